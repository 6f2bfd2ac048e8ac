use std::fs;
use tempfile::tempdir;

#[test]
fn configure_logging_writes_app_audit_metrics_in_dir() {
    let dir = tempdir().unwrap();
    let base = dir.path().join("proc_logs");
    fs::create_dir_all(&base).unwrap();
    docmock::logger::configure_logging(Some(&base), Some("debug"), Some(3)).unwrap();
    log::info!("hello app");
    log::info!(target: "docmock::audit", "audit event");
    log::info!(target: "docmock::metrics", "metric event");
    assert!(base.join("app.log").exists());
    assert!(base.join("audit.log").exists());
    assert!(base.join("metrics.log").exists());
}

#[test]
fn configure_logging_with_dev_creates_dev6_file() {
    let dir = tempdir().unwrap();
    let base = dir.path().join("dev_logs");
    docmock::logger::configure_logging_with_dev(Some(&base), Some("trace"), Some(2), true).unwrap();
    docmock::dev6!("bench line");
    assert!(base.join("dev6.log").exists());
    assert!(base.join("app.log").exists());
}
