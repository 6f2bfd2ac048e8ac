use docmock::utils::devlog;

#[test]
fn sink_disabled_after_guard_drop() {
    {
        let _g = devlog::enable_thread_sink();
        docmock::dev6!("inside {}", 1);
        assert_eq!(devlog::snapshot(), vec!["inside 1".to_string()]);
    }
    docmock::dev6!("outside");
    assert!(devlog::drain().is_empty());
}
