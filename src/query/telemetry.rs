use parking_lot::RwLock;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub slow_query_ms: u64,
    pub query_log_path: Option<PathBuf>,
    pub structured_json: bool,
    pub enable_audit: bool,
    /// Upper bound on documents returned by one find; `None` is unbounded.
    pub max_result_limit: Option<usize>,
    pub current_db: Option<String>,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            slow_query_ms: 500,
            query_log_path: None,
            structured_json: true,
            enable_audit: false,
            max_result_limit: None,
            current_db: None,
        }
    }
}

#[derive(Default)]
pub struct Metrics {
    pub queries_total: AtomicU64,
    pub queries_slow_total: AtomicU64,
    pub writes_total: AtomicU64,
    pub audits_total: AtomicU64,
    pub errors_total: AtomicU64,
}

#[derive(Default)]
pub struct Telemetry {
    pub cfg: RwLock<TelemetryConfig>,
    pub metrics: Metrics,
    // For tests we can capture audit lines in-memory
    audit_sink: RwLock<Option<Arc<RwLock<Vec<String>>>>>,
}

pub(crate) static TELEMETRY: std::sync::LazyLock<Telemetry> =
    std::sync::LazyLock::new(Telemetry::default);

pub fn set_db_name(db: &str) {
    TELEMETRY.cfg.write().current_db = Some(db.to_string());
}
pub fn set_query_log(path: PathBuf, slow_query_ms: Option<u64>, structured_json: Option<bool>) {
    let mut w = TELEMETRY.cfg.write();
    w.query_log_path = Some(path);
    if let Some(ms) = slow_query_ms {
        w.slow_query_ms = ms;
    }
    if let Some(js) = structured_json {
        w.structured_json = js;
    }
}
pub fn set_slow_query_ms(ms: u64) {
    TELEMETRY.cfg.write().slow_query_ms = ms;
}
pub fn set_audit_enabled(enabled: bool) {
    TELEMETRY.cfg.write().enable_audit = enabled;
}
pub fn set_audit_sink_for_tests(sink: Arc<RwLock<Vec<String>>>) {
    *TELEMETRY.audit_sink.write() = Some(sink);
}
pub fn set_max_result_limit(limit: Option<usize>) {
    TELEMETRY.cfg.write().max_result_limit = limit;
}
#[must_use]
pub fn max_result_limit() -> Option<usize> {
    TELEMETRY.cfg.read().max_result_limit
}

fn write_line(path: &PathBuf, line: &str) {
    if let Ok(mut f) = std::fs::OpenOptions::new().create(true).append(true).open(path) {
        use std::io::Write;
        let _ = writeln!(f, "{line}");
    }
}

fn now_ts() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

fn sha256_hex(input: &str) -> String {
    use sha2::{Digest, Sha256};
    let mut h = Sha256::new();
    h.update(input.as_bytes());
    hex::encode(h.finalize())
}

/// Records one read query. Slow queries are counted and logged on the metrics target.
pub fn log_query(collection: &str, op: &str, query_dbg: &str, duration_ms: u128, result_count: usize) {
    TELEMETRY.metrics.queries_total.fetch_add(1, Ordering::Relaxed);
    let cfg = TELEMETRY.cfg.read().clone();
    let filter_hash = sha256_hex(query_dbg);
    let slow = u64::try_from(duration_ms).map_or(true, |ms| ms >= cfg.slow_query_ms);
    if slow {
        TELEMETRY.metrics.queries_slow_total.fetch_add(1, Ordering::Relaxed);
        log::warn!(
            target: "docmock::metrics",
            "slow {op} on {collection}: {duration_ms}ms (filter {filter_hash})"
        );
    }
    let Some(path) = cfg.query_log_path.as_ref() else {
        return;
    };
    let line = if cfg.structured_json {
        serde_json::json!({
            "ts": now_ts(),
            "db": cfg.current_db.as_deref().unwrap_or("default"),
            "collection": collection,
            "op": op,
            "filter_hash": filter_hash,
            "duration_ms": u64::try_from(duration_ms).unwrap_or(u64::MAX),
            "result_count": result_count,
            "slow": slow
        })
        .to_string()
    } else {
        format!(
            "ts={} db={} collection={} op={} filter_hash={} duration_ms={} result_count={} slow={}",
            now_ts(),
            cfg.current_db.as_deref().unwrap_or("default"),
            collection,
            op,
            filter_hash,
            duration_ms,
            result_count,
            slow
        )
    };
    write_line(path, &line);
}

/// Records one document write; emits an audit line when auditing is enabled.
pub fn log_audit(op: &str, collection: &str, doc_id: &str) {
    TELEMETRY.metrics.writes_total.fetch_add(1, Ordering::Relaxed);
    if !TELEMETRY.cfg.read().enable_audit {
        return;
    }
    TELEMETRY.metrics.audits_total.fetch_add(1, Ordering::Relaxed);
    let db = TELEMETRY.cfg.read().current_db.clone().unwrap_or_else(|| "default".into());
    let line = serde_json::json!({
        "ts": now_ts(), "db": db, "op": op, "collection": collection, "doc_id": doc_id
    })
    .to_string();
    log::info!(target: "docmock::audit", "{line}");
    let audit_clone = TELEMETRY.audit_sink.read().clone();
    if let Some(sink) = audit_clone {
        sink.write().push(line.clone());
    }
    let log_path = TELEMETRY.cfg.read().query_log_path.clone();
    if let Some(path) = log_path.as_ref() {
        write_line(path, &line);
    }
}

/// Records an operation that was rejected with an error.
pub fn log_error(op: &str, collection: &str, err: &crate::errors::DbError) {
    TELEMETRY.metrics.errors_total.fetch_add(1, Ordering::Relaxed);
    log::warn!("{op} on {collection} failed: {err}");
}

#[must_use]
pub fn metrics_text() -> String {
    // OpenMetrics/Prometheus exposition format (no types/HELP for brevity)
    let m = &TELEMETRY.metrics;
    format!(
        "docmock_queries_total {}\n\
         docmock_queries_slow_total {}\n\
         docmock_writes_total {}\n\
         docmock_audits_total {}\n\
         docmock_errors_total {}\n",
        m.queries_total.load(Ordering::Relaxed),
        m.queries_slow_total.load(Ordering::Relaxed),
        m.writes_total.load(Ordering::Relaxed),
        m.audits_total.load(Ordering::Relaxed),
        m.errors_total.load(Ordering::Relaxed),
    )
}
