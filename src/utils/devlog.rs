//! Bench lines emitted by the collection operations.
//!
//! Every `find`, `count`, `update`, `delete` and `find_and_modify` writes one JSON
//! object through [`dev6!`](crate::dev6) under [`DEV6_TARGET`](crate::logger::DEV6_TARGET).
//! A test can switch on a per-thread capture buffer and read them back without
//! touching the global logger.

use std::cell::RefCell;

thread_local! {
    static CAPTURE: RefCell<Option<Vec<String>>> = const { RefCell::new(None) };
}

/// Stops capturing on this thread when dropped.
pub struct CaptureGuard;

impl Drop for CaptureGuard {
    fn drop(&mut self) {
        CAPTURE.with(|c| *c.borrow_mut() = None);
    }
}

/// Starts capturing bench lines emitted on the current thread.
pub fn enable_thread_sink() -> CaptureGuard {
    CAPTURE.with(|c| *c.borrow_mut() = Some(Vec::new()));
    CaptureGuard
}

/// Appends a line to this thread's buffer; a no-op while capture is off.
pub fn record(line: &str) {
    CAPTURE.with(|c| {
        if let Some(buf) = c.borrow_mut().as_mut() {
            buf.push(line.to_owned());
        }
    });
}

/// Takes the captured lines, leaving the buffer empty.
pub fn drain() -> Vec<String> {
    CAPTURE.with(|c| c.borrow_mut().as_mut().map(std::mem::take).unwrap_or_default())
}

#[must_use]
pub fn snapshot() -> Vec<String> {
    CAPTURE.with(|c| c.borrow().clone().unwrap_or_default())
}

/// Captured bench records for one operation (`"find"`, `"update_many"`, ...),
/// parsed as JSON. Lines that are not bench objects are skipped.
#[must_use]
pub fn bench_records(op: &str) -> Vec<serde_json::Value> {
    snapshot()
        .iter()
        .filter_map(|l| serde_json::from_str::<serde_json::Value>(l).ok())
        .filter(|v| v["bench"] == "query" && v["op"] == op)
        .collect()
}

/// Formats a bench line, captures it when enabled and logs it at trace level.
#[macro_export]
macro_rules! dev6 {
    ($($arg:tt)*) => {{
        let __line = format!($($arg)*);
        $crate::utils::devlog::record(&__line);
        log::trace!(target: $crate::logger::DEV6_TARGET, "{}", __line);
    }};
}
