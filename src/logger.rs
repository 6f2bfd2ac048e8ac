//! Process-wide logging on top of `log4rs`.
//!
//! Four rolling files live in the chosen directory: `app.log` for everything,
//! `audit.log` for target `docmock::audit`, `metrics.log` for `docmock::metrics`
//! and, when enabled, `dev6.log` for developer bench lines (`docmock::dev6`).

use crate::errors::{DbError, Result};
use log::LevelFilter;
use log4rs::Handle;
use log4rs::append::rolling_file::RollingFileAppender;
use log4rs::append::rolling_file::policy::compound::{
    CompoundPolicy, roll::fixed_window::FixedWindowRoller, trigger::size::SizeTrigger,
};
use log4rs::config::{Appender, Config, Logger, Root};
use log4rs::encode::pattern::PatternEncoder;
use parking_lot::Mutex;
use std::path::{Path, PathBuf};

const ENC_PATTERN: &str = "{d(%Y-%m-%d %H:%M:%S%.3f)} [{l}] {t} - {m}{n}";
const ROLL_SIZE: u64 = 10 * 1024 * 1024;
const DEFAULT_RETENTION: u32 = 7;

pub const AUDIT_TARGET: &str = "docmock::audit";
pub const METRICS_TARGET: &str = "docmock::metrics";
pub const DEV6_TARGET: &str = "docmock::dev6";

static HANDLE: Mutex<Option<Handle>> = Mutex::new(None);

fn config_err(e: impl std::fmt::Display) -> DbError {
    DbError::Config(format!("logging: {e}"))
}

/// Maps a textual level to a filter; unknown names fall back to `info`.
#[must_use]
pub fn parse_level(level: Option<&str>) -> LevelFilter {
    match level.unwrap_or("info").to_ascii_lowercase().as_str() {
        "off" => LevelFilter::Off,
        "error" => LevelFilter::Error,
        "warn" => LevelFilter::Warn,
        "debug" => LevelFilter::Debug,
        "trace" => LevelFilter::Trace,
        _ => LevelFilter::Info,
    }
}

fn rolling(base: &Path, stem: &str, keep: u32) -> Result<RollingFileAppender> {
    let roller = FixedWindowRoller::builder()
        .build(&format!("{}", base.join(format!("{stem}.{{}}.log")).display()), keep)
        .map_err(config_err)?;
    let policy = CompoundPolicy::new(Box::new(SizeTrigger::new(ROLL_SIZE)), Box::new(roller));
    RollingFileAppender::builder()
        .encoder(Box::new(PatternEncoder::new(ENC_PATTERN)))
        .build(base.join(format!("{stem}.log")), Box::new(policy))
        .map_err(DbError::from)
}

/// Configure logging globally for the process. A second call replaces the active config.
/// - dir: base directory for logs; if None, current directory.
/// - level: off|error|warn|info|debug|trace
/// - retention: number of rolled files to keep (default 7)
///
/// # Errors
/// Returns an error if the log directory or files cannot be created, or if a
/// different logger implementation is already installed.
pub fn configure_logging(dir: Option<&Path>, level: Option<&str>, retention: Option<usize>) -> Result<()> {
    configure_logging_with_dev(dir, level, retention, false)
}

/// Like [`configure_logging`]; with `enable_dev6` the `dev6!` bench lines are
/// also persisted to `dev6.log`.
///
/// # Errors
/// See [`configure_logging`].
pub fn configure_logging_with_dev(
    dir: Option<&Path>,
    level: Option<&str>,
    retention: Option<usize>,
    enable_dev6: bool,
) -> Result<()> {
    let base = match dir {
        Some(d) => PathBuf::from(d),
        None => std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
    };
    std::fs::create_dir_all(&base)?;
    let keep = retention.and_then(|r| u32::try_from(r).ok()).unwrap_or(DEFAULT_RETENTION);
    let lvl = parse_level(level);

    let mut builder = Config::builder()
        .appender(Appender::builder().build("app", Box::new(rolling(&base, "app", keep)?)))
        .appender(Appender::builder().build("audit", Box::new(rolling(&base, "audit", keep)?)))
        .appender(Appender::builder().build("metrics", Box::new(rolling(&base, "metrics", keep)?)))
        .logger(Logger::builder().appender("audit").additive(false).build(AUDIT_TARGET, lvl))
        .logger(Logger::builder().appender("metrics").additive(false).build(METRICS_TARGET, lvl));

    builder = if enable_dev6 {
        builder
            .appender(Appender::builder().build("dev6", Box::new(rolling(&base, "dev6", keep)?)))
            .logger(
                Logger::builder()
                    .appender("dev6")
                    .additive(false)
                    .build(DEV6_TARGET, LevelFilter::Trace),
            )
    } else {
        // Bench lines stay out of app.log unless routed explicitly
        builder.logger(Logger::builder().additive(false).build(DEV6_TARGET, LevelFilter::Off))
    };

    let config = builder.build(Root::builder().appender("app").build(lvl)).map_err(config_err)?;
    let mut slot = HANDLE.lock();
    if let Some(handle) = slot.as_ref() {
        handle.set_config(config);
        return Ok(());
    }
    *slot = Some(log4rs::init_config(config).map_err(config_err)?);
    Ok(())
}

/// Logging settings read from an environment-like lookup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvLogSettings {
    pub dir: Option<PathBuf>,
    pub level: Option<String>,
    pub retention: Option<usize>,
    pub dev6: bool,
}

impl EnvLogSettings {
    /// Reads `DOCMOCK_LOG_DIR`, `DOCMOCK_LOG_LEVEL`, `DOCMOCK_LOG_RETENTION` and `DOCMOCK_DEV6`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            dir: lookup("DOCMOCK_LOG_DIR").map(PathBuf::from),
            level: lookup("DOCMOCK_LOG_LEVEL"),
            retention: lookup("DOCMOCK_LOG_RETENTION").and_then(|s| s.parse::<usize>().ok()),
            dev6: lookup("DOCMOCK_DEV6")
                .is_some_and(|s| matches!(s.to_ascii_lowercase().as_str(), "1" | "true" | "yes")),
        }
    }
}

/// Configure logging from the process environment.
///
/// # Errors
/// See [`configure_logging`].
pub fn configure_from_env() -> Result<()> {
    let s = EnvLogSettings::from_lookup(|k| std::env::var(k).ok());
    configure_logging_with_dev(s.dir.as_deref(), s.level.as_deref(), s.retention, s.dev6)
}
