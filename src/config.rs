//! Engine configuration.
//!
//! Precedence: defaults < TOML file < `DOCMOCK_*` environment variables <
//! values the caller sets on the struct afterwards.

use crate::errors::{DbError, Result};
use crate::query::telemetry;
use crate::types::{
    IdGenerator, ObjectIdGenerator, SeededIdGenerator, SequentialIdGenerator, UuidGenerator,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum IdGeneratorKind {
    #[default]
    ObjectId,
    Uuid,
    Sequential {
        #[serde(default = "default_start")]
        start: i64,
    },
    Seeded {
        seed: u64,
    },
}

fn default_start() -> i64 {
    1
}

impl IdGeneratorKind {
    /// Parses the compact env form: `object_id`, `uuid`, `sequential[:start]`, `seeded:<seed>`.
    pub fn parse(s: &str) -> Result<Self> {
        let bad = || DbError::Config(format!("invalid id generator: {s}"));
        let (name, arg) = match s.split_once(':') {
            Some((n, a)) => (n.trim(), Some(a.trim())),
            None => (s.trim(), None),
        };
        match (name.to_ascii_lowercase().as_str(), arg) {
            ("object_id" | "objectid", None) => Ok(Self::ObjectId),
            ("uuid", None) => Ok(Self::Uuid),
            ("sequential", None) => Ok(Self::Sequential { start: default_start() }),
            ("sequential", Some(a)) => a.parse().map(|start| Self::Sequential { start }).map_err(|_| bad()),
            ("seeded", Some(a)) => a.parse().map(|seed| Self::Seeded { seed }).map_err(|_| bad()),
            _ => Err(bad()),
        }
    }

    #[must_use]
    pub fn build(&self) -> Arc<dyn IdGenerator> {
        match self {
            Self::ObjectId => Arc::new(ObjectIdGenerator),
            Self::Uuid => Arc::new(UuidGenerator),
            Self::Sequential { start } => Arc::new(SequentialIdGenerator::new(*start)),
            Self::Seeded { seed } => Arc::new(SeededIdGenerator::new(*seed)),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogSection {
    pub dir: Option<PathBuf>,
    pub level: Option<String>,
    pub retention: Option<usize>,
    pub dev6: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub id_generator: IdGeneratorKind,
    /// Cap on documents returned by one find; `None` is unbounded.
    pub max_result_limit: Option<usize>,
    pub slow_query_ms: u64,
    pub audit: bool,
    pub log: Option<LogSection>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            id_generator: IdGeneratorKind::default(),
            max_result_limit: None,
            slow_query_ms: 500,
            audit: false,
            log: None,
        }
    }
}

impl EngineConfig {
    pub fn from_toml_str(s: &str) -> Result<Self> {
        toml::from_str(s).map_err(|e| DbError::Config(e.to_string()))
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let s = std::fs::read_to_string(path)?;
        Self::from_toml_str(&s)
    }

    /// Defaults, overlaid by `path` when given, then by the process environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let cfg = match path {
            Some(p) => Self::from_file(p)?,
            None => Self::default(),
        };
        cfg.apply_env_from(|k| std::env::var(k).ok())
    }

    /// Overlays `DOCMOCK_*` values read through `lookup`. Unparseable values are errors.
    pub fn apply_env_from(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        if let Some(s) = lookup("DOCMOCK_ID_GENERATOR") {
            self.id_generator = IdGeneratorKind::parse(&s)?;
        }
        if let Some(s) = lookup("DOCMOCK_MAX_RESULT_LIMIT") {
            let n: usize = parse_env("DOCMOCK_MAX_RESULT_LIMIT", &s)?;
            self.max_result_limit = (n > 0).then_some(n);
        }
        if let Some(s) = lookup("DOCMOCK_SLOW_QUERY_MS") {
            self.slow_query_ms = parse_env("DOCMOCK_SLOW_QUERY_MS", &s)?;
        }
        if let Some(s) = lookup("DOCMOCK_AUDIT") {
            self.audit = matches!(s.to_ascii_lowercase().as_str(), "1" | "true" | "yes");
        }
        Ok(self)
    }

    #[must_use]
    pub fn build_id_generator(&self) -> Arc<dyn IdGenerator> {
        self.id_generator.build()
    }

    /// Pushes the limits and audit switch into the process-wide telemetry.
    pub fn apply_telemetry(&self) {
        telemetry::set_max_result_limit(self.max_result_limit);
        telemetry::set_slow_query_ms(self.slow_query_ms);
        telemetry::set_audit_enabled(self.audit);
    }

    /// Installs file logging when a `[log]` table is present.
    pub fn init_logging(&self) -> Result<()> {
        match &self.log {
            Some(l) => crate::logger::configure_logging_with_dev(
                l.dir.as_deref(),
                l.level.as_deref(),
                l.retention,
                l.dev6,
            ),
            None => Ok(()),
        }
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value.trim().parse().map_err(|_| DbError::Config(format!("{key}: cannot parse {value:?}")))
}
