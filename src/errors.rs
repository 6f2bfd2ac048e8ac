use thiserror::Error;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("Operator conflict: {0}")]
    OperatorConflict(String),

    #[error("Invalid operator spec: {0}")]
    InvalidOperatorSpec(String),

    #[error("Path resolution error: {0}")]
    PathResolution(String),

    #[error("Type mismatch: {0}")]
    TypeMismatch(String),

    #[error("Duplicate identifier: {0}")]
    DuplicateIdentifier(String),

    #[error("Collection not found: {0}")]
    NoSuchCollection(String),

    #[error("Collection already exists: {0}")]
    CollectionAlreadyExists(String),

    #[error("Serde JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(String),
}

impl From<std::io::Error> for DbError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, DbError>;
