use thiserror::Error;

#[derive(Debug, Error)]
pub enum DbLogError {
    #[error("Database unavailable: {0}")]
    DbUnavailable(#[from] r2d2::Error),
    #[error("SQL failure: {0}")]
    Sql(#[from] rusqlite::Error),
    #[error("Serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("I/O failure: {0}")]
    Io(#[from] std::io::Error),
    #[error("An item with the key '{0}' has already been added")]
    DuplicateKey(String),
    #[error("Context keys must not be empty")]
    InvalidKey,
    #[error("No value for key '{0}'")]
    MissingKey(String),
    #[error("Value for key '{key}' is not a {expected}: {detail}")]
    TypeMismatch {
        key: String,
        expected: &'static str,
        detail: String,
    },
    #[error("Trace sink unavailable: {0}")]
    TraceUnavailable(String),
    #[error("Sink panicked: {0}")]
    SinkPanicked(String),
}

impl DbLogError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::DbUnavailable(_) => "LOG-1001",
            Self::Sql(_) => "LOG-1002",
            Self::Serialize(_) => "LOG-1003",
            Self::Io(_) => "LOG-1004",
            Self::DuplicateKey(_) => "LOG-2001",
            Self::InvalidKey => "LOG-2002",
            Self::MissingKey(_) => "LOG-3001",
            Self::TypeMismatch { .. } => "LOG-3002",
            Self::TraceUnavailable(_) => "LOG-4001",
            Self::SinkPanicked(_) => "LOG-4002",
        }
    }

    pub fn explain(&self) -> &'static str {
        match self {
            Self::DbUnavailable(_) => "No connection to the log database could be obtained.",
            Self::Sql(_) => "The log database rejected the statement.",
            Self::Serialize(_) => "A value could not be rendered as JSON.",
            Self::Io(_) => "The log workspace could not be prepared on disk.",
            Self::DuplicateKey(_) => "The entry context already holds a value under this key.",
            Self::InvalidKey => "Context keys must be non-empty strings.",
            Self::MissingKey(_) => "The map has no value stored under the requested key.",
            Self::TypeMismatch { .. } => "The stored value cannot be read as the requested type.",
            Self::TraceUnavailable(_) => "The local trace sink refused the entry.",
            Self::SinkPanicked(_) => "A sink implementation panicked while handling the entry.",
        }
    }
}

pub type Result<T, E = DbLogError> = std::result::Result<T, E>;
