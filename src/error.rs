use std::path::PathBuf;

use thiserror::Error;

/// Failures of the domain parser
///
/// Validation problems are never reported through this type; they are diagnostics inside a
/// [`SchemaValidationResult`](crate::result::SchemaValidationResult).
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed XML in {path} at {line}:{column}: {details}")]
    Malformed {
        path: PathBuf,
        line: u32,
        column: u32,
        details: String,
    },

    #[error("Invalid root element in {path}: expected <process>, found <{found}>")]
    InvalidRoot { path: PathBuf, found: String },

    #[error("Missing required attribute '{attribute}' on <process> in {path}")]
    MissingAttribute { path: PathBuf, attribute: String },

    #[error("Unknown process type '{value}' in {path}")]
    UnknownProcessType { path: PathBuf, value: String },
}

impl ParseError {
    pub fn path(&self) -> &PathBuf {
        match self {
            ParseError::Io { path, .. }
            | ParseError::Malformed { path, .. }
            | ParseError::InvalidRoot { path, .. }
            | ParseError::MissingAttribute { path, .. }
            | ParseError::UnknownProcessType { path, .. } => path,
        }
    }
}

/// Failures while discovering input files
#[derive(Error, Debug)]
pub enum DiscoveryError {
    #[error("Cannot access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Failures of batch orchestration
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Validation task failed: {0}")]
    TaskJoin(#[from] tokio::task::JoinError),

    #[error("Concurrency limiter closed: {0}")]
    Semaphore(#[from] tokio::sync::AcquireError),
}

/// Parser result type alias
pub type ParseResult<T> = std::result::Result<T, ParseError>;

/// Discovery result type alias
pub type DiscoveryResult<T> = std::result::Result<T, DiscoveryError>;

/// Engine result type alias
pub type EngineResult<T> = std::result::Result<T, EngineError>;
