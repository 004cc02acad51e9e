use std::path::PathBuf;

/// Core error type.
///
/// List operations never fail (absence and conflicts are reported through return
/// values); this type covers configuration, the state file and transports.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("state file error: {path}: {reason}")]
    State { path: PathBuf, reason: String },

    #[error("external error: {0}")]
    External(String),
}

pub type Result<T> = std::result::Result<T, Error>;
