use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("Unable to find model at {0}")]
    ModelNotFound(PathBuf),
    #[error("Unrecognized model format: {0}")]
    InvalidFormat(String),
    #[error("Unable to read model: {0}")]
    Io(#[from] std::io::Error),
    #[error("Context length {requested} exceeds backend limit {limit}")]
    ContextLength { requested: u64, limit: u64 },
}

#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("Backend does not support {0}")]
    Unsupported(&'static str),
    #[error("Context window full")]
    ContextFull,
    #[error("Decode step failed: {0}")]
    Step(String),
    #[error("Invalid decode snapshot: {0}")]
    Snapshot(String),
}
