use crate::{
    backends::error::{BackendError, LoadError},
    generator::sampler::SamplingError,
    session::SessionError,
};

/// Caller-facing error taxonomy. Every variant is fatal to the call, never
/// to the process; the caller decides whether to retry with a fresh call.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error(transparent)]
    Load(#[from] LoadError),
    #[error("Backend does not support {0}")]
    Unsupported(&'static str),
    #[error(transparent)]
    Sampling(#[from] SamplingError),
    #[error("Backend failure: {0}")]
    Backend(BackendError),
    #[error("Generation aborted by caller")]
    Aborted,
    #[error(transparent)]
    Session(#[from] SessionError),
}

impl From<BackendError> for EngineError {
    fn from(value: BackendError) -> Self {
        match value {
            BackendError::Unsupported(capability) => {
                Self::Unsupported(capability)
            },
            other => Self::Backend(other),
        }
    }
}

impl EngineError {
    pub fn is_aborted(&self) -> bool {
        matches!(self, Self::Aborted)
    }
}
