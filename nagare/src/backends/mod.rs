pub mod config;
pub mod error;
pub mod markov;

pub use config::BackendConfig;
pub use error::{BackendError, LoadError};

use crate::generator::sampler::SamplingParams;

pub type TokenId = u32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Capabilities {
    pub tokenize: bool,
    pub embed: bool,
    pub session_save: bool,
    pub session_load: bool,
}

impl Capabilities {
    pub fn full() -> Self {
        Self {
            tokenize: true,
            embed: true,
            session_save: true,
            session_load: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BackendDescriptor {
    pub backend_id: String,
    pub model_id: String,
    pub context_length: u64,
}

#[derive(Debug, Clone)]
pub enum StepOutput {
    Logits(Vec<f32>),
    Token(TokenId),
}

/// One inference engine behind the uniform decode contract. Every step call
/// mutates the backend-owned decode context; a context must only be stepped
/// by one generation loop at a time.
pub trait Backend {
    type Context;

    fn capabilities(&self) -> Capabilities;

    fn descriptor(&self) -> BackendDescriptor;

    fn eos_token(&self) -> TokenId;

    fn new_context(&self) -> Result<Self::Context, BackendError>;

    fn step(
        &self,
        context: &mut Self::Context,
        token: TokenId,
        sampling: &SamplingParams,
    ) -> Result<StepOutput, BackendError>;

    fn tokenize(
        &self,
        text: &str,
    ) -> Result<Vec<TokenId>, BackendError>;

    fn detokenize(
        &self,
        tokens: &[TokenId],
    ) -> Result<String, BackendError>;

    fn embed(
        &self,
        context: &Self::Context,
    ) -> Result<Vec<f32>, BackendError> {
        let _ = context;
        Err(BackendError::Unsupported("embed"))
    }

    fn snapshot(
        &self,
        context: &Self::Context,
    ) -> Result<Vec<u8>, BackendError> {
        let _ = context;
        Err(BackendError::Unsupported("session-save"))
    }

    fn restore(
        &self,
        bytes: &[u8],
    ) -> Result<Self::Context, BackendError> {
        let _ = bytes;
        Err(BackendError::Unsupported("session-load"))
    }
}
