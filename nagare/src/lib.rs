pub mod backends;

pub mod cancel;
pub use cancel::{CancelController, CancelRegistration, CancelSignal, CancelToken};

pub mod engine;
pub use engine::{CompletionError, Engine};

pub mod error;
pub use error::EngineError;

pub mod generator;
pub use generator::request::GenerationRequest;
pub use generator::result::{FinishReason, GenerationResult, GenerationStats};
pub use generator::sampler::{SamplingParams, SamplingSeed};

pub mod session;

pub mod stream;
pub use stream::StreamEvent;

pub use backends::{
    Backend, BackendConfig, BackendDescriptor, Capabilities, StepOutput,
    TokenId,
};
