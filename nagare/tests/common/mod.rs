#![allow(dead_code)]

use nagare::{
    Backend, BackendDescriptor, Capabilities, EngineError, FinishReason,
    SamplingParams, StepOutput, StreamEvent, TokenId,
    backends::error::BackendError,
};
use serde::{Deserialize, Serialize};

pub const EOS: TokenId = 256;

#[derive(Debug, Clone)]
pub enum ScriptStep {
    Logits(Vec<f32>),
    Token(TokenId),
    Fail(String),
}

/// Backend with a fixed sequence of step outputs. Token ids 0..=255 are
/// raw bytes, 256 is the end marker, so tokenization matches the markov
/// reference backend. Outputs are consumed one per step call, prompt
/// feeding included; `scripted` pads the feed phase for you.
pub struct ScriptedBackend {
    script: Vec<ScriptStep>,
    capabilities: Capabilities,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScriptedContext {
    pub cursor: usize,
    pub tokens: Vec<TokenId>,
}

impl ScriptedBackend {
    pub fn new(script: Vec<ScriptStep>) -> Self {
        Self {
            script,
            capabilities: Capabilities::full(),
        }
    }

    pub fn with_capabilities(
        mut self,
        capabilities: Capabilities,
    ) -> Self {
        self.capabilities = capabilities;
        self
    }
}

/// Builds a backend whose decode outputs are exactly `decode`, regardless
/// of the length of `prompt`. Only the output of the last feed step
/// reaches the decoder, so feed steps before it get placeholders.
pub fn scripted(
    prompt: &str,
    decode: Vec<ScriptStep>,
) -> ScriptedBackend {
    let mut script =
        vec![ScriptStep::Token(0); prompt.len().saturating_sub(1)];
    script.extend(decode);
    ScriptedBackend::new(script)
}

/// Decode script spelling out `text` byte by byte, optionally ending on
/// the end marker.
pub fn spell(
    text: &str,
    end_with_eos: bool,
) -> Vec<ScriptStep> {
    let mut steps: Vec<ScriptStep> = text
        .bytes()
        .map(|byte| ScriptStep::Token(TokenId::from(byte)))
        .collect();
    if end_with_eos {
        steps.push(ScriptStep::Token(EOS));
    }
    steps
}

impl Backend for ScriptedBackend {
    type Context = ScriptedContext;

    fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    fn descriptor(&self) -> BackendDescriptor {
        BackendDescriptor {
            backend_id: "scripted".to_string(),
            model_id: "script".to_string(),
            context_length: 4096,
        }
    }

    fn eos_token(&self) -> TokenId {
        EOS
    }

    fn new_context(&self) -> Result<Self::Context, BackendError> {
        Ok(ScriptedContext::default())
    }

    fn step(
        &self,
        context: &mut Self::Context,
        token: TokenId,
        sampling: &SamplingParams,
    ) -> Result<StepOutput, BackendError> {
        let _ = sampling;
        context.tokens.push(token);
        let step = self
            .script
            .get(context.cursor)
            .cloned()
            .unwrap_or(ScriptStep::Token(EOS));
        context.cursor += 1;
        match step {
            ScriptStep::Logits(logits) => Ok(StepOutput::Logits(logits)),
            ScriptStep::Token(token) => Ok(StepOutput::Token(token)),
            ScriptStep::Fail(message) => Err(BackendError::Step(message)),
        }
    }

    fn tokenize(
        &self,
        text: &str,
    ) -> Result<Vec<TokenId>, BackendError> {
        if !self.capabilities.tokenize {
            return Err(BackendError::Unsupported("tokenize"));
        }
        Ok(text.bytes().map(TokenId::from).collect())
    }

    fn detokenize(
        &self,
        tokens: &[TokenId],
    ) -> Result<String, BackendError> {
        let bytes: Vec<u8> = tokens
            .iter()
            .filter(|&&token| token < EOS)
            .map(|&token| token as u8)
            .collect();
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    fn embed(
        &self,
        context: &Self::Context,
    ) -> Result<Vec<f32>, BackendError> {
        if !self.capabilities.embed {
            return Err(BackendError::Unsupported("embed"));
        }
        Ok(vec![context.tokens.len() as f32; 8])
    }

    fn snapshot(
        &self,
        context: &Self::Context,
    ) -> Result<Vec<u8>, BackendError> {
        if !self.capabilities.session_save {
            return Err(BackendError::Unsupported("session-save"));
        }
        bincode::serialize(context)
            .map_err(|error| BackendError::Snapshot(error.to_string()))
    }

    fn restore(
        &self,
        bytes: &[u8],
    ) -> Result<Self::Context, BackendError> {
        if !self.capabilities.session_load {
            return Err(BackendError::Unsupported("session-load"));
        }
        bincode::deserialize(bytes)
            .map_err(|error| BackendError::Snapshot(error.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CollectedEvent {
    Data {
        token: String,
        is_final: bool,
    },
    End {
        tokens: Vec<String>,
        completed: bool,
        finish_reason: Option<FinishReason>,
    },
    Error {
        kind: &'static str,
        tokens: Vec<String>,
    },
}

pub fn error_kind(error: &EngineError) -> &'static str {
    match error {
        EngineError::Load(_) => "load",
        EngineError::Unsupported(_) => "unsupported",
        EngineError::Sampling(_) => "sampling",
        EngineError::Backend(_) => "backend",
        EngineError::Aborted => "aborted",
        EngineError::Session(_) => "session",
    }
}

impl From<StreamEvent<'_>> for CollectedEvent {
    fn from(event: StreamEvent<'_>) -> Self {
        match event {
            StreamEvent::Data {
                token,
                is_final,
            } => CollectedEvent::Data {
                token: token.to_string(),
                is_final,
            },
            StreamEvent::End(result) => CollectedEvent::End {
                tokens: result.tokens.clone(),
                completed: result.completed,
                finish_reason: result.finish_reason,
            },
            StreamEvent::Error {
                error,
                partial,
            } => CollectedEvent::Error {
                kind: error_kind(error),
                tokens: partial.tokens.clone(),
            },
        }
    }
}

pub fn data_events(events: &[CollectedEvent]) -> Vec<&CollectedEvent> {
    events
        .iter()
        .filter(|event| matches!(event, CollectedEvent::Data { .. }))
        .collect()
}
