use std::{path::Path, sync::Mutex, time::Instant};

use tracing::info;

use crate::{
    backends::{Backend, Capabilities, TokenId},
    cancel::{CancelSignal, CancelToken},
    error::EngineError,
    generator::{
        generator::Generator,
        request::GenerationRequest,
        result::{FinishReason, GenerationResult, GenerationStats},
    },
    session::{SessionStore, SnapshotHeader},
    stream::{StreamEmitter, StreamEvent},
};

/// A failed call: the classification plus whatever was produced before the
/// failure. Tokens already streamed through `Data` events are preserved
/// here, never retracted.
#[derive(Debug, thiserror::Error)]
#[error("{error}")]
pub struct CompletionError {
    pub error: EngineError,
    pub partial: GenerationResult,
}

/// Caller-facing boundary around one loaded backend instance. Generation
/// calls are serialized on the decode context; tokenize and embedding do
/// not touch it and may run concurrently with a generation in flight.
pub struct Engine<B: Backend> {
    backend: B,
    context: Mutex<B::Context>,
}

impl<B: Backend> Engine<B> {
    pub fn new(backend: B) -> Result<Self, EngineError> {
        let context = backend.new_context()?;
        Ok(Self {
            backend,
            context: Mutex::new(context),
        })
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn capabilities(&self) -> Capabilities {
        self.backend.capabilities()
    }

    pub fn tokenize(
        &self,
        text: &str,
    ) -> Result<Vec<TokenId>, EngineError> {
        if !self.backend.capabilities().tokenize {
            return Err(EngineError::Unsupported("tokenize"));
        }
        Ok(self.backend.tokenize(text)?)
    }

    pub fn detokenize(
        &self,
        tokens: &[TokenId],
    ) -> Result<String, EngineError> {
        if !self.backend.capabilities().tokenize {
            return Err(EngineError::Unsupported("tokenize"));
        }
        Ok(self.backend.detokenize(tokens)?)
    }

    /// Feeds the request prompt into a fresh context and returns the
    /// backend's fixed-length embedding vector for it. The generation
    /// context is left untouched.
    pub fn embedding(
        &self,
        request: &GenerationRequest,
    ) -> Result<Vec<f32>, EngineError> {
        if !self.backend.capabilities().embed {
            return Err(EngineError::Unsupported("embed"));
        }
        let tokens = self.backend.tokenize(&request.prompt)?;
        let mut context = self.backend.new_context()?;
        for &token in &tokens {
            self.backend.step(&mut context, token, &request.sampling)?;
        }
        Ok(self.backend.embed(&context)?)
    }

    pub fn create_completion<F>(
        &self,
        request: &GenerationRequest,
        on_event: F,
    ) -> Result<GenerationResult, CompletionError>
    where
        F: FnMut(StreamEvent<'_>),
    {
        let cancel = CancelToken::new();
        self.run_completion(request, on_event, &cancel)
    }

    pub fn create_completion_with_signal<F>(
        &self,
        request: &GenerationRequest,
        on_event: F,
        signal: &CancelSignal,
    ) -> Result<GenerationResult, CompletionError>
    where
        F: FnMut(StreamEvent<'_>),
    {
        let cancel = CancelToken::new();
        let registration = {
            let cancel = cancel.clone();
            signal.register(Box::new(move || cancel.cancel()))
        };
        let result = self.run_completion(request, on_event, &cancel);
        // the call reached a terminal state, release the hook
        drop(registration);
        result
    }

    fn run_completion<F>(
        &self,
        request: &GenerationRequest,
        on_event: F,
        cancel: &CancelToken,
    ) -> Result<GenerationResult, CompletionError>
    where
        F: FnMut(StreamEvent<'_>),
    {
        let mut emitter = StreamEmitter::new(on_event);
        let start = Instant::now();
        let capabilities = self.backend.capabilities();

        let mut context = self.context.lock().unwrap();

        if let Some(path) = &request.load_session {
            if let Err(error) =
                self.restore_session(&mut context, path, capabilities)
            {
                let partial = Self::empty_result(start);
                emitter.error(&error, &partial);
                return Err(CompletionError {
                    error,
                    partial,
                });
            }
        }

        let run = {
            let mut generator = Generator::new(&self.backend, &mut context);
            generator.run(request, &mut emitter, cancel)
        };

        let mut result = GenerationResult {
            tokens: run.tokens,
            completed: false,
            finish_reason: None,
            stats: Self::build_stats(
                start,
                run.prompt_token_count,
                run.produced_token_count,
            ),
        };

        match run.outcome {
            Ok(reason) => {
                result.completed = reason == FinishReason::Eos;
                result.finish_reason = Some(reason);

                if let Some(path) = &request.save_session {
                    if let Err(error) =
                        self.persist_session(&context, path, capabilities)
                    {
                        emitter.error(&error, &result);
                        return Err(CompletionError {
                            error,
                            partial: result,
                        });
                    }
                }

                emitter.end(&result);
                Ok(result)
            },
            Err(error) => {
                emitter.error(&error, &result);
                Err(CompletionError {
                    error,
                    partial: result,
                })
            },
        }
    }

    fn restore_session(
        &self,
        context: &mut B::Context,
        path: &Path,
        capabilities: Capabilities,
    ) -> Result<(), EngineError> {
        if !capabilities.session_load {
            return Err(EngineError::Unsupported("session-load"));
        }
        let header = SnapshotHeader::from(self.backend.descriptor());
        let payload = SessionStore::load(path, &header)?;
        *context = self.backend.restore(&payload)?;
        info!(path = %path.display(), "restored decode session");
        Ok(())
    }

    fn persist_session(
        &self,
        context: &B::Context,
        path: &Path,
        capabilities: Capabilities,
    ) -> Result<(), EngineError> {
        if !capabilities.session_save {
            return Err(EngineError::Unsupported("session-save"));
        }
        let header = SnapshotHeader::from(self.backend.descriptor());
        let payload = self.backend.snapshot(context)?;
        SessionStore::save(path, &header, &payload)?;
        Ok(())
    }

    fn build_stats(
        start: Instant,
        prompt_tokens: usize,
        produced_tokens: usize,
    ) -> GenerationStats {
        let duration = start.elapsed().as_secs_f64();
        let tokens_per_second = if duration > 0.0 {
            produced_tokens as f64 / duration
        } else {
            0.0
        };
        GenerationStats {
            duration,
            tokens_count_input: prompt_tokens as u64,
            tokens_count_output: produced_tokens as u64,
            tokens_per_second,
        }
    }

    fn empty_result(start: Instant) -> GenerationResult {
        GenerationResult {
            tokens: Vec::new(),
            completed: false,
            finish_reason: None,
            stats: Self::build_stats(start, 0, 0),
        }
    }
}
