use rand::{SeedableRng, rngs::StdRng};
use tracing::debug;

use super::{
    request::GenerationRequest,
    result::FinishReason,
    sampler::{self, SamplingState},
};
use crate::{
    backends::{Backend, StepOutput, TokenId},
    cancel::CancelToken,
    error::EngineError,
    stream::{StreamEmitter, StreamEvent},
};

// Upper bound on how many undecodable token ids are accumulated while
// waiting for a multi-byte character to complete.
const PENDING_DECODE_LIMIT: usize = 8;

pub(crate) struct LoopRun {
    pub tokens: Vec<String>,
    pub prompt_token_count: usize,
    pub produced_token_count: usize,
    pub outcome: Result<FinishReason, EngineError>,
}

/// Drives one call through Feeding and Decoding until a stop condition
/// fires. Exactly one generator may mutate a given decode context at a
/// time; the engine enforces this with a mutex around the context.
pub(crate) struct Generator<'a, B: Backend> {
    backend: &'a B,
    context: &'a mut B::Context,
}

impl<'a, B: Backend> Generator<'a, B> {
    pub fn new(
        backend: &'a B,
        context: &'a mut B::Context,
    ) -> Self {
        Self {
            backend,
            context,
        }
    }

    pub fn run<F>(
        &mut self,
        request: &GenerationRequest,
        emitter: &mut StreamEmitter<F>,
        cancel: &CancelToken,
    ) -> LoopRun
    where
        F: FnMut(StreamEvent<'_>),
    {
        let mut tokens: Vec<String> = Vec::new();
        let mut prompt_token_count = 0usize;
        let mut produced = 0usize;
        let outcome = self.run_inner(
            request,
            emitter,
            cancel,
            &mut tokens,
            &mut prompt_token_count,
            &mut produced,
        );
        LoopRun {
            tokens,
            prompt_token_count,
            produced_token_count: produced,
            outcome,
        }
    }

    fn run_inner<F>(
        &mut self,
        request: &GenerationRequest,
        emitter: &mut StreamEmitter<F>,
        cancel: &CancelToken,
        tokens: &mut Vec<String>,
        prompt_token_count: &mut usize,
        produced: &mut usize,
    ) -> Result<FinishReason, EngineError>
    where
        F: FnMut(StreamEvent<'_>),
    {
        let params = &request.sampling;
        let prompt_tokens = self.backend.tokenize(&request.prompt)?;
        *prompt_token_count = prompt_tokens.len();
        let eos = self.backend.eos_token();

        let mut state = SamplingState::new(params.repeat_last_n);
        let mut rng = StdRng::seed_from_u64(params.seed.resolve());
        let mut stop_filter = StopFilter::new(request.stop_sequence.clone());
        let mut pending: Vec<TokenId> = Vec::new();

        debug!(prompt_tokens = prompt_tokens.len(), "feeding prompt");

        let mut last_output: Option<StepOutput> = None;
        for &token in &prompt_tokens {
            if cancel.is_cancelled() {
                return Err(EngineError::Aborted);
            }
            let output = self.backend.step(self.context, token, params)?;
            state.push(token);
            if request.echo_prompt {
                let text = self.backend.detokenize(&[token])?;
                emitter.data(&text, false);
                tokens.push(text);
            }
            last_output = Some(output);
        }

        if request.feed_only {
            debug!("prompt fed, generation skipped");
            return Ok(FinishReason::FeedOnly);
        }

        let reason = 'decode: loop {
            if *produced >= request.num_predict {
                break 'decode FinishReason::Length;
            }
            if cancel.is_cancelled() {
                return Err(EngineError::Aborted);
            }
            let Some(output) = last_output.take() else {
                break 'decode FinishReason::Length;
            };

            let token = match output {
                StepOutput::Logits(logits) => {
                    sampler::sample(&logits, &state, params, &mut rng)?
                },
                StepOutput::Token(token) => token,
            };

            if token == eos {
                self.flush_text(
                    &mut pending,
                    &mut stop_filter,
                    emitter,
                    tokens,
                );
                let marker = self.backend.detokenize(&[eos])?;
                emitter.data(&marker, true);
                tokens.push(marker);
                break 'decode FinishReason::Eos;
            }

            state.push(token);
            *produced += 1;
            pending.push(token);

            let piece = self.backend.detokenize(&pending)?;
            if !piece.contains('\u{FFFD}')
                || pending.len() > PENDING_DECODE_LIMIT
            {
                pending.clear();
                let (emit, matched) = stop_filter.push(&piece);
                if let Some(text) = emit {
                    emitter.data(&text, false);
                    tokens.push(text);
                }
                if matched {
                    break 'decode FinishReason::StopSequence;
                }
            }

            if *produced >= request.num_predict {
                break 'decode FinishReason::Length;
            }

            last_output =
                Some(self.backend.step(self.context, token, params)?);
        };

        if reason != FinishReason::Eos {
            self.flush_text(&mut pending, &mut stop_filter, emitter, tokens);
        }

        debug!(produced = *produced, reason = ?reason, "generation finished");
        Ok(reason)
    }

    fn flush_text<F>(
        &self,
        pending: &mut Vec<TokenId>,
        stop_filter: &mut StopFilter,
        emitter: &mut StreamEmitter<F>,
        tokens: &mut Vec<String>,
    ) where
        F: FnMut(StreamEvent<'_>),
    {
        if !pending.is_empty() {
            if let Ok(piece) = self.backend.detokenize(pending) {
                let (emit, _) = stop_filter.push(&piece);
                if let Some(text) = emit {
                    emitter.data(&text, false);
                    tokens.push(text);
                }
            }
            pending.clear();
        }
        if let Some(text) = stop_filter.flush() {
            emitter.data(&text, false);
            tokens.push(text);
        }
    }
}

/// Withholds text that could still turn into the configured stop sequence.
/// Matched stop text is never emitted; on a mismatch the withheld part is
/// released with the next piece.
struct StopFilter {
    stop: Option<String>,
    held: String,
}

impl StopFilter {
    fn new(stop: Option<String>) -> Self {
        let stop = stop.filter(|stop| !stop.is_empty());
        Self {
            stop,
            held: String::new(),
        }
    }

    fn push(
        &mut self,
        piece: &str,
    ) -> (Option<String>, bool) {
        let Some(stop) = &self.stop else {
            if piece.is_empty() {
                return (None, false);
            }
            return (Some(piece.to_string()), false);
        };

        self.held.push_str(piece);
        if let Some(position) = self.held.find(stop.as_str()) {
            let emit = self.held[..position].to_string();
            self.held.clear();
            return (Some(emit).filter(|emit| !emit.is_empty()), true);
        }

        let keep = longest_suffix_prefix(&self.held, stop);
        let cut = self.held.len() - keep;
        let emit = self.held[..cut].to_string();
        self.held.drain(..cut);
        (Some(emit).filter(|emit| !emit.is_empty()), false)
    }

    fn flush(&mut self) -> Option<String> {
        if self.held.is_empty() {
            return None;
        }
        Some(std::mem::take(&mut self.held))
    }
}

fn longest_suffix_prefix(
    held: &str,
    stop: &str,
) -> usize {
    let limit = held.len().min(stop.len());
    for length in (1..=limit).rev() {
        let start = held.len() - length;
        if !held.is_char_boundary(start) || !stop.is_char_boundary(length) {
            continue;
        }
        if held[start..] == stop[..length] {
            return length;
        }
    }
    0
}
