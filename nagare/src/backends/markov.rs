use std::{
    fs,
    hash::{DefaultHasher, Hash, Hasher},
};

use serde::{Deserialize, Serialize};

use super::{
    Backend, BackendConfig, BackendDescriptor, BackendError, Capabilities,
    LoadError, StepOutput, TokenId,
};
use crate::generator::sampler::SamplingParams;

pub const VOCABULARY_SIZE: usize = 257;
pub const EOS_TOKEN: TokenId = 256;

const CONTEXT_LENGTH_LIMIT: u64 = 1 << 16;

/// Self-contained reference backend: a byte-level bigram model estimated
/// from the text file given as the model path. Token ids 0..=255 are raw
/// bytes; id 256 is the end-of-sequence marker. It exposes raw logits and
/// implements the full capability set, which makes it suitable for driving
/// the whole pipeline without native engine bindings.
#[derive(Debug)]
pub struct MarkovBackend {
    bigram_counts: Vec<[u32; VOCABULARY_SIZE]>,
    model_id: String,
    context_length: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MarkovContext {
    tokens: Vec<TokenId>,
}

impl MarkovBackend {
    pub fn load(config: &BackendConfig) -> Result<Self, LoadError> {
        if config.context_length > CONTEXT_LENGTH_LIMIT {
            return Err(LoadError::ContextLength {
                requested: config.context_length,
                limit: CONTEXT_LENGTH_LIMIT,
            });
        }

        if !config.model_path.exists() {
            return Err(LoadError::ModelNotFound(config.model_path.clone()));
        }

        let bytes = fs::read(&config.model_path)?;
        if bytes.is_empty() {
            return Err(LoadError::InvalidFormat(
                "model corpus is empty".to_string(),
            ));
        }
        if std::str::from_utf8(&bytes).is_err() {
            return Err(LoadError::InvalidFormat(
                "model corpus is not valid UTF-8 text".to_string(),
            ));
        }

        let mut bigram_counts =
            vec![[0u32; VOCABULARY_SIZE]; VOCABULARY_SIZE];
        for pair in bytes.windows(2) {
            bigram_counts[pair[0] as usize][pair[1] as usize] += 1;
        }
        let last = bytes[bytes.len() - 1];
        bigram_counts[last as usize][EOS_TOKEN as usize] += 1;

        let mut hasher = DefaultHasher::new();
        bytes.hash(&mut hasher);
        let stem = config
            .model_path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| "corpus".to_string());
        let model_id = format!("{}-{:016x}", stem, hasher.finish());

        tracing::info!(
            model = %model_id,
            corpus_bytes = bytes.len(),
            "loaded markov backend"
        );

        Ok(Self {
            bigram_counts,
            model_id,
            context_length: config.context_length,
        })
    }
}

impl Backend for MarkovBackend {
    type Context = MarkovContext;

    fn capabilities(&self) -> Capabilities {
        Capabilities::full()
    }

    fn descriptor(&self) -> BackendDescriptor {
        BackendDescriptor {
            backend_id: "markov".to_string(),
            model_id: self.model_id.clone(),
            context_length: self.context_length,
        }
    }

    fn eos_token(&self) -> TokenId {
        EOS_TOKEN
    }

    fn new_context(&self) -> Result<Self::Context, BackendError> {
        Ok(MarkovContext::default())
    }

    fn step(
        &self,
        context: &mut Self::Context,
        token: TokenId,
        sampling: &SamplingParams,
    ) -> Result<StepOutput, BackendError> {
        let _ = sampling;
        if token as usize >= VOCABULARY_SIZE {
            return Err(BackendError::Step(format!(
                "token {} outside vocabulary",
                token
            )));
        }
        if context.tokens.len() as u64 >= self.context_length {
            return Err(BackendError::ContextFull);
        }
        context.tokens.push(token);

        let row = &self.bigram_counts[token as usize];
        let mut logits = vec![0.0f32; VOCABULARY_SIZE];
        let mut total = 0u32;
        for (id, &count) in row.iter().enumerate() {
            logits[id] = count as f32;
            total += count;
        }
        if total == 0 {
            logits[EOS_TOKEN as usize] = 1.0;
        }

        Ok(StepOutput::Logits(logits))
    }

    fn tokenize(
        &self,
        text: &str,
    ) -> Result<Vec<TokenId>, BackendError> {
        Ok(text.bytes().map(TokenId::from).collect())
    }

    fn detokenize(
        &self,
        tokens: &[TokenId],
    ) -> Result<String, BackendError> {
        let bytes: Vec<u8> = tokens
            .iter()
            .filter(|&&token| token < EOS_TOKEN)
            .map(|&token| token as u8)
            .collect();
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    fn embed(
        &self,
        context: &Self::Context,
    ) -> Result<Vec<f32>, BackendError> {
        let mut histogram = vec![0.0f32; 256];
        let mut count = 0usize;
        for &token in &context.tokens {
            if token < EOS_TOKEN {
                histogram[token as usize] += 1.0;
                count += 1;
            }
        }
        if count > 0 {
            for value in histogram.iter_mut() {
                *value /= count as f32;
            }
        }
        Ok(histogram)
    }

    fn snapshot(
        &self,
        context: &Self::Context,
    ) -> Result<Vec<u8>, BackendError> {
        bincode::serialize(context)
            .map_err(|error| BackendError::Snapshot(error.to_string()))
    }

    fn restore(
        &self,
        bytes: &[u8],
    ) -> Result<Self::Context, BackendError> {
        bincode::deserialize(bytes)
            .map_err(|error| BackendError::Snapshot(error.to_string()))
    }
}
