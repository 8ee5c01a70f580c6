use std::collections::VecDeque;

use rand::{Rng, rngs::StdRng};

use crate::backends::TokenId;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SamplingSeed {
    Default,
    Custom(u64),
}

impl Default for SamplingSeed {
    fn default() -> Self {
        SamplingSeed::Default
    }
}

impl SamplingSeed {
    pub fn resolve(&self) -> u64 {
        match self {
            SamplingSeed::Default => rand::rng().random::<u64>(),
            SamplingSeed::Custom(seed) => *seed,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SamplingParams {
    pub temperature: f32,
    pub top_k: usize,
    pub top_p: f32,
    pub repeat_penalty: f32,
    pub repeat_last_n: usize,
    pub seed: SamplingSeed,
}

impl Default for SamplingParams {
    fn default() -> Self {
        Self {
            temperature: 0.80,
            top_k: 40,
            top_p: 0.95,
            repeat_penalty: 1.30,
            repeat_last_n: 64,
            seed: SamplingSeed::default(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SamplingError {
    #[error("Distribution is empty after filtering")]
    EmptyDistribution,
    #[error("Distribution contains no finite values")]
    InvalidLogits,
}

/// Rolling window of the most recently emitted token ids, bounded by the
/// repetition window of the request it belongs to.
#[derive(Debug, Clone)]
pub struct SamplingState {
    window: VecDeque<TokenId>,
    limit: usize,
}

impl SamplingState {
    pub fn new(limit: usize) -> Self {
        Self {
            window: VecDeque::with_capacity(limit),
            limit,
        }
    }

    pub fn push(
        &mut self,
        token: TokenId,
    ) {
        if self.limit == 0 {
            return;
        }
        if self.window.len() == self.limit {
            self.window.pop_front();
        }
        self.window.push_back(token);
    }

    pub fn tokens(&self) -> impl Iterator<Item = TokenId> + '_ {
        self.window.iter().copied()
    }
}

pub fn sample(
    logits: &[f32],
    state: &SamplingState,
    params: &SamplingParams,
    rng: &mut StdRng,
) -> Result<TokenId, SamplingError> {
    if logits.is_empty() {
        return Err(SamplingError::EmptyDistribution);
    }

    let mut logits = logits.to_vec();
    for token in state.tokens() {
        if let Some(logit) = logits.get_mut(token as usize) {
            if *logit > 0.0 {
                *logit /= params.repeat_penalty;
            } else {
                *logit *= params.repeat_penalty;
            }
        }
    }

    if params.temperature <= 0.0 {
        return argmax(&logits);
    }

    let max_logit = logits
        .iter()
        .copied()
        .filter(|logit| logit.is_finite())
        .fold(f32::NEG_INFINITY, f32::max);
    if max_logit == f32::NEG_INFINITY {
        return Err(SamplingError::InvalidLogits);
    }

    let mut candidates: Vec<(usize, f32)> = logits
        .iter()
        .enumerate()
        .map(|(id, &logit)| {
            let weight = if logit.is_finite() {
                ((logit - max_logit) / params.temperature).exp()
            } else {
                0.0
            };
            (id, weight)
        })
        .collect();
    candidates.sort_by(|a, b| {
        f32::partial_cmp(&b.1, &a.1).unwrap_or(std::cmp::Ordering::Equal)
    });

    if params.top_k > 0 && params.top_k < candidates.len() {
        candidates.truncate(params.top_k);
    }

    if params.top_p < 1.0 {
        let total: f32 = candidates.iter().map(|(_, weight)| weight).sum();
        if total > 0.0 {
            let threshold = params.top_p * total;
            let mut cumulative = 0.0f32;
            let mut keep = candidates.len();
            for (index, (_, weight)) in candidates.iter().enumerate() {
                cumulative += weight;
                if cumulative >= threshold {
                    keep = index + 1;
                    break;
                }
            }
            candidates.truncate(keep);
        }
    }

    let total: f32 = candidates.iter().map(|(_, weight)| weight).sum();
    if !total.is_finite() || total <= 0.0 {
        return Err(SamplingError::EmptyDistribution);
    }

    let mut target = rng.random::<f32>() * total;
    for &(id, weight) in &candidates {
        target -= weight;
        if target <= 0.0 {
            return Ok(id as TokenId);
        }
    }
    // rounding slop leaves the draw past the last candidate
    Ok(candidates[candidates.len() - 1].0 as TokenId)
}

fn argmax(logits: &[f32]) -> Result<TokenId, SamplingError> {
    let mut best: Option<(usize, f32)> = None;
    for (id, &logit) in logits.iter().enumerate() {
        if !logit.is_finite() {
            continue;
        }
        match best {
            Some((_, value)) if logit <= value => {},
            _ => best = Some((id, logit)),
        }
    }
    best.map(|(id, _)| id as TokenId)
        .ok_or(SamplingError::InvalidLogits)
}
