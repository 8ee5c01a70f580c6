use std::path::PathBuf;

use super::sampler::{SamplingParams, SamplingSeed};

/// Immutable description of one completion call. Owned by the generation
/// loop for the duration of the call.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub prompt: String,
    pub num_predict: usize,
    pub sampling: SamplingParams,
    pub stop_sequence: Option<String>,
    pub echo_prompt: bool,
    pub feed_only: bool,
    pub load_session: Option<PathBuf>,
    pub save_session: Option<PathBuf>,
}

impl GenerationRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            num_predict: 512,
            sampling: SamplingParams::default(),
            stop_sequence: None,
            echo_prompt: false,
            feed_only: false,
            load_session: None,
            save_session: None,
        }
    }

    pub fn num_predict(
        mut self,
        num_predict: usize,
    ) -> Self {
        self.num_predict = num_predict;
        self
    }

    pub fn sampling(
        mut self,
        sampling: SamplingParams,
    ) -> Self {
        self.sampling = sampling;
        self
    }

    pub fn temperature(
        mut self,
        temperature: f32,
    ) -> Self {
        self.sampling.temperature = temperature;
        self
    }

    pub fn top_k(
        mut self,
        top_k: usize,
    ) -> Self {
        self.sampling.top_k = top_k;
        self
    }

    pub fn top_p(
        mut self,
        top_p: f32,
    ) -> Self {
        self.sampling.top_p = top_p;
        self
    }

    pub fn repeat_penalty(
        mut self,
        repeat_penalty: f32,
    ) -> Self {
        self.sampling.repeat_penalty = repeat_penalty;
        self
    }

    pub fn repeat_last_n(
        mut self,
        repeat_last_n: usize,
    ) -> Self {
        self.sampling.repeat_last_n = repeat_last_n;
        self
    }

    pub fn seed(
        mut self,
        seed: u64,
    ) -> Self {
        self.sampling.seed = SamplingSeed::Custom(seed);
        self
    }

    pub fn stop_sequence(
        mut self,
        stop_sequence: impl Into<String>,
    ) -> Self {
        self.stop_sequence = Some(stop_sequence.into());
        self
    }

    pub fn echo_prompt(
        mut self,
        echo_prompt: bool,
    ) -> Self {
        self.echo_prompt = echo_prompt;
        self
    }

    pub fn feed_only(
        mut self,
        feed_only: bool,
    ) -> Self {
        self.feed_only = feed_only;
        self
    }

    pub fn load_session(
        mut self,
        path: impl Into<PathBuf>,
    ) -> Self {
        self.load_session = Some(path.into());
        self
    }

    pub fn save_session(
        mut self,
        path: impl Into<PathBuf>,
    ) -> Self {
        self.save_session = Some(path.into());
        self
    }
}
