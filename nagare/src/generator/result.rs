use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    Eos,
    Length,
    StopSequence,
    FeedOnly,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct GenerationStats {
    pub duration: f64,
    pub tokens_count_input: u64,
    pub tokens_count_output: u64,
    pub tokens_per_second: f64,
}

/// Terminal summary of a completed or failed call. `completed` is true only
/// when the backend's own end-of-sequence marker fired; budget or
/// stop-sequence terminations leave it false. `finish_reason` is `None` on
/// partial results attached to a failure.
#[derive(Debug, Clone)]
pub struct GenerationResult {
    pub tokens: Vec<String>,
    pub completed: bool,
    pub finish_reason: Option<FinishReason>,
    pub stats: GenerationStats,
}

impl GenerationResult {
    pub fn text(&self) -> String {
        self.tokens.concat()
    }
}
