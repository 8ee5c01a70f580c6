use std::{collections::HashMap, path::PathBuf};

use serde::{Deserialize, Serialize};

/// Load-time configuration for a backend. `flags` carries backend-specific
/// options (memory locking, mmap, and the like) which are passed through
/// opaquely and validated only by the backend itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    pub model_path: PathBuf,
    pub context_length: u64,
    pub thread_count: u32,
    #[serde(default)]
    pub flags: HashMap<String, serde_json::Value>,
}

impl BackendConfig {
    pub fn new(model_path: impl Into<PathBuf>) -> Self {
        Self {
            model_path: model_path.into(),
            context_length: 2048,
            thread_count: 4,
            flags: HashMap::new(),
        }
    }

    pub fn context_length(
        mut self,
        context_length: u64,
    ) -> Self {
        self.context_length = context_length;
        self
    }

    pub fn thread_count(
        mut self,
        thread_count: u32,
    ) -> Self {
        self.thread_count = thread_count;
        self
    }

    pub fn flag(
        mut self,
        name: impl Into<String>,
        value: serde_json::Value,
    ) -> Self {
        self.flags.insert(name.into(), value);
        self
    }
}
