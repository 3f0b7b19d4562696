// Engine configuration

use std::env;

use chronicle_core::stream::{DEFAULT_CATEGORY, DEFAULT_VERSION};

pub const DEFAULT_MAX_ITERATIONS: u32 = 100;
pub const DEFAULT_MAX_LLM_RETRIES: u32 = 2;

pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful assistant. Use the available tools \
when they help you answer, and reply concisely once you have what you need.";

/// Settings for one processing engine instance.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Stream category for sessions started by this engine.
    pub category: String,
    /// Stream version segment; bump to evolve the event schema.
    pub version: String,
    /// Cap on loop iterations per processing pass.
    pub max_iterations: u32,
    /// Ephemeral retry budget for one LLM step.
    pub max_llm_retries: u32,
    /// System prompt sent on every LLM call.
    pub system_prompt: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            category: DEFAULT_CATEGORY.to_string(),
            version: DEFAULT_VERSION.to_string(),
            max_iterations: DEFAULT_MAX_ITERATIONS,
            max_llm_retries: DEFAULT_MAX_LLM_RETRIES,
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
        }
    }
}

impl EngineConfig {
    /// Load overrides from `MAX_ITERATIONS`; everything else keeps its
    /// default unless set programmatically.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(max_iterations) = env::var("MAX_ITERATIONS")
            .ok()
            .and_then(|raw| raw.parse::<u32>().ok())
            .filter(|n| *n > 0)
        {
            config.max_iterations = max_iterations;
        }
        config
    }

    pub fn with_max_iterations(mut self, max_iterations: u32) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn with_system_prompt(mut self, system_prompt: impl Into<String>) -> Self {
        self.system_prompt = system_prompt.into();
        self
    }
}
