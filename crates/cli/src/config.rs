// Application configuration
//
// Assembles the per-crate configs from the environment in one place so a
// bad setting fails at startup, before any processing begins.

use anyhow::Context;

use chronicle_engine::EngineConfig;
use chronicle_llm::LlmConfig;
use chronicle_store::StoreConfig;

const VALID_LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub store: StoreConfig,
    pub llm: LlmConfig,
    pub engine: EngineConfig,
    pub log_level: String,
    pub log_format: String,
    pub enable_tracing: bool,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let store = StoreConfig::from_env().context("invalid store configuration")?;
        let llm = LlmConfig::from_env();
        let engine = EngineConfig::from_env();

        let log_level = std::env::var("LOG_LEVEL")
            .unwrap_or_else(|_| "info".to_string())
            .to_lowercase();
        if !VALID_LOG_LEVELS.contains(&log_level.as_str()) {
            anyhow::bail!(
                "LOG_LEVEL must be one of {VALID_LOG_LEVELS:?}, got '{log_level}'"
            );
        }

        let log_format = std::env::var("LOG_FORMAT")
            .unwrap_or_else(|_| "text".to_string())
            .to_lowercase();
        if log_format != "text" && log_format != "json" {
            anyhow::bail!("LOG_FORMAT must be 'text' or 'json', got '{log_format}'");
        }

        let enable_tracing = std::env::var("ENABLE_TRACING")
            .map(|raw| raw.eq_ignore_ascii_case("true"))
            .unwrap_or(false);

        Ok(Self {
            store,
            llm,
            engine,
            log_level,
            log_format,
            enable_tracing,
        })
    }
}
