//! Runtime configuration from the environment.

use std::path::PathBuf;

/// Everything the binary needs to run, resolved once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory holding uploaded spreadsheets and the metadata cache.
    pub data_dir: PathBuf,
    /// Model backend name, see `model::factory`.
    pub backend: String,
    /// Base URL of the OpenAI-compatible API.
    pub api_base: String,
    pub api_key: String,
    /// Model identifier sent with each request.
    pub model: String,
}

impl Config {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            data_dir: std::env::var("SHEETWISE_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.data_dir),
            backend: std::env::var("SHEETWISE_BACKEND").unwrap_or(defaults.backend),
            api_base: std::env::var("OPENAI_BASE_URL").unwrap_or(defaults.api_base),
            api_key: std::env::var("OPENAI_API_KEY").unwrap_or(defaults.api_key),
            model: std::env::var("SHEETWISE_MODEL").unwrap_or(defaults.model),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("tmp"),
            backend: "openai".to_string(),
            api_base: "https://api.openai.com/v1".to_string(),
            api_key: String::new(),
            model: "gpt-4o-mini".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = Config::default();
        assert_eq!(cfg.data_dir, PathBuf::from("tmp"));
        assert_eq!(cfg.backend, "openai");
    }
}
