use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use anyhow::{Result, anyhow};

use crate::think::AnswerPolicy;

pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:11434";
pub const DEFAULT_MODEL: &str = "deepseek-r1:8b";
pub const DEFAULT_TEMPERATURE: f32 = 0.7;
pub const DEFAULT_REVEAL_INTERVAL_MS: u64 = 20;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Config {
    pub base_url: String,
    pub model: String,
    pub temperature: f32,
    /// Delay between revealed characters of the answer.
    pub reveal_interval_ms: u64,
    pub answer_policy: AnswerPolicy,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            temperature: DEFAULT_TEMPERATURE,
            reveal_interval_ms: DEFAULT_REVEAL_INTERVAL_MS,
            answer_policy: AnswerPolicy::default(),
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load from the user config directory, falling back to defaults when no
    /// file exists yet.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::get_config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::new());
        }

        let config_content = fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&config_content)?;
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::get_config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        // Create config directory if it doesn't exist
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let config_content = serde_json::to_string_pretty(self)?;
        fs::write(path, config_content)?;
        Ok(())
    }

    pub fn save_default_model(model: &str) -> Result<()> {
        let mut config = Self::load().unwrap_or_else(|_| Self::new());
        config.model = model.to_string();
        config.save()
    }

    /// Apply `THINKCHAT_BASE_URL` and `THINKCHAT_MODEL` overrides.
    pub fn with_env(self) -> Self {
        self.with_overrides(
            std::env::var("THINKCHAT_BASE_URL").ok(),
            std::env::var("THINKCHAT_MODEL").ok(),
        )
    }

    fn with_overrides(mut self, base_url: Option<String>, model: Option<String>) -> Self {
        if let Some(base_url) = base_url.filter(|v| !v.trim().is_empty()) {
            self.base_url = base_url;
        }
        if let Some(model) = model.filter(|v| !v.trim().is_empty()) {
            self.model = model;
        }
        self
    }

    fn get_config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow!("Could not determine config directory"))?;

        Ok(config_dir.join("thinkchat").join("config.json"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let config = Config::load_from(&dir.path().join("config.json")).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.base_url, "http://127.0.0.1:11434");
        assert_eq!(config.model, "deepseek-r1:8b");
    }

    #[test]
    fn test_save_and_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.json");
        let config = Config {
            model: "qwen3:4b".to_string(),
            answer_policy: AnswerPolicy::Interleaved,
            ..Config::default()
        };
        config.save_to(&path).unwrap();
        assert_eq!(Config::load_from(&path).unwrap(), config);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"model": "llama3.2", "answer_policy": "interleaved"}"#).unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.model, "llama3.2");
        assert_eq!(config.answer_policy, AnswerPolicy::Interleaved);
        assert_eq!(config.reveal_interval_ms, DEFAULT_REVEAL_INTERVAL_MS);
    }

    #[test]
    fn test_invalid_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{not json").unwrap();
        assert!(Config::load_from(&path).is_err());
    }

    #[test]
    fn test_overrides() {
        let config = Config::default().with_overrides(
            Some("http://gpu-box:11434".to_string()),
            Some("  ".to_string()),
        );
        assert_eq!(config.base_url, "http://gpu-box:11434");
        assert_eq!(config.model, DEFAULT_MODEL);
    }
}
