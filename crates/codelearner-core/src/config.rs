use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use anyhow::{Result, anyhow};

use crate::api::{DEFAULT_BASE_URL, DEFAULT_TIMEOUT};
use crate::exercise::{Language, DEFAULT_PROMPT};
use crate::shell::Theme;
use crate::word_search::{self, DEFAULT_SIZE, DEFAULT_TOPIC};

pub const API_URL_ENV: &str = "CODELEARNER_API_URL";

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct Config {
    pub api_base_url: Option<String>,
    pub request_timeout_secs: Option<u64>,
    pub theme: Option<Theme>,
    pub default_topic: Option<String>,
    pub default_size: Option<u8>,
    pub default_language: Option<String>,
    pub default_prompt: Option<String>,
    pub explanation: Option<bool>,
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

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

    /// Base URL of the backend: environment first, then the file, then the default.
    pub fn api_base_url(&self) -> String {
        std::env::var(API_URL_ENV)
            .ok()
            .filter(|url| !url.trim().is_empty())
            .or_else(|| self.api_base_url.clone())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
    }

    pub fn request_timeout(&self) -> Duration {
        self.request_timeout_secs
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_TIMEOUT)
    }

    pub fn theme(&self) -> Theme {
        self.theme.unwrap_or_default()
    }

    pub fn default_topic(&self) -> String {
        self.default_topic.clone().unwrap_or_else(|| DEFAULT_TOPIC.to_string())
    }

    pub fn default_size(&self) -> u8 {
        self.default_size
            .map(|size| word_search::clamp_size(size as i64))
            .unwrap_or(DEFAULT_SIZE)
    }

    pub fn default_language(&self) -> Language {
        self.default_language
            .as_deref()
            .and_then(Language::from_str)
            .unwrap_or_default()
    }

    pub fn default_prompt(&self) -> String {
        self.default_prompt.clone().unwrap_or_else(|| DEFAULT_PROMPT.to_string())
    }

    pub fn explanation(&self) -> bool {
        self.explanation.unwrap_or(true)
    }

    pub fn get_config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow!("Could not determine config directory"))?;

        Ok(config_dir.join("codelearner").join("config.json"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("config.json")).unwrap();
        assert_eq!(config, Config::new());
        assert_eq!(config.default_topic(), DEFAULT_TOPIC);
        assert_eq!(config.default_size(), DEFAULT_SIZE);
        assert_eq!(config.default_language(), Language::Python);
        assert!(config.explanation());
        assert_eq!(config.request_timeout(), DEFAULT_TIMEOUT);
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");

        let config = Config {
            api_base_url: Some("http://backend:9000".to_string()),
            theme: Some(Theme::Light),
            default_size: Some(12),
            default_language: Some("C++".to_string()),
            explanation: Some(false),
            ..Config::new()
        };
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded, config);
        assert_eq!(loaded.theme(), Theme::Light);
        assert_eq!(loaded.default_language(), Language::Cpp);
        assert!(!loaded.explanation());
    }

    #[test]
    fn test_out_of_range_size_is_clamped() {
        let config = Config {
            default_size: Some(40),
            ..Config::new()
        };
        assert_eq!(config.default_size(), word_search::MAX_SIZE);
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{ not json").unwrap();
        assert!(Config::load_from(&path).is_err());
    }
}
