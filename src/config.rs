//! Application configuration
//!
//! Read from `<config_dir>/studydesk/config.toml`; every field is optional.
//! `GEMINI_API_KEY` in the environment overrides the file's key.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const API_KEY_ENV: &str = "GEMINI_API_KEY";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Failed to get data directory")]
    NoDataDir,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct AppConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
    /// No timeout when unset
    pub request_timeout_secs: Option<u64>,
    pub flashcard_count: usize,
    /// Language the model answers in
    pub answer_language: String,
    /// Language code for speech synthesis
    pub speech_language: String,
    pub session_path: Option<PathBuf>,
    /// Name or path of poppler's `pdftotext`, used to read uploaded PDFs
    pub pdftotext_program: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: "gemini-1.5-flash".to_string(),
            base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            request_timeout_secs: None,
            flashcard_count: 10,
            answer_language: "English".to_string(),
            speech_language: "en".to_string(),
            session_path: None,
            pdftotext_program: "pdftotext".to_string(),
        }
    }
}

impl AppConfig {
    /// `~/.config/studydesk` (or the platform equivalent)
    pub fn default_config_dir() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("studydesk"))
    }

    /// `~/.local/share/studydesk` (or the platform equivalent)
    pub fn default_data_dir() -> Result<PathBuf, ConfigError> {
        dirs::data_dir()
            .map(|p| p.join("studydesk"))
            .ok_or(ConfigError::NoDataDir)
    }

    /// Load from `path`, or the default location when `None`.
    /// A missing file yields the defaults; the environment key is applied either way.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = match path {
            Some(p) => Some(p.to_path_buf()),
            None => Self::default_config_dir().map(|d| d.join("config.toml")),
        };

        let mut config = match path {
            Some(path) if path.exists() => Self::from_file(&path)?,
            _ => Self::default(),
        };

        if let Ok(key) = std::env::var(API_KEY_ENV) {
            config.apply_env_key(Some(key));
        }
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        log::debug!("Loaded config from {:?}", path);
        Ok(config)
    }

    fn apply_env_key(&mut self, key: Option<String>) {
        if let Some(key) = key.filter(|k| !k.trim().is_empty()) {
            self.api_key = Some(key);
        }
    }

    /// The key handed to the model; empty when none is configured
    pub fn api_key(&self) -> &str {
        self.api_key.as_deref().unwrap_or("")
    }

    /// Short diagnostic that never reveals the whole key
    pub fn api_key_hint(&self) -> String {
        match self.api_key.as_deref().map(str::trim) {
            Some(key) if !key.is_empty() => {
                let prefix: String = key.chars().take(4).collect();
                format!("key loaded (starts with {}...)", prefix)
            }
            _ => format!("no API key configured (set {})", API_KEY_ENV),
        }
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }

    pub fn session_path(&self) -> Result<PathBuf, ConfigError> {
        match &self.session_path {
            Some(path) => Ok(path.clone()),
            None => Ok(Self::default_data_dir()?.join("session.json")),
        }
    }
}
