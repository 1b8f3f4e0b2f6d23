use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use studydesk_lib::ai::GeminiModel;
use studydesk_lib::config::AppConfig;
use studydesk_lib::ingest::UploadedFile;
use studydesk_lib::speech::GoogleTts;
use studydesk_lib::storage::SessionStorage;
use studydesk_lib::StudyAssistant;

/// Shared application state for CLI commands
pub struct App {
    pub storage: SessionStorage,
    pub assistant: StudyAssistant,
}

impl App {
    /// Load the config and the session file, then wire up the assistant
    pub fn new(config_path: Option<&Path>, session_path: Option<PathBuf>) -> Result<Self> {
        let config = AppConfig::load(config_path).context("Failed to load configuration")?;

        let session_path = match session_path {
            Some(path) => path,
            None => config
                .session_path()
                .context("Failed to get data directory")?,
        };
        let storage = SessionStorage::new(session_path);
        let store = storage
            .load()
            .with_context(|| format!("Failed to load session from {}", storage.path().display()))?;

        let model = GeminiModel::from_config(&config).context("Failed to create model client")?;
        let speech = GoogleTts::with_timeout(config.request_timeout());

        let assistant =
            StudyAssistant::with_default_ingestor(store, config, Box::new(model), Box::new(speech));

        Ok(Self { storage, assistant })
    }

    /// Write the session back to disk
    pub fn save(&self) -> Result<()> {
        self.storage
            .save(self.assistant.store())
            .with_context(|| format!("Failed to save session to {}", self.storage.path().display()))
    }

    /// Read files from disk for upload, labelled by file name
    pub fn read_uploads(&self, paths: &[PathBuf]) -> Result<Vec<UploadedFile>> {
        paths
            .iter()
            .map(|path| {
                let bytes =
                    fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
                let name = path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| path.display().to_string());
                Ok(UploadedFile::new(name, bytes))
            })
            .collect()
    }
}
