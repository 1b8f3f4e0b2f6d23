//! Google Translate text-to-speech endpoint (the one gTTS uses)

use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

use reqwest::blocking::Client;

use super::{chunk_text, SpeechError, SpeechSynthesizer};

const DEFAULT_ENDPOINT: &str = "https://translate.google.com/translate_tts";

/// The endpoint rejects longer inputs
const MAX_CHUNK_CHARS: usize = 200;

#[derive(Debug)]
pub struct GoogleTts {
    client: Option<Client>,
    endpoint: String,
}

impl Default for GoogleTts {
    fn default() -> Self {
        Self::with_timeout(None)
    }
}

impl GoogleTts {
    pub fn new(endpoint: impl Into<String>, timeout: Option<Duration>) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| log::warn!("Failed to create TTS HTTP client: {}", e))
            .ok();
        Self {
            client,
            endpoint: endpoint.into(),
        }
    }

    /// Client for the public endpoint
    pub fn with_timeout(timeout: Option<Duration>) -> Self {
        Self::new(DEFAULT_ENDPOINT, timeout)
    }

    fn fetch_chunk(
        &self,
        client: &Client,
        chunk: &str,
        language_code: &str,
    ) -> Result<Vec<u8>, SpeechError> {
        let response = client
            .get(&self.endpoint)
            .query(&[
                ("ie", "UTF-8"),
                ("client", "tw-ob"),
                ("tl", language_code),
                ("q", chunk),
            ])
            .send()?;

        if !response.status().is_success() {
            return Err(SpeechError::Status(response.status().as_u16()));
        }
        Ok(response.bytes()?.to_vec())
    }

    /// Fetch every chunk and write the joined audio to a kept temp file
    fn render(&self, text: &str, language_code: &str) -> Result<Option<PathBuf>, SpeechError> {
        let client = self.client.as_ref().ok_or(SpeechError::NoClient)?;
        let chunks = chunk_text(text, MAX_CHUNK_CHARS);
        if chunks.is_empty() {
            return Ok(None);
        }

        let mut audio = Vec::new();
        for chunk in &chunks {
            audio.extend_from_slice(&self.fetch_chunk(client, chunk, language_code)?);
        }

        let path = Self::write_audio(&audio)?;
        log::info!("Wrote {} bytes of speech to {:?}", audio.len(), path);
        Ok(Some(path))
    }

    fn write_audio(audio: &[u8]) -> Result<PathBuf, SpeechError> {
        let mut file = tempfile::Builder::new()
            .prefix("studydesk-")
            .suffix(".mp3")
            .tempfile()?;
        file.write_all(audio)?;
        file.flush()?;
        let (_, path) = file.keep().map_err(|e| e.error)?;
        Ok(path)
    }
}

impl SpeechSynthesizer for GoogleTts {
    fn synthesize(&self, text: &str, language_code: &str) -> Option<PathBuf> {
        self.render(text, language_code)
            .map_err(|e| log::warn!("Speech synthesis failed: {}", e))
            .ok()
            .flatten()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_text_yields_nothing() {
        let tts = GoogleTts::new("http://127.0.0.1:9/translate_tts", None);
        assert!(tts.synthesize("  \n", "en").is_none());
    }

    #[test]
    fn test_unreachable_endpoint_yields_nothing() {
        let tts = GoogleTts::new(
            "http://127.0.0.1:9/translate_tts",
            Some(Duration::from_secs(2)),
        );
        assert!(tts.synthesize("hello", "en").is_none());
    }

    #[test]
    fn test_failures_are_typed() {
        let tts = GoogleTts::new(
            "http://127.0.0.1:9/translate_tts",
            Some(Duration::from_secs(2)),
        );
        assert!(matches!(tts.render("hello", "en"), Err(SpeechError::Http(_))));
        assert!(matches!(tts.render(" ", "en"), Ok(None)));

        let offline = GoogleTts {
            client: None,
            endpoint: DEFAULT_ENDPOINT.to_string(),
        };
        assert!(matches!(offline.render("hello", "en"), Err(SpeechError::NoClient)));
        assert_eq!(
            SpeechError::Status(429).to_string(),
            "Speech endpoint returned HTTP 429"
        );
    }

    #[test]
    fn test_write_audio_keeps_file() {
        let path = GoogleTts::write_audio(b"ID3fake").unwrap();
        assert!(path.exists());
        assert_eq!(path.extension().and_then(|e| e.to_str()), Some("mp3"));
        std::fs::remove_file(path).unwrap();
    }
}
