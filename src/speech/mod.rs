//! Text-to-speech playback files

mod google;

use std::path::PathBuf;

use thiserror::Error;

pub use google::GoogleTts;

/// Why a synthesis attempt failed; logged, then collapsed into [`AudioUnavailable`]
#[derive(Error, Debug)]
pub enum SpeechError {
    #[error("HTTP client unavailable")]
    NoClient,

    #[error("Request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Speech endpoint returned HTTP {0}")]
    Status(u16),

    #[error("Could not save audio: {0}")]
    Io(#[from] std::io::Error),
}

/// Speech could not be produced; shown to the user instead of a player
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("No audio available")]
pub struct AudioUnavailable;

/// Renders text to an audio file on disk
pub trait SpeechSynthesizer {
    /// Path of the rendered file, or `None` when synthesis failed
    fn synthesize(&self, text: &str, language_code: &str) -> Option<PathBuf>;
}

/// Split text into chunks of at most `limit` characters, breaking on whitespace.
/// A single word longer than `limit` is split mid-word.
pub fn chunk_text(text: &str, limit: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        let mut word = word;
        while word.chars().count() > limit {
            if !current.is_empty() {
                chunks.push(std::mem::take(&mut current));
            }
            let split = word
                .char_indices()
                .nth(limit)
                .map(|(i, _)| i)
                .unwrap_or(word.len());
            chunks.push(word[..split].to_string());
            word = &word[split..];
        }
        if word.is_empty() {
            continue;
        }

        let needed = if current.is_empty() {
            word.chars().count()
        } else {
            current.chars().count() + 1 + word.chars().count()
        };
        if needed > limit {
            chunks.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }

    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}
