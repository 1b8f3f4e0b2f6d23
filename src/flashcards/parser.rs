//! Extract a flashcard list from free-form model output.
//!
//! Two stages, in order:
//! 1. look for a fenced block tagged `json` and parse only its contents;
//! 2. if there is no such block, parse the whole output.
//!
//! A fenced block that is present but malformed is a failure; the whole text is not retried.

use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;
use thiserror::Error;

use super::models::Flashcard;

static JSON_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```json\s*(.*?)\s*```").expect("valid fence pattern"));

#[derive(Error, Debug)]
pub enum PayloadError {
    #[error("Flashcard payload is not a JSON list of question/answer objects: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("Flashcard payload contains no cards")]
    Empty,
}

/// Where the parsed payload was found
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadSource {
    FencedBlock,
    WholeText,
}

#[derive(Deserialize)]
struct CardPayload {
    question: String,
    answer: String,
}

/// The span that should hold the list, and where it came from
pub fn locate_payload(raw: &str) -> (&str, PayloadSource) {
    match JSON_FENCE.captures(raw).and_then(|caps| caps.get(1)) {
        Some(span) => (span.as_str(), PayloadSource::FencedBlock),
        None => (raw.trim(), PayloadSource::WholeText),
    }
}

/// Parse model output into cards
pub fn parse_flashcards(raw: &str) -> Result<(Vec<Flashcard>, PayloadSource), PayloadError> {
    let (span, source) = locate_payload(raw);
    let payload: Vec<CardPayload> = serde_json::from_str(span)?;
    if payload.is_empty() {
        return Err(PayloadError::Empty);
    }

    let cards = payload
        .into_iter()
        .map(|p| Flashcard::new(p.question, p.answer))
        .collect();
    Ok((cards, source))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fenced_block_with_surrounding_text() {
        let raw = "prefix text ```json [{\"question\":\"Q1\",\"answer\":\"A1\"}] ``` suffix";
        let (cards, source) = parse_flashcards(raw).unwrap();
        assert_eq!(cards, vec![Flashcard::new("Q1", "A1")]);
        assert_eq!(source, PayloadSource::FencedBlock);
    }

    #[test]
    fn test_multiline_fenced_block() {
        let raw = "Here you go:\n```json\n[\n  {\"question\": \"What is H2O?\", \"answer\": \"Water\"},\n  {\"question\": \"What is NaCl?\", \"answer\": \"Salt\"}\n]\n```\nGood luck!";
        let (cards, _) = parse_flashcards(raw).unwrap();
        assert_eq!(cards.len(), 2);
        assert_eq!(cards[1].answer, "Salt");
    }

    #[test]
    fn test_whole_text_fallback() {
        let raw = "  [{\"question\":\"Q\",\"answer\":\"A\",\"difficulty\":\"easy\"}]\n";
        let (cards, source) = parse_flashcards(raw).unwrap();
        assert_eq!(cards, vec![Flashcard::new("Q", "A")]);
        assert_eq!(source, PayloadSource::WholeText);
    }

    #[test]
    fn test_non_json_without_fence_fails() {
        let raw = "Sorry, I cannot help with that.";
        assert!(matches!(
            parse_flashcards(raw),
            Err(PayloadError::Malformed(_))
        ));
    }

    #[test]
    fn test_malformed_fence_does_not_fall_back() {
        // The whole text is not valid JSON either way, but the fence must win
        let raw = "```json\n[{\"question\": \"Q\"\n```";
        let (span, source) = locate_payload(raw);
        assert_eq!(source, PayloadSource::FencedBlock);
        assert_eq!(span, "[{\"question\": \"Q\"");
        assert!(parse_flashcards(raw).is_err());
    }

    #[test]
    fn test_objects_missing_fields_fail() {
        assert!(parse_flashcards("[{\"question\":\"Q\"}]").is_err());
        assert!(parse_flashcards("[{\"question\":\"Q\",\"answer\":3}]").is_err());
        assert!(parse_flashcards("{\"question\":\"Q\",\"answer\":\"A\"}").is_err());
        assert!(parse_flashcards("[\"Q\", \"A\"]").is_err());
    }

    #[test]
    fn test_empty_list_fails() {
        assert!(matches!(parse_flashcards("[]"), Err(PayloadError::Empty)));
    }
}
