//! Deck lifecycle per subject: generate, review, restart.
//!
//! ```text
//! NoDeck --begin--> Generating --finish(ok)--> Reviewing --mark x N--> Exhausted
//!                       |                          ^                      |
//!                       +--finish(err)--> previous +-------restart--------+
//! ```
//!
//! Regeneration is allowed from any state and always lands on a fresh deck with cursor 0.
//! Generation is split into `begin`/`finish` so that at most one request per subject can be
//! outstanding; `generate` runs both around a blocking model call. The ticket returned by
//! `begin` holds the subject's slot until it is finished or dropped.

use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::Rc;

use thiserror::Error;

use super::models::*;
use super::parser::{parse_flashcards, PayloadSource};
use crate::ai::{prompts, CompletionRequest, LanguageModel, ModelError, WARNING_GLYPH};
use crate::subjects::{StoreError, SubjectStore};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Flashcards for {0:?} are already being generated")]
    AlreadyGenerating(String),
}

type InFlight = Rc<RefCell<HashSet<String>>>;

/// Proof that a generation was started; consumed by `finish`.
/// Dropping it without finishing abandons the generation and frees the subject.
#[derive(Debug)]
pub struct GenerationTicket {
    subject: String,
    in_flight: InFlight,
}

impl GenerationTicket {
    pub fn subject(&self) -> &str {
        &self.subject
    }
}

impl Drop for GenerationTicket {
    fn drop(&mut self) {
        self.in_flight.borrow_mut().remove(&self.subject);
    }
}

/// What a generation attempt produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationOutcome {
    /// A new deck replaced the old one
    Ready { cards: usize, source: PayloadSource },
    /// Nothing changed; `raw` holds the model output when there was one to show
    Failed { message: String, raw: Option<String> },
}

/// Model parameters for one generation call
#[derive(Debug, Clone, Copy)]
pub struct GenerationRequest<'a> {
    pub system_instruction: &'a str,
    pub api_key: &'a str,
    pub count: usize,
}

#[derive(Debug, Default)]
pub struct FlashcardSession {
    in_flight: InFlight,
}

impl FlashcardSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self, store: &SubjectStore, subject: &str) -> Result<DeckState, StoreError> {
        let record = store.get(subject)?;
        if self.in_flight.borrow().contains(subject) {
            return Ok(DeckState::Generating);
        }
        Ok(DeckState::of(record.deck.as_ref()))
    }

    // ==================== Generation ====================

    pub fn begin(
        &mut self,
        store: &SubjectStore,
        subject: &str,
    ) -> Result<GenerationTicket, SessionError> {
        store.get(subject)?;
        if !self.in_flight.borrow_mut().insert(subject.to_string()) {
            return Err(SessionError::AlreadyGenerating(subject.to_string()));
        }
        Ok(GenerationTicket {
            subject: subject.to_string(),
            in_flight: Rc::clone(&self.in_flight),
        })
    }

    /// Apply a model reply. Parse failures are reported, never raised; the old deck stays.
    pub fn finish(
        &mut self,
        store: &mut SubjectStore,
        ticket: GenerationTicket,
        reply: Result<String, ModelError>,
    ) -> Result<GenerationOutcome, StoreError> {
        let subject = ticket.subject().to_string();
        drop(ticket);

        let raw = match reply {
            Ok(raw) => raw,
            Err(e) => {
                log::warn!("Flashcard generation for {:?} failed: {}", subject, e);
                store.get(&subject)?;
                return Ok(GenerationOutcome::Failed {
                    message: e.user_message(),
                    raw: None,
                });
            }
        };

        match parse_flashcards(&raw) {
            Ok((cards, source)) => {
                let count = cards.len();
                store.replace_deck(&subject, cards)?;
                Ok(GenerationOutcome::Ready {
                    cards: count,
                    source,
                })
            }
            Err(e) => {
                log::warn!("Unreadable flashcard payload for {:?}: {}", subject, e);
                store.get(&subject)?;
                Ok(GenerationOutcome::Failed {
                    message: format!(
                        "{} Could not read flashcards from the model reply ({})",
                        WARNING_GLYPH, e
                    ),
                    raw: Some(raw),
                })
            }
        }
    }

    /// Generate a deck for `subject` from its material with a blocking model call
    pub fn generate(
        &mut self,
        store: &mut SubjectStore,
        subject: &str,
        model: &dyn LanguageModel,
        request: GenerationRequest<'_>,
    ) -> Result<GenerationOutcome, SessionError> {
        let ticket = self.begin(store, subject)?;

        let material = store.get(subject)?.material_text();
        let task = prompts::flashcards_task(request.count);
        let reply = model.complete(&CompletionRequest {
            system_instruction: request.system_instruction,
            material: &material,
            task: &task,
            api_key: request.api_key,
        });

        Ok(self.finish(store, ticket, reply)?)
    }

    // ==================== Review ====================

    /// The card to show, if the deck is not exhausted
    pub fn current_card<'s>(
        &self,
        store: &'s SubjectStore,
        subject: &str,
    ) -> Result<Option<&'s Flashcard>, StoreError> {
        Ok(store
            .get(subject)?
            .deck
            .as_ref()
            .and_then(FlashcardDeck::current))
    }

    /// Rate the current card and move on by exactly one
    pub fn mark(
        &self,
        store: &mut SubjectStore,
        subject: &str,
        outcome: ReviewOutcome,
    ) -> Result<DeckState, StoreError> {
        if store.advance_review(subject)? {
            log::debug!("Marked card in {:?} as {:?}", subject, outcome);
        } else {
            log::debug!("Nothing to mark in {:?}", subject);
        }
        self.state(store, subject)
    }

    /// Start reviewing the same deck again from the first card
    pub fn restart(&self, store: &mut SubjectStore, subject: &str) -> Result<DeckState, StoreError> {
        store.restart_review(subject)?;
        self.state(store, subject)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::testing::ScriptedModel;
    use crate::subjects::MaterialBlock;

    const THREE_CARDS: &str = "```json\n[{\"question\":\"Q1\",\"answer\":\"A1\"},{\"question\":\"Q2\",\"answer\":\"A2\"},{\"question\":\"Q3\",\"answer\":\"A3\"}]\n```";

    fn request() -> GenerationRequest<'static> {
        GenerationRequest {
            system_instruction: "teach",
            api_key: "key",
            count: 3,
        }
    }

    fn setup() -> (FlashcardSession, SubjectStore) {
        let mut store = SubjectStore::new();
        store.create_subject("Biology").unwrap();
        store
            .append_material("Biology", MaterialBlock::from_source("cells.pdf", "mitosis"))
            .unwrap();
        (FlashcardSession::new(), store)
    }

    fn generate(
        session: &mut FlashcardSession,
        store: &mut SubjectStore,
        reply: &str,
    ) -> GenerationOutcome {
        let model = ScriptedModel::replying(vec![Ok(reply.to_string())]);
        session
            .generate(store, "Biology", &model, request())
            .unwrap()
    }

    #[test]
    fn test_fenced_reply_builds_deck() {
        let (mut session, mut store) = setup();
        let raw = "prefix text ```json [{\"question\":\"Q1\",\"answer\":\"A1\"}] ``` suffix";

        let outcome = generate(&mut session, &mut store, raw);
        assert_eq!(
            outcome,
            GenerationOutcome::Ready {
                cards: 1,
                source: PayloadSource::FencedBlock
            }
        );

        let record = store.get("Biology").unwrap();
        let deck = record.deck.as_ref().unwrap();
        assert_eq!(deck.cards, vec![Flashcard::new("Q1", "A1")]);
        assert_eq!(record.review_cursor(), 0);
    }

    #[test]
    fn test_generation_sends_material_and_count() {
        let (mut session, mut store) = setup();
        let model = ScriptedModel::replying(vec![Ok(THREE_CARDS.to_string())]);
        session
            .generate(&mut store, "Biology", &model, request())
            .unwrap();

        assert!(model.tasks.borrow()[0].contains("exactly 3 flashcards"));
        assert_eq!(model.materials.borrow()[0], "\n--- cells.pdf ---\nmitosis");
    }

    #[test]
    fn test_malformed_reply_leaves_no_deck() {
        let (mut session, mut store) = setup();
        let raw = "I am not able to produce flashcards today.";

        let outcome = generate(&mut session, &mut store, raw);
        match outcome {
            GenerationOutcome::Failed { message, raw: shown } => {
                assert!(message.starts_with(WARNING_GLYPH));
                assert_eq!(shown.as_deref(), Some(raw));
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
        assert!(store.get("Biology").unwrap().deck.is_none());
        assert_eq!(
            session.state(&store, "Biology").unwrap(),
            DeckState::NoDeck
        );
    }

    #[test]
    fn test_failed_regeneration_keeps_previous_deck() {
        let (mut session, mut store) = setup();
        generate(&mut session, &mut store, THREE_CARDS);
        session
            .mark(&mut store, "Biology", ReviewOutcome::Remembered)
            .unwrap();

        generate(&mut session, &mut store, "not json");
        assert_eq!(
            session.state(&store, "Biology").unwrap(),
            DeckState::Reviewing { cursor: 1, total: 3 }
        );
    }

    #[test]
    fn test_model_error_is_reported() {
        let (mut session, mut store) = setup();
        let model = ScriptedModel::replying(vec![Err(ModelError::KeyRejected)]);

        let outcome = session
            .generate(&mut store, "Biology", &model, request())
            .unwrap();
        assert_eq!(
            outcome,
            GenerationOutcome::Failed {
                message: ModelError::KeyRejected.user_message(),
                raw: None
            }
        );
        assert_eq!(
            session.state(&store, "Biology").unwrap(),
            DeckState::NoDeck
        );
    }

    #[test]
    fn test_review_walks_to_exhausted_and_restarts() {
        let (mut session, mut store) = setup();
        generate(&mut session, &mut store, THREE_CARDS);

        let outcomes = [
            ReviewOutcome::Remembered,
            ReviewOutcome::Forgot,
            ReviewOutcome::Remembered,
        ];
        for (i, outcome) in outcomes.iter().enumerate() {
            assert_eq!(store.get("Biology").unwrap().review_cursor(), i);
            session.mark(&mut store, "Biology", *outcome).unwrap();
        }
        assert_eq!(store.get("Biology").unwrap().review_cursor(), 3);
        assert_eq!(
            session.state(&store, "Biology").unwrap(),
            DeckState::Exhausted { total: 3 }
        );
        assert!(session.current_card(&store, "Biology").unwrap().is_none());

        let before = store.get("Biology").unwrap().deck.clone().unwrap();
        let state = session.restart(&mut store, "Biology").unwrap();
        assert_eq!(state, DeckState::Reviewing { cursor: 0, total: 3 });

        let after = store.get("Biology").unwrap().deck.clone().unwrap();
        assert_eq!(after.id, before.id);
        assert_eq!(after.cards, before.cards);
        assert_eq!(
            session.current_card(&store, "Biology").unwrap(),
            Some(&Flashcard::new("Q1", "A1"))
        );
    }

    #[test]
    fn test_marking_exhausted_deck_is_noop() {
        let (mut session, mut store) = setup();
        generate(
            &mut session,
            &mut store,
            "[{\"question\":\"Q\",\"answer\":\"A\"}]",
        );
        session
            .mark(&mut store, "Biology", ReviewOutcome::Forgot)
            .unwrap();
        let state = session
            .mark(&mut store, "Biology", ReviewOutcome::Forgot)
            .unwrap();
        assert_eq!(state, DeckState::Exhausted { total: 1 });
        assert_eq!(store.get("Biology").unwrap().review_cursor(), 1);
    }

    #[test]
    fn test_regenerate_mid_review_resets_cursor() {
        let (mut session, mut store) = setup();
        generate(&mut session, &mut store, THREE_CARDS);
        session
            .mark(&mut store, "Biology", ReviewOutcome::Remembered)
            .unwrap();
        assert_eq!(store.get("Biology").unwrap().review_cursor(), 1);

        let five: Vec<String> = (1..=5)
            .map(|i| format!("{{\"question\":\"N{}\",\"answer\":\"M{}\"}}", i, i))
            .collect();
        let raw = format!("[{}]", five.join(","));
        generate(&mut session, &mut store, &raw);

        let record = store.get("Biology").unwrap();
        assert_eq!(record.review_cursor(), 0);
        assert_eq!(record.deck.as_ref().unwrap().len(), 5);
        assert_eq!(
            session.current_card(&store, "Biology").unwrap().unwrap().question,
            "N1"
        );
    }

    #[test]
    fn test_one_generation_in_flight_per_subject() {
        let (mut session, mut store) = setup();
        store.create_subject("History").unwrap();

        let ticket = session.begin(&store, "Biology").unwrap();
        assert_eq!(
            session.state(&store, "Biology").unwrap(),
            DeckState::Generating
        );
        assert_eq!(
            session.begin(&store, "Biology").unwrap_err(),
            SessionError::AlreadyGenerating("Biology".to_string())
        );
        // Other subjects are independent
        let other = session.begin(&store, "History").unwrap();

        session
            .finish(&mut store, ticket, Ok(THREE_CARDS.to_string()))
            .unwrap();
        session
            .finish(&mut store, other, Err(ModelError::EmptyResponse))
            .unwrap();
        assert_eq!(
            session.state(&store, "Biology").unwrap(),
            DeckState::Reviewing { cursor: 0, total: 3 }
        );
        assert!(session.begin(&store, "Biology").is_ok());
    }

    #[test]
    fn test_dropped_ticket_frees_subject() {
        let (mut session, mut store) = setup();

        let ticket = session.begin(&store, "Biology").unwrap();
        assert_eq!(ticket.subject(), "Biology");
        drop(ticket);

        assert_eq!(
            session.state(&store, "Biology").unwrap(),
            DeckState::NoDeck
        );
        let outcome = generate(&mut session, &mut store, THREE_CARDS);
        assert!(matches!(outcome, GenerationOutcome::Ready { cards: 3, .. }));
        assert_eq!(
            session.state(&store, "Biology").unwrap(),
            DeckState::Reviewing { cursor: 0, total: 3 }
        );
    }

    #[test]
    fn test_unknown_subject() {
        let (mut session, mut store) = setup();
        let model = ScriptedModel::default();
        assert_eq!(
            session
                .generate(&mut store, "Nope", &model, request())
                .unwrap_err(),
            SessionError::Store(StoreError::UnknownSubject("Nope".to_string()))
        );
        assert_eq!(model.calls(), 0);
        assert!(session.state(&store, "Nope").is_err());
    }
}
