//! The study assistant: a subject store and the services acting on it.
//!
//! Every action takes an optional subject name and falls back to the current subject.
//! Store contract violations (unknown subject, bad names) come back as errors; collaborator
//! failures never do. They turn into [`StudyReply::Failed`], a failed generation outcome or
//! [`AudioUnavailable`].

use std::path::PathBuf;

use crate::ai::{prompts, CompletionRequest, LanguageModel};
use crate::config::AppConfig;
use crate::flashcards::{
    DeckState, Flashcard, FlashcardSession, GenerationOutcome, GenerationRequest, ReviewOutcome,
    SessionError,
};
use crate::ingest::{
    DocumentExtractor, IngestReport, MaterialIngestor, PdfTextExtractor, SlidesTextExtractor,
    UploadedFile,
};
use crate::speech::{AudioUnavailable, SpeechSynthesizer};
use crate::subjects::{StoreError, SubjectStore};

/// Result of a summary, quiz or question
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StudyReply {
    Answer(String),
    /// The subject has no material to work from; the model was not called
    NoMaterial,
    /// User-facing failure message, warning-prefixed
    Failed(String),
}

pub struct StudyAssistant {
    store: SubjectStore,
    config: AppConfig,
    model: Box<dyn LanguageModel>,
    ingestor: MaterialIngestor,
    speech: Box<dyn SpeechSynthesizer>,
    flashcards: FlashcardSession,
}

impl StudyAssistant {
    pub fn new(
        store: SubjectStore,
        config: AppConfig,
        model: Box<dyn LanguageModel>,
        ingestor: MaterialIngestor,
        speech: Box<dyn SpeechSynthesizer>,
    ) -> Self {
        Self {
            store,
            config,
            model,
            ingestor,
            speech,
            flashcards: FlashcardSession::new(),
        }
    }

    /// Assistant wired to the document extractors, with `pdftotext` taken from the config
    pub fn with_default_ingestor(
        store: SubjectStore,
        config: AppConfig,
        model: Box<dyn LanguageModel>,
        speech: Box<dyn SpeechSynthesizer>,
    ) -> Self {
        let extractor = DocumentExtractor::new(
            PdfTextExtractor::new(config.pdftotext_program.clone()),
            SlidesTextExtractor::default(),
        );
        let ingestor = MaterialIngestor::new(Box::new(extractor));
        Self::new(store, config, model, ingestor, speech)
    }

    pub fn store(&self) -> &SubjectStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut SubjectStore {
        &mut self.store
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// The given subject, or the current one. Fails for unknown names.
    pub fn resolve_subject(&self, subject: Option<&str>) -> Result<String, StoreError> {
        match subject {
            Some(name) => self.store.get(name).map(|record| record.name.clone()),
            None => Ok(self.store.current_record().name.clone()),
        }
    }

    // ==================== Material ====================

    pub fn upload(
        &mut self,
        subject: Option<&str>,
        files: &[UploadedFile],
    ) -> Result<IngestReport, StoreError> {
        let subject = self.resolve_subject(subject)?;
        let report = self.ingestor.ingest_batch(&mut self.store, &subject, files)?;
        log::info!(
            "Uploaded {} files to {:?} ({} degraded, {} skipped)",
            report.processed,
            subject,
            report.degraded.len(),
            report.skipped.len()
        );
        Ok(report)
    }

    // ==================== Study Actions ====================

    pub fn summarize(&mut self, subject: Option<&str>) -> Result<StudyReply, StoreError> {
        self.run_task(subject, "Summarize the material.", prompts::summary_task(), true)
    }

    pub fn quiz(&mut self, subject: Option<&str>) -> Result<StudyReply, StoreError> {
        self.run_task(subject, "Quiz me on the material.", prompts::quiz_task(), true)
    }

    /// Free question; allowed even when the subject has no material
    pub fn ask(&mut self, subject: Option<&str>, question: &str) -> Result<StudyReply, StoreError> {
        self.run_task(subject, question, question, false)
    }

    fn run_task(
        &mut self,
        subject: Option<&str>,
        user_text: &str,
        task: &str,
        needs_material: bool,
    ) -> Result<StudyReply, StoreError> {
        let subject = self.resolve_subject(subject)?;
        let record = self.store.get(&subject)?;
        if needs_material && !record.has_material() {
            return Ok(StudyReply::NoMaterial);
        }

        let material = record.material_text();
        let system_instruction = prompts::system_instruction(&self.config.answer_language);
        let reply = self.model.complete(&CompletionRequest {
            system_instruction: &system_instruction,
            material: &material,
            task,
            api_key: self.config.api_key(),
        });

        match reply {
            Ok(answer) => {
                self.store.push_exchange(&subject, user_text, &answer)?;
                Ok(StudyReply::Answer(answer))
            }
            Err(e) => {
                log::warn!("Model call for {:?} failed: {}", subject, e);
                Ok(StudyReply::Failed(e.user_message()))
            }
        }
    }

    // ==================== Flashcards ====================

    /// Generate a fresh deck; `count` defaults to the configured size
    pub fn generate_flashcards(
        &mut self,
        subject: Option<&str>,
        count: Option<usize>,
    ) -> Result<GenerationOutcome, SessionError> {
        let subject = self.resolve_subject(subject)?;
        let system_instruction = prompts::system_instruction(&self.config.answer_language);
        let request = GenerationRequest {
            system_instruction: &system_instruction,
            api_key: self.config.api_key(),
            count: count.unwrap_or(self.config.flashcard_count).max(1),
        };
        self.flashcards
            .generate(&mut self.store, &subject, self.model.as_ref(), request)
    }

    pub fn deck_state(&self, subject: Option<&str>) -> Result<DeckState, StoreError> {
        let subject = self.resolve_subject(subject)?;
        self.flashcards.state(&self.store, &subject)
    }

    pub fn current_card(&self, subject: Option<&str>) -> Result<Option<&Flashcard>, StoreError> {
        let subject = self.resolve_subject(subject)?;
        self.flashcards.current_card(&self.store, &subject)
    }

    pub fn mark_card(
        &mut self,
        subject: Option<&str>,
        outcome: ReviewOutcome,
    ) -> Result<DeckState, StoreError> {
        let subject = self.resolve_subject(subject)?;
        self.flashcards.mark(&mut self.store, &subject, outcome)
    }

    pub fn restart_review(&mut self, subject: Option<&str>) -> Result<DeckState, StoreError> {
        let subject = self.resolve_subject(subject)?;
        self.flashcards.restart(&mut self.store, &subject)
    }

    // ==================== Speech ====================

    /// Render `text` to an audio file in the configured speech language
    pub fn speak(&self, text: &str) -> Result<PathBuf, AudioUnavailable> {
        if text.trim().is_empty() {
            return Err(AudioUnavailable);
        }
        self.speech
            .synthesize(text, &self.config.speech_language)
            .ok_or(AudioUnavailable)
    }
}
