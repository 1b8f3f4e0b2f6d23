//! Language model access for study actions.
//!
//! The assistant only needs one call: complete a task over a subject's material.
//! Failures are typed here and turned into warning-prefixed, user-facing text by callers.

mod gemini;
pub mod prompts;

use thiserror::Error;

pub use gemini::GeminiModel;

/// Prefix for every user-facing failure message
pub const WARNING_GLYPH: &str = "\u{26a0}\u{fe0f}";

#[derive(Error, Debug)]
pub enum ModelError {
    #[error("No API key configured. Set GEMINI_API_KEY or api_key in config.toml.")]
    MissingApiKey,

    #[error("The API key was rejected by the provider. Check your configuration.")]
    KeyRejected,

    #[error("Model not found: {0}")]
    ModelNotFound(String),

    #[error("The model returned an empty response")]
    EmptyResponse,

    #[error("A technical error occurred: {0}")]
    Technical(String),
}

impl ModelError {
    /// Message shown to the user in place of a model reply
    pub fn user_message(&self) -> String {
        format!("{} {}", WARNING_GLYPH, self)
    }
}

/// One completion call: a task over a body of material
#[derive(Debug, Clone, Copy)]
pub struct CompletionRequest<'a> {
    pub system_instruction: &'a str,
    pub material: &'a str,
    pub task: &'a str,
    pub api_key: &'a str,
}

impl CompletionRequest<'_> {
    /// Flatten the request into a single prompt
    pub fn prompt(&self) -> String {
        format!(
            "{}\n\nMATERIAL:\n{}\n\nTASK: {}",
            self.system_instruction, self.material, self.task
        )
    }
}

/// A text-generation backend.
///
/// Output is free-form; callers must not assume it contains well-formed structured data.
pub trait LanguageModel {
    fn complete(&self, request: &CompletionRequest<'_>) -> Result<String, ModelError>;
}

#[cfg(test)]
pub(crate) mod testing {
    use std::cell::RefCell;
    use std::collections::VecDeque;

    use super::*;

    /// Replays canned replies and records the tasks it was given
    #[derive(Default)]
    pub struct ScriptedModel {
        replies: RefCell<VecDeque<Result<String, ModelError>>>,
        pub tasks: RefCell<Vec<String>>,
        pub materials: RefCell<Vec<String>>,
    }

    impl ScriptedModel {
        pub fn replying(replies: Vec<Result<String, ModelError>>) -> Self {
            Self {
                replies: RefCell::new(replies.into()),
                ..Default::default()
            }
        }

        pub fn calls(&self) -> usize {
            self.tasks.borrow().len()
        }
    }

    impl LanguageModel for ScriptedModel {
        fn complete(&self, request: &CompletionRequest<'_>) -> Result<String, ModelError> {
            self.tasks.borrow_mut().push(request.task.to_string());
            self.materials.borrow_mut().push(request.material.to_string());
            self.replies
                .borrow_mut()
                .pop_front()
                .unwrap_or(Err(ModelError::EmptyResponse))
        }
    }
}
