//! Instruction and task text for the study actions

/// Standing instruction for every call
pub fn system_instruction(answer_language: &str) -> String {
    format!(
        "You are a patient, pedagogical teacher inside a personal study assistant. \
         Answer in {}. Stick to the material below.",
        answer_language
    )
}

pub fn summary_task() -> &'static str {
    "Summarize the material. Start with a short overview, then list the key concepts \
     with a one-sentence explanation each."
}

pub fn quiz_task() -> &'static str {
    "Write a quiz of five questions about the material, mixing multiple choice and short \
     answer. Put the answer key at the end."
}

/// Task asking for exactly `count` cards as a fenced JSON list
pub fn flashcards_task(count: usize) -> String {
    format!(
        "Create exactly {} flashcards about the material. Reply only with a JSON list inside \
         a ```json fenced block, in the form \
         [{{\"question\": \"...\", \"answer\": \"...\"}}].",
        count
    )
}
