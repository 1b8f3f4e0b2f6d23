use anyhow::{bail, Result};

use studydesk_lib::flashcards::{DeckState, GenerationOutcome, ReviewOutcome};

use crate::app::App;
use crate::commands::subjects::describe_deck;
use crate::render::terminal::{paint, Color};
use crate::{MarkOutcome, OutputFormat};

pub fn run_generate(
    app: &mut App,
    count: Option<usize>,
    subject: Option<&str>,
    format: &OutputFormat,
) -> Result<()> {
    let name = app.assistant.resolve_subject(subject)?;
    let outcome = app.assistant.generate_flashcards(Some(&name), count)?;
    if matches!(outcome, GenerationOutcome::Ready { .. }) {
        app.save()?;
    }

    match format {
        OutputFormat::Json => {
            let output = match &outcome {
                GenerationOutcome::Ready { cards, source } => serde_json::json!({
                    "status": "ready",
                    "subject": name,
                    "cards": cards,
                    "source": format!("{:?}", source),
                }),
                GenerationOutcome::Failed { message, raw } => serde_json::json!({
                    "status": "failed",
                    "subject": name,
                    "message": message,
                    "raw": raw,
                }),
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Plain => match &outcome {
            GenerationOutcome::Ready { cards, .. } => {
                println!("Generated {} flashcards for \"{}\"", cards, name)
            }
            GenerationOutcome::Failed { message, raw } => {
                println!("{}", message);
                if let Some(raw) = raw {
                    println!("\nModel reply:\n{}", raw.trim_end());
                }
            }
        },
    }
    Ok(())
}

pub fn run_show(
    app: &App,
    subject: Option<&str>,
    reveal: bool,
    format: &OutputFormat,
    use_color: bool,
) -> Result<()> {
    let state = app.assistant.deck_state(subject)?;
    let card = app.assistant.current_card(subject)?;

    match format {
        OutputFormat::Json => {
            let answer = card.filter(|_| reveal).map(|c| c.answer.as_str());
            let output = serde_json::json!({
                "deck": state,
                "question": card.map(|c| c.question.as_str()),
                "answer": answer,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Plain => match (card, state) {
            (Some(card), DeckState::Reviewing { cursor, total }) => {
                let progress = format!("Card {} of {}", cursor + 1, total);
                println!("{}", paint(&progress, Color::GRAY, use_color));
                println!("Q: {}", card.question);
                if reveal {
                    println!("A: {}", paint(&card.answer, Color::YELLOW, use_color));
                }
            }
            (_, DeckState::NoDeck) => println!("No flashcards yet. Run `flashcards generate`."),
            (_, DeckState::Exhausted { total }) => {
                println!("All {} cards reviewed. Run `flashcards restart` to go again.", total)
            }
            (_, state) => println!("Flashcards: {}", describe_deck(&state)),
        },
    }
    Ok(())
}

pub fn run_mark(
    app: &mut App,
    outcome: MarkOutcome,
    subject: Option<&str>,
    format: &OutputFormat,
) -> Result<()> {
    let outcome = match outcome {
        MarkOutcome::Remembered => ReviewOutcome::Remembered,
        MarkOutcome::Forgot => ReviewOutcome::Forgot,
    };
    if app.assistant.deck_state(subject)? == DeckState::NoDeck {
        bail!("No flashcards to mark. Run `flashcards generate` first.");
    }

    let state = app.assistant.mark_card(subject, outcome)?;
    app.save()?;
    print_state(&state, format)
}

pub fn run_restart(app: &mut App, subject: Option<&str>, format: &OutputFormat) -> Result<()> {
    let state = app.assistant.restart_review(subject)?;
    app.save()?;
    print_state(&state, format)
}

pub fn run_status(app: &App, subject: Option<&str>, format: &OutputFormat) -> Result<()> {
    let state = app.assistant.deck_state(subject)?;
    print_state(&state, format)
}

fn print_state(state: &DeckState, format: &OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(state)?),
        OutputFormat::Plain => println!("Flashcards: {}", describe_deck(state)),
    }
    Ok(())
}
