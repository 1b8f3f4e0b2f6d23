use anyhow::Result;

use studydesk_lib::flashcards::DeckState;

use crate::app::App;
use crate::render::terminal::{heading, paint, Color};
use crate::OutputFormat;

pub fn run_status(app: &App, format: &OutputFormat, use_color: bool) -> Result<()> {
    let assistant = &app.assistant;
    let record = assistant.store().current_record();
    let deck = assistant.deck_state(None)?;

    match format {
        OutputFormat::Json => {
            let output = serde_json::json!({
                "currentSubject": record.name,
                "subjects": assistant.store().len(),
                "materialBlocks": record.material.len(),
                "historyEntries": record.history.len(),
                "deck": deck,
                "apiKey": assistant.config().api_key_hint(),
                "model": assistant.config().model,
                "session": app.storage.path().to_string_lossy(),
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Plain => {
            println!("Subject: {}", heading(&record.name, use_color));
            println!("  Material: {} blocks", record.material.len());
            println!("  History: {} messages", record.history.len());
            println!("  Flashcards: {}", describe_deck(&deck));
            println!(
                "{}",
                paint(
                    &format!("{} ({})", assistant.config().api_key_hint(), assistant.config().model),
                    Color::GRAY,
                    use_color
                )
            );
        }
    }

    Ok(())
}

pub fn run_list(app: &App, format: &OutputFormat, use_color: bool) -> Result<()> {
    let store = app.assistant.store();

    match format {
        OutputFormat::Json => {
            let output: Vec<serde_json::Value> = store
                .subject_names()
                .into_iter()
                .filter_map(|name| store.get(name).ok())
                .map(|record| {
                    serde_json::json!({
                        "name": record.name,
                        "isCurrent": record.name == store.current_subject(),
                        "materialBlocks": record.material.len(),
                        "historyEntries": record.history.len(),
                        "cards": record.deck.as_ref().map(|d| d.len()).unwrap_or(0),
                        "updatedAt": record.updated_at.to_rfc3339(),
                    })
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Plain => {
            for name in store.subject_names() {
                let current = if name == store.current_subject() { "* " } else { "  " };
                let record = store.get(name)?;
                let detail = format!(
                    "({} blocks, {} messages)",
                    record.material.len(),
                    record.history.len()
                );
                println!("{}{} {}", current, name, paint(&detail, Color::DIM, use_color));
            }
        }
    }

    Ok(())
}

pub fn run_create(app: &mut App, name: &str, format: &OutputFormat) -> Result<()> {
    let created = app.assistant.store_mut().create_subject(name)?.name.clone();
    app.save()?;
    print_current(&created, "Created and selected", format)
}

pub fn run_select(app: &mut App, name: &str, format: &OutputFormat) -> Result<()> {
    let changed = app.assistant.store_mut().select_subject(name)?;
    if changed {
        app.save()?;
    }
    let verb = if changed { "Selected" } else { "Already on" };
    print_current(name, verb, format)
}

pub fn run_rename(app: &mut App, old: &str, new: &str, format: &OutputFormat) -> Result<()> {
    app.assistant.store_mut().rename_subject(old, new)?;
    app.save()?;

    match format {
        OutputFormat::Json => {
            let output = serde_json::json!({
                "renamed": old,
                "to": new.trim(),
                "currentSubject": app.assistant.store().current_subject(),
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Plain => println!("Renamed \"{}\" to \"{}\"", old, new.trim()),
    }
    Ok(())
}

fn print_current(name: &str, verb: &str, format: &OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            let output = serde_json::json!({ "currentSubject": name });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Plain => println!("{} \"{}\"", verb, name),
    }
    Ok(())
}

pub fn describe_deck(state: &DeckState) -> String {
    match state {
        DeckState::NoDeck => "none".to_string(),
        DeckState::Generating => "generating...".to_string(),
        DeckState::Reviewing { cursor, total } => format!("card {} of {}", cursor + 1, total),
        DeckState::Exhausted { total } => format!("all {} cards reviewed", total),
    }
}
