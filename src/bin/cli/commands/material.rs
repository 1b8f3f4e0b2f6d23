use std::path::PathBuf;

use anyhow::{bail, Result};

use studydesk_lib::ai::WARNING_GLYPH;
use studydesk_lib::subjects::ClearOutcome;

use crate::app::App;
use crate::render::terminal::{heading, paint, Color};
use crate::OutputFormat;

pub fn run_upload(
    app: &mut App,
    paths: &[PathBuf],
    subject: Option<&str>,
    format: &OutputFormat,
) -> Result<()> {
    let files = app.read_uploads(paths)?;
    let target = app.assistant.resolve_subject(subject)?;
    let report = app.assistant.upload(Some(&target), &files)?;
    app.save()?;

    match format {
        OutputFormat::Json => {
            let output = serde_json::json!({
                "subject": target,
                "processed": report.processed,
                "degraded": report.degraded,
                "skipped": report.skipped,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Plain => {
            println!("Added {} files to \"{}\"", report.processed, target);
            for name in &report.degraded {
                println!("  {} Could not read {}; stored a placeholder", WARNING_GLYPH, name);
            }
            for name in &report.skipped {
                println!("  Skipped {} (unsupported file type)", name);
            }
        }
    }
    Ok(())
}

pub fn run_show(
    app: &App,
    subject: Option<&str>,
    format: &OutputFormat,
    use_color: bool,
) -> Result<()> {
    let name = app.assistant.resolve_subject(subject)?;
    let record = app.assistant.store().get(&name)?;

    match format {
        OutputFormat::Json => {
            let output = serde_json::json!({
                "subject": record.name,
                "blocks": record.material,
                "text": record.material_text(),
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Plain => {
            println!("{}", heading(&record.name, use_color));
            if record.has_material() {
                println!("{}", record.material_text().trim_start_matches('\n'));
            } else {
                println!("{}", paint("No material yet.", Color::DIM, use_color));
            }
        }
    }
    Ok(())
}

/// Text for `edit`. Blank input is refused; emptying material goes through `clear`.
pub fn edit_text(content: Option<String>) -> Result<String> {
    match content {
        Some(text) if !text.trim().is_empty() => Ok(text),
        _ => bail!("No text given. Pass the new material as an argument or pipe it on stdin; use `clear` to remove material."),
    }
}

pub fn run_edit(
    app: &mut App,
    content: Option<String>,
    subject: Option<&str>,
    format: &OutputFormat,
) -> Result<()> {
    let text = edit_text(content)?;
    let text = text.as_str();
    let name = app.assistant.resolve_subject(subject)?;
    app.assistant.store_mut().overwrite_material(&name, text)?;
    app.save()?;

    match format {
        OutputFormat::Json => {
            let output = serde_json::json!({ "subject": name, "characters": text.chars().count() });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Plain => println!("Saved material for \"{}\"", name),
    }
    Ok(())
}

pub fn run_clear(app: &mut App, subject: Option<&str>, format: &OutputFormat) -> Result<()> {
    let name = app.assistant.resolve_subject(subject)?;
    let outcome = app.assistant.store_mut().clear_material(&name)?;
    app.save()?;

    match format {
        OutputFormat::Json => {
            let output = serde_json::json!({
                "subject": name,
                "cleared": outcome == ClearOutcome::Cleared,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Plain => match outcome {
            ClearOutcome::ConfirmationRequired => {
                println!("This deletes all material in \"{}\". Run clear again to confirm.", name)
            }
            ClearOutcome::Cleared => println!("Cleared material of \"{}\"", name),
        },
    }
    Ok(())
}
