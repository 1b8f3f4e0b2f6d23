use anyhow::Result;

use studydesk_lib::StudyReply;

use crate::app::App;
use crate::render::terminal::render_history;
use crate::OutputFormat;

pub fn run_summary(app: &mut App, subject: Option<&str>, format: &OutputFormat) -> Result<()> {
    let reply = app.assistant.summarize(subject)?;
    finish(app, reply, format)
}

pub fn run_quiz(app: &mut App, subject: Option<&str>, format: &OutputFormat) -> Result<()> {
    let reply = app.assistant.quiz(subject)?;
    finish(app, reply, format)
}

pub fn run_ask(
    app: &mut App,
    question: &str,
    subject: Option<&str>,
    format: &OutputFormat,
) -> Result<()> {
    let reply = app.assistant.ask(subject, question)?;
    finish(app, reply, format)
}

/// Print the reply; only an answer changes the session
fn finish(app: &App, reply: StudyReply, format: &OutputFormat) -> Result<()> {
    if matches!(reply, StudyReply::Answer(_)) {
        app.save()?;
    }

    match format {
        OutputFormat::Json => {
            let output = match &reply {
                StudyReply::Answer(text) => serde_json::json!({ "status": "answer", "text": text }),
                StudyReply::NoMaterial => serde_json::json!({ "status": "noMaterial" }),
                StudyReply::Failed(message) => {
                    serde_json::json!({ "status": "failed", "message": message })
                }
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Plain => match &reply {
            StudyReply::Answer(text) => println!("{}", text.trim_end()),
            StudyReply::NoMaterial => {
                println!("This subject has no material yet. Add some with `upload` or `edit`.")
            }
            StudyReply::Failed(message) => println!("{}", message),
        },
    }
    Ok(())
}

pub fn run_history(
    app: &App,
    subject: Option<&str>,
    format: &OutputFormat,
    use_color: bool,
) -> Result<()> {
    let name = app.assistant.resolve_subject(subject)?;
    let record = app.assistant.store().get(&name)?;

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&record.history)?);
        }
        OutputFormat::Plain => {
            if record.history.is_empty() {
                println!("No conversation yet in \"{}\".", name);
            } else {
                println!("{}", render_history(&record.history, use_color));
            }
        }
    }
    Ok(())
}
