use anyhow::Result;

use studydesk_lib::ai::WARNING_GLYPH;

use crate::app::App;
use crate::OutputFormat;

/// Synthesize `text`, or the subject's latest assistant reply, and print the audio path
pub fn run(
    app: &App,
    text: Option<String>,
    subject: Option<&str>,
    format: &OutputFormat,
) -> Result<()> {
    let text = match text {
        Some(text) => text,
        None => {
            let name = app.assistant.resolve_subject(subject)?;
            let record = app.assistant.store().get(&name)?;
            record.last_reply().unwrap_or_default().to_string()
        }
    };

    let result = app.assistant.speak(&text);

    match format {
        OutputFormat::Json => {
            let output = match &result {
                Ok(path) => serde_json::json!({ "audio": path.to_string_lossy() }),
                Err(e) => serde_json::json!({ "audio": null, "message": e.to_string() }),
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Plain => match &result {
            Ok(path) => println!("{}", path.display()),
            Err(e) => println!("{} {}", WARNING_GLYPH, e),
        },
    }
    Ok(())
}
