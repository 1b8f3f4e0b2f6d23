//! PDF text extraction through poppler's `pdftotext`
//!
//! The program must be installed at runtime (`poppler-utils` on most Linux distributions,
//! `poppler` on Homebrew). Its name or path comes from `pdftotext_program` in the config.
//! When it cannot be found every PDF degrades to the placeholder and
//! [`ExtractError::ToolMissing`] is logged.

use std::io::{ErrorKind, Write};
use std::process::Command;

use super::ExtractError;

#[derive(Debug, Clone)]
pub struct PdfTextExtractor {
    program: String,
}

impl Default for PdfTextExtractor {
    fn default() -> Self {
        Self::new("pdftotext")
    }
}

impl PdfTextExtractor {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn extract_text(&self, bytes: &[u8]) -> Result<String, ExtractError> {
        if !bytes.starts_with(b"%PDF") {
            return Err(ExtractError::Invalid(super::DocumentKind::Pdf));
        }

        let mut file = tempfile::Builder::new().suffix(".pdf").tempfile()?;
        file.write_all(bytes)?;
        file.flush()?;

        let output = Command::new(&self.program)
            .args(["-enc", "UTF-8"])
            .arg(file.path())
            .arg("-")
            .output()
            .map_err(|e| match e.kind() {
                ErrorKind::NotFound => ExtractError::ToolMissing(self.program.clone()),
                _ => ExtractError::Io(e),
            })?;

        if !output.status.success() {
            return Err(ExtractError::Tool {
                tool: self.program.clone(),
                detail: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        // Pages are separated by form feeds
        Ok(String::from_utf8_lossy(&output.stdout).replace('\u{c}', "\n"))
    }
}
