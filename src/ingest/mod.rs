//! Material ingestion from uploaded documents
//!
//! Each uploaded file becomes one labelled material block. Extraction never fails an upload:
//! an unreadable document is stored as a fixed placeholder so the user can see which file
//! did not come through. Files of unsupported types are skipped.

mod pdf;
mod slides;

use std::fmt;
use std::path::Path;

use thiserror::Error;

use crate::subjects::{MaterialBlock, StoreError, SubjectStore};

pub use pdf::PdfTextExtractor;
pub use slides::SlidesTextExtractor;

#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Archive error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("{tool} failed: {detail}")]
    Tool { tool: String, detail: String },

    #[error("{0} not found; install poppler-utils to read PDFs")]
    ToolMissing(String),

    #[error("Not a valid {0} document")]
    Invalid(DocumentKind),
}

/// Document formats the assistant can read
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocumentKind {
    Pdf,
    Slides,
}

impl DocumentKind {
    /// Detect the kind from a file name's extension (case-insensitive)
    pub fn from_file_name(name: &str) -> Option<Self> {
        let ext = Path::new(name).extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "pdf" => Some(Self::Pdf),
            "pptx" => Some(Self::Slides),
            _ => None,
        }
    }

    /// Stored in place of the text when extraction fails
    pub fn placeholder(self) -> &'static str {
        match self {
            Self::Pdf => "Could not read PDF.",
            Self::Slides => "Could not read slides.",
        }
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pdf => write!(f, "PDF"),
            Self::Slides => write!(f, "slide deck"),
        }
    }
}

/// Turns document bytes into plain text
pub trait TextExtractor {
    fn extract(&self, bytes: &[u8], kind: DocumentKind) -> Result<String, ExtractError>;
}

/// Dispatches to the PDF or slide extractor by kind
#[derive(Debug, Default)]
pub struct DocumentExtractor {
    pdf: PdfTextExtractor,
    slides: SlidesTextExtractor,
}

impl DocumentExtractor {
    pub fn new(pdf: PdfTextExtractor, slides: SlidesTextExtractor) -> Self {
        Self { pdf, slides }
    }
}

impl TextExtractor for DocumentExtractor {
    fn extract(&self, bytes: &[u8], kind: DocumentKind) -> Result<String, ExtractError> {
        match kind {
            DocumentKind::Pdf => self.pdf.extract_text(bytes),
            DocumentKind::Slides => self.slides.extract_text(bytes),
        }
    }
}

/// A file handed over by the user
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl UploadedFile {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bytes,
        }
    }
}

/// What happened to a single file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestOutcome {
    Extracted,
    /// Stored as a placeholder block
    Degraded,
    /// Unsupported type; nothing stored
    Skipped,
}

/// Summary of a batch upload
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestReport {
    /// Files that produced a material block, placeholders included
    pub processed: usize,
    pub degraded: Vec<String>,
    pub skipped: Vec<String>,
}

pub struct MaterialIngestor {
    extractor: Box<dyn TextExtractor>,
}

impl MaterialIngestor {
    pub fn new(extractor: Box<dyn TextExtractor>) -> Self {
        Self { extractor }
    }

    /// Extract one document and append it to `subject`'s material
    pub fn ingest(
        &self,
        store: &mut SubjectStore,
        subject: &str,
        source_label: &str,
        bytes: &[u8],
        kind: DocumentKind,
    ) -> Result<IngestOutcome, StoreError> {
        store.get(subject)?;

        let (text, outcome) = match self.extractor.extract(bytes, kind) {
            Ok(text) => (text, IngestOutcome::Extracted),
            Err(e) => {
                log::warn!("Could not extract {} {:?}: {}", kind, source_label, e);
                (kind.placeholder().to_string(), IngestOutcome::Degraded)
            }
        };

        store.append_material(subject, MaterialBlock::from_source(source_label, text))?;
        log::info!("Added {:?} to {:?} ({:?})", source_label, subject, outcome);
        Ok(outcome)
    }

    /// Ingest a file, choosing the extractor from its extension
    pub fn ingest_file(
        &self,
        store: &mut SubjectStore,
        subject: &str,
        file: &UploadedFile,
    ) -> Result<IngestOutcome, StoreError> {
        match DocumentKind::from_file_name(&file.name) {
            Some(kind) => self.ingest(store, subject, &file.name, &file.bytes, kind),
            None => {
                store.get(subject)?;
                log::debug!("Skipping unsupported file {:?}", file.name);
                Ok(IngestOutcome::Skipped)
            }
        }
    }

    /// Ingest every file; one bad file never stops the rest
    pub fn ingest_batch(
        &self,
        store: &mut SubjectStore,
        subject: &str,
        files: &[UploadedFile],
    ) -> Result<IngestReport, StoreError> {
        store.get(subject)?;

        let mut report = IngestReport::default();
        for file in files {
            match self.ingest_file(store, subject, file)? {
                IngestOutcome::Extracted => report.processed += 1,
                IngestOutcome::Degraded => {
                    report.processed += 1;
                    report.degraded.push(file.name.clone());
                }
                IngestOutcome::Skipped => report.skipped.push(file.name.clone()),
            }
        }
        Ok(report)
    }
}
