//! Text extraction from PowerPoint (.pptx) decks.
//!
//! A deck is a zip archive; slide bodies live in `ppt/slides/slideN.xml` and visible text
//! sits in `<a:t>` runs grouped into `<a:p>` paragraphs.

use std::io::{Cursor, Read};

use quick_xml::events::Event;
use quick_xml::Reader;
use zip::ZipArchive;

use super::{DocumentKind, ExtractError};

const PRESENTATION_PART: &str = "ppt/presentation.xml";

#[derive(Debug, Clone, Default)]
pub struct SlidesTextExtractor;

impl SlidesTextExtractor {
    pub fn extract_text(&self, bytes: &[u8]) -> Result<String, ExtractError> {
        let mut archive = ZipArchive::new(Cursor::new(bytes))?;
        if archive.by_name(PRESENTATION_PART).is_err() {
            return Err(ExtractError::Invalid(DocumentKind::Slides));
        }

        let mut slides: Vec<(u32, String)> = archive
            .file_names()
            .filter_map(|name| slide_number(name).map(|n| (n, name.to_string())))
            .collect();
        slides.sort_by_key(|(n, _)| *n);

        let mut text = String::new();
        for (_, name) in slides {
            let mut xml = String::new();
            archive.by_name(&name)?.read_to_string(&mut xml)?;
            text.push_str(&slide_text(&xml)?);
        }
        Ok(text)
    }
}

/// `ppt/slides/slide12.xml` -> 12
fn slide_number(name: &str) -> Option<u32> {
    name.strip_prefix("ppt/slides/slide")?
        .strip_suffix(".xml")?
        .parse()
        .ok()
}

/// Visible text of one slide, one line per non-empty paragraph
fn slide_text(xml: &str) -> Result<String, ExtractError> {
    let mut reader = Reader::from_str(xml);
    let mut buf = Vec::new();

    let mut out = String::new();
    let mut paragraph = String::new();
    let mut in_run = false;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) if e.name().as_ref() == b"a:t" => in_run = true,
            Ok(Event::End(ref e)) => match e.name().as_ref() {
                b"a:t" => in_run = false,
                b"a:p" => {
                    let line = paragraph.trim_end();
                    if !line.trim().is_empty() {
                        out.push_str(line);
                        out.push('\n');
                    }
                    paragraph.clear();
                }
                _ => {}
            },
            Ok(Event::Text(e)) if in_run => {
                paragraph.push_str(&e.unescape().map_err(quick_xml::Error::from)?)
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(e.into()),
            _ => {}
        }
        buf.clear();
    }

    Ok(out)
}
