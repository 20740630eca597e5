//! Plain-text extraction from .docx bodies

use crate::error::AgentError;
use crate::Result;
use lazy_static::lazy_static;
use regex::Regex;
use std::io::{Cursor, Read};
use zip::ZipArchive;

const BODY_PART: &str = "word/document.xml";

lazy_static! {
    static ref PARAGRAPH: Regex = Regex::new(r"(?s)<w:p[\s>].*?</w:p>").expect("valid paragraph pattern");
    static ref TEXT_RUN: Regex = Regex::new(r"<w:t(?:\s[^>]*)?>([^<]*)</w:t>").expect("valid text pattern");
}

fn unescape_xml(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

/// Non-blank paragraphs of the document body, one per line
pub fn extract_text(bytes: &[u8]) -> Result<String> {
    if bytes.is_empty() {
        return Err(AgentError::DocumentError("document is empty".to_string()));
    }

    let mut archive = ZipArchive::new(Cursor::new(bytes))?;
    let mut xml = String::new();
    archive.by_name(BODY_PART)?.read_to_string(&mut xml)?;

    let paragraphs: Vec<String> = PARAGRAPH
        .find_iter(&xml)
        .map(|paragraph| {
            TEXT_RUN
                .captures_iter(paragraph.as_str())
                .filter_map(|c| c.get(1))
                .map(|m| unescape_xml(m.as_str()))
                .collect::<String>()
        })
        .filter(|text| !text.trim().is_empty())
        .collect();

    if paragraphs.is_empty() {
        return Err(AgentError::DocumentError(
            "document has no text content".to_string(),
        ));
    }

    Ok(paragraphs.join("\n"))
}
