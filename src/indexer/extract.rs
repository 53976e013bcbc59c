//! Media type detection and plain-text extraction for uploaded files.
use std::path::Path;

use lopdf::Document as PdfDocument;
use tracing::debug;

use crate::error::{RagError, Result};

pub const OCTET_STREAM: &str = "application/octet-stream";
pub const PDF: &str = "application/pdf";

/// Extension → media type table.
const MEDIA_TYPES: &[(&str, &str)] = &[
    ("txt", "text/plain"),
    ("text", "text/plain"),
    ("log", "text/plain"),
    ("md", "text/markdown"),
    ("markdown", "text/markdown"),
    ("csv", "text/csv"),
    ("tsv", "text/tab-separated-values"),
    ("html", "text/html"),
    ("htm", "text/html"),
    ("css", "text/css"),
    ("xml", "text/xml"),
    ("yaml", "text/yaml"),
    ("yml", "text/yaml"),
    ("ics", "text/calendar"),
    ("vtt", "text/vtt"),
    ("pdf", PDF),
    ("json", "application/json"),
    ("js", "application/javascript"),
    ("rtf", "application/rtf"),
    ("doc", "application/msword"),
    (
        "docx",
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    ),
    ("xls", "application/vnd.ms-excel"),
    (
        "xlsx",
        "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
    ),
    ("zip", "application/zip"),
    ("png", "image/png"),
    ("jpg", "image/jpeg"),
    ("jpeg", "image/jpeg"),
];

/// Detects a media type from a filename's extension.
pub fn detect_media_type(filename: &str) -> &'static str {
    let Some(ext) = Path::new(filename).extension().and_then(|e| e.to_str()) else {
        return OCTET_STREAM;
    };
    let ext = ext.to_ascii_lowercase();
    MEDIA_TYPES
        .iter()
        .find(|(known, _)| *known == ext)
        .map_or(OCTET_STREAM, |(_, media_type)| *media_type)
}

/// Whether a media type can be turned into text.
pub fn is_supported(media_type: &str) -> bool {
    media_type.starts_with("text/") || media_type == PDF
}

/// Extracts plain text from file bytes of the given media type.
///
/// `text/*` is decoded as UTF-8 (invalid sequences replaced), PDFs go
/// through page text extraction, everything else is rejected.
pub fn extract_text(media_type: &str, bytes: &[u8]) -> Result<String> {
    if media_type.starts_with("text/") {
        return Ok(String::from_utf8_lossy(bytes).into_owned());
    }
    if media_type == PDF {
        return extract_pdf_text(bytes);
    }
    Err(RagError::UnsupportedFileType {
        media_type: media_type.to_string(),
    })
}

fn extract_pdf_text(bytes: &[u8]) -> Result<String> {
    let doc = PdfDocument::load_mem(bytes)
        .map_err(|e| RagError::TextExtraction(format!("unreadable PDF: {e}")))?;
    let pages: Vec<u32> = doc.get_pages().keys().copied().collect();
    if pages.is_empty() {
        return Ok(String::new());
    }
    let text = doc
        .extract_text(&pages)
        .map_err(|e| RagError::TextExtraction(format!("PDF text extraction failed: {e}")))?;
    debug!("Extracted {} chars from {} PDF pages", text.len(), pages.len());
    Ok(text)
}
