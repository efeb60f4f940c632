//! Document loading: uploaded bytes to ordered text segments.
//!
//! The file kind is inferred from the filename suffix; `.pdf` goes through
//! the PDF extractor, everything else is read as UTF-8 text. Parsers need a
//! filesystem path, so the bytes are staged in a scoped temp file whose
//! guard removes it on every exit path.

use std::io::Write;

use serde_json::{json, Value};
use tempfile::NamedTempFile;

use crate::core::errors::IngestError;

/// One contiguous extracted text region with loader metadata (e.g. the page
/// number for PDFs).
#[derive(Debug, Clone)]
pub struct Segment {
    pub text: String,
    pub metadata: Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Pdf,
    Text,
}

impl DocumentKind {
    pub fn from_filename(filename: &str) -> Self {
        let lower = filename.to_lowercase();
        if lower.ends_with(".pdf") {
            Self::Pdf
        } else {
            Self::Text
        }
    }

    fn suffix(&self) -> &'static str {
        match self {
            Self::Pdf => ".pdf",
            Self::Text => ".txt",
        }
    }
}

/// Parses uploaded bytes into ordered segments. Parsing is filesystem and
/// CPU bound, so the whole call runs on the blocking pool.
pub async fn load_document(bytes: Vec<u8>, filename: &str) -> Result<Vec<Segment>, IngestError> {
    let kind = DocumentKind::from_filename(filename);
    let filename = filename.to_string();

    tokio::task::spawn_blocking(move || load_blocking(bytes, kind, &filename))
        .await
        .map_err(|err| IngestError::UnsupportedFormat(format!("loader task failed: {}", err)))?
}

fn load_blocking(bytes: Vec<u8>, kind: DocumentKind, filename: &str) -> Result<Vec<Segment>, IngestError> {
    let mut tmp = tempfile::Builder::new()
        .prefix("copilot-upload-")
        .suffix(kind.suffix())
        .tempfile()
        .map_err(|err| IngestError::TemporaryResource(format!("temp file create failed: {}", err)))?;

    tmp.write_all(&bytes)
        .map_err(|err| IngestError::TemporaryResource(format!("temp file write failed: {}", err)))?;

    let segments = match kind {
        DocumentKind::Pdf => load_pdf(&tmp),
        DocumentKind::Text => load_text(&tmp),
    };

    // On the error paths above the guard's Drop removes the file; here we
    // close explicitly so a cleanup failure is visible in the logs.
    if let Err(err) = tmp.close() {
        tracing::warn!("Failed to remove temp file for {}: {}", filename, err);
    }

    segments
}

fn load_pdf(tmp: &NamedTempFile) -> Result<Vec<Segment>, IngestError> {
    let text = pdf_extract::extract_text(tmp.path())
        .map_err(|err| IngestError::UnsupportedFormat(format!("PDF parse failed: {}", err)))?;

    // pdf-extract emits form feeds between pages; one segment per page.
    let segments = text
        .split('\u{0C}')
        .enumerate()
        .filter(|(_, page)| !page.trim().is_empty())
        .map(|(idx, page)| Segment {
            text: page.to_string(),
            metadata: json!({ "page": idx + 1 }),
        })
        .collect();

    Ok(segments)
}

fn load_text(tmp: &NamedTempFile) -> Result<Vec<Segment>, IngestError> {
    let text = std::fs::read_to_string(tmp.path())
        .map_err(|_| IngestError::UnsupportedFormat("file is not valid UTF-8 text".to_string()))?;

    if text.is_empty() {
        return Ok(Vec::new());
    }

    Ok(vec![Segment {
        text,
        metadata: json!({}),
    }])
}
