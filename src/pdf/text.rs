//! Per-page text extraction via lopdf.

use anyhow::{Context, Result};
use lopdf::Document;
use std::path::Path;
use tracing::debug;

/// Extracted text for every page of a document, 1-indexed page numbers.
///
/// Pages whose content streams cannot be decoded yield an empty string rather
/// than failing the file; scanned-image pages simply have no text layer.
pub fn extract_pages(path: &Path) -> Result<Vec<(u32, String)>> {
    let doc = Document::load(path)
        .with_context(|| format!("Failed to load PDF: {}", path.display()))?;

    let mut pages = Vec::new();

    for page_number in doc.get_pages().keys() {
        let text = match doc.extract_text(&[*page_number]) {
            Ok(text) => text,
            Err(e) => {
                debug!(
                    "No extractable text on page {} of {}: {}",
                    page_number,
                    path.display(),
                    e
                );
                String::new()
            }
        };
        pages.push((*page_number, text));
    }

    Ok(pages)
}
