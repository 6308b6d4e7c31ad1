//! Plain-text extraction for the summarization step

use crate::document::{load_document, page_ids};
use crate::error::HighlightError;
use crate::text_layer::{page_items, text_runs};
use lopdf::Document;

/// Extract the text layer of every page.
///
/// Runs within a page are joined with a single space and every page is
/// followed by a blank line. Pages without text contribute nothing but the
/// separator, so a scanned document yields whitespace only; use
/// [`is_image_only`] to detect that.
///
/// # Errors
/// - `HighlightError::UnreadableDocument` - the bytes are not a readable PDF,
///   the document is encrypted, or a page's content cannot be decoded
pub fn extract_text(bytes: &[u8]) -> Result<String, HighlightError> {
    extract_document_text(&load_document(bytes)?)
}

/// [`extract_text`] for an already loaded document.
pub fn extract_document_text(doc: &Document) -> Result<String, HighlightError> {
    let pages = page_ids(doc);
    let mut full_text = String::new();

    for page_id in pages.iter().copied() {
        let items = page_items(doc, page_id)?;
        let page_text = text_runs(&items)
            .map(|run| run.text.as_str())
            .collect::<Vec<_>>()
            .join(" ");
        full_text.push_str(&page_text);
        full_text.push_str("\n\n");
    }

    tracing::debug!(
        "Extracted {} characters from {} pages",
        full_text.len(),
        pages.len()
    );

    Ok(full_text)
}

/// True when extracted text carries no content, as for image-only scans.
pub fn is_image_only(text: &str) -> bool {
    text.trim().is_empty()
}

/// Extract text and reject documents without a text layer.
pub fn extract_required_text(bytes: &[u8]) -> Result<String, HighlightError> {
    let text = extract_text(bytes)?;
    if is_image_only(&text) {
        return Err(HighlightError::ImageOnlyDocument);
    }
    Ok(text)
}
