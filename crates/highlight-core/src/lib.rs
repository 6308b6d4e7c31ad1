//! Key-phrase highlighting for PDFs
//!
//! This crate reads a PDF's text layer with lopdf and works in three steps:
//! - `extract_text`: plain text of every page, for summarization
//! - `find_highlights`: rectangles of text runs containing key-phrase words
//! - `create_highlighted_pdf`: a copy of the PDF with those rectangles drawn
//!
//! Rectangles use the page's top-left, scale-1.0 viewport space; see
//! [`Highlight::scaled`] for display scales.

pub mod annotate;
pub mod command;
pub mod document;
pub mod error;
pub mod extract;
pub mod fonts;
pub mod geometry;
pub mod locate;
pub mod model;
pub mod session;
pub mod text_layer;
pub mod vocabulary;

#[cfg(test)]
mod test_support;

pub use annotate::{
    create_highlighted_pdf, create_highlighted_pdf_with_style, highlight_document, HighlightStyle,
};
pub use command::{execute, execute_json, HighlightCommand, ProcessMetrics, ProcessResult};
pub use error::HighlightError;
pub use extract::{extract_document_text, extract_required_text, extract_text, is_image_only};
pub use locate::{find_document_highlights, find_highlights};
pub use model::{Highlight, Rectangle};
pub use session::{AnalysisSession, AnalysisTicket};

/// Prefix of the file name offered for a highlighted download.
pub const HIGHLIGHTED_PREFIX: &str = "highlighted-";

/// Parse PDF bytes and return page count
pub fn get_page_count(bytes: &[u8]) -> Result<u32, HighlightError> {
    let doc = document::load_document(bytes)?;
    Ok(doc.get_pages().len() as u32)
}

/// Download name for the highlighted copy of `original_name`.
pub fn highlighted_file_name(original_name: &str) -> String {
    format!("{}{}", HIGHLIGHTED_PREFIX, original_name)
}
