//! Per-upload analysis state
//!
//! Holds the current document and the results derived from it. A new upload
//! invalidates any analysis still in flight for the previous one: results
//! carry the [`AnalysisTicket`] they were started with and are dropped when
//! it no longer matches.

use crate::annotate::create_highlighted_pdf;
use crate::document::{load_document, page_ids};
use crate::error::HighlightError;
use crate::extract::extract_required_text;
use crate::highlighted_file_name;
use crate::locate::find_highlights;
use crate::model::{Highlight, Rectangle};

/// Generation of the document an analysis was started for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnalysisTicket(u64);

struct DocumentEntry {
    name: String,
    bytes: Vec<u8>,
    page_count: usize,
}

#[derive(Default)]
pub struct AnalysisSession {
    document: Option<DocumentEntry>,
    generation: u64,
    summary: Option<String>,
    key_phrases: Vec<String>,
    highlights: Vec<Highlight>,
}

impl AnalysisSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the current document and discard everything derived from the
    /// previous one. Returns the page count.
    pub fn load_document(&mut self, name: &str, bytes: Vec<u8>) -> Result<usize, HighlightError> {
        let page_count = page_ids(&load_document(&bytes)?).len();

        self.generation += 1;
        self.document = Some(DocumentEntry {
            name: name.to_string(),
            bytes,
            page_count,
        });
        self.summary = None;
        self.key_phrases.clear();
        self.highlights.clear();

        tracing::debug!(
            "Loaded {} ({} pages), generation {}",
            name,
            page_count,
            self.generation
        );
        Ok(page_count)
    }

    pub fn document_name(&self) -> Option<&str> {
        self.document.as_ref().map(|d| d.name.as_str())
    }

    pub fn page_count(&self) -> usize {
        self.document.as_ref().map_or(0, |d| d.page_count)
    }

    /// Text to send for summarization.
    ///
    /// # Errors
    /// - `HighlightError::InvalidInput` - no document is loaded
    /// - `HighlightError::ImageOnlyDocument` - the document has no text layer
    pub fn document_text(&self) -> Result<String, HighlightError> {
        extract_required_text(&self.current()?.bytes)
    }

    /// Mark the start of an analysis of the current document.
    pub fn begin_analysis(&self) -> AnalysisTicket {
        AnalysisTicket(self.generation)
    }

    pub fn is_current(&self, ticket: AnalysisTicket) -> bool {
        ticket.0 == self.generation
    }

    /// Store the analysis result and locate its key phrases.
    ///
    /// Returns `Ok(false)` without touching the session when another document
    /// was loaded after `ticket` was issued.
    pub fn apply_key_phrases(
        &mut self,
        ticket: AnalysisTicket,
        summary: String,
        key_phrases: Vec<String>,
    ) -> Result<bool, HighlightError> {
        if !self.is_current(ticket) {
            tracing::debug!(
                "Dropping stale analysis (generation {}, current {})",
                ticket.0,
                self.generation
            );
            return Ok(false);
        }

        let highlights = find_highlights(&self.current()?.bytes, &key_phrases[..])?;
        self.summary = Some(summary);
        self.key_phrases = key_phrases;
        self.highlights = highlights;
        Ok(true)
    }

    pub fn summary(&self) -> Option<&str> {
        self.summary.as_deref()
    }

    pub fn key_phrases(&self) -> &[String] {
        &self.key_phrases
    }

    pub fn highlights(&self) -> &[Highlight] {
        &self.highlights
    }

    /// Rectangles to overlay on one page; empty if the page has none.
    pub fn highlights_for_page(&self, page_index: usize) -> &[Rectangle] {
        self.highlights
            .iter()
            .find(|h| h.page_index == page_index)
            .map_or(&[], |h| h.rects.as_slice())
    }

    /// The highlighted document and its download name, if there is anything
    /// to highlight.
    pub fn download(&self) -> Result<Option<(String, Vec<u8>)>, HighlightError> {
        let Some(document) = self.document.as_ref() else {
            return Ok(None);
        };
        if self.highlights.is_empty() {
            return Ok(None);
        }

        let bytes = create_highlighted_pdf(&document.bytes, &self.highlights)?;
        Ok(Some((highlighted_file_name(&document.name), bytes)))
    }

    fn current(&self) -> Result<&DocumentEntry, HighlightError> {
        self.document
            .as_ref()
            .ok_or_else(|| HighlightError::InvalidInput("no document loaded".to_string()))
    }
}
