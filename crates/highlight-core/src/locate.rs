//! Highlight locator
//!
//! Maps key phrases onto page geometry: every text run containing a
//! significant word yields one rectangle in the page's top-left, scale-1.0
//! viewport space.

use crate::document::{load_document, page_ids, page_viewport};
use crate::error::HighlightError;
use crate::geometry::Matrix;
use crate::model::{Highlight, Rectangle};
use crate::text_layer::{page_items, text_runs, TextRun};
use crate::vocabulary::SignificantWordSet;
use lopdf::Document;

/// Find the rectangles of text runs that contain significant key-phrase words.
///
/// Pages are scanned in order; a page contributes a [`Highlight`] only if at
/// least one of its runs matched. Each run contributes at most one rectangle,
/// for its first matching token.
///
/// # Errors
/// - `HighlightError::UnreadableDocument` - the bytes are not a readable PDF,
///   or any page's content cannot be decoded (the whole call fails)
pub fn find_highlights<S: AsRef<str>>(
    bytes: &[u8],
    key_phrases: &[S],
) -> Result<Vec<Highlight>, HighlightError> {
    let vocabulary = SignificantWordSet::from_phrases(key_phrases);
    if vocabulary.is_empty() {
        tracing::debug!("No significant words in {} key phrases", key_phrases.len());
        return Ok(Vec::new());
    }

    locate_words(&load_document(bytes)?, &vocabulary)
}

/// [`find_highlights`] for an already loaded document.
pub fn find_document_highlights<S: AsRef<str>>(
    doc: &Document,
    key_phrases: &[S],
) -> Result<Vec<Highlight>, HighlightError> {
    let vocabulary = SignificantWordSet::from_phrases(key_phrases);
    if vocabulary.is_empty() {
        tracing::debug!("No significant words in {} key phrases", key_phrases.len());
        return Ok(Vec::new());
    }

    locate_words(doc, &vocabulary)
}

fn locate_words(
    doc: &Document,
    vocabulary: &SignificantWordSet,
) -> Result<Vec<Highlight>, HighlightError> {
    let mut highlights = Vec::new();

    for (page_index, page_id) in page_ids(doc).into_iter().enumerate() {
        let viewport = page_viewport(doc, page_id);
        let items = page_items(doc, page_id)?;

        let rects: Vec<Rectangle> = text_runs(&items)
            .filter(|run| vocabulary.first_match(&run.text).is_some())
            .map(|run| run_rectangle(&viewport.transform, run))
            .collect();

        if !rects.is_empty() {
            highlights.push(Highlight { page_index, rects });
        }
    }

    tracing::info!(
        "Located {} rectangles on {} pages for {} significant words",
        highlights.iter().map(|h| h.rects.len()).sum::<usize>(),
        highlights.len(),
        vocabulary.len()
    );

    Ok(highlights)
}

/// Bounding box of a matched run in viewport space.
///
/// The combined transform's translation is the run's baseline origin; the
/// box extends upward from it by the run's own height.
pub fn run_rectangle(viewport: &Matrix, run: &TextRun) -> Rectangle {
    let tx = viewport.then_apply(&run.transform);

    // Box height deliberately stays the run's reported height
    let _font_height = tx.c.hypot(tx.d);

    Rectangle {
        left: tx.e,
        top: tx.f - run.height,
        width: run.width,
        height: run.height,
    }
}
