//! Burn highlight rectangles into a PDF

use crate::document::{load_document, media_box, page_ids, page_resources, resolve, resolve_dict};
use crate::error::HighlightError;
use crate::model::{Highlight, Rectangle};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream};
use std::collections::HashMap;

/// Fill colour and opacity of drawn highlights.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HighlightStyle {
    /// RGB components in the 0-1 range
    pub color: (f32, f32, f32),
    pub opacity: f32,
}

impl Default for HighlightStyle {
    fn default() -> Self {
        Self {
            color: (0.99, 0.93, 0.45),
            opacity: 0.3,
        }
    }
}

impl HighlightStyle {
    /// Build a style from a `#RRGGBB` colour and an opacity in `0..=1`.
    pub fn from_hex(color: &str, opacity: f32) -> Result<Self, HighlightError> {
        Self {
            color: parse_hex_color(color)?,
            opacity: 1.0,
        }
        .with_opacity(opacity)
    }

    pub fn with_opacity(self, opacity: f32) -> Result<Self, HighlightError> {
        if !(0.0..=1.0).contains(&opacity) {
            return Err(HighlightError::InvalidInput(format!(
                "opacity {} is outside 0-1",
                opacity
            )));
        }
        Ok(Self { opacity, ..self })
    }
}

/// Parse hex color string (e.g., "#FF0000" or "FF0000") to RGB floats (0-1 range)
fn parse_hex_color(color: &str) -> Result<(f32, f32, f32), HighlightError> {
    let hex = color.trim_start_matches('#');
    let invalid = || HighlightError::InvalidInput(format!("invalid colour: {}", color));
    if hex.len() != 6 || !hex.is_ascii() {
        return Err(invalid());
    }
    let channel = |range: std::ops::Range<usize>| {
        u8::from_str_radix(&hex[range], 16)
            .map(|v| v as f32 / 255.0)
            .map_err(|_| invalid())
    };
    Ok((channel(0..2)?, channel(2..4)?, channel(4..6)?))
}

/// Draw highlights with the default translucent yellow.
///
/// See [`create_highlighted_pdf_with_style`].
pub fn create_highlighted_pdf(
    pdf_bytes: &[u8],
    highlights: &[Highlight],
) -> Result<Vec<u8>, HighlightError> {
    create_highlighted_pdf_with_style(pdf_bytes, highlights, &HighlightStyle::default())
}

/// Produce a new PDF with each highlight rectangle filled on its page.
///
/// Rectangles are in top-left page space; each is drawn at
/// `x = left`, `y = page_height - top - height` using the page's MediaBox
/// height. Highlights whose page index is out of range are skipped.
///
/// The locator measures rectangles in the page's view box, which starts at
/// the CropBox (or MediaBox) origin and follows `/Rotate`. This drawing uses
/// neither the box origin nor the rotation, so highlights only line up on
/// unrotated pages whose view box starts at `(0, 0)`.
///
/// # Errors
/// - `HighlightError::UnreadableDocument` - the input is not a readable PDF
/// - `HighlightError::SerializationFailure` - the modified document cannot be saved
pub fn create_highlighted_pdf_with_style(
    pdf_bytes: &[u8],
    highlights: &[Highlight],
    style: &HighlightStyle,
) -> Result<Vec<u8>, HighlightError> {
    highlight_document(load_document(pdf_bytes)?, highlights, style)
}

/// Draw highlights into an already loaded document and serialize it.
pub fn highlight_document(
    mut doc: Document,
    highlights: &[Highlight],
    style: &HighlightStyle,
) -> Result<Vec<u8>, HighlightError> {
    let pages = page_ids(&doc);
    let mut opacity_states: HashMap<ObjectId, Vec<u8>> = HashMap::new();
    let mut drawn = 0;

    for highlight in highlights {
        let Some(&page_id) = pages.get(highlight.page_index) else {
            tracing::debug!(
                "Skipping highlight for page {} (document has {} pages)",
                highlight.page_index,
                pages.len()
            );
            continue;
        };
        if highlight.rects.is_empty() {
            continue;
        }

        let gs_name = match opacity_states.get(&page_id) {
            Some(name) => name.clone(),
            None => {
                let name = add_opacity_state(&mut doc, page_id, style.opacity)?;
                isolate_page_content(&mut doc, page_id)?;
                opacity_states.insert(page_id, name.clone());
                name
            }
        };

        let page_height = media_box(&doc, page_id).height();
        let content = highlight_content(&highlight.rects, page_height, &gs_name, style)?;
        let content_id = doc.add_object(Stream::new(Dictionary::new(), content));
        append_page_content(&mut doc, page_id, content_id)?;
        drawn += highlight.rects.len();
    }

    tracing::info!(
        "Drew {} highlight rectangles on {} pages",
        drawn,
        opacity_states.len()
    );

    let mut output = Vec::new();
    doc.save_to(&mut output)
        .map_err(|e| HighlightError::SerializationFailure(e.to_string()))?;

    Ok(output)
}

fn highlight_content(
    rects: &[Rectangle],
    page_height: f64,
    gs_name: &[u8],
    style: &HighlightStyle,
) -> Result<Vec<u8>, HighlightError> {
    let (r, g, b) = style.color;
    let mut operations = vec![
        Operation::new("q", vec![]),
        Operation::new("gs", vec![Object::Name(gs_name.to_vec())]),
        Operation::new(
            "rg",
            vec![Object::Real(r), Object::Real(g), Object::Real(b)],
        ),
    ];

    for rect in rects {
        // Drawing space is bottom-up
        let x = rect.left;
        let y = page_height - rect.top - rect.height;
        operations.push(Operation::new(
            "re",
            vec![
                Object::Real(x as f32),
                Object::Real(y as f32),
                Object::Real(rect.width as f32),
                Object::Real(rect.height as f32),
            ],
        ));
        operations.push(Operation::new("f", vec![]));
    }
    operations.push(Operation::new("Q", vec![]));

    Content { operations }
        .encode()
        .map_err(|e| HighlightError::SerializationFailure(e.to_string()))
}

/// Register a fill-opacity graphics state on the page and return its name.
///
/// The page gets its own copy of the (possibly inherited or shared)
/// resource dictionary so other pages are unaffected.
fn add_opacity_state(
    doc: &mut Document,
    page_id: ObjectId,
    opacity: f32,
) -> Result<Vec<u8>, HighlightError> {
    let mut resources = page_resources(doc, page_id).cloned().unwrap_or_default();
    let mut ext_gstates = resources
        .get(b"ExtGState")
        .ok()
        .and_then(|obj| resolve_dict(doc, obj))
        .cloned()
        .unwrap_or_default();

    let mut name = b"HighlightGS".to_vec();
    let mut suffix = 1;
    while ext_gstates.has(&name) {
        name = format!("HighlightGS{}", suffix).into_bytes();
        suffix += 1;
    }

    let gs_id = doc.add_object(dictionary! {
        "Type" => "ExtGState",
        "ca" => Object::Real(opacity),
        "CA" => Object::Real(opacity),
    });
    ext_gstates.set(name.clone(), Object::Reference(gs_id));
    resources.set("ExtGState", Object::Dictionary(ext_gstates));

    page_dict_mut(doc, page_id)?.set("Resources", Object::Dictionary(resources));
    Ok(name)
}

fn page_dict_mut(doc: &mut Document, page_id: ObjectId) -> Result<&mut Dictionary, HighlightError> {
    doc.get_object_mut(page_id)
        .and_then(Object::as_dict_mut)
        .map_err(|e| HighlightError::UnreadableDocument(e.to_string()))
}

/// Current `/Contents` of a page as a list of stream references.
fn content_refs(doc: &Document, page_id: ObjectId) -> Result<Vec<Object>, HighlightError> {
    let page = doc
        .get_dictionary(page_id)
        .map_err(|e| HighlightError::UnreadableDocument(e.to_string()))?;

    Ok(match page.get(b"Contents") {
        Ok(Object::Reference(id)) => match doc.get_object(*id) {
            Ok(Object::Array(parts)) => parts.clone(),
            _ => vec![Object::Reference(*id)],
        },
        Ok(Object::Array(parts)) => parts.clone(),
        Ok(other) => match resolve(doc, other) {
            Some(Object::Stream(stream)) => {
                // A direct stream cannot live in a page dictionary; hoist it
                vec![Object::Stream(stream.clone())]
            }
            _ => Vec::new(),
        },
        Err(_) => Vec::new(),
    })
}

/// Wrap the existing content in `q ... Q` so drawing starts from the default state.
fn isolate_page_content(doc: &mut Document, page_id: ObjectId) -> Result<(), HighlightError> {
    let existing = content_refs(doc, page_id)?;
    if existing.is_empty() {
        return Ok(());
    }

    let save_id = doc.add_object(Stream::new(Dictionary::new(), b"q\n".to_vec()));
    let restore_id = doc.add_object(Stream::new(Dictionary::new(), b"\nQ\n".to_vec()));

    let mut contents = vec![Object::Reference(save_id)];
    for part in existing {
        match part {
            Object::Stream(stream) => contents.push(Object::Reference(doc.add_object(stream))),
            other => contents.push(other),
        }
    }
    contents.push(Object::Reference(restore_id));

    page_dict_mut(doc, page_id)?.set("Contents", Object::Array(contents));
    Ok(())
}

fn append_page_content(
    doc: &mut Document,
    page_id: ObjectId,
    content_id: ObjectId,
) -> Result<(), HighlightError> {
    let mut contents = content_refs(doc, page_id)?;
    contents.push(Object::Reference(content_id));
    page_dict_mut(doc, page_id)?.set("Contents", Object::Array(contents));
    Ok(())
}
