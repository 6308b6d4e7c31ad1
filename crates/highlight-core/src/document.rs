//! Document loading and page-tree helpers on top of lopdf

use crate::error::HighlightError;
use crate::geometry::{PageBox, Viewport};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};

/// Parent chains and reference chains longer than this are treated as cycles.
const MAX_RESOLVE_DEPTH: usize = 32;

/// US Letter, used when a page tree carries no MediaBox at all.
const DEFAULT_MEDIA_BOX: PageBox = PageBox {
    x0: 0.0,
    y0: 0.0,
    x1: 612.0,
    y1: 792.0,
};

/// Parse PDF bytes into a fresh document owned by the caller.
///
/// Encrypted documents are decrypted when the user password is empty and
/// rejected otherwise.
pub fn load_document(bytes: &[u8]) -> Result<Document, HighlightError> {
    let mut doc =
        Document::load_mem(bytes).map_err(|e| HighlightError::UnreadableDocument(e.to_string()))?;

    // Permission-only encryption opens with the empty user password
    if doc.is_encrypted() {
        doc.decrypt("").map_err(|e| {
            HighlightError::UnreadableDocument(format!("document is encrypted: {}", e))
        })?;
        tracing::debug!("Decrypted document with the empty user password");
    }

    Ok(doc)
}

/// Page object ids in page order.
pub fn page_ids(doc: &Document) -> Vec<ObjectId> {
    doc.get_pages().into_values().collect()
}

/// Follow indirect references until a direct object is reached.
pub fn resolve<'a>(doc: &'a Document, obj: &'a Object) -> Option<&'a Object> {
    let mut current = obj;
    for _ in 0..MAX_RESOLVE_DEPTH {
        match current {
            Object::Reference(id) => current = doc.get_object(*id).ok()?,
            other => return Some(other),
        }
    }
    None
}

pub fn resolve_dict<'a>(doc: &'a Document, obj: &'a Object) -> Option<&'a Dictionary> {
    resolve(doc, obj)?.as_dict().ok()
}

/// Look up `key` on the page, falling back to its ancestors in the page tree.
pub fn resolve_inherited<'a>(
    doc: &'a Document,
    page_id: ObjectId,
    key: &[u8],
) -> Option<&'a Object> {
    let mut node_id = page_id;
    for _ in 0..MAX_RESOLVE_DEPTH {
        let dict = doc.get_dictionary(node_id).ok()?;
        if let Ok(value) = dict.get(key) {
            return resolve(doc, value);
        }
        match dict.get(b"Parent") {
            Ok(Object::Reference(parent_id)) => node_id = *parent_id,
            _ => return None,
        }
    }
    None
}

pub fn object_to_f64(obj: &Object) -> Option<f64> {
    match obj {
        Object::Integer(i) => Some(*i as f64),
        Object::Real(f) => Some(*f as f64),
        _ => None,
    }
}

/// Numeric operands as f64, or `None` if any operand is not a number.
pub fn numbers(doc: &Document, objects: &[Object]) -> Option<Vec<f64>> {
    objects
        .iter()
        .map(|obj| resolve(doc, obj).and_then(object_to_f64))
        .collect()
}

fn page_box(doc: &Document, page_id: ObjectId, key: &[u8]) -> Option<PageBox> {
    let array = resolve_inherited(doc, page_id, key)?.as_array().ok()?;
    match numbers(doc, array)?.as_slice() {
        [x0, y0, x1, y1] => Some(PageBox::new(*x0, *y0, *x1, *y1)),
        _ => None,
    }
}

pub fn media_box(doc: &Document, page_id: ObjectId) -> PageBox {
    page_box(doc, page_id, b"MediaBox").unwrap_or(DEFAULT_MEDIA_BOX)
}

/// The visible region of the page: CropBox clipped to MediaBox.
pub fn view_box(doc: &Document, page_id: ObjectId) -> PageBox {
    let media = media_box(doc, page_id);
    let Some(crop) = page_box(doc, page_id, b"CropBox") else {
        return media;
    };

    let x0 = crop.x0.max(media.x0);
    let y0 = crop.y0.max(media.y0);
    let x1 = crop.x1.min(media.x1);
    let y1 = crop.y1.min(media.y1);
    if x0 >= x1 || y0 >= y1 {
        return media;
    }
    PageBox::new(x0, y0, x1, y1)
}

pub fn rotation(doc: &Document, page_id: ObjectId) -> i64 {
    match resolve_inherited(doc, page_id, b"Rotate") {
        Some(Object::Integer(degrees)) if degrees % 90 == 0 => *degrees,
        _ => 0,
    }
}

/// The page's viewport at scale 1.0.
pub fn page_viewport(doc: &Document, page_id: ObjectId) -> Viewport {
    Viewport::new(view_box(doc, page_id), rotation(doc, page_id), 1.0)
}

pub fn page_resources(doc: &Document, page_id: ObjectId) -> Option<&Dictionary> {
    resolve_inherited(doc, page_id, b"Resources")?.as_dict().ok()
}

/// Decode a stream, decompressing if it declares a filter.
pub fn stream_content(stream: &Stream) -> Result<Vec<u8>, HighlightError> {
    if stream.dict.get(b"Filter").is_ok() {
        stream.decompressed_content().map_err(|e| {
            HighlightError::UnreadableDocument(format!("failed to decompress stream: {}", e))
        })
    } else {
        Ok(stream.content.clone())
    }
}

/// Concatenated content streams of a page. A page without `/Contents` is empty.
pub fn page_content(doc: &Document, page_id: ObjectId) -> Result<Vec<u8>, HighlightError> {
    let page = doc
        .get_dictionary(page_id)
        .map_err(|e| HighlightError::UnreadableDocument(e.to_string()))?;

    let Ok(contents) = page.get(b"Contents") else {
        return Ok(Vec::new());
    };

    let unreadable = |what: &str| HighlightError::UnreadableDocument(format!("/Contents {}", what));

    match resolve(doc, contents).ok_or_else(|| unreadable("cannot be resolved"))? {
        Object::Stream(stream) => stream_content(stream),
        Object::Array(parts) => {
            let mut content = Vec::new();
            for part in parts {
                let stream = resolve(doc, part)
                    .and_then(|obj| obj.as_stream().ok())
                    .ok_or_else(|| unreadable("array item is not a stream"))?;
                if !content.is_empty() {
                    content.push(b'\n');
                }
                content.extend_from_slice(&stream_content(stream)?);
            }
            Ok(content)
        }
        _ => Err(unreadable("is not a stream or array")),
    }
}
