//! Page text layer
//!
//! Interprets a page's content stream (and any form XObjects it paints) and
//! emits one [`TextRun`] per text-showing operator, with the run's placement
//! in PDF user space. Marked-content operators are reported as separate items
//! so consumers can tell them apart from text.

use crate::document::{
    numbers, object_to_f64, page_content, page_resources, resolve, resolve_dict, stream_content,
};
use crate::error::HighlightError;
use crate::fonts::Font;
use crate::geometry::Matrix;
use lopdf::content::Content;
use lopdf::{Dictionary, Document, Object, ObjectId};
use std::collections::HashMap;
use std::rc::Rc;

/// Form XObjects nested deeper than this are not painted.
const MAX_FORM_DEPTH: usize = 8;

/// A `TJ` gap wider than this fraction of an em reads as a word break.
const SPACE_GAP_EM: f64 = 0.2;

/// A decoded text fragment and its placement in user space.
#[derive(Debug, Clone, PartialEq)]
pub struct TextRun {
    pub text: String,
    /// Advance width in user-space units
    pub width: f64,
    /// Glyph height in user-space units
    pub height: f64,
    /// Maps the run's text space (unit em, baseline origin) to user space
    pub transform: Matrix,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TextLayerItem {
    Run(TextRun),
    BeginMarkedContent { tag: String },
    EndMarkedContent,
}

impl TextLayerItem {
    pub fn as_run(&self) -> Option<&TextRun> {
        match self {
            TextLayerItem::Run(run) => Some(run),
            _ => None,
        }
    }
}

/// Iterate the text runs of a page, skipping marker items.
pub fn text_runs(items: &[TextLayerItem]) -> impl Iterator<Item = &TextRun> {
    items.iter().filter_map(TextLayerItem::as_run)
}

#[derive(Debug, Clone)]
struct GraphicsState {
    ctm: Matrix,
    font: Rc<Font>,
    font_size: f64,
    char_spacing: f64,
    word_spacing: f64,
    horizontal_scale: f64,
    leading: f64,
    rise: f64,
}

impl Default for GraphicsState {
    fn default() -> Self {
        Self {
            ctm: Matrix::IDENTITY,
            font: Rc::new(Font::default()),
            font_size: 0.0,
            char_spacing: 0.0,
            word_spacing: 0.0,
            horizontal_scale: 1.0,
            leading: 0.0,
            rise: 0.0,
        }
    }
}

enum Shown<'o> {
    Glyphs(&'o [u8]),
    Adjust(f64),
}

struct Interpreter<'a> {
    doc: &'a Document,
    items: Vec<TextLayerItem>,
    fonts: HashMap<ObjectId, Rc<Font>>,
    /// Forms currently being painted, outermost first
    painting: Vec<ObjectId>,
}

/// Text-layer items of one page, in content-stream order.
pub fn page_items(doc: &Document, page_id: ObjectId) -> Result<Vec<TextLayerItem>, HighlightError> {
    let content = page_content(doc, page_id)?;
    let mut interpreter = Interpreter {
        doc,
        items: Vec::new(),
        fonts: HashMap::new(),
        painting: Vec::new(),
    };
    interpreter.run(
        &content,
        page_resources(doc, page_id),
        GraphicsState::default(),
        0,
    )?;
    Ok(interpreter.items)
}

fn name_operand(operands: &[Object], index: usize) -> Option<&[u8]> {
    match operands.get(index) {
        Some(Object::Name(name)) => Some(name.as_slice()),
        _ => None,
    }
}

impl<'a> Interpreter<'a> {
    fn run(
        &mut self,
        content: &[u8],
        resources: Option<&'a Dictionary>,
        base: GraphicsState,
        depth: usize,
    ) -> Result<(), HighlightError> {
        let content = Content::decode(content).map_err(|e| {
            HighlightError::UnreadableDocument(format!("invalid content stream: {}", e))
        })?;

        let mut state = base;
        let mut saved: Vec<GraphicsState> = Vec::new();
        let mut text_matrix = Matrix::IDENTITY;
        let mut line_matrix = Matrix::IDENTITY;

        for op in &content.operations {
            let operands = op.operands.as_slice();
            let doc = self.doc;
            let nums = || numbers(doc, operands).unwrap_or_default();

            match op.operator.as_str() {
                "q" => saved.push(state.clone()),
                "Q" => {
                    if let Some(previous) = saved.pop() {
                        state = previous;
                    }
                }
                "cm" => {
                    if let Some(m) = Matrix::from_operands(&nums()) {
                        state.ctm = state.ctm.then_apply(&m);
                    }
                }
                "BT" => {
                    text_matrix = Matrix::IDENTITY;
                    line_matrix = Matrix::IDENTITY;
                }
                "Tm" => {
                    if let Some(m) = Matrix::from_operands(&nums()) {
                        text_matrix = m;
                        line_matrix = m;
                    }
                }
                "Td" | "TD" => {
                    if let [tx, ty] = nums().as_slice() {
                        if op.operator == "TD" {
                            state.leading = -ty;
                        }
                        line_matrix = line_matrix.then_apply(&Matrix::translation(*tx, *ty));
                        text_matrix = line_matrix;
                    }
                }
                "T*" => {
                    line_matrix = line_matrix.then_apply(&Matrix::translation(0.0, -state.leading));
                    text_matrix = line_matrix;
                }
                "TL" => {
                    if let [leading] = nums().as_slice() {
                        state.leading = *leading;
                    }
                }
                "Tc" => {
                    if let [spacing] = nums().as_slice() {
                        state.char_spacing = *spacing;
                    }
                }
                "Tw" => {
                    if let [spacing] = nums().as_slice() {
                        state.word_spacing = *spacing;
                    }
                }
                "Tz" => {
                    if let [scale] = nums().as_slice() {
                        state.horizontal_scale = scale / 100.0;
                    }
                }
                "Ts" => {
                    if let [rise] = nums().as_slice() {
                        state.rise = *rise;
                    }
                }
                "Tf" => {
                    if let Some(name) = name_operand(operands, 0) {
                        state.font = self.font(resources, name);
                    }
                    if let Some(size) = operands
                        .get(1)
                        .and_then(|obj| resolve(self.doc, obj))
                        .and_then(object_to_f64)
                    {
                        state.font_size = size;
                    }
                }
                "Tj" => {
                    if let Some(Object::String(bytes, _)) = operands.first() {
                        self.show(&state, &mut text_matrix, &[Shown::Glyphs(bytes)]);
                    }
                }
                "'" => {
                    line_matrix = line_matrix.then_apply(&Matrix::translation(0.0, -state.leading));
                    text_matrix = line_matrix;
                    if let Some(Object::String(bytes, _)) = operands.first() {
                        self.show(&state, &mut text_matrix, &[Shown::Glyphs(bytes)]);
                    }
                }
                "\"" => {
                    if let (Some(aw), Some(ac)) = (
                        operands.first().and_then(object_to_f64),
                        operands.get(1).and_then(object_to_f64),
                    ) {
                        state.word_spacing = aw;
                        state.char_spacing = ac;
                    }
                    line_matrix = line_matrix.then_apply(&Matrix::translation(0.0, -state.leading));
                    text_matrix = line_matrix;
                    if let Some(Object::String(bytes, _)) = operands.get(2) {
                        self.show(&state, &mut text_matrix, &[Shown::Glyphs(bytes)]);
                    }
                }
                "TJ" => {
                    if let Some(Object::Array(elements)) = operands.first() {
                        let shown: Vec<Shown> = elements
                            .iter()
                            .filter_map(|element| match element {
                                Object::String(bytes, _) => Some(Shown::Glyphs(bytes)),
                                other => object_to_f64(other).map(Shown::Adjust),
                            })
                            .collect();
                        self.show(&state, &mut text_matrix, &shown);
                    }
                }
                "BMC" | "BDC" => {
                    let tag = name_operand(operands, 0)
                        .map(|name| String::from_utf8_lossy(name).into_owned())
                        .unwrap_or_default();
                    self.items.push(TextLayerItem::BeginMarkedContent { tag });
                }
                "EMC" => self.items.push(TextLayerItem::EndMarkedContent),
                "Do" => {
                    if let Some(name) = name_operand(operands, 0) {
                        self.paint_form(resources, name, &state, depth)?;
                    }
                }
                _ => {}
            }
        }

        Ok(())
    }

    fn font(&mut self, resources: Option<&'a Dictionary>, name: &[u8]) -> Rc<Font> {
        let font_obj = resources
            .and_then(|res| res.get(b"Font").ok())
            .and_then(|fonts| resolve_dict(self.doc, fonts))
            .and_then(|fonts| fonts.get(name).ok());

        match font_obj {
            Some(Object::Reference(id)) => {
                if let Some(font) = self.fonts.get(id) {
                    return Rc::clone(font);
                }
                let font = match self.doc.get_dictionary(*id) {
                    Ok(dict) => Rc::new(Font::from_dict(self.doc, dict)),
                    Err(_) => Rc::new(Font::default()),
                };
                self.fonts.insert(*id, Rc::clone(&font));
                font
            }
            Some(Object::Dictionary(dict)) => Rc::new(Font::from_dict(self.doc, dict)),
            _ => {
                tracing::debug!(
                    "Font {} not found in resources",
                    String::from_utf8_lossy(name)
                );
                Rc::new(Font::default())
            }
        }
    }

    /// Emit one run for a text-showing operator and advance the text matrix.
    fn show(&mut self, state: &GraphicsState, text_matrix: &mut Matrix, shown: &[Shown]) {
        let font_size = state.font_size;
        let h_scale = state.horizontal_scale;
        let text_state = Matrix::new(font_size * h_scale, 0.0, 0.0, font_size, 0.0, state.rise);

        let start = *text_matrix;
        let transform = state.ctm.then_apply(&start.then_apply(&text_state));
        let user_scale = state.ctm.then_apply(&start).x_scale();

        let mut text = String::new();
        let mut advance = 0.0;

        for part in shown {
            match part {
                Shown::Glyphs(bytes) => {
                    for code in state.font.codes(bytes) {
                        text.push_str(&state.font.decode(code));
                        let mut tx = state.font.width(code) / 1000.0 * font_size + state.char_spacing;
                        if state.font.is_word_space(code) {
                            tx += state.word_spacing;
                        }
                        tx *= h_scale;
                        advance += tx;
                        *text_matrix = text_matrix.then_apply(&Matrix::translation(tx, 0.0));
                    }
                }
                Shown::Adjust(amount) => {
                    let em = -amount / 1000.0;
                    let tx = em * font_size * h_scale;
                    advance += tx;
                    *text_matrix = text_matrix.then_apply(&Matrix::translation(tx, 0.0));
                    if em > SPACE_GAP_EM && !text.is_empty() && !text.ends_with(' ') {
                        text.push(' ');
                    }
                }
            }
        }

        if text.is_empty() {
            return;
        }

        self.items.push(TextLayerItem::Run(TextRun {
            text,
            width: advance * user_scale,
            height: transform.y_scale(),
            transform,
        }));
    }

    fn paint_form(
        &mut self,
        resources: Option<&'a Dictionary>,
        name: &[u8],
        state: &GraphicsState,
        depth: usize,
    ) -> Result<(), HighlightError> {
        if depth >= MAX_FORM_DEPTH {
            tracing::debug!("Form XObject nesting exceeds {}, skipping", MAX_FORM_DEPTH);
            return Ok(());
        }

        let doc = self.doc;
        let Some(entry) = resources
            .and_then(|res| res.get(b"XObject").ok())
            .and_then(|xobjects| resolve_dict(doc, xobjects))
            .and_then(|xobjects| xobjects.get(name).ok())
        else {
            return Ok(());
        };
        let Some(stream) = resolve(doc, entry).and_then(|obj| obj.as_stream().ok()) else {
            return Ok(());
        };

        let form_id = match entry {
            Object::Reference(id) => Some(*id),
            _ => None,
        };
        if let Some(id) = form_id {
            if self.painting.contains(&id) {
                tracing::debug!("Form {:?} paints itself, skipping", id);
                return Ok(());
            }
        }

        let is_form = matches!(stream.dict.get(b"Subtype"), Ok(Object::Name(n)) if n == b"Form");
        if !is_form {
            return Ok(());
        }

        let matrix = stream
            .dict
            .get(b"Matrix")
            .ok()
            .and_then(|obj| resolve(doc, obj))
            .and_then(|obj| obj.as_array().ok())
            .and_then(|values| numbers(doc, values))
            .and_then(|values| Matrix::from_operands(&values))
            .unwrap_or(Matrix::IDENTITY);

        let form_resources = stream
            .dict
            .get(b"Resources")
            .ok()
            .and_then(|obj| resolve_dict(doc, obj))
            .or(resources);

        let mut form_state = state.clone();
        form_state.ctm = state.ctm.then_apply(&matrix);

        let content = stream_content(stream)?;
        if let Some(id) = form_id {
            self.painting.push(id);
        }
        let result = self.run(&content, form_resources, form_state, depth + 1);
        if form_id.is_some() {
            self.painting.pop();
        }
        result
    }
}
