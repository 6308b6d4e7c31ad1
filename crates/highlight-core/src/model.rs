//! Highlight geometry shared by the locator and the annotator

use serde::{Deserialize, Serialize};

/// Axis-aligned box in page-native units with a top-left origin.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Rectangle {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl Rectangle {
    /// Rectangle at a display scale, for overlaying on a rendered page image.
    pub fn scaled(&self, factor: f64) -> Rectangle {
        Rectangle {
            left: self.left * factor,
            top: self.top * factor,
            width: self.width * factor,
            height: self.height * factor,
        }
    }
}

/// All matched rectangles of one page, in content-stream order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Highlight {
    /// 0-based page index
    pub page_index: usize,
    pub rects: Vec<Rectangle>,
}

impl Highlight {
    pub fn scaled(&self, factor: f64) -> Highlight {
        Highlight {
            page_index: self.page_index,
            rects: self.rects.iter().map(|r| r.scaled(factor)).collect(),
        }
    }

    pub fn to_json(highlights: &[Highlight]) -> Result<String, serde_json::Error> {
        serde_json::to_string(highlights)
    }

    pub fn from_json(json: &str) -> Result<Vec<Highlight>, serde_json::Error> {
        serde_json::from_str(json)
    }
}
