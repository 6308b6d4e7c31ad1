//! JSON command boundary
//!
//! Hosts that talk JSON (a worker, a CLI reading stdin) send a
//! [`HighlightCommand`] and get a [`ProcessResult`] back; PDFs travel as
//! base64 in both directions.

use crate::annotate::{highlight_document, HighlightStyle};
use crate::document::{load_document, page_ids};
use crate::error::HighlightError;
use crate::extract::{extract_document_text, is_image_only};
use crate::locate::find_document_highlights;
use crate::model::Highlight;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use lopdf::Document;
use serde::{Deserialize, Serialize};
use std::time::Instant;

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
pub enum HighlightCommand {
    Extract {
        /// Base64-encoded PDF
        file: String,
    },
    Locate {
        file: String,
        #[serde(rename = "keyPhrases")]
        key_phrases: Vec<String>,
    },
    Annotate {
        file: String,
        highlights: Vec<Highlight>,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessResult {
    pub success: bool,
    /// JSON for Extract and Locate, base64-encoded PDF for Annotate
    pub data: Option<String>,
    pub error: Option<String>,
    pub metrics: Option<ProcessMetrics>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessMetrics {
    pub input_size_bytes: usize,
    pub output_size_bytes: usize,
    pub page_count: u32,
    pub processing_time_ms: u64,
}

/// Payload of a successful Extract command.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedText {
    pub text: String,
    pub image_only: bool,
}

impl ProcessResult {
    fn failure(error: HighlightError) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.to_string()),
            metrics: None,
        }
    }
}

/// Run a command to completion. Failures are reported in the result, never panics.
pub fn execute(command: HighlightCommand) -> ProcessResult {
    let start = Instant::now();

    match run(command) {
        Ok((data, input_size_bytes, page_count)) => {
            let metrics = ProcessMetrics {
                input_size_bytes,
                output_size_bytes: data.len(),
                page_count,
                processing_time_ms: start.elapsed().as_millis() as u64,
            };
            tracing::debug!(
                "Command finished in {}ms ({} -> {} bytes)",
                metrics.processing_time_ms,
                metrics.input_size_bytes,
                metrics.output_size_bytes
            );
            ProcessResult {
                success: true,
                data: Some(data),
                error: None,
                metrics: Some(metrics),
            }
        }
        Err(e) => {
            tracing::warn!("Command failed: {}", e);
            ProcessResult::failure(e)
        }
    }
}

/// Parse a JSON command and run it.
pub fn execute_json(json: &str) -> ProcessResult {
    match serde_json::from_str::<HighlightCommand>(json) {
        Ok(command) => execute(command),
        Err(e) => ProcessResult::failure(HighlightError::InvalidInput(e.to_string())),
    }
}

fn decode_file(file: &str) -> Result<Vec<u8>, HighlightError> {
    BASE64
        .decode(file.trim())
        .map_err(|e| HighlightError::InvalidInput(format!("file is not valid base64: {}", e)))
}

fn to_json<T: Serialize>(value: &T) -> Result<String, HighlightError> {
    serde_json::to_string(value).map_err(|e| HighlightError::SerializationFailure(e.to_string()))
}

/// Decode and parse the input once; returns it with its size and page count.
fn load_file(file: &str) -> Result<(Document, usize, u32), HighlightError> {
    let bytes = decode_file(file)?;
    let doc = load_document(&bytes)?;
    let page_count = page_ids(&doc).len() as u32;
    Ok((doc, bytes.len(), page_count))
}

fn run(command: HighlightCommand) -> Result<(String, usize, u32), HighlightError> {
    match command {
        HighlightCommand::Extract { file } => {
            let (doc, input_size, page_count) = load_file(&file)?;
            let text = extract_document_text(&doc)?;
            let payload = ExtractedText {
                image_only: is_image_only(&text),
                text,
            };
            Ok((to_json(&payload)?, input_size, page_count))
        }
        HighlightCommand::Locate { file, key_phrases } => {
            let (doc, input_size, page_count) = load_file(&file)?;
            let highlights = find_document_highlights(&doc, &key_phrases[..])?;
            Ok((to_json(&highlights)?, input_size, page_count))
        }
        HighlightCommand::Annotate { file, highlights } => {
            let (doc, input_size, page_count) = load_file(&file)?;
            let output = highlight_document(doc, &highlights, &HighlightStyle::default())?;
            Ok((BASE64.encode(output), input_size, page_count))
        }
    }
}
