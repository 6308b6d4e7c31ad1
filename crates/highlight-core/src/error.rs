use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum HighlightError {
    #[error("Failed to read PDF: {0}")]
    UnreadableDocument(String),

    /// The document decoded but has no text layer (e.g. a scanned PDF).
    /// Raised by callers after inspecting extracted text, never by the extractor.
    #[error("PDF has no extractable text; scanned documents are not supported")]
    ImageOnlyDocument,

    #[error("Failed to serialize PDF: {0}")]
    SerializationFailure(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}
