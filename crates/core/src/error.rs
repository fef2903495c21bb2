use crate::generation::GenerationError;
use crate::store::StoreError;

/// Per-document failures during a merge.
///
/// These never fail a merge. Each one is rendered (via `Display`) into the placeholder
/// fragment that takes the document's place in the merged text, so the messages below are
/// part of the merged-text format.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DocumentError {
    #[error("Error: {reason} for {name}")]
    FileAccessDenied { name: String, reason: String },
    #[error("Error reading file: {name}")]
    FileDecodeFailed { name: String },
    #[error("Error: Unsupported file type {name}")]
    UnsupportedFileType { name: String },
    #[error("Error: No text extracted from PDF {name}")]
    NoTextExtracted { name: String },
    #[error("Error: {reason} for {name}")]
    PdfUnreadable { name: String, reason: String },
}

/// Failures surfaced to the caller of the procedure pipeline.
///
/// Each variant renders as the single user-visible message for that failure.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("No files selected.")]
    NoFilesSelected,
    #[error("There is no merged text to process.")]
    NothingToProcess,
    #[error("document index {index} is out of range ({len} selected)")]
    DocumentIndexOutOfRange { index: usize, len: usize },
    #[error("AI service unavailable: {0}")]
    AiServiceUnavailable(String),
    #[error("AI generation failed: {0}")]
    AiGenerationFailed(#[source] GenerationError),
    #[error("Failed to save procedure: {0}")]
    PersistenceFailed(#[source] StoreError),
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

pub type PipelineResult<T> = std::result::Result<T, PipelineError>;
