//! Source documents and merge results.

use crate::constants::MERGE_SEPARATOR;
use crate::error::DocumentError;
use crate::{PipelineError, PipelineResult};
use std::path::Path;
use vaultmd_files::{DocumentHandle, DocumentKind};
use vaultmd_types::NonEmptyText;

/// A user-chosen document, not yet read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceDocument {
    name: NonEmptyText,
    kind: DocumentKind,
    handle: DocumentHandle,
}

impl SourceDocument {
    pub fn new(name: NonEmptyText, kind: DocumentKind, handle: DocumentHandle) -> Self {
        Self { name, kind, handle }
    }

    /// Builds a document for a file on disk, naming it after the last path component and
    /// declaring its kind from the extension (or magic bytes when there is none).
    ///
    /// # Errors
    ///
    /// Returns `PipelineError::InvalidInput` if the path has no usable file name.
    pub fn from_path(path: &Path) -> PipelineResult<Self> {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .and_then(|n| NonEmptyText::new(n).ok())
            .ok_or_else(|| {
                PipelineError::InvalidInput(format!("no file name in path: {}", path.display()))
            })?;

        Ok(Self {
            name,
            kind: DocumentKind::detect_path(path),
            handle: DocumentHandle::new(path),
        })
    }

    pub fn name(&self) -> &NonEmptyText {
        &self.name
    }

    pub fn kind(&self) -> DocumentKind {
        self.kind
    }

    pub fn handle(&self) -> &DocumentHandle {
        &self.handle
    }
}

/// One document's contribution to the merged text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fragment {
    name: String,
    text: String,
    error: Option<DocumentError>,
}

impl Fragment {
    pub(crate) fn extracted(name: &str, text: String) -> Self {
        Self {
            name: name.to_string(),
            text,
            error: None,
        }
    }

    /// A placeholder fragment; its text is the error's rendered message.
    pub(crate) fn placeholder(name: &str, error: DocumentError) -> Self {
        Self {
            name: name.to_string(),
            text: error.to_string(),
            error: Some(error),
        }
    }

    /// Display name of the source document.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn error(&self) -> Option<&DocumentError> {
        self.error.as_ref()
    }

    pub fn is_placeholder(&self) -> bool {
        self.error.is_some()
    }
}

/// Ordered fragments, one per input document, and their joined text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeResult {
    fragments: Vec<Fragment>,
    merged_text: String,
}

impl MergeResult {
    pub(crate) fn from_fragments(fragments: Vec<Fragment>) -> Self {
        let merged_text = fragments
            .iter()
            .map(Fragment::text)
            .collect::<Vec<_>>()
            .join(MERGE_SEPARATOR);
        Self {
            fragments,
            merged_text,
        }
    }

    pub fn fragments(&self) -> &[Fragment] {
        &self.fragments
    }

    pub fn merged_text(&self) -> &str {
        &self.merged_text
    }

    pub fn into_merged_text(self) -> String {
        self.merged_text
    }

    pub fn placeholder_count(&self) -> usize {
        self.fragments.iter().filter(|f| f.is_placeholder()).count()
    }
}
