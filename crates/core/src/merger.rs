//! Document merging.
//!
//! Turns an ordered selection of documents into one working text. Each document is read and
//! converted on its own; a document that cannot be read or converted is replaced by a
//! placeholder fragment describing what went wrong, and the remaining documents are still
//! processed. Documents are handled sequentially, in selection order.

use crate::document::{Fragment, MergeResult, SourceDocument};
use crate::error::DocumentError;
use crate::pdf::extract_pdf_text;
use crate::{PipelineError, PipelineResult};
use vaultmd_files::{DocumentKind, FileAccess, ScopedAccess};

/// Merges documents read through a file-access collaborator.
#[derive(Debug)]
pub struct DocumentMerger<'a, A: FileAccess + ?Sized> {
    access: &'a A,
}

impl<'a, A: FileAccess + ?Sized> DocumentMerger<'a, A> {
    pub fn new(access: &'a A) -> Self {
        Self { access }
    }

    /// Merges `documents` into one text, one fragment per document, in order.
    ///
    /// Each call recomputes everything from the documents; nothing is cached between calls.
    ///
    /// # Errors
    ///
    /// Returns `PipelineError::NoFilesSelected` if `documents` is empty. Per-document failures
    /// are never returned as errors; they become placeholder fragments.
    pub fn merge(&self, documents: &[SourceDocument]) -> PipelineResult<MergeResult> {
        if documents.is_empty() {
            return Err(PipelineError::NoFilesSelected);
        }

        let fragments = documents
            .iter()
            .map(|document| self.fragment_for(document))
            .collect();
        let result = MergeResult::from_fragments(fragments);

        tracing::info!(
            documents = documents.len(),
            placeholders = result.placeholder_count(),
            "merged documents"
        );

        Ok(result)
    }

    fn fragment_for(&self, document: &SourceDocument) -> Fragment {
        let name = document.name().as_str();
        match self.extract(document) {
            Ok(text) => Fragment::extracted(name, text),
            Err(error) => {
                tracing::warn!("document {} replaced by placeholder: {}", name, error);
                Fragment::placeholder(name, error)
            }
        }
    }

    fn extract(&self, document: &SourceDocument) -> Result<String, DocumentError> {
        let name = document.name().as_str().to_string();

        if document.kind() == DocumentKind::Unsupported {
            return Err(DocumentError::UnsupportedFileType { name });
        }

        let bytes = self.read(document).map_err(|e| DocumentError::FileAccessDenied {
            name: name.clone(),
            reason: e.to_string(),
        })?;

        match document.kind() {
            DocumentKind::Text => {
                String::from_utf8(bytes).map_err(|_| DocumentError::FileDecodeFailed { name })
            }
            DocumentKind::Pdf => {
                let text = extract_pdf_text(&bytes).map_err(|e| DocumentError::PdfUnreadable {
                    name: name.clone(),
                    reason: e.to_string(),
                })?;
                if text.trim().is_empty() {
                    return Err(DocumentError::NoTextExtracted { name });
                }
                Ok(text)
            }
            DocumentKind::Unsupported => Err(DocumentError::UnsupportedFileType { name }),
        }
    }

    /// Reads the document's bytes inside a scoped access that ends before this returns.
    fn read(&self, document: &SourceDocument) -> std::io::Result<Vec<u8>> {
        let scope = ScopedAccess::begin(self.access, document.handle())?;
        scope.read()
    }
}
