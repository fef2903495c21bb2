//! Declared document kinds.

use std::path::Path;

/// How a document's bytes are turned into text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentKind {
    /// UTF-8 plain text
    Text,
    /// PDF with an extractable text layer
    Pdf,
    Unsupported,
}

impl DocumentKind {
    /// Classifies a file extension (case-insensitive, without the dot).
    pub fn from_extension(extension: &str) -> Self {
        match extension.to_ascii_lowercase().as_str() {
            "txt" | "text" | "md" => Self::Text,
            "pdf" => Self::Pdf,
            _ => Self::Unsupported,
        }
    }

    /// Classifies a file name by its extension; `None` when it has none.
    pub fn from_name(name: &str) -> Option<Self> {
        Path::new(name)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(Self::from_extension)
    }

    /// Classifies content by its magic bytes.
    ///
    /// This is best-effort: plain text has no signature, so only formats `infer` recognises as
    /// `text/*` are classified as text.
    pub fn sniff(bytes: &[u8]) -> Self {
        match infer::get(bytes) {
            Some(kind) => Self::from_mime(kind.mime_type()),
            None => Self::Unsupported,
        }
    }

    /// Declared kind for an uploaded document: extension first, content second.
    pub fn detect(name: &str, bytes: &[u8]) -> Self {
        Self::from_name(name).unwrap_or_else(|| Self::sniff(bytes))
    }

    /// Declared kind for a file on disk: extension first, then the file's magic bytes.
    pub fn detect_path(path: &Path) -> Self {
        if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
            return Self::from_extension(ext);
        }
        match infer::get_from_path(path) {
            Ok(Some(kind)) => Self::from_mime(kind.mime_type()),
            Ok(None) => Self::Unsupported,
            Err(e) => {
                tracing::debug!("could not sniff {}: {}", path.display(), e);
                Self::Unsupported
            }
        }
    }

    fn from_mime(mime: &str) -> Self {
        if mime == "application/pdf" {
            Self::Pdf
        } else if mime.starts_with("text/") {
            Self::Text
        } else {
            Self::Unsupported
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const PDF_MAGIC: &[u8] = b"%PDF-1.5\n%\xE2\xE3\xCF\xD3\n";

    #[test]
    fn extensions_are_case_insensitive() {
        assert_eq!(DocumentKind::from_extension("TXT"), DocumentKind::Text);
        assert_eq!(DocumentKind::from_extension("Pdf"), DocumentKind::Pdf);
        assert_eq!(DocumentKind::from_extension("docx"), DocumentKind::Unsupported);
    }

    #[test]
    fn from_name_without_extension_is_none() {
        assert_eq!(DocumentKind::from_name("README"), None);
        assert_eq!(DocumentKind::from_name("op-note.md"), Some(DocumentKind::Text));
    }

    #[test]
    fn detect_prefers_extension_over_content() {
        assert_eq!(DocumentKind::detect("scan.txt", PDF_MAGIC), DocumentKind::Text);
    }

    #[test]
    fn detect_sniffs_pdf_without_extension() {
        assert_eq!(DocumentKind::detect("scan", PDF_MAGIC), DocumentKind::Pdf);
        assert_eq!(DocumentKind::detect("blob", &[0x00, 0x01]), DocumentKind::Unsupported);
    }

    #[test]
    fn detect_path_sniffs_file_without_extension() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("scan");
        fs::write(&path, PDF_MAGIC).unwrap();

        assert_eq!(DocumentKind::detect_path(&path), DocumentKind::Pdf);
        assert_eq!(
            DocumentKind::detect_path(&temp.path().join("missing")),
            DocumentKind::Unsupported
        );
    }

    #[test]
    fn serialises_lowercase() {
        let json = serde_json::to_string(&DocumentKind::Pdf).unwrap();
        assert_eq!(json, "\"pdf\"");
    }
}
