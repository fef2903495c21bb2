//! File-access collaborators and the scoped access guard.
//!
//! Two implementations of [`FileAccess`] are provided:
//!
//! - [`LocalFileAccess`] reads documents from the local filesystem by path.
//! - [`InMemoryFileAccess`] serves documents that were uploaded as bytes (for example through
//!   the REST service), keyed by handles it allocates itself.

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Opaque reference to a user-selected document.
///
/// For [`LocalFileAccess`] this is a filesystem path. For [`InMemoryFileAccess`] it is a key
/// allocated on upload.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DocumentHandle(PathBuf);

impl DocumentHandle {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self(path.into())
    }

    pub fn as_path(&self) -> &Path {
        &self.0
    }

    /// Last path component, used as the document's display name.
    pub fn file_name(&self) -> Option<&str> {
        self.0.file_name().and_then(|n| n.to_str())
    }
}

impl fmt::Display for DocumentHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.display())
    }
}

/// Source of raw document bytes.
///
/// Implementations must tolerate `end_scoped_access` being called exactly once for every
/// successful `begin_scoped_access`, whatever happened in between.
pub trait FileAccess: Send + Sync {
    /// Acquires whatever the platform requires before the document can be read.
    fn begin_scoped_access(&self, handle: &DocumentHandle) -> io::Result<()>;

    /// Releases the resource acquired by [`FileAccess::begin_scoped_access`].
    fn end_scoped_access(&self, handle: &DocumentHandle);

    /// Reads the full contents of the document.
    fn read(&self, handle: &DocumentHandle) -> io::Result<Vec<u8>>;
}

/// Guard holding scoped access to one document.
///
/// Access ends when the guard is dropped.
pub struct ScopedAccess<'a, A: FileAccess + ?Sized> {
    access: &'a A,
    handle: &'a DocumentHandle,
}

impl<'a, A: FileAccess + ?Sized> ScopedAccess<'a, A> {
    /// Begins scoped access to `handle`.
    ///
    /// # Errors
    ///
    /// Returns the collaborator's error if access cannot be acquired. Nothing is held in that
    /// case, so nothing is released.
    pub fn begin(access: &'a A, handle: &'a DocumentHandle) -> io::Result<Self> {
        access.begin_scoped_access(handle)?;
        Ok(Self { access, handle })
    }

    pub fn read(&self) -> io::Result<Vec<u8>> {
        self.access.read(self.handle)
    }
}

impl<A: FileAccess + ?Sized> Drop for ScopedAccess<'_, A> {
    fn drop(&mut self) {
        self.access.end_scoped_access(self.handle);
    }
}

/// Reads documents straight from the local filesystem.
#[derive(Debug, Default, Clone)]
pub struct LocalFileAccess;

impl LocalFileAccess {
    pub fn new() -> Self {
        Self
    }
}

impl FileAccess for LocalFileAccess {
    fn begin_scoped_access(&self, handle: &DocumentHandle) -> io::Result<()> {
        let metadata = fs::metadata(handle.as_path())?;
        if metadata.is_dir() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "Path is a directory",
            ));
        }
        tracing::debug!("began access to {}", handle);
        Ok(())
    }

    fn end_scoped_access(&self, handle: &DocumentHandle) {
        tracing::debug!("ended access to {}", handle);
    }

    fn read(&self, handle: &DocumentHandle) -> io::Result<Vec<u8>> {
        fs::read(handle.as_path())
    }
}

/// Serves uploaded documents held in memory.
#[derive(Debug, Default, Clone)]
pub struct InMemoryFileAccess {
    documents: HashMap<DocumentHandle, Vec<u8>>,
}

impl InMemoryFileAccess {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `bytes` and returns the handle to read them back.
    ///
    /// Handles are unique per upload, so two uploads sharing a name do not collide.
    pub fn insert(&mut self, name: &str, bytes: Vec<u8>) -> DocumentHandle {
        let handle = DocumentHandle::new(format!("upload-{}/{}", self.documents.len(), name));
        self.documents.insert(handle.clone(), bytes);
        handle
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

impl FileAccess for InMemoryFileAccess {
    fn begin_scoped_access(&self, handle: &DocumentHandle) -> io::Result<()> {
        if self.documents.contains_key(handle) {
            Ok(())
        } else {
            Err(io::Error::new(
                io::ErrorKind::NotFound,
                "Document was not uploaded",
            ))
        }
    }

    fn end_scoped_access(&self, _handle: &DocumentHandle) {}

    fn read(&self, handle: &DocumentHandle) -> io::Result<Vec<u8>> {
        self.documents.get(handle).cloned().ok_or_else(|| {
            io::Error::new(io::ErrorKind::NotFound, "Document was not uploaded")
        })
    }
}
