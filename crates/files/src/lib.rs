//! VaultMD document access
//!
//! This crate is the file-access collaborator of the procedure pipeline. It knows how to obtain
//! the raw bytes behind a user-selected document and how to classify that document, and nothing
//! about what the bytes mean.
//!
//! ## Scoped access
//!
//! Every read is bracketed by "begin scoped access" / "end scoped access". Callers should not
//! pair these by hand; [`ScopedAccess`] begins access on construction and ends it when dropped,
//! so the resource is released on every exit path (read errors, decode errors, early returns):
//!
//! ```no_run
//! use vaultmd_files::{DocumentHandle, FileAccess, LocalFileAccess, ScopedAccess};
//!
//! # fn main() -> std::io::Result<()> {
//! let access = LocalFileAccess::new();
//! let handle = DocumentHandle::new("notes/appendectomy.txt");
//!
//! let scope = ScopedAccess::begin(&access, &handle)?;
//! let bytes = scope.read()?;
//! # let _ = bytes;
//! # Ok(())
//! # }
//! ```
//!
//! ## Document kinds
//!
//! [`DocumentKind`] is declared from the file extension, with magic-byte sniffing as the
//! fallback for files that have none.

mod access;
mod kind;

pub use access::{DocumentHandle, FileAccess, InMemoryFileAccess, LocalFileAccess, ScopedAccess};
pub use kind::DocumentKind;
