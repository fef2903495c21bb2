//! # VaultMD Core
//!
//! Core logic for turning clinician-selected documents into procedure documentation.
//!
//! The pipeline has three stages:
//! - **Merge**: read each selected document (plain text or PDF) through a
//!   [`FileAccess`](vaultmd_files::FileAccess) collaborator and join the extracted texts into one
//!   string. Unreadable documents become inline placeholders; they never fail the merge.
//! - **Generate**: send the (possibly hand-edited) merged text to a [`Generator`] inside a fixed
//!   prompt.
//! - **Save and present**: persist a [`ProcedureRecord`] through a [`RecordStore`] and split the
//!   model output into its labelled sections.
//!
//! [`ProcedureSession`] sequences these stages and holds the user-visible state.
//!
//! **No API concerns**: HTTP servers and command-line handling belong in the `vaultmd-run` and
//! `vaultmd-cli` binaries.

pub mod config;
pub mod constants;
pub mod document;
pub mod error;
pub mod generation;
pub mod merger;
mod pdf;
pub mod pipeline;
pub mod record;
pub mod sections;
pub mod store;

pub use config::{CoreConfig, GeneratorCommand};
pub use document::{Fragment, MergeResult, SourceDocument};
pub use error::{DocumentError, PipelineError, PipelineResult};
pub use generation::{build_prompt, CommandGenerator, GenerationError, GenerationResult, Generator};
pub use merger::DocumentMerger;
pub use pipeline::{Notice, ProcedureSession, ProcessOutcome, Stage};
pub use record::ProcedureRecord;
pub use sections::{extract_section, ExtractedSections, SectionLabel};
pub use store::{FileRecordStore, RecordStore, StoreError, StoreResult};

pub use vaultmd_files::{
    DocumentHandle, DocumentKind, FileAccess, InMemoryFileAccess, LocalFileAccess,
};
pub use vaultmd_types::{NonEmptyText, RecordId};
