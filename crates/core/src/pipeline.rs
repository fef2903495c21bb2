//! Procedure session: the state holder that sequences merge, generation and saving.
//!
//! One [`ProcedureSession`] backs one clinician's working session. It owns the document
//! selection, the merged text, the latest generated output and the user-visible status, and it
//! drives the collaborators one stage at a time:
//!
//! ```text
//! NotStarted → Merging → Merged → AiProcessing → Succeeded | Failed
//!                                              → Saving → Saved | SaveFailed
//! ```
//!
//! At most one generation is in flight per session. A call to [`ProcedureSession::process`]
//! made while another is outstanding returns [`ProcessOutcome::AlreadyInFlight`] without
//! touching any state or collaborator.
//!
//! Failures never lose work: the merged text and any earlier output survive a failed
//! generation or save, and retrying is always a full redo.

use crate::constants::{SAVED_NOTICE_TTL, SAVE_FAILED_NOTICE_TTL};
use crate::document::{MergeResult, SourceDocument};
use crate::generation::{build_prompt, GenerationError, GenerationResult, Generator};
use crate::merger::DocumentMerger;
use crate::record::ProcedureRecord;
use crate::sections::ExtractedSections;
use crate::store::RecordStore;
use crate::{PipelineError, PipelineResult};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use vaultmd_files::FileAccess;
use vaultmd_types::RecordId;

/// Where the session is in the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Stage {
    #[default]
    NotStarted,
    Merging,
    Merged,
    AiProcessing,
    Succeeded(String),
    Failed(String),
    Saving,
    Saved(RecordId),
    SaveFailed(String),
}

/// Short-lived status message shown after a save attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    Saved(RecordId),
    SaveFailed(String),
}

impl Notice {
    /// How long the notice stays visible.
    pub fn ttl(&self) -> Duration {
        match self {
            Notice::Saved(_) => SAVED_NOTICE_TTL,
            Notice::SaveFailed(_) => SAVE_FAILED_NOTICE_TTL,
        }
    }
}

/// Result of a [`ProcedureSession::process`] call.
#[derive(Debug)]
pub enum ProcessOutcome {
    /// Generation succeeded and the record was saved.
    Saved(ProcedureRecord),
    /// Another call was already processing; nothing was done.
    AlreadyInFlight,
    /// The session was cleared while generation was running. The output was dropped and
    /// nothing was saved.
    Discarded,
}

#[derive(Debug, Default)]
struct SessionState {
    documents: Vec<SourceDocument>,
    merged_text: String,
    generated_output: Option<String>,
    stage: Stage,
    last_error: Option<String>,
    notice: Option<(Notice, Instant)>,
    /// Bumped by `clear`; work started before a clear must not write into the new state.
    epoch: u64,
}

/// Clears the in-flight flag however processing ends.
struct InFlight<'a>(&'a AtomicBool);

impl<'a> InFlight<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// State holder for one working session.
pub struct ProcedureSession<A, G, S> {
    access: A,
    generator: Result<G, String>,
    store: S,
    state: Mutex<SessionState>,
    ai_in_flight: AtomicBool,
}

impl<A, G, S> ProcedureSession<A, G, S>
where
    A: FileAccess,
    G: Generator,
    S: RecordStore,
{
    /// Creates a session.
    ///
    /// `generator` is the outcome of constructing the AI collaborator. When it is an error the
    /// session still supports merging and editing, and every processing attempt fails with
    /// `PipelineError::AiServiceUnavailable` carrying that error's message.
    pub fn new(access: A, generator: GenerationResult<G>, store: S) -> Self {
        let generator = generator.map_err(|e| {
            tracing::warn!("AI generation unavailable: {}", e);
            e.to_string()
        });
        Self {
            access,
            generator,
            store,
            state: Mutex::new(SessionState::default()),
            ai_in_flight: AtomicBool::new(false),
        }
    }

    fn state(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Runs `f` with the state locked. The lock is never held across an await.
    fn update<R>(&self, f: impl FnOnce(&mut SessionState) -> R) -> R {
        f(&mut self.state())
    }

    /// Replaces the selection.
    pub fn select_documents(&self, documents: Vec<SourceDocument>) {
        self.update(|st| st.documents = documents);
    }

    /// Appends to the selection.
    pub fn add_documents(&self, documents: impl IntoIterator<Item = SourceDocument>) {
        self.update(|st| st.documents.extend(documents));
    }

    /// Removes one document from the selection. Merged text is left alone until the next
    /// [`merge`](Self::merge).
    ///
    /// # Errors
    ///
    /// Returns `PipelineError::DocumentIndexOutOfRange` for an invalid index.
    pub fn remove_document(&self, index: usize) -> PipelineResult<SourceDocument> {
        self.update(|st| {
            if index < st.documents.len() {
                Ok(st.documents.remove(index))
            } else {
                Err(PipelineError::DocumentIndexOutOfRange {
                    index,
                    len: st.documents.len(),
                })
            }
        })
    }

    pub fn documents(&self) -> Vec<SourceDocument> {
        self.state().documents.clone()
    }

    /// Merges the current selection, replacing the merged text.
    ///
    /// # Errors
    ///
    /// Returns `PipelineError::NoFilesSelected` when nothing is selected; the merged text is
    /// then left unchanged.
    pub fn merge(&self) -> PipelineResult<MergeResult> {
        let documents = self.update(|st| {
            if st.documents.is_empty() {
                return None;
            }
            st.stage = Stage::Merging;
            st.last_error = None;
            Some(st.documents.clone())
        });
        let Some(documents) = documents else {
            let error = PipelineError::NoFilesSelected;
            self.update(|st| st.last_error = Some(error.to_string()));
            return Err(error);
        };

        let result = DocumentMerger::new(&self.access).merge(&documents)?;

        self.update(|st| {
            st.merged_text = result.merged_text().to_string();
            st.stage = Stage::Merged;
        });
        Ok(result)
    }

    pub fn merged_text(&self) -> String {
        self.state().merged_text.clone()
    }

    /// Replaces the merged text with a hand-edited version.
    pub fn set_merged_text(&self, text: impl Into<String>) {
        let text = text.into();
        self.update(|st| st.merged_text = text);
    }

    pub fn generated_output(&self) -> Option<String> {
        self.state().generated_output.clone()
    }

    /// Sections of the latest generated output, recomputed on each call.
    pub fn sections(&self) -> Option<ExtractedSections> {
        self.state()
            .generated_output
            .as_deref()
            .map(ExtractedSections::from_output)
    }

    pub fn stage(&self) -> Stage {
        self.state().stage.clone()
    }

    /// User-visible message for the most recent failure.
    pub fn last_error(&self) -> Option<String> {
        self.state().last_error.clone()
    }

    pub fn is_processing_ai(&self) -> bool {
        self.ai_in_flight.load(Ordering::Acquire)
    }

    pub fn is_ai_available(&self) -> bool {
        self.generator.is_ok()
    }

    /// The save notice, if it has not yet expired.
    pub fn notice(&self) -> Option<Notice> {
        self.notice_at(Instant::now())
    }

    /// The save notice as seen at `now`. Expired notices are cleared.
    pub fn notice_at(&self, now: Instant) -> Option<Notice> {
        self.update(|st| {
            let (notice, shown_at) = st.notice.as_ref()?;
            if now.saturating_duration_since(*shown_at) < notice.ttl() {
                return Some(notice.clone());
            }
            st.notice = None;
            None
        })
    }

    /// Resets selection, merged text, output and messages.
    ///
    /// A `process` call already in flight finishes without writing its results into the
    /// cleared session.
    pub fn clear(&self) {
        self.update(|st| {
            let epoch = st.epoch.wrapping_add(1);
            *st = SessionState {
                epoch,
                ..SessionState::default()
            };
        });
    }

    /// Generates output for the merged text and saves the resulting record.
    ///
    /// # Errors
    ///
    /// - `PipelineError::AiServiceUnavailable` if the generator could not be constructed.
    /// - `PipelineError::NothingToProcess` if the merged text is empty or whitespace.
    /// - `PipelineError::AiGenerationFailed` if the generator fails or returns nothing.
    /// - `PipelineError::PersistenceFailed` if the store fails; the new output is kept.
    ///
    /// Every error is also recorded as [`last_error`](Self::last_error).
    pub async fn process(&self) -> PipelineResult<ProcessOutcome> {
        let generator = match &self.generator {
            Ok(generator) => generator,
            Err(reason) => {
                return Err(self.fail(PipelineError::AiServiceUnavailable(reason.clone())));
            }
        };

        let Some(_in_flight) = InFlight::acquire(&self.ai_in_flight) else {
            tracing::debug!("generation already in flight, ignoring request");
            return Ok(ProcessOutcome::AlreadyInFlight);
        };

        let snapshot = self.update(|st| {
            if st.merged_text.trim().is_empty() {
                return None;
            }
            st.stage = Stage::AiProcessing;
            st.last_error = None;
            Some((st.merged_text.clone(), st.epoch))
        });
        let Some((original_text, epoch)) = snapshot else {
            return Err(self.fail(PipelineError::NothingToProcess));
        };

        let prompt = build_prompt(&original_text);
        let generated = generator
            .generate(&prompt)
            .await
            .and_then(|output| {
                if output.trim().is_empty() {
                    Err(GenerationError::NoContent)
                } else {
                    Ok(output)
                }
            });
        let output = match generated {
            Ok(output) => output,
            Err(e) => {
                let error = PipelineError::AiGenerationFailed(e);
                return Err(self.fail_since(epoch, error, Stage::Failed));
            }
        };

        let current = self.update_since(epoch, |st| {
            st.generated_output = Some(output.clone());
            st.stage = Stage::Succeeded(output.clone());
        });
        if current.is_none() {
            tracing::info!("session cleared during generation, discarding output");
            return Ok(ProcessOutcome::Discarded);
        }

        let record = ProcedureRecord::new(original_text).with_generated_output(output);
        self.update_since(epoch, |st| st.stage = Stage::Saving);

        match self.store.save(&record).await {
            Ok(id) => {
                self.update_since(epoch, |st| {
                    st.stage = Stage::Saved(id);
                    st.notice = Some((Notice::Saved(id), Instant::now()));
                });
                Ok(ProcessOutcome::Saved(record))
            }
            Err(e) => {
                let error = PipelineError::PersistenceFailed(e);
                let message = error.to_string();
                self.update_since(epoch, |st| {
                    st.notice = Some((Notice::SaveFailed(message), Instant::now()));
                });
                Err(self.fail_since(epoch, error, Stage::SaveFailed))
            }
        }
    }

    /// Runs `f` only if the session has not been cleared since `epoch`.
    fn update_since<R>(&self, epoch: u64, f: impl FnOnce(&mut SessionState) -> R) -> Option<R> {
        self.update(|st| (st.epoch == epoch).then(|| f(st)))
    }

    fn fail(&self, error: PipelineError) -> PipelineError {
        tracing::warn!("procedure processing failed: {}", error);
        self.update(|st| st.last_error = Some(error.to_string()));
        error
    }

    /// Records a failure of work started at `epoch`, unless the session was cleared since.
    fn fail_since(
        &self,
        epoch: u64,
        error: PipelineError,
        stage: impl FnOnce(String) -> Stage,
    ) -> PipelineError {
        tracing::warn!("procedure processing failed: {}", error);
        let message = error.to_string();
        self.update_since(epoch, |st| {
            st.stage = stage(message.clone());
            st.last_error = Some(message);
        });
        error
    }
}
