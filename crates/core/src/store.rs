//! Persistence collaborator.
//!
//! [`RecordStore`] is the seam the pipeline saves through. [`FileRecordStore`] keeps each
//! record as YAML in its own sharded directory:
//!
//! ```text
//! <data_dir>/procedures/<id[0..2]>/<id[2..4]>/<id>/procedure.yaml
//! ```
//!
//! Records are written once. Saving a record whose directory already exists is an error
//! rather than an overwrite.

use crate::config::CoreConfig;
use crate::constants::PROCEDURE_RECORD_FILENAME;
use crate::record::ProcedureRecord;
use std::future::Future;
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use vaultmd_types::RecordId;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("record {0} already exists")]
    AlreadyExists(RecordId),
    #[error("record {0} not found")]
    NotFound(RecordId),
    #[error("failed to create record directory: {0}")]
    DirCreation(#[source] io::Error),
    #[error("failed to write record: {0}")]
    FileWrite(#[source] io::Error),
    #[error("failed to read record: {0}")]
    FileRead(#[source] io::Error),
    #[error("failed to serialize record: {0}")]
    Serialization(#[source] serde_yaml::Error),
    #[error("failed to deserialize record: {0}")]
    Deserialization(#[source] serde_yaml::Error),
    #[error("{0}")]
    Backend(String),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Saves procedure records.
pub trait RecordStore: Send + Sync {
    /// Persists `record` and returns the identifier it was stored under.
    fn save(&self, record: &ProcedureRecord) -> impl Future<Output = StoreResult<RecordId>> + Send;
}

impl<T: RecordStore> RecordStore for Arc<T> {
    async fn save(&self, record: &ProcedureRecord) -> StoreResult<RecordId> {
        (**self).save(record).await
    }
}

/// Stores records as YAML files under the configured data directory.
#[derive(Debug, Clone)]
pub struct FileRecordStore {
    procedures_dir: PathBuf,
}

impl FileRecordStore {
    pub fn new(cfg: &CoreConfig) -> Self {
        Self::with_root(cfg.procedures_dir())
    }

    pub fn with_root(procedures_dir: impl Into<PathBuf>) -> Self {
        Self {
            procedures_dir: procedures_dir.into(),
        }
    }

    pub fn procedures_dir(&self) -> &Path {
        &self.procedures_dir
    }

    fn record_path(&self, id: &RecordId) -> PathBuf {
        id.sharded_dir(&self.procedures_dir)
            .join(PROCEDURE_RECORD_FILENAME)
    }

    /// Reads a stored record back.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if no record is stored under `id`.
    pub async fn load(&self, id: &RecordId) -> StoreResult<ProcedureRecord> {
        let path = self.record_path(id);
        let contents = match tokio::fs::read_to_string(&path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => return Err(StoreError::NotFound(*id)),
            Err(e) => return Err(StoreError::FileRead(e)),
        };
        serde_yaml::from_str(&contents).map_err(StoreError::Deserialization)
    }
}

impl RecordStore for FileRecordStore {
    async fn save(&self, record: &ProcedureRecord) -> StoreResult<RecordId> {
        let id = record.id();
        let record_dir = id.sharded_dir(&self.procedures_dir);

        if let Some(parent) = record_dir.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(StoreError::DirCreation)?;
        }
        match tokio::fs::create_dir(&record_dir).await {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                return Err(StoreError::AlreadyExists(id))
            }
            Err(e) => return Err(StoreError::DirCreation(e)),
        }

        let yaml = serde_yaml::to_string(record).map_err(StoreError::Serialization)?;
        tokio::fs::write(record_dir.join(PROCEDURE_RECORD_FILENAME), yaml)
            .await
            .map_err(StoreError::FileWrite)?;

        tracing::info!("saved procedure record {}", id);
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn record() -> ProcedureRecord {
        ProcedureRecord::new("Patient underwent appendectomy.")
            .with_generated_output("Operative Note:\nRemoved appendix.".into())
    }

    #[tokio::test]
    async fn save_writes_sharded_yaml_and_loads_back() {
        let temp = TempDir::new().unwrap();
        let store = FileRecordStore::with_root(temp.path().join("procedures"));
        let record = record();

        let id = store.save(&record).await.unwrap();

        assert_eq!(id, record.id());
        let canonical = id.to_string();
        let expected = temp
            .path()
            .join("procedures")
            .join(&canonical[0..2])
            .join(&canonical[2..4])
            .join(&canonical)
            .join(PROCEDURE_RECORD_FILENAME);
        assert!(expected.is_file());
        assert_eq!(store.load(&id).await.unwrap(), record);
    }

    #[tokio::test]
    async fn saving_same_record_twice_is_rejected() {
        let temp = TempDir::new().unwrap();
        let store = FileRecordStore::with_root(temp.path());
        let record = record();

        store.save(&record).await.unwrap();
        let second = store.save(&record).await;

        assert!(matches!(second, Err(StoreError::AlreadyExists(id)) if id == record.id()));
    }

    #[tokio::test]
    async fn loading_unknown_record_is_not_found() {
        let temp = TempDir::new().unwrap();
        let store = FileRecordStore::with_root(temp.path());
        let id = RecordId::new();

        assert!(matches!(store.load(&id).await, Err(StoreError::NotFound(_))));
    }

    #[tokio::test]
    async fn unwritable_root_is_dir_creation_error() {
        let temp = TempDir::new().unwrap();
        let blocker = temp.path().join("blocker");
        std::fs::write(&blocker, "file in the way").unwrap();
        let store = FileRecordStore::with_root(blocker.join("procedures"));

        assert!(matches!(
            store.save(&record()).await,
            Err(StoreError::DirCreation(_))
        ));
    }

    #[test]
    fn store_from_config_uses_procedures_dir() {
        let temp = TempDir::new().unwrap();
        let cfg = CoreConfig::new(temp.path().to_path_buf(), None).unwrap();
        assert_eq!(FileRecordStore::new(&cfg).procedures_dir(), cfg.procedures_dir());
    }
}
