use std::collections::BTreeMap;

use bytes::Bytes;
use object_store::{PutMode, UpdateVersion};
use tracing::debug;

use crate::error::AppError;
use crate::storage::store::StorageManager;

/// Version of the ledger object observed at load time, used to make the
/// subsequent save conditional.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
enum LedgerVersion {
    /// The ledger object did not exist when loaded; save must create it.
    #[default]
    Absent,
    /// The ledger object existed; save updates against the observed ETag.
    /// Backends that report no ETag fall back to an unconditional overwrite.
    Existing(Option<String>),
}

/// The ingestion ledger: a persisted mapping from snapshot file name to the
/// vector index it was loaded into. Presence of a key means "fully ingested
/// and queryable"; there is no in-progress state, so a crash before `save`
/// leaves the snapshot ingestible again.
#[derive(Debug, Clone, Default)]
pub struct IngestionLedger {
    entries: BTreeMap<String, String>,
    version: LedgerVersion,
}

impl IngestionLedger {
    /// Fetch the ledger object. A missing object is the first-run bootstrap
    /// case and yields an empty ledger; any other storage failure surfaces.
    pub async fn load(storage: &StorageManager, key: &str) -> Result<Self, AppError> {
        match storage.get_with_version(key).await {
            Ok((bytes, e_tag)) => {
                let entries: BTreeMap<String, String> = serde_json::from_slice(&bytes)?;
                debug!(entries = entries.len(), "Loaded ingestion ledger");
                Ok(Self {
                    entries,
                    version: LedgerVersion::Existing(e_tag),
                })
            }
            Err(object_store::Error::NotFound { .. }) => {
                debug!("No ingestion ledger object yet, starting empty");
                Ok(Self::default())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Persist the ledger as one JSON object.
    ///
    /// The put is conditional on the version observed at load: create when the
    /// ledger was absent, update against the observed ETag otherwise. A failed
    /// precondition means a concurrent ingestion run saved first and surfaces
    /// as `LedgerConflict` instead of silently dropping its record.
    pub async fn save(&mut self, storage: &StorageManager, key: &str) -> Result<(), AppError> {
        let payload = Bytes::from(serde_json::to_vec_pretty(&self.entries)?);
        let mode = match &self.version {
            LedgerVersion::Absent => PutMode::Create,
            LedgerVersion::Existing(Some(e_tag)) => PutMode::Update(UpdateVersion {
                e_tag: Some(e_tag.clone()),
                version: None,
            }),
            LedgerVersion::Existing(None) => PutMode::Overwrite,
        };

        match storage.put_with_mode(key, payload.clone(), mode).await {
            Ok(e_tag) => {
                self.version = LedgerVersion::Existing(e_tag);
                Ok(())
            }
            Err(
                e @ (object_store::Error::Precondition { .. }
                | object_store::Error::AlreadyExists { .. }),
            ) => Err(AppError::LedgerConflict(format!(
                "ledger at {key} changed since it was loaded: {e}"
            ))),
            Err(object_store::Error::NotImplemented) => {
                // Backend without conditional-put support (local filesystem):
                // degrade to last-write-wins, as single-operator deployments do.
                debug!(key, "Conditional put unsupported, overwriting ledger");
                storage.put(key, payload).await?;
                self.version = LedgerVersion::Existing(None);
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Pure lookup: has this snapshot already been ingested?
    pub fn is_ingested(&self, file_name: &str) -> bool {
        self.entries.contains_key(file_name)
    }

    /// Index a snapshot was recorded against, if any.
    pub fn index_for(&self, file_name: &str) -> Option<&str> {
        self.entries.get(file_name).map(String::as_str)
    }

    /// Pure insert; the caller persists via `save`.
    pub fn record(&mut self, file_name: impl Into<String>, index_name: impl Into<String>) {
        self.entries.insert(file_name.into(), index_name.into());
    }

    /// The most recently ingested entry. Snapshot names embed their creation
    /// timestamp, so the greatest key is the newest ingestion.
    pub fn latest_entry(&self) -> Option<(&str, &str)> {
        self.entries
            .last_key_value()
            .map(|(file, index)| (file.as_str(), index.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}
