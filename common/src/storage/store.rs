use std::path::{Path, PathBuf};
use std::sync::Arc;

use bytes::Bytes;
use futures::TryStreamExt;
use object_store::aws::AmazonS3Builder;
use object_store::local::LocalFileSystem;
use object_store::memory::InMemory;
use object_store::{path::Path as ObjPath, ObjectStore, PutMode, PutOptions};

use crate::error::AppError;
use crate::utils::config::{AppConfig, StorageKind};

pub type DynStore = Arc<dyn ObjectStore>;

/// Thin lifecycle wrapper around the configured object-store backend.
///
/// Snapshots and the ingestion ledger both live behind this handle, so the
/// rest of the system never sees backend-specific types.
#[derive(Clone)]
pub struct StorageManager {
    store: DynStore,
    backend_kind: StorageKind,
    local_base: Option<PathBuf>,
}

impl StorageManager {
    /// Create a new StorageManager for the configured backend.
    pub async fn new(cfg: &AppConfig) -> Result<Self, AppError> {
        let backend_kind = cfg.storage.clone();
        let (store, local_base) = create_storage_backend(cfg).await?;

        Ok(Self {
            store,
            backend_kind,
            local_base,
        })
    }

    /// Create a StorageManager over an in-memory backend. Used by tests and
    /// available for ephemeral development runs.
    pub fn memory() -> Self {
        Self {
            store: Arc::new(InMemory::new()),
            backend_kind: StorageKind::Memory,
            local_base: None,
        }
    }

    /// Create a StorageManager with a custom storage backend.
    pub fn with_backend(store: DynStore, backend_kind: StorageKind) -> Self {
        Self {
            store,
            backend_kind,
            local_base: None,
        }
    }

    pub fn backend_kind(&self) -> &StorageKind {
        &self.backend_kind
    }

    /// Resolved base directory when using the local backend.
    pub fn local_base_path(&self) -> Option<&Path> {
        self.local_base.as_deref()
    }

    /// Store bytes at the specified location, overwriting any existing object.
    pub async fn put(&self, location: &str, data: Bytes) -> object_store::Result<()> {
        let path = ObjPath::from(location);
        let payload = object_store::PutPayload::from_bytes(data);
        self.store.put(&path, payload).await.map(|_| ())
    }

    /// Store bytes with an explicit put mode (`Create`, `Update`, `Overwrite`).
    ///
    /// Returns the ETag reported by the backend, when it reports one.
    pub async fn put_with_mode(
        &self,
        location: &str,
        data: Bytes,
        mode: PutMode,
    ) -> object_store::Result<Option<String>> {
        let path = ObjPath::from(location);
        let payload = object_store::PutPayload::from_bytes(data);
        let opts = PutOptions::from(mode);
        let result = self.store.put_opts(&path, payload, opts).await?;
        Ok(result.e_tag)
    }

    /// Retrieve the full contents at the specified location, buffered in memory.
    pub async fn get(&self, location: &str) -> object_store::Result<Bytes> {
        let path = ObjPath::from(location);
        let result = self.store.get(&path).await?;
        result.bytes().await
    }

    /// Retrieve contents plus the object's version (ETag), for read-modify-write
    /// cycles that want a conditional put.
    pub async fn get_with_version(
        &self,
        location: &str,
    ) -> object_store::Result<(Bytes, Option<String>)> {
        let path = ObjPath::from(location);
        let result = self.store.get(&path).await?;
        let e_tag = result.meta.e_tag.clone();
        let bytes = result.bytes().await?;
        Ok((bytes, e_tag))
    }

    /// Delete a single object.
    pub async fn delete(&self, location: &str) -> object_store::Result<()> {
        let path = ObjPath::from(location);
        self.store.delete(&path).await
    }

    /// List all objects below the specified prefix.
    pub async fn list(
        &self,
        prefix: Option<&str>,
    ) -> object_store::Result<Vec<object_store::ObjectMeta>> {
        let prefix_path = prefix.map(ObjPath::from);
        self.store.list(prefix_path.as_ref()).try_collect().await
    }

    /// Check if an object exists at the specified location.
    pub async fn exists(&self, location: &str) -> object_store::Result<bool> {
        let path = ObjPath::from(location);
        self.store
            .head(&path)
            .await
            .map(|_| true)
            .or_else(|e| match e {
                object_store::Error::NotFound { .. } => Ok(false),
                _ => Err(e),
            })
    }
}

/// Create a storage backend based on configuration.
async fn create_storage_backend(
    cfg: &AppConfig,
) -> Result<(DynStore, Option<PathBuf>), AppError> {
    match cfg.storage {
        StorageKind::Local => {
            let base = resolve_base_dir(cfg);
            if !base.exists() {
                tokio::fs::create_dir_all(&base).await?;
            }
            let store = LocalFileSystem::new_with_prefix(base.clone())
                .map_err(AppError::Storage)?;
            Ok((Arc::new(store), Some(base)))
        }
        StorageKind::Memory => {
            let store = InMemory::new();
            Ok((Arc::new(store), None))
        }
        StorageKind::S3 => {
            let bucket = cfg.s3_bucket.as_deref().ok_or_else(|| {
                AppError::Config("s3_bucket is required when storage = \"s3\"".into())
            })?;
            let store = AmazonS3Builder::from_env()
                .with_bucket_name(bucket)
                .build()
                .map_err(AppError::Storage)?;
            Ok((Arc::new(store), None))
        }
    }
}

/// Resolve the absolute base directory used for local storage from config.
///
/// If `data_dir` is relative, it is resolved against the current working directory.
pub fn resolve_base_dir(cfg: &AppConfig) -> PathBuf {
    if cfg.data_dir.starts_with('/') {
        PathBuf::from(&cfg.data_dir)
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(&cfg.data_dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use uuid::Uuid;

    fn test_config_local(root: &str) -> AppConfig {
        AppConfig {
            data_dir: root.into(),
            storage: StorageKind::Local,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn memory_basic_operations() {
        let storage = StorageManager::memory();
        assert!(storage.local_base_path().is_none());

        let location = "test/data/file.txt";
        let data = b"test data for storage manager";

        storage
            .put(location, Bytes::from(data.to_vec()))
            .await
            .expect("put");
        let retrieved = storage.get(location).await.expect("get");
        assert_eq!(retrieved.as_ref(), data);

        assert!(storage.exists(location).await.expect("exists check"));

        storage.delete(location).await.expect("delete");
        assert!(!storage
            .exists(location)
            .await
            .expect("exists check after delete"));
    }

    #[tokio::test]
    async fn local_basic_operations() {
        let base = format!("/tmp/inventory_storage_test_{}", Uuid::new_v4());
        let cfg = test_config_local(&base);
        let storage = StorageManager::new(&cfg)
            .await
            .expect("create storage manager");
        let resolved_base = storage
            .local_base_path()
            .expect("resolved base dir")
            .to_path_buf();
        assert_eq!(resolved_base, PathBuf::from(&base));

        let location = "test/data/file.txt";
        let data = b"test data for local storage";

        storage
            .put(location, Bytes::from(data.to_vec()))
            .await
            .expect("put");
        let retrieved = storage.get(location).await.expect("get");
        assert_eq!(retrieved.as_ref(), data);

        assert!(storage.exists(location).await.expect("exists check"));

        storage.delete(location).await.expect("delete");
        assert!(!storage
            .exists(location)
            .await
            .expect("exists check after delete"));

        let _ = tokio::fs::remove_dir_all(&base).await;
    }

    #[tokio::test]
    async fn list_operations() {
        let storage = StorageManager::memory();

        let files = vec![
            ("dir1/file1.txt", b"content1"),
            ("dir1/file2.txt", b"content2"),
            ("dir2/file3.txt", b"content3"),
        ];

        for (location, data) in &files {
            storage
                .put(location, Bytes::from(data.to_vec()))
                .await
                .expect("put");
        }

        let all_files = storage.list(None).await.expect("list all");
        assert_eq!(all_files.len(), 3);

        let dir1_files = storage.list(Some("dir1/")).await.expect("list dir1");
        assert_eq!(dir1_files.len(), 2);
        assert!(dir1_files
            .iter()
            .any(|meta| meta.location.as_ref().contains("file1.txt")));

        let empty_files = storage
            .list(Some("nonexistent/"))
            .await
            .expect("list nonexistent");
        assert_eq!(empty_files.len(), 0);
    }

    #[tokio::test]
    async fn conditional_put_modes() {
        let storage = StorageManager::memory();
        let location = "conditional/object.json";

        // Create succeeds only while the object is absent.
        let etag = storage
            .put_with_mode(location, Bytes::from_static(b"first"), PutMode::Create)
            .await
            .expect("create");
        assert!(etag.is_some());

        let second_create = storage
            .put_with_mode(location, Bytes::from_static(b"second"), PutMode::Create)
            .await;
        assert!(matches!(
            second_create,
            Err(object_store::Error::AlreadyExists { .. })
        ));

        // Update succeeds with the current version and fails with a stale one.
        let (_, current) = storage.get_with_version(location).await.expect("get");
        let updated = storage
            .put_with_mode(
                location,
                Bytes::from_static(b"second"),
                PutMode::Update(object_store::UpdateVersion {
                    e_tag: current,
                    version: None,
                }),
            )
            .await
            .expect("conditional update");
        assert!(updated.is_some());

        let stale = storage
            .put_with_mode(
                location,
                Bytes::from_static(b"third"),
                PutMode::Update(object_store::UpdateVersion {
                    e_tag: Some("stale".into()),
                    version: None,
                }),
            )
            .await;
        assert!(matches!(
            stale,
            Err(object_store::Error::Precondition { .. })
        ));
    }

    #[tokio::test]
    async fn get_missing_object_errors() {
        let storage = StorageManager::memory();
        let result = storage.get("nonexistent.txt").await;
        assert!(matches!(result, Err(object_store::Error::NotFound { .. })));

        let exists = storage
            .exists("nonexistent.txt")
            .await
            .expect("exists check");
        assert!(!exists);
    }
}
