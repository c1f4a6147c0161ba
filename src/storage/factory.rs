//! Storage factory for creating the configured backend

use std::sync::Arc;

use crate::config::{ensure_db_dir, BackendKind, StorageConfig};
use crate::storage::{
    DocumentStore, MemorySortedSets, RedisSortedSets, SortedIndexBackend, StorageBackend,
};
use crate::{Error, Result};

/// Shared handle to the one backend a service runs against
pub type SharedBackend = Arc<dyn StorageBackend>;

/// Build the backend selected by `config`.
///
/// Missing or invalid settings surface as `Error::Config` so the service
/// never starts half-configured.
pub fn open_backend(config: &StorageConfig) -> Result<SharedBackend> {
    let kind = config.backend_kind()?;
    let backend: SharedBackend = match kind {
        BackendKind::Redis => {
            let store = RedisSortedSets::connect(&config.redis).map_err(|e| {
                Error::Config(format!("could not connect to {}: {}", config.redis.url(), e))
            })?;
            Arc::new(SortedIndexBackend::new(store))
        }
        BackendKind::Sqlite => {
            let path = config
                .sqlite
                .path
                .as_deref()
                .ok_or_else(|| Error::Config("No storage.sqlite.path provided!".into()))?;
            ensure_db_dir(path)?;
            Arc::new(DocumentStore::open(path)?)
        }
        BackendKind::Memory => Arc::new(SortedIndexBackend::new(MemorySortedSets::new())),
    };

    tracing::info!("Storage backend ready: {}", backend.name());
    Ok(backend)
}
