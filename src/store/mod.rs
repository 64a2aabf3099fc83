pub mod disk;
pub mod memory;

use crate::core::config::AppConfig;
use crate::core::storage::ClientStorage;
use anyhow::{Context, Result};
use disk::DiskStorage;
use fjall::{Keyspace, PartitionCreateOptions, PartitionHandle};
use memory::MemoryStorage;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, warn};

const CLIENT_PARTITION: &str = "client";

/// The on-disk keyspace holding client storage and server documents, one
/// partition each.
#[derive(Clone)]
pub struct KeyValueStore {
    keyspace: Keyspace,
}

impl KeyValueStore {
    pub fn open(path: &Path) -> Result<Self> {
        std::fs::create_dir_all(path)
            .with_context(|| format!("Failed to create data directory: {}", path.display()))?;
        let keyspace = fjall::Config::new(path.join("storage"))
            .open()
            .with_context(|| format!("Failed to open keyspace at {}", path.display()))?;
        debug!("Opened keyspace at {}", path.display());
        Ok(Self { keyspace })
    }

    pub fn from_config(config: &AppConfig) -> Result<Self> {
        Self::open(&config.default_data_path()?)
    }

    pub fn keyspace(&self) -> &Keyspace {
        &self.keyspace
    }

    pub fn partition(&self, name: &str) -> Result<PartitionHandle> {
        self.keyspace
            .open_partition(name, PartitionCreateOptions::default())
            .with_context(|| format!("Failed to open partition: {name}"))
    }

    pub fn client_storage(&self) -> Result<DiskStorage> {
        let partition = self.partition(CLIENT_PARTITION)?;
        Ok(DiskStorage::new(self.keyspace.clone(), partition))
    }
}

/// Opens durable client storage, or in-memory storage when the data directory
/// cannot be used.
pub fn open_client_storage(config: &AppConfig) -> Arc<dyn ClientStorage> {
    match KeyValueStore::from_config(config).and_then(|store| store.client_storage()) {
        Ok(storage) => Arc::new(storage),
        Err(e) => {
            warn!(error = %e, "Durable storage unavailable, cart will not be saved");
            Arc::new(MemoryStorage::new())
        }
    }
}
