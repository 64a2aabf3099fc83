use crate::core::storage::ClientStorage;
use anyhow::{Context, Result};
use fjall::{Keyspace, PartitionHandle, PersistMode};
use tracing::debug;

/// Client storage backed by a single fjall partition. Every write is synced
/// to disk before returning.
pub struct DiskStorage {
    keyspace: Keyspace,
    partition: PartitionHandle,
}

impl DiskStorage {
    pub fn new(keyspace: Keyspace, partition: PartitionHandle) -> Self {
        Self {
            keyspace,
            partition,
        }
    }

    fn sync(&self) -> Result<()> {
        self.keyspace
            .persist(PersistMode::SyncAll)
            .context("Failed to persist client storage")
    }
}

impl ClientStorage for DiskStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>> {
        let Some(value) = self.partition.get(key.as_bytes())? else {
            debug!("Storage MISS for key: {}", key);
            return Ok(None);
        };
        debug!("Storage HIT for key: {}", key);
        let text = String::from_utf8(value.to_vec())
            .with_context(|| format!("Stored value for {key} is not UTF-8"))?;
        Ok(Some(text))
    }

    fn set_item(&self, key: &str, value: &str) -> Result<()> {
        self.partition.insert(key.as_bytes(), value.as_bytes())?;
        self.sync()?;
        debug!("Storage PUT for key: {}", key);
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<()> {
        self.partition.remove(key.as_bytes())?;
        self.sync()?;
        debug!("Storage REMOVE for key: {}", key);
        Ok(())
    }
}
