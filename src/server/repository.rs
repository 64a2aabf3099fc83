//! Persistence for user documents.

use async_trait::async_trait;
use chrono::Utc;
use fjall::{Keyspace, PartitionHandle, PersistMode};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tracing::debug;

use super::user::UserRecord;

#[derive(Debug, Error)]
pub enum RepositoryError {
    /// The stored document moved on since it was read.
    #[error("user {id} was modified concurrently (expected version {expected}, found {found})")]
    Conflict { id: String, expected: u64, found: u64 },

    #[error("user {0} already exists")]
    AlreadyExists(String),

    #[error("storage error: {0}")]
    Storage(#[from] fjall::Error),

    #[error("corrupt user document: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("repository lock poisoned")]
    Poisoned,

    #[error("storage task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find(&self, id: &str) -> Result<Option<UserRecord>, RepositoryError>;

    async fn insert(&self, user: UserRecord) -> Result<(), RepositoryError>;

    /// Stores `user` if the stored document still has `user.version`, bumping
    /// the version. Returns the saved document.
    async fn save(&self, user: UserRecord) -> Result<UserRecord, RepositoryError>;
}

fn check_version(stored: Option<u64>, user: &UserRecord) -> Result<(), RepositoryError> {
    let found = stored.unwrap_or(0);
    if found != user.version {
        return Err(RepositoryError::Conflict {
            id: user.id.clone(),
            expected: user.version,
            found,
        });
    }
    Ok(())
}

fn next_version(mut user: UserRecord) -> UserRecord {
    user.version += 1;
    user.updated_at = Utc::now();
    user
}

#[derive(Default)]
pub struct MemoryUserRepository {
    users: Mutex<HashMap<String, UserRecord>>,
}

impl MemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserRepository for MemoryUserRepository {
    async fn find(&self, id: &str) -> Result<Option<UserRecord>, RepositoryError> {
        let users = self.users.lock().map_err(|_| RepositoryError::Poisoned)?;
        Ok(users.get(id).cloned())
    }

    async fn insert(&self, user: UserRecord) -> Result<(), RepositoryError> {
        let mut users = self.users.lock().map_err(|_| RepositoryError::Poisoned)?;
        if users.contains_key(&user.id) {
            return Err(RepositoryError::AlreadyExists(user.id));
        }
        users.insert(user.id.clone(), user);
        Ok(())
    }

    async fn save(&self, user: UserRecord) -> Result<UserRecord, RepositoryError> {
        let mut users = self.users.lock().map_err(|_| RepositoryError::Poisoned)?;
        check_version(users.get(&user.id).map(|u| u.version), &user)?;
        let saved = next_version(user);
        users.insert(saved.id.clone(), saved.clone());
        Ok(saved)
    }
}

/// Users stored as JSON documents in a fjall partition.
///
/// Reads and synced writes run on the blocking pool so an fsync never stalls
/// a runtime worker.
pub struct FjallUserRepository {
    inner: Arc<FjallUsers>,
}

struct FjallUsers {
    keyspace: Keyspace,
    partition: PartitionHandle,
    // Serialises the version check with the write that follows it.
    write_lock: Mutex<()>,
}

impl FjallUserRepository {
    pub fn new(keyspace: Keyspace, partition: PartitionHandle) -> Self {
        Self {
            inner: Arc::new(FjallUsers {
                keyspace,
                partition,
                write_lock: Mutex::new(()),
            }),
        }
    }

    async fn blocking<T, F>(&self, op: F) -> Result<T, RepositoryError>
    where
        F: FnOnce(&FjallUsers) -> Result<T, RepositoryError> + Send + 'static,
        T: Send + 'static,
    {
        let inner = Arc::clone(&self.inner);
        tokio::task::spawn_blocking(move || op(&inner)).await?
    }
}

impl FjallUsers {
    fn read(&self, id: &str) -> Result<Option<UserRecord>, RepositoryError> {
        match self.partition.get(id.as_bytes())? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    fn write(&self, user: &UserRecord) -> Result<(), RepositoryError> {
        self.partition
            .insert(user.id.as_bytes(), serde_json::to_vec(user)?)?;
        self.keyspace.persist(PersistMode::SyncAll)?;
        debug!(user = %user.id, version = user.version, "Saved user document");
        Ok(())
    }

    fn insert(&self, user: UserRecord) -> Result<(), RepositoryError> {
        let _guard = self.write_lock.lock().map_err(|_| RepositoryError::Poisoned)?;
        if self.read(&user.id)?.is_some() {
            return Err(RepositoryError::AlreadyExists(user.id));
        }
        self.write(&user)
    }

    fn save(&self, user: UserRecord) -> Result<UserRecord, RepositoryError> {
        let _guard = self.write_lock.lock().map_err(|_| RepositoryError::Poisoned)?;
        check_version(self.read(&user.id)?.map(|u| u.version), &user)?;
        let saved = next_version(user);
        self.write(&saved)?;
        Ok(saved)
    }
}

#[async_trait]
impl UserRepository for FjallUserRepository {
    async fn find(&self, id: &str) -> Result<Option<UserRecord>, RepositoryError> {
        let id = id.to_string();
        self.blocking(move |users| users.read(&id)).await
    }

    async fn insert(&self, user: UserRecord) -> Result<(), RepositoryError> {
        self.blocking(move |users| users.insert(user)).await
    }

    async fn save(&self, user: UserRecord) -> Result<UserRecord, RepositoryError> {
        self.blocking(move |users| users.save(user)).await
    }
}
