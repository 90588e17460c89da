//! Trait abstractions for runtime I/O
//!
//! The gateway trait lives with its transport; this module holds the
//! persistence seam so tests can swap in an in-memory store.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Corrupt identity file: {0}")]
    Corrupt(#[from] serde_json::Error),
}

/// Storage for the persisted user identifier
#[async_trait]
pub trait IdentityStore: Send + Sync {
    /// Persist the identifier, replacing any previous one
    async fn save(&self, user_id: &str) -> Result<(), StoreError>;

    /// Read the identifier left by a previous run
    async fn load(&self) -> Result<Option<String>, StoreError>;

    /// Forget the identifier
    async fn clear(&self) -> Result<(), StoreError>;
}

// ============================================================================
// Arc implementations for trait objects
// ============================================================================

#[async_trait]
impl<T: IdentityStore + ?Sized> IdentityStore for Arc<T> {
    async fn save(&self, user_id: &str) -> Result<(), StoreError> {
        (**self).save(user_id).await
    }

    async fn load(&self) -> Result<Option<String>, StoreError> {
        (**self).load().await
    }

    async fn clear(&self) -> Result<(), StoreError> {
        (**self).clear().await
    }
}

// ============================================================================
// Production Adapters
// ============================================================================

/// On-disk layout of the identity file
#[derive(Debug, Serialize, Deserialize)]
struct PersistedIdentity {
    user_id: String,
}

/// JSON file holding the user id
#[derive(Debug, Clone)]
pub struct FileIdentityStore {
    path: PathBuf,
}

impl FileIdentityStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl IdentityStore for FileIdentityStore {
    async fn save(&self, user_id: &str) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let data = serde_json::to_vec_pretty(&PersistedIdentity {
            user_id: user_id.to_string(),
        })?;

        // Write-then-rename so a crash never leaves a half-written file
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, data).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }

    async fn load(&self) -> Result<Option<String>, StoreError> {
        let data = match tokio::fs::read(&self.path).await {
            Ok(data) => data,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let persisted: PersistedIdentity = serde_json::from_slice(&data)?;
        Ok(Some(persisted.user_id).filter(|id| !id.is_empty()))
    }

    async fn clear(&self) -> Result<(), StoreError> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
