//! Blob store abstraction and the directory-backed store used for local runs.
//!
//! Every store is addressed by object name inside one fixed container. The
//! Cloud Storage implementation lives in [`crate::services::gcs`].

use async_trait::async_trait;
use service_core::error::AppError;
use std::io::ErrorKind;
use std::path::PathBuf;
use thiserror::Error;
use tokio::fs;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("File not found in bucket: {0}")]
    NotFound(String),

    #[error("Invalid object name: {0}")]
    InvalidName(String),

    #[error("Storage not configured: {0}")]
    NotConfigured(String),

    #[error("Storage authentication failed: {0}")]
    Auth(String),

    #[error("Storage API error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Storage network error: {0}")]
    Network(String),

    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound(_) => AppError::NotFound(err.to_string()),
            StorageError::InvalidName(_) => AppError::Validation(err.to_string()),
            StorageError::NotConfigured(_) => AppError::Configuration(anyhow::Error::new(err)),
            other => AppError::Dependency(anyhow::Error::new(other)),
        }
    }
}

/// What a delete call found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    /// Nothing to delete; another request may have removed it first.
    AlreadyAbsent,
}

#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn exists(&self, name: &str) -> Result<bool, StorageError>;

    /// Fails with [`StorageError::NotFound`] when the object is absent.
    async fn read_text(&self, name: &str) -> Result<String, StorageError>;

    /// Idempotent: an absent object yields [`DeleteOutcome::AlreadyAbsent`].
    async fn delete(&self, name: &str) -> Result<DeleteOutcome, StorageError>;

    async fn write_text(&self, name: &str, content: &str) -> Result<(), StorageError>;

    /// Reject names this store can never address, without any I/O.
    fn check_name(&self, _name: &str) -> Result<(), StorageError> {
        Ok(())
    }
}

/// Directory-backed store. Object names map to files directly under `base_path`.
pub struct LocalBlobStore {
    base_path: PathBuf,
}

impl LocalBlobStore {
    pub async fn new(base_path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let base_path = base_path.into();
        if !base_path.exists() {
            fs::create_dir_all(&base_path).await?;
        }
        Ok(Self { base_path })
    }

    fn path_for(&self, name: &str) -> Result<PathBuf, StorageError> {
        if name.is_empty()
            || name == "."
            || name == ".."
            || name.contains('/')
            || name.contains('\\')
            || name.contains('\0')
        {
            return Err(StorageError::InvalidName(name.to_string()));
        }
        Ok(self.base_path.join(name))
    }
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    async fn exists(&self, name: &str) -> Result<bool, StorageError> {
        let path = self.path_for(name)?;
        Ok(fs::try_exists(path).await?)
    }

    async fn read_text(&self, name: &str) -> Result<String, StorageError> {
        let path = self.path_for(name)?;
        match fs::read_to_string(path).await {
            Ok(content) => Ok(content),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(StorageError::NotFound(name.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn delete(&self, name: &str) -> Result<DeleteOutcome, StorageError> {
        let path = self.path_for(name)?;
        match fs::remove_file(path).await {
            Ok(()) => Ok(DeleteOutcome::Deleted),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(DeleteOutcome::AlreadyAbsent),
            Err(e) => Err(e.into()),
        }
    }

    async fn write_text(&self, name: &str, content: &str) -> Result<(), StorageError> {
        let path = self.path_for(name)?;
        fs::write(path, content).await?;
        Ok(())
    }

    fn check_name(&self, name: &str) -> Result<(), StorageError> {
        self.path_for(name).map(|_| ())
    }
}
