pub mod auth;
pub mod cleanup;
pub mod gcs;
pub mod prompt;
pub mod providers;
pub mod setup_check;
pub mod storage;

pub use auth::AccessTokenSource;
pub use cleanup::{CleanupGuard, CleanupReport};
pub use gcs::GcsBlobStore;
pub use providers::{ProviderError, TextProvider};
pub use storage::{BlobStore, DeleteOutcome, LocalBlobStore, StorageError};
