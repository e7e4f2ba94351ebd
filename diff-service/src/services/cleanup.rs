//! Best-effort deletion of the objects a request consumed.
//!
//! A [`CleanupGuard`] is created once the object names are known and is
//! released on every exit path of the handler. Deletion failures are logged
//! and counted, never returned.

use super::storage::{BlobStore, DeleteOutcome};
use metrics::counter;
use std::sync::Arc;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CleanupReport {
    pub deleted: usize,
    pub already_absent: usize,
    pub failed: usize,
}

pub struct CleanupGuard {
    store: Arc<dyn BlobStore>,
    names: Vec<String>,
}

impl CleanupGuard {
    pub fn new(store: Arc<dyn BlobStore>, names: impl IntoIterator<Item = String>) -> Self {
        let mut unique: Vec<String> = Vec::new();
        for name in names {
            if !unique.contains(&name) {
                unique.push(name);
            }
        }

        Self {
            store,
            names: unique,
        }
    }

    /// Give up on deleting anything.
    pub fn disarm(&mut self) {
        self.names.clear();
    }

    pub fn is_armed(&self) -> bool {
        !self.names.is_empty()
    }

    /// Delete every tracked object once.
    pub async fn release(mut self) -> CleanupReport {
        let names = std::mem::take(&mut self.names);
        delete_all(self.store.as_ref(), &names).await
    }
}

impl Drop for CleanupGuard {
    fn drop(&mut self) {
        if self.names.is_empty() {
            return;
        }

        // Reached when the request future is dropped before `release`.
        let names = std::mem::take(&mut self.names);
        let store = self.store.clone();
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                tracing::warn!(
                    objects = ?names,
                    "Request ended early; deleting files in background"
                );
                handle.spawn(async move {
                    delete_all(store.as_ref(), &names).await;
                });
            }
            Err(_) => {
                tracing::error!(
                    objects = ?names,
                    "No runtime available; files were not cleaned up"
                );
                counter!("blob_cleanup_failures_total").increment(names.len() as u64);
            }
        }
    }
}

async fn delete_all(store: &dyn BlobStore, names: &[String]) -> CleanupReport {
    let mut report = CleanupReport::default();

    for name in names {
        tracing::info!(object = %name, "Cleaning up file");
        match store.delete(name).await {
            Ok(DeleteOutcome::Deleted) => report.deleted += 1,
            Ok(DeleteOutcome::AlreadyAbsent) => {
                tracing::warn!(object = %name, "File already deleted or never existed");
                report.already_absent += 1;
            }
            Err(e) => {
                tracing::error!(object = %name, error = %e, "Cleanup failed");
                counter!("blob_cleanup_failures_total").increment(1);
                report.failed += 1;
            }
        }
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::storage::StorageError;
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct DeleteLog {
        deleted: Mutex<Vec<String>>,
        fail_on: Option<String>,
    }

    #[async_trait]
    impl BlobStore for DeleteLog {
        async fn exists(&self, _name: &str) -> Result<bool, StorageError> {
            Ok(true)
        }

        async fn read_text(&self, name: &str) -> Result<String, StorageError> {
            Err(StorageError::NotFound(name.to_string()))
        }

        async fn delete(&self, name: &str) -> Result<DeleteOutcome, StorageError> {
            if self.fail_on.as_deref() == Some(name) {
                return Err(StorageError::Network("connection reset".to_string()));
            }
            let mut deleted = self.deleted.lock().unwrap();
            if deleted.iter().any(|n| n == name) {
                return Ok(DeleteOutcome::AlreadyAbsent);
            }
            deleted.push(name.to_string());
            Ok(DeleteOutcome::Deleted)
        }

        async fn write_text(&self, _name: &str, _content: &str) -> Result<(), StorageError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn release_deletes_each_name_once() {
        let store = Arc::new(DeleteLog::default());
        let guard = CleanupGuard::new(store.clone(), ["a.json".to_string(), "a.json".to_string()]);

        let report = guard.release().await;
        assert_eq!(report.deleted, 1);
        assert_eq!(*store.deleted.lock().unwrap(), vec!["a.json"]);
    }

    #[tokio::test]
    async fn failures_do_not_stop_remaining_deletes() {
        let store = Arc::new(DeleteLog {
            fail_on: Some("a.json".to_string()),
            ..Default::default()
        });
        let guard = CleanupGuard::new(store.clone(), ["a.json".to_string(), "b.json".to_string()]);

        let report = guard.release().await;
        assert_eq!(
            report,
            CleanupReport {
                deleted: 1,
                already_absent: 0,
                failed: 1
            }
        );
        assert_eq!(*store.deleted.lock().unwrap(), vec!["b.json"]);
    }

    #[tokio::test]
    async fn disarmed_guard_deletes_nothing() {
        let store = Arc::new(DeleteLog::default());
        let mut guard = CleanupGuard::new(store.clone(), ["a.json".to_string()]);
        guard.disarm();
        assert!(!guard.is_armed());

        assert_eq!(guard.release().await, CleanupReport::default());
        assert!(store.deleted.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn dropped_guard_cleans_up_in_background() {
        let store = Arc::new(DeleteLog::default());
        {
            let _guard = CleanupGuard::new(store.clone(), ["late.json".to_string()]);
        }

        for _ in 0..50 {
            if !store.deleted.lock().unwrap().is_empty() {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        assert_eq!(*store.deleted.lock().unwrap(), vec!["late.json"]);
    }
}
