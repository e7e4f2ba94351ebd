//! Pre-flight check that the configured bucket accepts writes and deletes.

use super::storage::{BlobStore, DeleteOutcome, StorageError};

pub const TEST_OBJECT_NAME: &str = "test_file.txt";
const TEST_OBJECT_CONTENT: &str = "This is a test file for the diff service setup.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetupStep {
    Upload,
    Exists,
    Delete,
}

impl SetupStep {
    pub fn describe(&self) -> &'static str {
        match self {
            SetupStep::Upload => "upload test object",
            SetupStep::Exists => "find uploaded test object",
            SetupStep::Delete => "delete test object",
        }
    }
}

#[derive(Debug)]
pub struct SetupFailure {
    pub step: SetupStep,
    pub error: StorageError,
}

impl std::fmt::Display for SetupFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "failed to {}: {}", self.step.describe(), self.error)
    }
}

/// Write, find and delete [`TEST_OBJECT_NAME`]. Returns the steps that passed.
pub async fn run_setup_check(store: &dyn BlobStore) -> Result<Vec<SetupStep>, SetupFailure> {
    let mut passed = Vec::new();
    let fail = |step, error| SetupFailure { step, error };

    store
        .write_text(TEST_OBJECT_NAME, TEST_OBJECT_CONTENT)
        .await
        .map_err(|e| fail(SetupStep::Upload, e))?;
    passed.push(SetupStep::Upload);

    match store.exists(TEST_OBJECT_NAME).await {
        Ok(true) => passed.push(SetupStep::Exists),
        Ok(false) => {
            return Err(fail(
                SetupStep::Exists,
                StorageError::NotFound(TEST_OBJECT_NAME.to_string()),
            ))
        }
        Err(e) => return Err(fail(SetupStep::Exists, e)),
    }

    match store.delete(TEST_OBJECT_NAME).await {
        Ok(DeleteOutcome::Deleted) => passed.push(SetupStep::Delete),
        Ok(DeleteOutcome::AlreadyAbsent) => {
            return Err(fail(
                SetupStep::Delete,
                StorageError::NotFound(TEST_OBJECT_NAME.to_string()),
            ))
        }
        Err(e) => return Err(fail(SetupStep::Delete, e)),
    }

    Ok(passed)
}
