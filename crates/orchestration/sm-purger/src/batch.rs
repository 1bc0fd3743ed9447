//! Delete batches and the deleter that sends them.

use serde::{Deserialize, Serialize};
use sm_error::DeleteError;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::store::{ObjectKey, ObjectStore};

/// Maximum number of keys S3 accepts in one `DeleteObjects` request.
pub const MAX_BATCH_SIZE: usize = 1000;

/// Failure code recorded for every key of a request that failed as a whole.
pub const REQUEST_FAILED_CODE: &str = "RequestFailed";

/// Failure code recorded for keys the backend neither deleted nor rejected.
pub const UNREPORTED_CODE: &str = "Unreported";

/// Error code S3 uses for keys that do not exist.
pub const NO_SUCH_KEY_CODE: &str = "NoSuchKey";

/// Failure code for keys whose delete task panicked.
pub const TASK_PANICKED_CODE: &str = "TaskPanicked";

/// A set of keys submitted together in one delete request.
///
/// Always holds between 1 and [`MAX_BATCH_SIZE`] keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteBatch {
    keys: Vec<ObjectKey>,
}

impl DeleteBatch {
    /// Build a batch, rejecting empty or oversized key sets.
    pub fn new(keys: Vec<ObjectKey>) -> Result<Self, DeleteError> {
        if keys.is_empty() {
            return Err(DeleteError::EmptyBatch);
        }
        if keys.len() > MAX_BATCH_SIZE {
            return Err(DeleteError::BatchTooLarge {
                size: keys.len(),
                limit: MAX_BATCH_SIZE,
            });
        }
        Ok(Self { keys })
    }

    /// Split `keys` into batches of at most [`MAX_BATCH_SIZE`], preserving order.
    ///
    /// An empty key list yields no batches.
    pub fn partition(keys: Vec<ObjectKey>) -> Vec<DeleteBatch> {
        keys.chunks(MAX_BATCH_SIZE)
            .map(|chunk| DeleteBatch {
                keys: chunk.to_vec(),
            })
            .collect()
    }

    pub fn keys(&self) -> &[ObjectKey] {
        &self.keys
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Returns true if the batch has no keys.
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

/// A key the backend refused to delete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyFailure {
    pub key: ObjectKey,
    pub code: String,
    pub message: String,
}

impl KeyFailure {
    pub fn new(
        key: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            key: key.into(),
            code: code.into(),
            message: message.into(),
        }
    }
}

/// Result of one delete batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeleteOutcome {
    /// Keys deleted successfully
    pub deleted: Vec<ObjectKey>,

    /// Keys that failed, with the backend's code and message
    pub failures: Vec<KeyFailure>,
}

impl DeleteOutcome {
    pub fn new(deleted: Vec<ObjectKey>, failures: Vec<KeyFailure>) -> Self {
        Self { deleted, failures }
    }

    /// Outcome in which every key failed for the same reason.
    pub fn all_failed(keys: &[ObjectKey], code: &str, message: &str) -> Self {
        Self {
            deleted: Vec::new(),
            failures: keys
                .iter()
                .map(|key| KeyFailure::new(key.as_str(), code, message))
                .collect(),
        }
    }

    /// Convert a whole-batch request failure into an outcome.
    ///
    /// Returns `None` for contract violations, which carry no keys to account for.
    pub fn from_request_error(error: &DeleteError) -> Option<Self> {
        match error {
            DeleteError::Request { keys, message } => {
                Some(Self::all_failed(keys, REQUEST_FAILED_CODE, message))
            }
            DeleteError::BatchTooLarge { .. } | DeleteError::EmptyBatch => None,
        }
    }

    /// Account for every key of `batch` exactly once.
    ///
    /// Keys the backend did not mention are recorded as failures, and keys
    /// reported twice or not in the batch are dropped.
    pub fn reconcile(self, batch: &DeleteBatch) -> Self {
        let expected: HashSet<&str> = batch.keys().iter().map(String::as_str).collect();
        let mut seen: HashSet<String> = HashSet::with_capacity(batch.len());

        let deleted: Vec<ObjectKey> = self
            .deleted
            .into_iter()
            .filter(|key| expected.contains(key.as_str()) && seen.insert(key.clone()))
            .collect();

        let mut failures: Vec<KeyFailure> = self
            .failures
            .into_iter()
            .filter(|f| expected.contains(f.key.as_str()) && seen.insert(f.key.clone()))
            .collect();

        for key in batch.keys() {
            if !seen.contains(key) {
                failures.push(KeyFailure::new(
                    key.as_str(),
                    UNREPORTED_CODE,
                    "key missing from delete response",
                ));
            }
        }

        Self { deleted, failures }
    }

    /// Treat `NoSuchKey` failures as successful deletions.
    pub fn tolerate_missing(mut self) -> Self {
        let (missing, failures): (Vec<_>, Vec<_>) = self
            .failures
            .into_iter()
            .partition(|f| f.code == NO_SUCH_KEY_CODE);
        self.deleted.extend(missing.into_iter().map(|f| f.key));
        self.failures = failures;
        self
    }

    pub fn succeeded(&self) -> usize {
        self.deleted.len()
    }

    pub fn failed(&self) -> usize {
        self.failures.len()
    }

    /// Number of keys accounted for.
    pub fn total(&self) -> usize {
        self.deleted.len() + self.failures.len()
    }

    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }
}

/// Sends delete batches for one bucket.
///
/// Cheap to clone; clones share the store handle.
#[derive(Clone)]
pub struct BatchDeleter {
    store: Arc<dyn ObjectStore>,
    bucket: String,
    timeout: Option<Duration>,
}

impl BatchDeleter {
    /// Create a deleter for `bucket`.
    pub fn new(store: Arc<dyn ObjectStore>, bucket: impl Into<String>) -> Self {
        Self {
            store,
            bucket: bucket.into(),
            timeout: None,
        }
    }

    /// Fail a batch as a whole if the request takes longer than `timeout`.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Delete `keys` in a single request.
    ///
    /// An empty slice is a no-op. More than [`MAX_BATCH_SIZE`] keys fails with
    /// [`DeleteError::BatchTooLarge`] before anything is sent.
    pub async fn delete_keys(&self, keys: &[ObjectKey]) -> Result<DeleteOutcome, DeleteError> {
        if keys.is_empty() {
            debug!(bucket = %self.bucket, "No objects to delete");
            return Ok(DeleteOutcome::default());
        }

        let batch = DeleteBatch::new(keys.to_vec())?;
        self.delete_batch(&batch).await
    }

    /// Delete a pre-built batch in a single request. No retries are attempted.
    pub async fn delete_batch(&self, batch: &DeleteBatch) -> Result<DeleteOutcome, DeleteError> {
        let request = self.store.delete_objects(&self.bucket, batch);

        let result = match self.timeout {
            Some(timeout) => match tokio::time::timeout(timeout, request).await {
                Ok(result) => result,
                Err(_) => Err(DeleteError::Request {
                    keys: batch.keys().to_vec(),
                    message: format!("timed out after {}ms", timeout.as_millis()),
                }),
            },
            None => request.await,
        };

        match result {
            Ok(outcome) => {
                let outcome = outcome.reconcile(batch);
                debug!(
                    bucket = %self.bucket,
                    keys = batch.len(),
                    deleted = outcome.succeeded(),
                    failed = outcome.failed(),
                    "Delete batch completed"
                );
                for failure in &outcome.failures {
                    warn!(
                        bucket = %self.bucket,
                        key = %failure.key,
                        code = %failure.code,
                        message = %failure.message,
                        "Object not deleted"
                    );
                }
                Ok(outcome)
            }
            Err(e) => {
                warn!(bucket = %self.bucket, keys = batch.len(), error = %e, "Delete batch failed");
                Err(e)
            }
        }
    }
}
