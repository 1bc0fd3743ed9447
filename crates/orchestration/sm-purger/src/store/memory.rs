//! In-memory object store.

use async_trait::async_trait;
use sm_error::{DeleteError, ListingError};
use std::collections::{BTreeMap, HashSet};
use std::ops::Bound;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use super::{ObjectEntry, ObjectPage, ObjectStore};
use crate::batch::{DeleteBatch, DeleteOutcome, KeyFailure, MAX_BATCH_SIZE, NO_SUCH_KEY_CODE};

/// A call received by a [`MemoryStore`], in arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreCall {
    List {
        bucket: String,
        token: Option<String>,
    },
    Delete {
        bucket: String,
        keys: Vec<String>,
    },
}

/// Object store that keeps buckets in process memory.
///
/// Listing uses the last key of the previous page as the continuation
/// token, so deletions running alongside a listing never shift its pages.
/// Faults can be injected for listing calls, whole delete requests and
/// individual keys, and every call is recorded.
pub struct MemoryStore {
    page_size: usize,
    state: Mutex<State>,
}

#[derive(Default)]
struct State {
    buckets: BTreeMap<String, BTreeMap<String, u64>>,
    locked: HashSet<String>,
    fail_list_call: Option<usize>,
    list_calls: usize,
    failing_deletes: usize,
    delete_delay: Duration,
    report_missing: bool,
    calls: Vec<StoreCall>,
    deletes_in_flight: usize,
    max_deletes_in_flight: usize,
    deletes_completed: usize,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    /// Create an empty store returning pages of up to 1000 entries, like S3.
    pub fn new() -> Self {
        Self {
            page_size: MAX_BATCH_SIZE,
            state: Mutex::new(State::default()),
        }
    }

    /// Set the maximum number of entries per listing page.
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    fn state(&self) -> MutexGuard<'_, State> {
        // A panic while holding the lock cannot leave State half-updated.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Create `bucket` if it does not exist.
    pub fn create_bucket(&self, bucket: &str) {
        self.state().buckets.entry(bucket.to_string()).or_default();
    }

    /// Add objects to `bucket`, creating it if needed.
    pub fn insert_all(&self, bucket: &str, entries: impl IntoIterator<Item = ObjectEntry>) {
        let mut state = self.state();
        let objects = state.buckets.entry(bucket.to_string()).or_default();
        for entry in entries {
            objects.insert(entry.key, entry.size);
        }
    }

    /// Reject deletes of `key` with `AccessDenied`, as an object lock would.
    pub fn lock_key(&self, key: &str) {
        self.state().locked.insert(key.to_string());
    }

    /// Fail the `call`-th listing request (1-based).
    pub fn fail_list_call(&self, call: usize) {
        self.state().fail_list_call = Some(call);
    }

    /// Fail the next `count` delete requests as a whole.
    pub fn fail_delete_requests(&self, count: usize) {
        self.state().failing_deletes = count;
    }

    /// Delay every delete request by `delay`.
    pub fn set_delete_delay(&self, delay: Duration) {
        self.state().delete_delay = delay;
    }

    /// Report keys that do not exist as `NoSuchKey` instead of deleted.
    pub fn set_report_missing(&self, report_missing: bool) {
        self.state().report_missing = report_missing;
    }

    /// Number of objects currently in `bucket`.
    pub fn object_count(&self, bucket: &str) -> usize {
        self.state().buckets.get(bucket).map_or(0, BTreeMap::len)
    }

    /// Every call received so far.
    pub fn calls(&self) -> Vec<StoreCall> {
        self.state().calls.clone()
    }

    /// Key sets of every delete call received so far.
    pub fn delete_calls(&self) -> Vec<Vec<String>> {
        self.state()
            .calls
            .iter()
            .filter_map(|call| match call {
                StoreCall::Delete { keys, .. } => Some(keys.clone()),
                StoreCall::List { .. } => None,
            })
            .collect()
    }

    /// Number of listing calls received so far.
    pub fn list_call_count(&self) -> usize {
        self.state().list_calls
    }

    /// Number of delete calls that have returned.
    pub fn deletes_completed(&self) -> usize {
        self.state().deletes_completed
    }

    /// Number of delete calls currently running.
    pub fn deletes_in_flight(&self) -> usize {
        self.state().deletes_in_flight
    }

    /// Highest number of delete calls observed running at once.
    pub fn max_deletes_in_flight(&self) -> usize {
        self.state().max_deletes_in_flight
    }

    fn apply_delete(&self, bucket: &str, batch: &DeleteBatch) -> Result<DeleteOutcome, DeleteError> {
        let mut state = self.state();

        if state.failing_deletes > 0 {
            state.failing_deletes -= 1;
            return Err(DeleteError::Request {
                keys: batch.keys().to_vec(),
                message: "connection reset by peer".to_string(),
            });
        }

        let State {
            buckets,
            locked,
            report_missing,
            ..
        } = &mut *state;
        let objects = buckets.entry(bucket.to_string()).or_default();

        let mut outcome = DeleteOutcome::default();
        for key in batch.keys() {
            if locked.contains(key) {
                outcome.failures.push(KeyFailure::new(
                    key.as_str(),
                    "AccessDenied",
                    "Access Denied because object protected by object lock.",
                ));
            } else if objects.remove(key).is_none() && *report_missing {
                outcome.failures.push(KeyFailure::new(
                    key.as_str(),
                    NO_SUCH_KEY_CODE,
                    "The specified key does not exist.",
                ));
            } else {
                outcome.deleted.push(key.clone());
            }
        }

        Ok(outcome)
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn list_page(
        &self,
        bucket: &str,
        token: Option<&str>,
    ) -> Result<ObjectPage, ListingError> {
        let mut state = self.state();
        state.list_calls += 1;
        state.calls.push(StoreCall::List {
            bucket: bucket.to_string(),
            token: token.map(str::to_string),
        });

        if state.fail_list_call == Some(state.list_calls) {
            return Err(ListingError::Request {
                bucket: bucket.to_string(),
                message: "connection reset by peer".to_string(),
            });
        }

        let objects = state
            .buckets
            .get(bucket)
            .ok_or_else(|| ListingError::NoSuchBucket(bucket.to_string()))?;

        let start = match token {
            Some(after) => Bound::Excluded(after),
            None => Bound::Unbounded,
        };
        let mut remaining = objects
            .range::<str, _>((start, Bound::Unbounded))
            .peekable();

        let mut entries = Vec::with_capacity(self.page_size.min(objects.len()));
        while entries.len() < self.page_size {
            match remaining.next() {
                Some((key, size)) => entries.push(ObjectEntry::new(key.as_str(), *size)),
                None => break,
            }
        }

        let next_token = if remaining.peek().is_some() {
            entries.last().map(|e| e.key.clone())
        } else {
            None
        };

        Ok(ObjectPage::new(entries, next_token))
    }

    async fn delete_objects(
        &self,
        bucket: &str,
        batch: &DeleteBatch,
    ) -> Result<DeleteOutcome, DeleteError> {
        let delay = {
            let mut state = self.state();
            state.calls.push(StoreCall::Delete {
                bucket: bucket.to_string(),
                keys: batch.keys().to_vec(),
            });
            state.deletes_in_flight += 1;
            state.max_deletes_in_flight = state.max_deletes_in_flight.max(state.deletes_in_flight);
            state.delete_delay
        };

        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let result = self.apply_delete(bucket, batch);

        let mut state = self.state();
        state.deletes_in_flight -= 1;
        state.deletes_completed += 1;

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn populated(n: usize, page_size: usize) -> MemoryStore {
        let store = MemoryStore::new().with_page_size(page_size);
        store.insert_all(
            "bucket",
            (0..n).map(|i| ObjectEntry::new(format!("key-{i:03}"), 10)),
        );
        store
    }

    #[tokio::test]
    async fn test_list_pages_with_tokens() {
        let store = populated(5, 2);

        let first = store.list_page("bucket", None).await.unwrap();
        assert_eq!(first.keys(), vec!["key-000", "key-001"]);
        assert_eq!(first.next_token.as_deref(), Some("key-001"));

        let second = store
            .list_page("bucket", first.next_token.as_deref())
            .await
            .unwrap();
        assert_eq!(second.keys(), vec!["key-002", "key-003"]);

        let third = store
            .list_page("bucket", second.next_token.as_deref())
            .await
            .unwrap();
        assert_eq!(third.keys(), vec!["key-004"]);
        assert!(third.next_token.is_none());
        assert_eq!(store.list_call_count(), 3);
    }

    #[tokio::test]
    async fn test_list_exact_multiple_has_no_trailing_token() {
        let store = populated(4, 2);
        let first = store.list_page("bucket", None).await.unwrap();
        let second = store
            .list_page("bucket", first.next_token.as_deref())
            .await
            .unwrap();
        assert_eq!(second.len(), 2);
        assert!(second.next_token.is_none());
    }

    #[tokio::test]
    async fn test_list_missing_bucket() {
        let store = MemoryStore::new();
        let result = store.list_page("nope", None).await;
        assert_eq!(result, Err(ListingError::NoSuchBucket("nope".to_string())));
    }

    #[tokio::test]
    async fn test_list_failure_injection() {
        let store = populated(5, 2);
        store.fail_list_call(2);

        let first = store.list_page("bucket", None).await.unwrap();
        let second = store.list_page("bucket", first.next_token.as_deref()).await;
        assert!(matches!(second, Err(ListingError::Request { .. })));
    }

    #[tokio::test]
    async fn test_delete_missing_keys() {
        let store = populated(1, 10);
        let batch = DeleteBatch::new(vec!["key-000".to_string(), "ghost".to_string()]).unwrap();

        let outcome = store.delete_objects("bucket", &batch).await.unwrap();
        assert_eq!(outcome.succeeded(), 2);

        store.set_report_missing(true);
        let outcome = store.delete_objects("bucket", &batch).await.unwrap();
        assert_eq!(outcome.succeeded(), 0);
        assert!(outcome.failures.iter().all(|f| f.code == NO_SUCH_KEY_CODE));
        assert_eq!(store.deletes_completed(), 2);
        assert_eq!(store.deletes_in_flight(), 0);
    }
}
