//! Object store boundary consumed by the delete pipeline.
//!
//! This module provides the [`ObjectStore`] trait and the page types it
//! returns. Implementations:
//! - [`S3Store`](crate::s3::S3Store) - AWS S3 (and S3-compatible endpoints)
//! - [`MemoryStore`] - In-process store with fault injection, for tests

mod memory;

pub use memory::{MemoryStore, StoreCall};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sm_error::{DeleteError, ListingError};

use crate::batch::{DeleteBatch, DeleteOutcome};

/// Opaque key identifying one object within a bucket.
pub type ObjectKey = String;

/// An object entry returned by a listing call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectEntry {
    /// The object key (full path within the bucket)
    pub key: ObjectKey,

    /// Size of the object in bytes
    pub size: u64,
}

impl ObjectEntry {
    pub fn new(key: impl Into<String>, size: u64) -> Self {
        Self {
            key: key.into(),
            size,
        }
    }
}

/// One page of a bucket listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObjectPage {
    /// Entries in listing order
    pub entries: Vec<ObjectEntry>,

    /// Token for the next page, absent on the last page
    pub next_token: Option<String>,
}

impl ObjectPage {
    /// Create a page from its entries and continuation token.
    pub fn new(entries: Vec<ObjectEntry>, next_token: Option<String>) -> Self {
        Self {
            entries,
            next_token,
        }
    }

    /// Keys of every entry on this page, in listing order.
    pub fn keys(&self) -> Vec<ObjectKey> {
        self.entries.iter().map(|e| e.key.clone()).collect()
    }

    /// Number of entries on this page.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the page has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Total size in bytes of the objects on this page.
    pub fn total_bytes(&self) -> u64 {
        self.entries.iter().map(|e| e.size).sum()
    }
}

/// Trait for object storage backends.
///
/// Handles are shared across deletion tasks, so implementations must not
/// keep per-call mutable state that affects results.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// List one page of the bucket, continuing from `token` if given.
    async fn list_page(
        &self,
        bucket: &str,
        token: Option<&str>,
    ) -> Result<ObjectPage, ListingError>;

    /// Delete every key of `batch` in a single request.
    ///
    /// Per-key rejections are reported in the outcome. An `Err` means the
    /// request as a whole failed.
    async fn delete_objects(
        &self,
        bucket: &str,
        batch: &DeleteBatch,
    ) -> Result<DeleteOutcome, DeleteError>;
}
