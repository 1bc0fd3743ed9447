//! sm-purger - Bulk deletion of S3 bucket contents for s3magic.
//!
//! This crate walks a bucket listing page by page and deletes what it finds
//! in batches of up to 1000 keys. It supports:
//!
//! - Paginated listing exposed as a lazy stream of pages
//! - Batch deletion with per-key failure reporting
//! - Listing and deletion overlapped on concurrent tasks, with a
//!   configurable concurrency limit
//! - Single or double deletion passes
//! - An in-memory store for tests and local experiments
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use sm_purger::{DeleteOrchestrator, PurgeConfig, S3Config, S3Store};
//!
//! let s3_config = S3Config::new("my-bucket").with_region("us-east-1");
//! let store = S3Store::from_config(&s3_config).await?;
//!
//! let config = PurgeConfig::new().with_concurrency(8);
//! let orchestrator = DeleteOrchestrator::new(Arc::new(store), "my-bucket", config);
//!
//! let summary = orchestrator.run().await?;
//! eprintln!("Deleted {} objects, {} failed", summary.succeeded, summary.failed);
//! ```

pub mod batch;
pub mod config;
pub mod orchestrator;
pub mod pager;
pub mod s3;
pub mod store;
pub mod summary;

pub use batch::{BatchDeleter, DeleteBatch, DeleteOutcome, KeyFailure, MAX_BATCH_SIZE};
pub use config::{MAX_CONCURRENCY, PassMode, PurgeConfig};
pub use orchestrator::DeleteOrchestrator;
pub use pager::ListingPager;
pub use s3::{S3Config, S3Store, create_s3_client};
pub use store::{MemoryStore, ObjectEntry, ObjectKey, ObjectPage, ObjectStore, StoreCall};
pub use summary::{PreliminaryStats, RunSummary};
