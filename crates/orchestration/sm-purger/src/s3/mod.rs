//! S3 client and store functionality.
//!
//! This module provides S3 operations for the delete pipeline:
//! - Client configuration with LocalStack support
//! - [`S3Store`], the [`ObjectStore`](crate::store::ObjectStore) backed by `ListObjectsV2` and `DeleteObjects`

mod client;
mod store;

pub use client::{S3Config, create_s3_client};
pub use store::S3Store;
