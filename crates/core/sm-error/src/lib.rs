//! Error types for s3magic.
//!
//! This crate provides:
//! - [`SmError`] - Top-level error enum for the delete pipeline
//! - [`ListingError`] - Failures while walking a bucket listing (fatal to a run)
//! - [`DeleteError`] - Failures while building or sending a delete batch
//! - [`DeleteError::is_contract_violation`] to separate caller bugs from backend failures

use thiserror::Error;

/// Top-level error type for s3magic.
#[derive(Error, Debug)]
pub enum SmError {
    /// Listing errors (always fatal to a run)
    #[error("Listing error: {0}")]
    Listing(#[from] ListingError),

    /// Delete errors (batch construction or whole-batch request failure)
    #[error("Delete error: {0}")]
    Delete(#[from] DeleteError),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Generic errors (wrapped anyhow)
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Errors raised by a listing call.
///
/// A listing cannot be resumed safely after a mid-stream failure, so every
/// variant aborts the run.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ListingError {
    /// The bucket does not exist
    #[error("Bucket not found: {0}")]
    NoSuchBucket(String),

    /// The caller may not list the bucket
    #[error("Access denied listing {bucket}: {message}")]
    AccessDenied { bucket: String, message: String },

    /// Transport or service failure
    #[error("List request failed for {bucket}: {message}")]
    Request { bucket: String, message: String },
}

/// Errors raised while building or sending a delete batch.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DeleteError {
    /// More keys than a single delete request accepts
    #[error("Batch of {size} keys exceeds the limit of {limit}")]
    BatchTooLarge { size: usize, limit: usize },

    /// A batch must carry at least one key
    #[error("Batch contains no keys")]
    EmptyBatch,

    /// The whole request failed; every key in it is unaccounted for
    #[error("Delete request for {} keys failed: {message}", keys.len())]
    Request { keys: Vec<String>, message: String },
}

impl DeleteError {
    /// Returns true for errors that indicate a bug in the caller rather than
    /// a backend failure.
    pub fn is_contract_violation(&self) -> bool {
        matches!(self, Self::BatchTooLarge { .. } | Self::EmptyBatch)
    }
}

impl SmError {
    /// Returns true if this error must abort a delete run.
    pub fn is_fatal(&self) -> bool {
        match self {
            Self::Listing(_) => true,
            Self::Delete(e) => e.is_contract_violation(),
            Self::Config(_) => true,
            Self::Other(_) => true,
        }
    }
}

/// Result type alias using SmError.
pub type Result<T> = std::result::Result<T, SmError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_listing_error_is_fatal() {
        let error = SmError::Listing(ListingError::NoSuchBucket("missing".to_string()));
        assert!(error.is_fatal());
    }

    #[test]
    fn test_request_error_is_not_fatal() {
        let error = SmError::Delete(DeleteError::Request {
            keys: vec!["a".to_string(), "b".to_string()],
            message: "connection reset".to_string(),
        });
        assert!(!error.is_fatal());
    }

    #[test]
    fn test_contract_violations() {
        assert!(
            DeleteError::BatchTooLarge {
                size: 1001,
                limit: 1000
            }
            .is_contract_violation()
        );
        assert!(DeleteError::EmptyBatch.is_contract_violation());
        assert!(
            !DeleteError::Request {
                keys: vec![],
                message: "timeout".to_string()
            }
            .is_contract_violation()
        );
    }

    #[test]
    fn test_error_display() {
        let error = SmError::Delete(DeleteError::BatchTooLarge {
            size: 1500,
            limit: 1000,
        });
        assert_eq!(
            error.to_string(),
            "Delete error: Batch of 1500 keys exceeds the limit of 1000"
        );

        let error = DeleteError::Request {
            keys: vec!["a".to_string(), "b".to_string(), "c".to_string()],
            message: "503 Service Unavailable".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Delete request for 3 keys failed: 503 Service Unavailable"
        );
    }

    #[test]
    fn test_listing_error_display() {
        let error = ListingError::AccessDenied {
            bucket: "private".to_string(),
            message: "not allowed".to_string(),
        };
        assert!(error.to_string().contains("Access denied listing private"));
    }
}
