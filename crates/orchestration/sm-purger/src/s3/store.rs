//! [`ObjectStore`] implementation over the AWS S3 SDK.

use async_trait::async_trait;
use aws_sdk_s3::Client;
use aws_sdk_s3::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_s3::operation::list_objects_v2::ListObjectsV2Error;
use aws_sdk_s3::types::{Delete, ObjectIdentifier};
use sm_error::{DeleteError, ListingError, Result};

use super::client::{S3Config, create_s3_client};
use crate::batch::{DeleteBatch, DeleteOutcome, KeyFailure};
use crate::store::{ObjectEntry, ObjectPage, ObjectStore};

/// Object store backed by S3 `ListObjectsV2` and `DeleteObjects`.
#[derive(Debug, Clone)]
pub struct S3Store {
    client: Client,
}

impl S3Store {
    /// Wrap an existing S3 client.
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Create a client from `config` and wrap it.
    pub async fn from_config(config: &S3Config) -> Result<Self> {
        Ok(Self::new(create_s3_client(config).await?))
    }

    pub fn client(&self) -> &Client {
        &self.client
    }
}

#[async_trait]
impl ObjectStore for S3Store {
    async fn list_page(
        &self,
        bucket: &str,
        token: Option<&str>,
    ) -> std::result::Result<ObjectPage, ListingError> {
        let mut req = self.client.list_objects_v2().bucket(bucket);

        if let Some(token) = token {
            req = req.continuation_token(token);
        }

        let resp = req.send().await.map_err(|e| listing_error(bucket, e))?;

        let entries = resp
            .contents
            .unwrap_or_default()
            .into_iter()
            .filter_map(|obj| {
                let key = obj.key.filter(|k| !k.is_empty())?;
                Some(ObjectEntry::new(key, obj.size.unwrap_or(0).max(0) as u64))
            })
            .collect();

        let next_token = if resp.is_truncated == Some(true) {
            resp.next_continuation_token
        } else {
            None
        };

        Ok(ObjectPage::new(entries, next_token))
    }

    async fn delete_objects(
        &self,
        bucket: &str,
        batch: &DeleteBatch,
    ) -> std::result::Result<DeleteOutcome, DeleteError> {
        let request_error = |message: String| DeleteError::Request {
            keys: batch.keys().to_vec(),
            message,
        };

        let objects = batch
            .keys()
            .iter()
            .map(|key| ObjectIdentifier::builder().key(key).build())
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| request_error(format!("Invalid object identifier: {e}")))?;

        // Quiet mode would omit deleted keys from the response
        let delete = Delete::builder()
            .set_objects(Some(objects))
            .quiet(false)
            .build()
            .map_err(|e| request_error(format!("Invalid delete request: {e}")))?;

        let resp = self
            .client
            .delete_objects()
            .bucket(bucket)
            .delete(delete)
            .send()
            .await
            .map_err(|e| request_error(DisplayErrorContext(&e).to_string()))?;

        let deleted = resp
            .deleted
            .unwrap_or_default()
            .into_iter()
            .filter_map(|d| d.key)
            .collect();

        let failures = resp
            .errors
            .unwrap_or_default()
            .into_iter()
            .filter_map(|e| {
                Some(KeyFailure::new(
                    e.key?,
                    e.code.unwrap_or_else(|| "Unknown".to_string()),
                    e.message.unwrap_or_default(),
                ))
            })
            .collect();

        Ok(DeleteOutcome::new(deleted, failures))
    }
}

/// Map a listing failure onto the listing error taxonomy.
fn listing_error(bucket: &str, error: SdkError<ListObjectsV2Error>) -> ListingError {
    let message = DisplayErrorContext(&error).to_string();

    match error.code() {
        Some("NoSuchBucket") => ListingError::NoSuchBucket(bucket.to_string()),
        Some("AccessDenied") | Some("AllAccessDisabled") | Some("InvalidAccessKeyId") => {
            ListingError::AccessDenied {
                bucket: bucket.to_string(),
                message,
            }
        }
        _ => ListingError::Request {
            bucket: bucket.to_string(),
            message,
        },
    }
}
