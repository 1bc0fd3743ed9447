//! LocalStack test context and utilities.

use aws_sdk_s3::Client as S3Client;
use aws_sdk_s3::config::{Credentials, Region};
use futures::future::try_join_all;
use sm_purger::S3Config;

/// Uploads issued concurrently while seeding a bucket.
const UPLOAD_CHUNK: usize = 100;

/// LocalStack test context providing an S3 client.
pub struct LocalStackTestContext {
    pub s3: S3Client,
    pub endpoint: String,
    pub region: String,
}

impl LocalStackTestContext {
    /// Create a new LocalStack test context.
    ///
    /// Uses the `LOCALSTACK_ENDPOINT` environment variable if set,
    /// otherwise defaults to `http://localhost:4566`.
    pub async fn new() -> Self {
        let endpoint = std::env::var("LOCALSTACK_ENDPOINT")
            .unwrap_or_else(|_| "http://localhost:4566".to_string());
        let region = "us-east-1".to_string();

        let config = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(Region::new(region.clone()))
            .endpoint_url(&endpoint)
            .credentials_provider(Credentials::new("test", "test", None, None, "localstack"))
            .load()
            .await;

        let s3_config = aws_sdk_s3::config::Builder::from(&config)
            .force_path_style(true)
            .build();

        Self {
            s3: S3Client::from_conf(s3_config),
            endpoint,
            region,
        }
    }

    /// Check if LocalStack is available and healthy.
    pub async fn is_available(&self) -> bool {
        self.s3.list_buckets().send().await.is_ok()
    }

    /// Store configuration pointing at this LocalStack instance.
    pub fn s3_config(&self, bucket: &str) -> S3Config {
        S3Config::new(bucket)
            .with_region(&self.region)
            .with_endpoint(&self.endpoint)
            .with_credentials("test", "test")
    }

    /// Create an S3 bucket for testing.
    pub async fn create_bucket(&self, name: &str) -> Result<(), aws_sdk_s3::Error> {
        let buckets = self.s3.list_buckets().send().await?;
        let exists = buckets
            .buckets()
            .iter()
            .any(|b| b.name().unwrap_or_default() == name);

        if !exists {
            self.s3.create_bucket().bucket(name).send().await?;
        }
        Ok(())
    }

    /// Upload a small object.
    pub async fn put_object(&self, bucket: &str, key: &str) -> Result<(), aws_sdk_s3::Error> {
        self.s3
            .put_object()
            .bucket(bucket)
            .key(key)
            .body(format!("contents of {key}").into_bytes().into())
            .send()
            .await?;
        Ok(())
    }

    /// Upload every key in `keys`, a chunk at a time.
    pub async fn put_objects(&self, bucket: &str, keys: &[String]) -> Result<(), aws_sdk_s3::Error> {
        for chunk in keys.chunks(UPLOAD_CHUNK) {
            try_join_all(chunk.iter().map(|key| self.put_object(bucket, key))).await?;
        }
        Ok(())
    }

    /// Count the objects currently in `bucket`.
    pub async fn count_objects(&self, bucket: &str) -> Result<usize, aws_sdk_s3::Error> {
        let mut count = 0;
        let mut token: Option<String> = None;

        loop {
            let resp = self
                .s3
                .list_objects_v2()
                .bucket(bucket)
                .set_continuation_token(token.take())
                .send()
                .await?;

            count += resp.contents().len();

            match resp.next_continuation_token {
                Some(next) if resp.is_truncated == Some(true) => token = Some(next),
                _ => return Ok(count),
            }
        }
    }
}

/// Generate `count` distinct keys spread over a few prefixes.
pub fn test_keys(count: usize) -> Vec<String> {
    (0..count)
        .map(|i| format!("data/{:02}/object-{:05}.txt", i % 7, i))
        .collect()
}
