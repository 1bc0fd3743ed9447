//! Bucket purge integration tests using LocalStack.

use crate::common::{LocalStackTestContext, test_keys};
use sm_error::{ListingError, SmError};
use sm_purger::{
    DeleteBatch, DeleteOrchestrator, ObjectStore, PassMode, PurgeConfig, S3Store,
};
use std::sync::Arc;

async fn context() -> Option<LocalStackTestContext> {
    let ctx = LocalStackTestContext::new().await;

    if !ctx.is_available().await {
        eprintln!("LocalStack not available, skipping test");
        return None;
    }

    Some(ctx)
}

#[tokio::test]
#[ignore = "requires LocalStack"]
async fn test_empty_bucket_across_pages() {
    let Some(ctx) = context().await else {
        return;
    };

    let bucket = "test-purge-many";
    ctx.create_bucket(bucket).await.unwrap();
    ctx.put_objects(bucket, &test_keys(1500)).await.unwrap();

    let store = S3Store::from_config(&ctx.s3_config(bucket)).await.unwrap();
    let orchestrator = DeleteOrchestrator::new(
        Arc::new(store),
        bucket,
        PurgeConfig::new().with_concurrency(4),
    );

    let summary = orchestrator.run().await.unwrap();

    assert_eq!(summary.pages_listed, 2);
    assert_eq!(summary.objects_listed, 1500);
    assert_eq!(summary.succeeded, 1500);
    assert_eq!(summary.failed, 0);
    assert!(summary.preliminary.is_none());
    assert_eq!(ctx.count_objects(bucket).await.unwrap(), 0);
}

#[tokio::test]
#[ignore = "requires LocalStack"]
async fn test_double_pass_reports_second_pass() {
    let Some(ctx) = context().await else {
        return;
    };

    let bucket = "test-purge-double";
    ctx.create_bucket(bucket).await.unwrap();
    ctx.put_objects(bucket, &test_keys(50)).await.unwrap();

    let store = S3Store::from_config(&ctx.s3_config(bucket)).await.unwrap();
    let config = PurgeConfig::new().with_pass_mode(PassMode::Double);
    let orchestrator = DeleteOrchestrator::new(Arc::new(store), bucket, config);

    let summary = orchestrator.run().await.unwrap();

    // S3 reports already-deleted keys as deleted, so the second pass is clean
    assert_eq!(summary.succeeded, 50);
    assert_eq!(summary.failed, 0);
    let preliminary = summary.preliminary.unwrap();
    assert_eq!(preliminary.succeeded, 50);
    assert_eq!(ctx.count_objects(bucket).await.unwrap(), 0);
}

#[tokio::test]
#[ignore = "requires LocalStack"]
async fn test_empty_bucket_is_not_an_error() {
    let Some(ctx) = context().await else {
        return;
    };

    let bucket = "test-purge-empty";
    ctx.create_bucket(bucket).await.unwrap();

    let store = S3Store::from_config(&ctx.s3_config(bucket)).await.unwrap();
    let orchestrator = DeleteOrchestrator::new(Arc::new(store), bucket, PurgeConfig::new());

    let summary = orchestrator.run().await.unwrap();

    assert_eq!(summary.pages_listed, 1);
    assert_eq!(summary.total(), 0);
    assert!(!summary.has_failures());
}

#[tokio::test]
#[ignore = "requires LocalStack"]
async fn test_missing_bucket_is_fatal() {
    let Some(ctx) = context().await else {
        return;
    };

    let bucket = "test-purge-does-not-exist";
    let store = S3Store::from_config(&ctx.s3_config(bucket)).await.unwrap();
    let orchestrator = DeleteOrchestrator::new(Arc::new(store), bucket, PurgeConfig::new());

    let err = orchestrator.run().await.unwrap_err();

    assert!(matches!(
        err,
        SmError::Listing(ListingError::NoSuchBucket(ref name)) if name == bucket
    ));
}

#[tokio::test]
#[ignore = "requires LocalStack"]
async fn test_store_lists_and_deletes() {
    let Some(ctx) = context().await else {
        return;
    };

    let bucket = "test-purge-store";
    ctx.create_bucket(bucket).await.unwrap();
    ctx.put_objects(bucket, &test_keys(3)).await.unwrap();

    let store = S3Store::from_config(&ctx.s3_config(bucket)).await.unwrap();

    let page = store.list_page(bucket, None).await.unwrap();
    assert_eq!(page.len(), 3);
    assert!(page.next_token.is_none());

    let batch = DeleteBatch::new(page.keys()).unwrap();
    let outcome = store.delete_objects(bucket, &batch).await.unwrap();

    assert_eq!(outcome.succeeded(), 3);
    assert!(!outcome.has_failures());
    assert_eq!(ctx.count_objects(bucket).await.unwrap(), 0);
}
