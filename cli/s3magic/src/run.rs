//! Main execution logic for the s3magic CLI.

use std::sync::Arc;

use anyhow::Result;
use sm_purger::{DeleteOrchestrator, PurgeConfig, RunSummary, S3Config, S3Store};
use tracing::{Level, info};
use tracing_subscriber::fmt;

use crate::args::{DeleteArgs, LogLevel};

/// Initialize logging.
pub fn init_logging(level: LogLevel) -> Result<()> {
    let level: Level = level.into();

    let subscriber = fmt::Subscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr); // stdout carries the JSON report

    subscriber.init();

    Ok(())
}

/// Empty the bucket named in `args`.
pub async fn execute(args: DeleteArgs) -> Result<RunSummary> {
    let s3_config = build_s3_config(&args);
    let store = S3Store::from_config(&s3_config).await?;

    let config = build_purge_config(&args);

    info!(
        bucket = %args.bucket,
        concurrency = config.concurrency,
        passes = ?config.pass_mode,
        "Starting delete"
    );

    let orchestrator = DeleteOrchestrator::new(Arc::new(store), &args.bucket, config);
    let summary = orchestrator.run().await?;

    Ok(summary)
}

fn build_s3_config(args: &DeleteArgs) -> S3Config {
    let mut s3_config = S3Config::new(&args.bucket)
        .with_region(&args.region)
        .with_timeout(args.request_timeout_secs);

    if let Some(endpoint) = &args.s3_endpoint {
        s3_config = s3_config.with_endpoint(endpoint);
    }

    if let (Some(access_key), Some(secret_key)) = (&args.access_key, &args.secret_key) {
        s3_config = s3_config.with_credentials(access_key, secret_key);
    }

    if let Some(profile) = &args.profile {
        s3_config = s3_config.with_profile(profile);
    }

    s3_config
}

fn build_purge_config(args: &DeleteArgs) -> PurgeConfig {
    PurgeConfig::new()
        .with_concurrency(args.concurrency)
        .with_pass_mode(args.passes.into())
        .with_batch_timeout_secs(args.batch_timeout_secs)
}
