//! CLI argument definitions for s3magic.

use clap::{Args, Parser, Subcommand, ValueEnum};
use sm_purger::{MAX_CONCURRENCY, PassMode};

/// s3magic is a CLI tool for managing AWS S3 buckets and objects.
///
/// ## Examples
///
/// Empty a bucket:
///   s3magic delete my-bucket
///
/// Against LocalStack, with a higher request concurrency:
///   s3magic delete my-bucket --s3-endpoint http://localhost:4566 --concurrency 32
///
/// Machine-readable summary on stdout:
///   s3magic delete my-bucket --output-format json
#[derive(Parser, Debug)]
#[command(name = "s3magic")]
#[command(version, about, long_about = None)]
#[command(arg_required_else_help = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Log level
    #[arg(long, value_enum, default_value = "info", global = true)]
    pub log_level: LogLevel,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Delete every object in a bucket
    Delete(DeleteArgs),
}

/// Arguments for `s3magic delete`.
#[derive(Args, Debug)]
pub struct DeleteArgs {
    /// Bucket to empty
    pub bucket: String,

    // === S3 Configuration ===
    /// Custom S3 endpoint URL (for LocalStack or MinIO)
    #[arg(long, env = "S3MAGIC_S3_ENDPOINT")]
    pub s3_endpoint: Option<String>,

    /// AWS region
    #[arg(long, env = "AWS_REGION", default_value = "us-east-1")]
    pub region: String,

    /// AWS access key ID
    #[arg(long, env = "AWS_ACCESS_KEY_ID", hide_env_values = true)]
    pub access_key: Option<String>,

    /// AWS secret access key
    #[arg(long, env = "AWS_SECRET_ACCESS_KEY", hide_env_values = true)]
    pub secret_key: Option<String>,

    /// AWS profile name
    #[arg(long, env = "AWS_PROFILE")]
    pub profile: Option<String>,

    // === Pipeline Options ===
    /// Maximum concurrent delete requests (1 to 4096)
    #[arg(long, default_value = "16", value_parser = parse_concurrency)]
    pub concurrency: usize,

    /// Number of delete passes over the listing
    #[arg(long, value_enum, default_value = "single")]
    pub passes: PassArg,

    /// Deadline for a single delete request in seconds (0 = none)
    #[arg(long, default_value = "0")]
    pub batch_timeout_secs: u64,

    /// SDK operation timeout for every S3 call in seconds (0 = SDK default)
    #[arg(long, default_value = "0")]
    pub request_timeout_secs: u64,

    // === Output Options ===
    /// Format of the final report
    #[arg(long, value_enum, default_value = "text")]
    pub output_format: OutputFormat,
}

/// Delete pass argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PassArg {
    /// Delete each page once, as it is listed
    Single,
    /// Delete each page as it is listed and again after listing completes
    Double,
}

impl From<PassArg> for PassMode {
    fn from(arg: PassArg) -> Self {
        match arg {
            PassArg::Single => PassMode::Single,
            PassArg::Double => PassMode::Double,
        }
    }
}

/// Report format argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable report on stderr
    Text,
    /// JSON summary on stdout
    Json,
}

/// Log level argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    /// Trace level (most verbose)
    Trace,
    /// Debug level
    Debug,
    /// Info level (default)
    Info,
    /// Warning level
    Warn,
    /// Error level (least verbose)
    Error,
}

impl From<LogLevel> for tracing::Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => tracing::Level::TRACE,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Error => tracing::Level::ERROR,
        }
    }
}

/// Parse a concurrency limit in `1..=MAX_CONCURRENCY`.
fn parse_concurrency(s: &str) -> Result<usize, String> {
    let value: usize = s
        .parse()
        .map_err(|_| format!("'{}' is not a valid number", s))?;
    if !(1..=MAX_CONCURRENCY).contains(&value) {
        return Err(format!("{} is not in 1..={}", value, MAX_CONCURRENCY));
    }
    Ok(value)
}
