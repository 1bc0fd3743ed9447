//! s3magic CLI
//!
//! Bulk object management for S3 buckets.

use clap::Parser;

mod args;
mod report;
mod run;

use args::{Cli, Command};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging (to stderr, so stdout is clean for the JSON report)
    run::init_logging(cli.log_level)?;

    match cli.command {
        Command::Delete(args) => {
            let format = args.output_format;
            let result = run::execute(args).await;
            let code = report::exit_code(&result);

            // Fatal errors surface through main's Err, which exits with 1
            let summary = result?;
            report::print_report(&summary, format)?;

            if code != report::EXIT_SUCCESS {
                std::process::exit(code);
            }
        }
    }

    Ok(())
}
