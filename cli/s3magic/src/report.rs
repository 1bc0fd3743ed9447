//! Final run report.

use std::fmt::Write as _;

use anyhow::Result;
use sm_purger::RunSummary;

use crate::args::OutputFormat;

/// Exit code for a run where every object was deleted.
pub const EXIT_SUCCESS: i32 = 0;

/// Exit code for a run that could not complete.
pub const EXIT_FATAL: i32 = 1;

/// Exit code for a run that completed with failed keys.
pub const EXIT_PARTIAL_FAILURE: i32 = 4;

/// Map the result of a run to the process exit code.
pub fn exit_code(result: &Result<RunSummary>) -> i32 {
    match result {
        Err(_) => EXIT_FATAL,
        Ok(summary) if summary.has_failures() => EXIT_PARTIAL_FAILURE,
        Ok(_) => EXIT_SUCCESS,
    }
}

/// Print the report in the requested format.
///
/// Text goes to stderr next to the logs; JSON goes to stdout.
pub fn print_report(summary: &RunSummary, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Text => eprint!("{}", render_text(summary)),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(summary)?),
    }
    Ok(())
}

/// Render the human-readable report.
pub fn render_text(summary: &RunSummary) -> String {
    let mut out = String::new();

    // Writing to a String cannot fail
    let _ = writeln!(out);
    let _ = writeln!(out, "Delete completed for s3://{}:", summary.bucket);
    let _ = writeln!(
        out,
        "  Objects listed:   {} ({})",
        format_number(summary.objects_listed as u64),
        format_bytes(summary.bytes_listed)
    );
    let _ = writeln!(out, "  Pages listed:     {}", format_number(summary.pages_listed as u64));
    let _ = writeln!(out, "  Batches:          {}", format_number(summary.batches as u64));
    let _ = writeln!(out, "  Succeeded:        {}", format_number(summary.succeeded as u64));
    let _ = writeln!(out, "  Failed:           {}", format_number(summary.failed as u64));

    if summary.request_errors > 0 {
        let _ = writeln!(out, "  Request errors:   {}", summary.request_errors);
    }

    if let Some(preliminary) = &summary.preliminary {
        let _ = writeln!(
            out,
            "  First pass:       {} succeeded, {} failed in {} batches",
            format_number(preliminary.succeeded as u64),
            format_number(preliminary.failed as u64),
            preliminary.batches
        );
    }

    if let Some(duration) = summary.duration() {
        let _ = writeln!(
            out,
            "  Duration:         {:.2}s",
            duration.num_milliseconds() as f64 / 1000.0
        );

        if let Some(ops) = summary.objects_per_second() {
            let _ = writeln!(out, "  Throughput:       {:.1} objects/sec", ops);
        }
    }

    for failure in &summary.failures {
        let _ = writeln!(
            out,
            "  Failed: {}: {} ({})",
            failure.key, failure.message, failure.code
        );
    }

    out
}

/// Format bytes as human-readable string.
pub fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;
    const TB: u64 = GB * 1024;

    if bytes >= TB {
        format!("{:.2} TB", bytes as f64 / TB as f64)
    } else if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} bytes", bytes)
    }
}

/// Format a large number with commas for readability.
pub fn format_number(n: u64) -> String {
    let digits = n.to_string();
    let mut result = String::with_capacity(digits.len() + digits.len() / 3);

    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            result.push(',');
        }
        result.push(c);
    }

    result
}
