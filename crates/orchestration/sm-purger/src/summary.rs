//! Statistics for delete runs.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::batch::{DeleteOutcome, KeyFailure};

/// Counts for the pass that does not decide the final result.
///
/// Only filled in double-pass runs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreliminaryStats {
    pub batches: usize,
    pub succeeded: usize,
    pub failed: usize,
}

/// Aggregate result of one delete run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunSummary {
    /// Bucket the run targeted
    pub bucket: String,

    /// When the run started
    pub started_at: Option<DateTime<Utc>>,

    /// When the run completed
    pub completed_at: Option<DateTime<Utc>>,

    /// Listing pages received
    pub pages_listed: usize,

    /// Objects seen across all listing pages
    pub objects_listed: usize,

    /// Bytes seen across all listing pages
    pub bytes_listed: u64,

    /// Delete batches whose outcome decides the final result
    pub batches: usize,

    /// Batches that failed as a whole
    pub request_errors: usize,

    /// Objects deleted successfully
    pub succeeded: usize,

    /// Objects that could not be deleted
    pub failed: usize,

    /// Every object that could not be deleted
    pub failures: Vec<KeyFailure>,

    /// Outcomes of the non-authoritative pass
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preliminary: Option<PreliminaryStats>,
}

impl RunSummary {
    /// Create a summary for `bucket` with the current time as start time.
    pub fn new(bucket: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            started_at: Some(Utc::now()),
            ..Default::default()
        }
    }

    /// Mark the run as complete with the current time.
    pub fn complete(&mut self) {
        self.completed_at = Some(Utc::now());
    }

    /// Record a listing page of `objects` entries totalling `bytes`.
    pub fn record_page(&mut self, objects: usize, bytes: u64) {
        self.pages_listed += 1;
        self.objects_listed += objects;
        self.bytes_listed += bytes;
    }

    /// Merge a batch outcome that decides the final result.
    pub fn record_outcome(&mut self, outcome: DeleteOutcome) {
        self.batches += 1;
        self.succeeded += outcome.succeeded();
        self.failed += outcome.failed();
        self.failures.extend(outcome.failures);
    }

    /// Merge the outcome of a batch that failed as a whole.
    pub fn record_request_error(&mut self, outcome: DeleteOutcome) {
        self.request_errors += 1;
        self.record_outcome(outcome);
    }

    /// Merge an outcome of the non-authoritative pass.
    pub fn record_preliminary(&mut self, outcome: &DeleteOutcome) {
        let stats = self.preliminary.get_or_insert_with(PreliminaryStats::default);
        stats.batches += 1;
        stats.succeeded += outcome.succeeded();
        stats.failed += outcome.failed();
    }

    /// Number of objects accounted for.
    pub fn total(&self) -> usize {
        self.succeeded + self.failed
    }

    /// Check if any object could not be deleted.
    pub fn has_failures(&self) -> bool {
        self.failed > 0
    }

    /// Get the duration of the run.
    pub fn duration(&self) -> Option<Duration> {
        match (self.started_at, self.completed_at) {
            (Some(start), Some(end)) => Some(end - start),
            _ => None,
        }
    }

    /// Calculate the throughput in deleted objects per second.
    pub fn objects_per_second(&self) -> Option<f64> {
        self.duration().map(|d| {
            let secs = d.num_milliseconds() as f64 / 1000.0;
            if secs > 0.0 {
                self.succeeded as f64 / secs
            } else {
                0.0
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;
    use std::time::Duration as StdDuration;

    fn outcome(deleted: &[&str], failed: &[&str]) -> DeleteOutcome {
        DeleteOutcome::new(
            deleted.iter().map(|k| k.to_string()).collect(),
            failed
                .iter()
                .map(|k| KeyFailure::new(*k, "AccessDenied", "Access Denied"))
                .collect(),
        )
    }

    #[test]
    fn test_summary_new() {
        let summary = RunSummary::new("bucket");
        assert_eq!(summary.bucket, "bucket");
        assert!(summary.started_at.is_some());
        assert!(summary.completed_at.is_none());
        assert_eq!(summary.total(), 0);
        assert!(!summary.has_failures());
    }

    #[test]
    fn test_record_outcomes() {
        let mut summary = RunSummary::new("bucket");
        summary.record_page(3, 300);
        summary.record_outcome(outcome(&["a", "b"], &["c"]));
        summary.record_request_error(outcome(&[], &["d", "e"]));

        assert_eq!(summary.pages_listed, 1);
        assert_eq!(summary.objects_listed, 3);
        assert_eq!(summary.bytes_listed, 300);
        assert_eq!(summary.batches, 2);
        assert_eq!(summary.request_errors, 1);
        assert_eq!(summary.succeeded, 2);
        assert_eq!(summary.failed, 3);
        assert_eq!(summary.failures.len(), 3);
        assert!(summary.has_failures());
    }

    #[test]
    fn test_preliminary_does_not_touch_totals() {
        let mut summary = RunSummary::new("bucket");
        summary.record_preliminary(&outcome(&["a"], &["b"]));

        assert_eq!(summary.total(), 0);
        assert_eq!(
            summary.preliminary,
            Some(PreliminaryStats {
                batches: 1,
                succeeded: 1,
                failed: 1
            })
        );
    }

    #[test]
    fn test_summary_duration() {
        let mut summary = RunSummary::new("bucket");
        sleep(StdDuration::from_millis(10));
        summary.complete();

        let duration = summary.duration().unwrap();
        assert!(duration.num_milliseconds() >= 10);
        assert!(summary.objects_per_second().is_some());
    }

    #[test]
    fn test_summary_serializes_failures() {
        let mut summary = RunSummary::new("bucket");
        summary.record_outcome(outcome(&[], &["locked-object.txt"]));

        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["failed"], 1);
        assert_eq!(json["failures"][0]["key"], "locked-object.txt");
        assert_eq!(json["failures"][0]["code"], "AccessDenied");
        assert!(json.get("preliminary").is_none());
    }
}
