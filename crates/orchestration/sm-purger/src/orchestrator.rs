//! Delete orchestration: listing, dispatch and aggregation.

use futures::{StreamExt, pin_mut};
use sm_error::{DeleteError, Result, SmError};
use std::sync::Arc;
use tokio::sync::{Semaphore, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::batch::{BatchDeleter, DeleteBatch, DeleteOutcome, TASK_PANICKED_CODE};
use crate::config::{MAX_CONCURRENCY, PassMode, PurgeConfig};
use crate::pager::ListingPager;
use crate::store::{ObjectKey, ObjectPage, ObjectStore};
use crate::summary::RunSummary;

/// Which pass a delete batch belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pass {
    /// Single-pass mode
    Only,
    /// Double-pass mode, dispatched while listing
    First,
    /// Double-pass mode, dispatched after listing
    Second,
}

impl Pass {
    fn is_authoritative(self) -> bool {
        !matches!(self, Pass::First)
    }

    /// Keys deleted by the first pass may come back as `NoSuchKey`.
    fn tolerates_missing(self) -> bool {
        matches!(self, Pass::Second)
    }
}

/// Messages consumed by the aggregating task.
enum Event {
    Page { objects: usize, bytes: u64 },
    Settled {
        pass: Pass,
        result: std::result::Result<DeleteOutcome, DeleteError>,
    },
}

/// Deletes every object in a bucket.
///
/// Pages are dispatched to delete tasks as soon as they are listed, so
/// listing and deletion overlap. At most `concurrency` delete requests run
/// at once; when all slots are busy, listing waits. Every task reports its
/// outcome over a channel to a single aggregating task that owns the
/// [`RunSummary`].
pub struct DeleteOrchestrator {
    store: Arc<dyn ObjectStore>,
    bucket: String,
    config: PurgeConfig,
}

impl DeleteOrchestrator {
    /// Create a new orchestrator.
    ///
    /// # Arguments
    ///
    /// * `store` - The object store to list and delete from
    /// * `bucket` - The bucket to empty
    /// * `config` - The run configuration
    pub fn new(store: Arc<dyn ObjectStore>, bucket: impl Into<String>, config: PurgeConfig) -> Self {
        Self {
            store,
            bucket: bucket.into(),
            config,
        }
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    pub fn config(&self) -> &PurgeConfig {
        &self.config
    }

    /// Run the delete pipeline to completion.
    ///
    /// Per-key and whole-batch delete failures are recorded in the returned
    /// summary. A listing error stops further dispatch and is returned once
    /// every task already dispatched has finished.
    pub async fn run(&self) -> Result<RunSummary> {
        info!(
            bucket = %self.bucket,
            concurrency = self.config.concurrency,
            pass_mode = ?self.config.pass_mode,
            "Starting delete run"
        );

        let mut deleter = BatchDeleter::new(self.store.clone(), &self.bucket);
        if let Some(timeout) = self.config.batch_timeout() {
            deleter = deleter.with_timeout(timeout);
        }

        let concurrency = self.config.concurrency.clamp(1, MAX_CONCURRENCY);
        let (events, receiver) = mpsc::channel(concurrency.saturating_mul(2));
        let aggregator = tokio::spawn(aggregate(RunSummary::new(&self.bucket), receiver));

        let mut dispatcher = Dispatcher {
            deleter,
            semaphore: Arc::new(Semaphore::new(concurrency)),
            events,
            handles: Vec::new(),
        };

        let dispatched = async {
            let retained = self.list_and_dispatch(&mut dispatcher).await?;

            if self.config.pass_mode == PassMode::Double {
                debug!(pages = retained.len(), "Listing complete, starting second pass");
                for keys in retained {
                    dispatcher.dispatch(keys, Pass::Second).await?;
                }
            }

            Ok::<(), SmError>(())
        }
        .await;

        if let Err(e) = &dispatched {
            error!(
                bucket = %self.bucket,
                error = %e,
                in_flight = dispatcher.handles.len(),
                "Aborting delete run, waiting for dispatched batches"
            );
        }

        dispatcher.wait_all().await;

        let (summary, violation) = aggregator
            .await
            .map_err(|e| SmError::Other(anyhow::anyhow!("Aggregator task failed: {e}")))?;

        dispatched?;
        if let Some(violation) = violation {
            return Err(violation.into());
        }

        // Both pass modes settle every listed object exactly once.
        if summary.total() != summary.objects_listed {
            error!(
                bucket = %summary.bucket,
                listed = summary.objects_listed,
                accounted = summary.total(),
                "Delete outcomes do not cover the listing"
            );
            return Err(SmError::Other(anyhow::anyhow!(
                "Accounted for {} of {} listed objects",
                summary.total(),
                summary.objects_listed
            )));
        }

        info!(
            bucket = %summary.bucket,
            pages = summary.pages_listed,
            objects = summary.objects_listed,
            batches = summary.batches,
            succeeded = summary.succeeded,
            failed = summary.failed,
            "Delete run completed"
        );

        Ok(summary)
    }

    /// Walk the listing, dispatching each page as it arrives.
    ///
    /// Returns the keys of every page when a second pass is configured.
    async fn list_and_dispatch(&self, dispatcher: &mut Dispatcher) -> Result<Vec<Vec<ObjectKey>>> {
        let pass = match self.config.pass_mode {
            PassMode::Single => Pass::Only,
            PassMode::Double => Pass::First,
        };

        let pager = ListingPager::new(self.store.clone(), &self.bucket);
        let pages = pager.pages();
        pin_mut!(pages);

        let mut retained = Vec::new();

        while let Some(page) = pages.next().await {
            let page = page?;
            dispatcher.record_page(&page).await;

            let keys = page.keys();
            if self.config.pass_mode == PassMode::Double {
                retained.push(keys.clone());
            }

            dispatcher.dispatch(keys, pass).await?;
        }

        Ok(retained)
    }
}

/// Spawns delete tasks and keeps their handles.
struct Dispatcher {
    deleter: BatchDeleter,
    semaphore: Arc<Semaphore>,
    events: mpsc::Sender<Event>,
    handles: Vec<InFlight>,
}

/// A spawned delete task and what it was asked to delete.
struct InFlight {
    pass: Pass,
    keys: Vec<ObjectKey>,
    handle: JoinHandle<()>,
}

impl Dispatcher {
    async fn record_page(&self, page: &ObjectPage) {
        let event = Event::Page {
            objects: page.len(),
            bytes: page.total_bytes(),
        };
        if self.events.send(event).await.is_err() {
            warn!("Aggregator stopped, page not recorded");
        }
    }

    /// Spawn one delete task per batch of `keys`.
    async fn dispatch(&mut self, keys: Vec<ObjectKey>, pass: Pass) -> Result<()> {
        for batch in DeleteBatch::partition(keys) {
            let permit = self
                .semaphore
                .clone()
                .acquire_owned()
                .await
                .map_err(|e| SmError::Other(anyhow::anyhow!("Failed to acquire semaphore: {e}")))?;

            let deleter = self.deleter.clone();
            let events = self.events.clone();

            debug!(keys = batch.len(), pass = ?pass, "Dispatching delete batch");

            let keys = batch.keys().to_vec();
            let handle = tokio::spawn(async move {
                let mut result = deleter.delete_batch(&batch).await;
                drop(permit);

                if pass.tolerates_missing() {
                    result = result.map(DeleteOutcome::tolerate_missing);
                }

                if events.send(Event::Settled { pass, result }).await.is_err() {
                    error!(keys = batch.len(), "Aggregator stopped, batch outcome lost");
                }
            });

            self.handles.push(InFlight { pass, keys, handle });
        }

        Ok(())
    }

    /// Wait for every dispatched task, then close the event channel.
    ///
    /// Keys of a task that panicked are reported as failed.
    async fn wait_all(self) {
        let (tasks, handles): (Vec<_>, Vec<_>) = self
            .handles
            .into_iter()
            .map(|task| ((task.pass, task.keys), task.handle))
            .unzip();

        let results = futures::future::join_all(handles).await;
        for ((pass, keys), result) in tasks.into_iter().zip(results) {
            let Err(e) = result else {
                continue;
            };

            error!(keys = keys.len(), error = %e, "Delete task panicked");

            let message = format!("Delete task panicked: {e}");
            let outcome = DeleteOutcome::all_failed(&keys, TASK_PANICKED_CODE, &message);
            let event = Event::Settled {
                pass,
                result: Ok(outcome),
            };
            if self.events.send(event).await.is_err() {
                error!(keys = keys.len(), "Aggregator stopped, batch outcome lost");
            }
        }
    }
}

/// Fold every event into one summary.
///
/// Returns the summary and the first contract violation seen, if any.
async fn aggregate(
    mut summary: RunSummary,
    mut events: mpsc::Receiver<Event>,
) -> (RunSummary, Option<DeleteError>) {
    let mut violation = None;

    while let Some(event) = events.recv().await {
        match event {
            Event::Page { objects, bytes } => summary.record_page(objects, bytes),
            Event::Settled { pass, result } => match result {
                Ok(outcome) if pass.is_authoritative() => summary.record_outcome(outcome),
                Ok(outcome) => summary.record_preliminary(&outcome),
                Err(e) => match DeleteOutcome::from_request_error(&e) {
                    Some(outcome) if pass.is_authoritative() => {
                        summary.record_request_error(outcome)
                    }
                    Some(outcome) => summary.record_preliminary(&outcome),
                    None => {
                        error!(error = %e, "Delete batch violated its size contract");
                        violation.get_or_insert(e);
                    }
                },
            },
        }
    }

    summary.complete();
    (summary, violation)
}
