use crate::core::assembler::BatchAssembler;
use crate::core::checkpoint::CheckpointStore;
use crate::core::executor::{BoundedExecutor, ExecutorEvent};
use crate::core::reporter::{JobSummary, Reporter};
use crate::core::retry::RetryPolicy;
use crate::domain::model::Batch;
use crate::domain::ports::{BatchSink, RecordFetcher};
use crate::utils::error::Result;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Plain values the engine consumes; building them from CLI/TOML is the
/// config layer's job.
#[derive(Debug, Clone)]
pub struct JobSettings {
    pub batch_size: usize,
    pub concurrency: usize,
    pub attempt_timeout: Duration,
    pub checkpoint_path: PathBuf,
}

const PROGRESS_EVERY: usize = 20;

/// Wires checkpoint store, executor, assembler and reporter together and
/// runs the single consumer loop that serializes every state mutation.
pub struct JobRunner<F, K> {
    fetcher: Arc<F>,
    sink: K,
    policy: RetryPolicy,
    settings: JobSettings,
}

impl<F: RecordFetcher + 'static, K: BatchSink> JobRunner<F, K> {
    pub fn new(fetcher: Arc<F>, sink: K, policy: RetryPolicy, settings: JobSettings) -> Self {
        Self {
            fetcher,
            sink,
            policy,
            settings,
        }
    }

    /// Runs the job to completion (or cancellation) and returns the summary.
    /// Per-identifier failures never abort the job; checkpoint or sink write
    /// failures do, immediately, since resume correctness depends on them.
    pub async fn run(
        &self,
        identifiers: Vec<String>,
        cancel: CancellationToken,
    ) -> Result<JobSummary> {
        let mut checkpoint = CheckpointStore::load(&self.settings.checkpoint_path, &identifiers)?;
        let pending = checkpoint.pending_ids();
        info!(
            run = checkpoint.run_count(),
            total = identifiers.len(),
            pending = pending.len(),
            already_done = identifiers.len() - pending.len(),
            "starting fetch job"
        );

        let mut reporter = Reporter::new();
        let mut assembler =
            BatchAssembler::new(self.settings.batch_size, checkpoint.batches_sealed());
        let mut batches_written: u32 = 0;
        let total = pending.len();

        let executor = BoundedExecutor::new(
            Arc::clone(&self.fetcher),
            self.policy.clone(),
            self.settings.attempt_timeout,
            self.settings.concurrency,
            self.settings.batch_size + self.settings.concurrency,
        );
        let (cursor_tx, cursor_rx) = watch::channel(0usize);
        let mut events = executor.spawn(pending, cancel.clone(), cursor_rx);

        let mut completed = 0usize;
        while let Some(event) = events.recv().await {
            match event {
                ExecutorEvent::Started { id } => checkpoint.mark_in_flight(&id),
                ExecutorEvent::Finished {
                    position,
                    id,
                    result,
                    retries,
                } => {
                    completed += 1;
                    reporter.record_retries(retries);
                    let sealed = match result {
                        Ok(record) => {
                            reporter.record_success();
                            assembler.push_success(position, id, record)
                        }
                        Err(error) => {
                            warn!(id = %id, "giving up: {}", error);
                            reporter.record_failure(&id, &error);
                            checkpoint.mark_failed(&id, error.to_string());
                            checkpoint.flush()?;
                            assembler.push_skipped(position)
                        }
                    };
                    for batch in sealed {
                        self.commit_batch(&mut checkpoint, batch).await?;
                        batches_written += 1;
                    }
                    // Lets the executor dispatch further into the input.
                    let _ = cursor_tx.send(assembler.cursor());

                    if completed % PROGRESS_EVERY == 0 || completed == total {
                        let stats = reporter.snapshot();
                        info!(
                            completed,
                            total,
                            succeeded = stats.succeeded,
                            failed = stats.permanently_failed,
                            retried = stats.retried,
                            buffered = assembler.buffered(),
                            "progress"
                        );
                    }
                }
            }
        }

        if cancel.is_cancelled() {
            // Buffered but unwritten successes are dropped on purpose: they
            // are not marked Done, so the next run re-fetches them instead
            // of risking a duplicate batch.
            checkpoint.flush()?;
            warn!(completed, total, "job cancelled, checkpoint flushed");
            return Ok(reporter.into_summary(batches_written, true));
        }

        if let Some(batch) = assembler.finish() {
            self.commit_batch(&mut checkpoint, batch).await?;
            batches_written += 1;
        }
        checkpoint.flush()?;

        if !reporter.failures().is_empty() {
            self.sink.write_error_report(reporter.failures()).await?;
        }

        let summary = reporter.into_summary(batches_written, false);
        self.sink
            .write_summary(&serde_json::to_value(&summary)?)
            .await?;
        info!(
            succeeded = summary.stats.succeeded,
            failed = summary.stats.permanently_failed,
            retried = summary.stats.retried,
            batches = summary.batches_written,
            elapsed_s = format!("{:.1}", summary.elapsed_seconds),
            "job finished"
        );
        Ok(summary)
    }

    /// Sink write first, `Done` second: an identifier is only ever recorded
    /// Done after its record reached the sink.
    async fn commit_batch(&self, checkpoint: &mut CheckpointStore, batch: Batch) -> Result<()> {
        let path = self.sink.write_batch(&batch).await?;
        for id in &batch.ids {
            checkpoint.mark_done(id);
        }
        checkpoint.set_batches_sealed(batch.seq);
        checkpoint.flush()?;
        info!(seq = batch.seq, records = batch.records.len(), path = %path, "batch written");
        Ok(())
    }
}
