use crate::core::retry::RetryPolicy;
use crate::domain::model::{FetchError, FetchErrorKind, FetchOutcome, ProductRecord};
use crate::domain::ports::RecordFetcher;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch, Semaphore};
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Events the executor reports to the orchestrator. `position` is the
/// identifier's index within the pending sequence submitted to `spawn`.
#[derive(Debug)]
pub enum ExecutorEvent {
    /// Sent once per identifier, before its first fetch attempt.
    Started { id: String },
    /// Terminal outcome, sent exactly once per identifier.
    Finished {
        position: usize,
        id: String,
        result: std::result::Result<ProductRecord, FetchError>,
        retries: u32,
    },
}

/// Runs the per-identifier fetch operation under a hard concurrency ceiling.
/// A semaphore permit covers exactly one attempt; it is released before the
/// backoff sleep and re-acquired afterwards, so a delayed identifier never
/// occupies an execution slot.
///
/// Dispatch is additionally held within `lookahead` positions of the
/// consumer's cursor (fed back through a watch channel), so completions
/// piling up behind a stalled position stay bounded even while that position
/// sits in a long backoff.
pub struct BoundedExecutor<F> {
    fetcher: Arc<F>,
    policy: RetryPolicy,
    attempt_timeout: Duration,
    concurrency: usize,
    lookahead: usize,
}

impl<F: RecordFetcher + 'static> BoundedExecutor<F> {
    pub fn new(
        fetcher: Arc<F>,
        policy: RetryPolicy,
        attempt_timeout: Duration,
        concurrency: usize,
        lookahead: usize,
    ) -> Self {
        Self {
            fetcher,
            policy,
            attempt_timeout,
            concurrency,
            lookahead: lookahead.max(1),
        }
    }

    /// Spawns a dispatcher that starts one task per identifier, in input
    /// order, never more than `lookahead` positions past `cursor`. Returns
    /// the event channel; it closes once every started task has reported or
    /// bailed out after cancellation. Identifiers that never started simply
    /// produce no event.
    pub fn spawn(
        &self,
        ids: Vec<String>,
        cancel: CancellationToken,
        cursor: watch::Receiver<usize>,
    ) -> mpsc::Receiver<ExecutorEvent> {
        let (tx, rx) = mpsc::channel(self.concurrency.max(1) * 2);
        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let fetcher = Arc::clone(&self.fetcher);
        let policy = self.policy.clone();
        let attempt_timeout = self.attempt_timeout;
        let lookahead = self.lookahead;

        tokio::spawn(async move {
            let mut cursor = cursor;
            for (position, id) in ids.into_iter().enumerate() {
                loop {
                    if cancel.is_cancelled() {
                        return;
                    }
                    if position < *cursor.borrow() + lookahead {
                        break;
                    }
                    tokio::select! {
                        _ = cancel.cancelled() => return,
                        changed = cursor.changed() => {
                            // Sender gone means the consumer is gone.
                            if changed.is_err() {
                                return;
                            }
                        }
                    }
                }

                let tx = tx.clone();
                let semaphore = Arc::clone(&semaphore);
                let fetcher = Arc::clone(&fetcher);
                let policy = policy.clone();
                let cancel = cancel.clone();

                tokio::spawn(async move {
                    let mut attempt: u32 = 0;
                    let mut started = false;

                    loop {
                        let permit = tokio::select! {
                            _ = cancel.cancelled() => return,
                            permit = Arc::clone(&semaphore).acquire_owned() => match permit {
                                Ok(permit) => permit,
                                Err(_) => return,
                            },
                        };

                        if !started {
                            started = true;
                            if tx.send(ExecutorEvent::Started { id: id.clone() }).await.is_err() {
                                return;
                            }
                        }

                        attempt += 1;
                        let result =
                            match tokio::time::timeout(attempt_timeout, fetcher.fetch(&id)).await {
                                Ok(result) => result,
                                Err(_) => Err(FetchError::new(
                                    FetchErrorKind::Timeout,
                                    format!("attempt {} exceeded {:?}", attempt, attempt_timeout),
                                )),
                            };
                        drop(permit);

                        match policy.assess(result, attempt) {
                            FetchOutcome::Success(record) => {
                                let _ = tx
                                    .send(ExecutorEvent::Finished {
                                        position,
                                        id,
                                        result: Ok(record),
                                        retries: attempt - 1,
                                    })
                                    .await;
                                return;
                            }
                            FetchOutcome::Retryable { error, .. } => {
                                let delay = policy.next_delay(attempt);
                                debug!(id = %id, attempt, delay_ms = delay.as_millis() as u64,
                                    "retrying after backoff: {}", error);
                                tokio::select! {
                                    _ = cancel.cancelled() => return,
                                    _ = tokio::time::sleep(delay) => {}
                                }
                            }
                            FetchOutcome::Permanent(error) => {
                                let _ = tx
                                    .send(ExecutorEvent::Finished {
                                        position,
                                        id,
                                        result: Err(error),
                                        retries: attempt.saturating_sub(1),
                                    })
                                    .await;
                                return;
                            }
                        }
                    }
                });
            }
        });

        rx
    }
}
