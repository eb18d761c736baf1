use crate::domain::model::{FailureRecord, FetchError, JobStats};
use serde::Serialize;
use std::time::Instant;

/// Accumulates counters and the permanent-failure list. Purely additive;
/// it never raises and never drives control flow on its own.
pub struct Reporter {
    stats: JobStats,
    failures: Vec<FailureRecord>,
    started: Instant,
}

impl Reporter {
    pub fn new() -> Self {
        Self {
            stats: JobStats::default(),
            failures: Vec::new(),
            started: Instant::now(),
        }
    }

    pub fn record_success(&mut self) {
        self.stats.attempted += 1;
        self.stats.succeeded += 1;
    }

    pub fn record_failure(&mut self, id: &str, error: &FetchError) {
        self.stats.attempted += 1;
        self.stats.permanently_failed += 1;
        *self
            .stats
            .errors_by_kind
            .entry(error.kind.as_str().to_string())
            .or_insert(0) += 1;
        self.failures.push(FailureRecord {
            id: id.to_string(),
            kind: error.kind,
            message: error.message.clone(),
        });
    }

    pub fn record_retries(&mut self, retries: u32) {
        self.stats.retried += u64::from(retries);
    }

    pub fn snapshot(&self) -> &JobStats {
        &self.stats
    }

    pub fn failures(&self) -> &[FailureRecord] {
        &self.failures
    }

    pub fn into_summary(self, batches_written: u32, cancelled: bool) -> JobSummary {
        JobSummary {
            elapsed_seconds: self.started.elapsed().as_secs_f64(),
            stats: self.stats,
            failures: self.failures,
            batches_written,
            cancelled,
        }
    }
}

impl Default for Reporter {
    fn default() -> Self {
        Self::new()
    }
}

/// Final job report, also serialized to the sink as `summary.json`.
#[derive(Debug, Clone, Serialize)]
pub struct JobSummary {
    pub stats: JobStats,
    pub failures: Vec<FailureRecord>,
    pub batches_written: u32,
    pub cancelled: bool,
    pub elapsed_seconds: f64,
}

impl JobSummary {
    /// 0 = total success, 2 = finished with permanent failures,
    /// 130 = interrupted. Fatal aborts exit 1 from `main` instead.
    pub fn exit_code(&self) -> i32 {
        if self.cancelled {
            130
        } else if self.stats.permanently_failed > 0 {
            2
        } else {
            0
        }
    }
}
