use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// One fetched product listing. The engine never inspects anything beyond
/// `id`; the remaining fields pass through to the output batches as-is.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductRecord {
    pub id: String,
    pub name: String,
    pub url_key: Option<String>,
    pub price: Option<f64>,
    pub description: String,
    pub images: Vec<String>,
}

/// Classification of a failed fetch attempt. The mapping from kind to
/// retryable/permanent lives in `RetryPolicy` and nowhere else.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchErrorKind {
    Timeout,
    Connect,
    RateLimited,
    ServerError,
    NotFound,
    ClientError,
    Malformed,
}

impl FetchErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FetchErrorKind::Timeout => "timeout",
            FetchErrorKind::Connect => "connect",
            FetchErrorKind::RateLimited => "rate_limited",
            FetchErrorKind::ServerError => "server_error",
            FetchErrorKind::NotFound => "not_found",
            FetchErrorKind::ClientError => "client_error",
            FetchErrorKind::Malformed => "malformed",
        }
    }
}

#[derive(Debug, Clone)]
pub struct FetchError {
    pub kind: FetchErrorKind,
    pub message: String,
}

impl FetchError {
    pub fn new(kind: FetchErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind.as_str(), self.message)
    }
}

impl std::error::Error for FetchError {}

/// Outcome of one fetch attempt after the retry policy has assessed it.
/// `Retryable` only ever appears while attempts remain; the executor turns
/// the last retryable error into `Permanent`.
#[derive(Debug)]
pub enum FetchOutcome {
    Success(ProductRecord),
    Retryable { error: FetchError, attempt: u32 },
    Permanent(FetchError),
}

/// A sealed, input-ordered group of records headed for the sink.
/// `ids` mirrors `records` one-to-one so the orchestrator can mark the
/// identifiers `Done` once the sink confirms the write.
#[derive(Debug, Clone)]
pub struct Batch {
    pub seq: u32,
    pub ids: Vec<String>,
    pub records: Vec<ProductRecord>,
}

/// One permanent failure, kept for the error report.
#[derive(Debug, Clone, Serialize)]
pub struct FailureRecord {
    pub id: String,
    pub kind: FetchErrorKind,
    pub message: String,
}

/// Running counters for the job. Mutated only by the reporter.
#[derive(Debug, Clone, Default, Serialize)]
pub struct JobStats {
    pub attempted: u64,
    pub succeeded: u64,
    pub permanently_failed: u64,
    pub retried: u64,
    pub errors_by_kind: HashMap<String, u64>,
}
