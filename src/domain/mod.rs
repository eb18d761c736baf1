// Domain layer: core models and ports (interfaces). No dependency on the
// engine or the adapters.

pub mod model;
pub mod ports;

pub use model::{
    Batch, FailureRecord, FetchError, FetchErrorKind, FetchOutcome, JobStats, ProductRecord,
};
pub use ports::{BatchSink, RecordFetcher, Storage};
