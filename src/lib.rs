pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

pub use adapters::http_fetcher::HttpFetcher;
pub use adapters::local::{JsonBatchSink, LocalStorage};
pub use config::{toml_config::JobConfig, CliConfig};
pub use core::job::{JobRunner, JobSettings};
pub use core::reporter::JobSummary;
pub use core::retry::RetryPolicy;
pub use domain::model::ProductRecord;
pub use utils::error::{FetchJobError, Result};
