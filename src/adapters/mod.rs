// Adapters layer: concrete implementations for external systems (HTTP API,
// CSV input, local filesystem output).

pub mod csv_input;
pub mod http_fetcher;
pub mod local;
