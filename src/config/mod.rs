pub mod toml_config;

use clap::Parser;

/// Command line surface. Everything except the settings file path is an
/// override for the corresponding TOML field.
#[derive(Debug, Clone, Parser)]
#[command(name = "catalog-fetch")]
#[command(about = "Resumable concurrent batch fetcher for product listings")]
pub struct CliConfig {
    /// TOML settings file
    #[arg(long, default_value = "config/settings.toml")]
    pub config: String,

    /// CSV file with an `id` column
    #[arg(long)]
    pub input: Option<String>,

    /// Directory for batch output files
    #[arg(long)]
    pub output_dir: Option<String>,

    /// Checkpoint file path
    #[arg(long)]
    pub checkpoint: Option<String>,

    /// Product API URL template containing `{id}`
    #[arg(long)]
    pub api_url: Option<String>,

    #[arg(long)]
    pub concurrency: Option<usize>,

    #[arg(long)]
    pub batch_size: Option<usize>,

    #[arg(long)]
    pub retry_attempts: Option<u32>,

    #[arg(long)]
    pub timeout_seconds: Option<u64>,

    #[arg(long, help = "Enable verbose output")]
    pub verbose: bool,
}
