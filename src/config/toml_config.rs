use crate::config::CliConfig;
use crate::core::job::JobSettings;
use crate::core::retry::RetryPolicy;
use crate::utils::error::Result;
use crate::utils::validation::{validate_path, validate_positive_number, validate_url, Validate};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobConfig {
    pub source: SourceConfig,
    #[serde(default)]
    pub fetch: FetchConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// URL template with an `{id}` placeholder.
    pub api_url: String,
    #[serde(default = "default_input_csv")]
    pub input_csv: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    pub concurrency: usize,
    pub batch_size: usize,
    pub timeout_seconds: u64,
    pub retry_attempts: u32,
    pub backoff_base_ms: u64,
    pub backoff_max_ms: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            concurrency: 5,
            batch_size: 100,
            timeout_seconds: 10,
            retry_attempts: 2,
            backoff_base_ms: 1000,
            backoff_max_ms: 30_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub output_dir: String,
    pub checkpoint_path: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            output_dir: "output".to_string(),
            checkpoint_path: "logs/checkpoint.json".to_string(),
        }
    }
}

fn default_input_csv() -> String {
    "input/product_ids.csv".to_string()
}

impl JobConfig {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)?;
        toml::from_str(&contents).map_err(|e| crate::utils::error::FetchJobError::ConfigValidationError {
            message: format!("{}: {}", path.display(), e),
        })
    }

    pub fn apply_cli(mut self, cli: &CliConfig) -> Self {
        if let Some(input) = &cli.input {
            self.source.input_csv = input.clone();
        }
        if let Some(api_url) = &cli.api_url {
            self.source.api_url = api_url.clone();
        }
        if let Some(output_dir) = &cli.output_dir {
            self.output.output_dir = output_dir.clone();
        }
        if let Some(checkpoint) = &cli.checkpoint {
            self.output.checkpoint_path = checkpoint.clone();
        }
        if let Some(concurrency) = cli.concurrency {
            self.fetch.concurrency = concurrency;
        }
        if let Some(batch_size) = cli.batch_size {
            self.fetch.batch_size = batch_size;
        }
        if let Some(retry_attempts) = cli.retry_attempts {
            self.fetch.retry_attempts = retry_attempts;
        }
        if let Some(timeout_seconds) = cli.timeout_seconds {
            self.fetch.timeout_seconds = timeout_seconds;
        }
        self
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.fetch.retry_attempts,
            Duration::from_millis(self.fetch.backoff_base_ms),
            Duration::from_millis(self.fetch.backoff_max_ms),
        )
    }

    pub fn job_settings(&self) -> JobSettings {
        JobSettings {
            batch_size: self.fetch.batch_size,
            concurrency: self.fetch.concurrency,
            attempt_timeout: Duration::from_secs(self.fetch.timeout_seconds),
            checkpoint_path: self.output.checkpoint_path.clone().into(),
        }
    }
}

impl Validate for JobConfig {
    fn validate(&self) -> Result<()> {
        // The template is not a parseable URL as-is; check the filled form.
        validate_url("source.api_url", &self.source.api_url.replace("{id}", "0"))?;
        if !self.source.api_url.contains("{id}") {
            return Err(crate::utils::error::FetchJobError::InvalidConfigValueError {
                field: "source.api_url".to_string(),
                value: self.source.api_url.clone(),
                reason: "URL template must contain an {id} placeholder".to_string(),
            });
        }
        validate_path("source.input_csv", &self.source.input_csv)?;
        validate_path("output.output_dir", &self.output.output_dir)?;
        validate_path("output.checkpoint_path", &self.output.checkpoint_path)?;
        validate_positive_number("fetch.concurrency", self.fetch.concurrency, 1)?;
        validate_positive_number("fetch.batch_size", self.fetch.batch_size, 1)?;
        validate_positive_number(
            "fetch.timeout_seconds",
            self.fetch.timeout_seconds as usize,
            1,
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal() -> JobConfig {
        toml::from_str(
            r#"
            [source]
            api_url = "https://shop.example/api/v2/products/{id}"
            "#,
        )
        .unwrap()
    }

    #[test]
    fn test_defaults_fill_missing_sections() {
        let config = minimal();
        assert_eq!(config.fetch.concurrency, 5);
        assert_eq!(config.fetch.batch_size, 100);
        assert_eq!(config.fetch.retry_attempts, 2);
        assert_eq!(config.output.output_dir, "output");
        assert_eq!(config.source.input_csv, "input/product_ids.csv");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_missing_id_placeholder_rejected() {
        let mut config = minimal();
        config.source.api_url = "https://shop.example/api/v2/products".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_batch_size_rejected() {
        let mut config = minimal();
        config.fetch.batch_size = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_concurrency_rejected() {
        let mut config = minimal();
        config.fetch.concurrency = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_full_file_parses() {
        let config: JobConfig = toml::from_str(
            r#"
            [source]
            api_url = "https://shop.example/api/v2/products/{id}"
            input_csv = "input/ids.csv"

            [fetch]
            concurrency = 8
            batch_size = 50
            timeout_seconds = 15
            retry_attempts = 3
            backoff_base_ms = 500
            backoff_max_ms = 10000

            [output]
            output_dir = "out"
            checkpoint_path = "state/checkpoint.json"
            "#,
        )
        .unwrap();

        assert_eq!(config.fetch.concurrency, 8);
        assert_eq!(config.retry_policy().max_attempts(), 4);
        let settings = config.job_settings();
        assert_eq!(settings.batch_size, 50);
        assert_eq!(settings.attempt_timeout, Duration::from_secs(15));
    }
}
