#[cfg(feature = "cli")]
pub mod cli;
pub mod toml_config;

#[cfg(feature = "cli")]
pub use cli::{CliConfig, Command, DomainArgs, LogFormat, SendArgs};
pub use toml_config::TomlConfig;

use crate::adapters::dns::DEFAULT_DNS_TIMEOUT;
use crate::adapters::smtp::DEFAULT_SMTP_TIMEOUT;
use crate::core::dispatch::{DispatchSettings, DEFAULT_BATCH_SIZE, DEFAULT_SKIP_ROWS};
use crate::core::engine::{PipelineSettings, DEFAULT_QUEUE_CAPACITY, INVALID_FILE, VALID_FILE};
use crate::core::source::Delimiter;
use crate::core::validator::ValidatorSettings;
use crate::core::worker_pool::DEFAULT_CONCURRENCY;
use crate::utils::error::Result;
use crate::utils::validation::{self, Validate};
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_ERROR_LOG: &str = "errors.log";
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);
pub const MAX_TIMEOUT_SECS: u64 = 300;

/// Error log path: CLI flag, then `[output] error_log`, then the default.
pub fn resolve_error_log(cli_value: Option<&str>, toml: &TomlConfig) -> String {
    cli_value
        .or_else(|| toml.error_log())
        .unwrap_or(DEFAULT_ERROR_LOG)
        .to_string()
}

/// Settings for a `domain` run after TOML and CLI layers are merged.
#[derive(Debug, Clone)]
pub struct DomainCheckConfig {
    pub input: Option<PathBuf>,
    pub delimiter: Delimiter,
    pub concurrency: usize,
    pub queue_capacity: usize,
    pub output_dir: PathBuf,
    pub valid_file: String,
    pub invalid_file: String,
    pub dns_timeout: Duration,
    pub smtp_timeout: Duration,
    pub smtp_port: u16,
    pub max_attempts: u32,
    pub backoff_step: Duration,
}

impl Default for DomainCheckConfig {
    fn default() -> Self {
        let validator = ValidatorSettings::default();
        Self {
            input: None,
            delimiter: Delimiter::default(),
            concurrency: DEFAULT_CONCURRENCY,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            output_dir: PathBuf::from("."),
            valid_file: VALID_FILE.to_string(),
            invalid_file: INVALID_FILE.to_string(),
            dns_timeout: DEFAULT_DNS_TIMEOUT,
            smtp_timeout: DEFAULT_SMTP_TIMEOUT,
            smtp_port: validator.smtp_port,
            max_attempts: validator.max_attempts,
            backoff_step: validator.backoff_step,
        }
    }
}

impl DomainCheckConfig {
    pub fn from_toml(toml: &TomlConfig) -> Self {
        let mut config = Self::default();

        if let Some(v) = &toml.validation {
            if let Some(concurrency) = v.concurrency {
                config.concurrency = concurrency;
            }
            if let Some(capacity) = v.queue_capacity {
                config.queue_capacity = capacity;
            }
            if let Some(delimiter) = v.delimiter {
                config.delimiter = delimiter;
            }
            if let Some(secs) = v.dns_timeout_secs {
                config.dns_timeout = Duration::from_secs(secs);
            }
            if let Some(secs) = v.smtp_timeout_secs {
                config.smtp_timeout = Duration::from_secs(secs);
            }
            if let Some(port) = v.smtp_port {
                config.smtp_port = port;
            }
            if let Some(attempts) = v.max_attempts {
                config.max_attempts = attempts;
            }
            if let Some(ms) = v.backoff_ms {
                config.backoff_step = Duration::from_millis(ms);
            }
        }

        if let Some(o) = &toml.output {
            if let Some(dir) = &o.dir {
                config.output_dir = PathBuf::from(dir);
            }
            if let Some(name) = &o.valid_file {
                config.valid_file = name.clone();
            }
            if let Some(name) = &o.invalid_file {
                config.invalid_file = name.clone();
            }
        }

        config
    }

    pub fn pipeline_settings(&self) -> Result<PipelineSettings> {
        let input = validation::validate_required_field("file", &self.input)?;
        Ok(PipelineSettings {
            input: input.clone(),
            delimiter: self.delimiter,
            concurrency: self.concurrency,
            queue_capacity: self.queue_capacity,
            output_dir: self.output_dir.clone(),
            valid_file: self.valid_file.clone(),
            invalid_file: self.invalid_file.clone(),
        })
    }

    pub fn validator_settings(&self) -> ValidatorSettings {
        ValidatorSettings {
            max_attempts: self.max_attempts,
            backoff_step: self.backoff_step,
            smtp_port: self.smtp_port,
        }
    }
}

impl Validate for DomainCheckConfig {
    fn validate(&self) -> Result<()> {
        let input = validation::validate_required_field("file", &self.input)?;
        validation::validate_path("file", &input.to_string_lossy())?;
        validation::validate_path("output_dir", &self.output_dir.to_string_lossy())?;
        validation::validate_non_empty_string("valid_file", &self.valid_file)?;
        validation::validate_non_empty_string("invalid_file", &self.invalid_file)?;

        validation::validate_positive_number("concurrency", self.concurrency, 1)?;
        validation::validate_positive_number("queue_capacity", self.queue_capacity, 1)?;
        validation::validate_range("max_attempts", self.max_attempts, 1, 10)?;
        validation::validate_range("smtp_port", self.smtp_port, 1, u16::MAX)?;
        validation::validate_range("dns_timeout_secs", self.dns_timeout.as_secs(), 1, MAX_TIMEOUT_SECS)?;
        validation::validate_range("smtp_timeout_secs", self.smtp_timeout.as_secs(), 1, MAX_TIMEOUT_SECS)?;
        Ok(())
    }
}

/// Settings for a `send` run after TOML and CLI layers are merged.
#[derive(Debug, Clone)]
pub struct SendConfig {
    pub input: Option<PathBuf>,
    pub endpoint: Option<String>,
    pub api_key: Option<String>,
    pub sender: Option<String>,
    pub subject: Option<String>,
    pub body: Option<String>,
    pub batch_size: usize,
    pub skip_rows: usize,
    pub timeout: Duration,
    /// Check each recipient's address and MX records before sending.
    pub verify_recipients: bool,
}

impl Default for SendConfig {
    fn default() -> Self {
        Self {
            input: None,
            endpoint: None,
            api_key: None,
            sender: None,
            subject: None,
            body: None,
            batch_size: DEFAULT_BATCH_SIZE,
            skip_rows: DEFAULT_SKIP_ROWS,
            timeout: DEFAULT_HTTP_TIMEOUT,
            verify_recipients: false,
        }
    }
}

impl SendConfig {
    pub fn from_toml(toml: &TomlConfig) -> Self {
        let mut config = Self::default();
        let Some(d) = &toml.dispatch else {
            return config;
        };

        config.endpoint = d.endpoint.clone();
        config.api_key = d.api_key.clone();
        config.sender = d.sender.clone();
        config.subject = d.subject.clone();
        config.body = d.body.clone();
        if let Some(batch_size) = d.batch_size {
            config.batch_size = batch_size;
        }
        if let Some(skip_rows) = d.skip_rows {
            config.skip_rows = skip_rows;
        }
        if let Some(secs) = d.timeout_secs {
            config.timeout = Duration::from_secs(secs);
        }
        if let Some(verify) = d.verify_recipients {
            config.verify_recipients = verify;
        }
        config
    }

    pub fn endpoint(&self) -> Result<&str> {
        validation::validate_required_field("endpoint", &self.endpoint).map(String::as_str)
    }

    pub fn dispatch_settings(&self) -> Result<DispatchSettings> {
        Ok(DispatchSettings {
            sender: validation::validate_required_field("sender", &self.sender)?.clone(),
            subject: validation::validate_required_field("subject", &self.subject)?.clone(),
            body: validation::validate_required_field("body", &self.body)?.clone(),
            batch_size: self.batch_size,
            skip_rows: self.skip_rows,
        })
    }
}

impl Validate for SendConfig {
    fn validate(&self) -> Result<()> {
        let input = validation::validate_required_field("file", &self.input)?;
        validation::validate_path("file", &input.to_string_lossy())?;
        validation::validate_url("endpoint", self.endpoint()?)?;

        let settings = self.dispatch_settings()?;
        validation::validate_non_empty_string("sender", &settings.sender)?;
        validation::validate_non_empty_string("subject", &settings.subject)?;
        validation::validate_positive_number("batch_size", self.batch_size, 1)?;
        Ok(())
    }
}
