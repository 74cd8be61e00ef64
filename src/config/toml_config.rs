use crate::core::source::Delimiter;
use crate::utils::error::{PigeonError, Result};
use crate::utils::validation::{self, Validate};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::LazyLock;

static ENV_VAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([^}]+)\}").expect("env var pattern is valid"));

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TomlConfig {
    pub validation: Option<ValidationSection>,
    pub output: Option<OutputSection>,
    pub dispatch: Option<DispatchSection>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValidationSection {
    pub concurrency: Option<usize>,
    pub queue_capacity: Option<usize>,
    pub delimiter: Option<Delimiter>,
    pub dns_timeout_secs: Option<u64>,
    pub smtp_timeout_secs: Option<u64>,
    pub smtp_port: Option<u16>,
    pub max_attempts: Option<u32>,
    pub backoff_ms: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OutputSection {
    pub dir: Option<String>,
    pub valid_file: Option<String>,
    pub invalid_file: Option<String>,
    pub error_log: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DispatchSection {
    pub endpoint: Option<String>,
    pub api_key: Option<String>,
    pub sender: Option<String>,
    pub subject: Option<String>,
    pub body: Option<String>,
    pub batch_size: Option<usize>,
    pub skip_rows: Option<usize>,
    pub timeout_secs: Option<u64>,
    pub verify_recipients: Option<bool>,
}

impl TomlConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(PigeonError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content);

        toml::from_str(&processed_content).map_err(|e| PigeonError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${PIGEON_API_KEY})；未設定的變數保留原樣
    fn substitute_env_vars(content: &str) -> String {
        ENV_VAR.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        })
        .to_string()
    }

    pub fn error_log(&self) -> Option<&str> {
        self.output.as_ref().and_then(|o| o.error_log.as_deref())
    }
}

impl Validate for TomlConfig {
    fn validate(&self) -> Result<()> {
        if let Some(validation) = &self.validation {
            if let Some(concurrency) = validation.concurrency {
                validation::validate_positive_number("validation.concurrency", concurrency, 1)?;
            }
            if let Some(capacity) = validation.queue_capacity {
                validation::validate_positive_number("validation.queue_capacity", capacity, 1)?;
            }
            if let Some(attempts) = validation.max_attempts {
                validation::validate_range("validation.max_attempts", attempts, 1, 10)?;
            }
            if let Some(secs) = validation.dns_timeout_secs {
                validation::validate_range("validation.dns_timeout_secs", secs, 1, super::MAX_TIMEOUT_SECS)?;
            }
            if let Some(secs) = validation.smtp_timeout_secs {
                validation::validate_range("validation.smtp_timeout_secs", secs, 1, super::MAX_TIMEOUT_SECS)?;
            }
        }

        if let Some(output) = &self.output {
            if let Some(dir) = &output.dir {
                validation::validate_path("output.dir", dir)?;
            }
            if let Some(log) = &output.error_log {
                validation::validate_path("output.error_log", log)?;
            }
        }

        if let Some(dispatch) = &self.dispatch {
            if let Some(endpoint) = &dispatch.endpoint {
                validation::validate_url("dispatch.endpoint", endpoint)?;
            }
            if let Some(batch_size) = dispatch.batch_size {
                validation::validate_positive_number("dispatch.batch_size", batch_size, 1)?;
            }
        }

        Ok(())
    }
}
