use thiserror::Error;

#[derive(Error, Debug)]
pub enum PigeonError {
    #[error("HTTP request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Invalid value for '{field}' ({value}): {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Configuration validation failed for '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("No domains found in {path}")]
    EmptyInput { path: String },

    #[error("Failed to read input at line {line}: {message}")]
    SourceReadError { line: u64, message: String },

    #[error("Failed to initialise output {path}: {source}")]
    SinkInitError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Email dispatch failed: {message}")]
    DispatchError { message: String },

    #[error("Background task failed: {0}")]
    TaskFailed(#[from] tokio::task::JoinError),

    #[error("Run cancelled")]
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Input,
    Network,
    Output,
    Internal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl PigeonError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::ConfigError { .. }
            | Self::InvalidConfigValueError { .. }
            | Self::MissingConfigError { .. }
            | Self::ConfigValidationError { .. } => ErrorCategory::Configuration,
            Self::CsvError(_) | Self::EmptyInput { .. } | Self::SourceReadError { .. } => {
                ErrorCategory::Input
            }
            Self::ApiError(_) | Self::DispatchError { .. } => ErrorCategory::Network,
            Self::IoError(_) | Self::SinkInitError { .. } => ErrorCategory::Output,
            Self::SerializationError(_) | Self::TaskFailed(_) | Self::Cancelled => {
                ErrorCategory::Internal
            }
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            Self::Cancelled => ErrorSeverity::Low,
            Self::ApiError(_) | Self::DispatchError { .. } => ErrorSeverity::Medium,
            Self::SinkInitError { .. } | Self::IoError(_) | Self::TaskFailed(_) => {
                ErrorSeverity::Critical
            }
            _ => ErrorSeverity::High,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self.category() {
            ErrorCategory::Configuration => "Check the command line flags and the TOML config file",
            ErrorCategory::Input => {
                "Make sure the input file exists, is readable and has one domain per row in the first column"
            }
            ErrorCategory::Network => "Check network connectivity and the provider endpoint, then retry",
            ErrorCategory::Output => "Check that the output directory exists and is writable",
            ErrorCategory::Internal => "Re-run with --verbose and inspect the error log",
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            Self::EmptyInput { path } => format!("No domains could be read from '{}'", path),
            Self::SourceReadError { line, .. } => {
                format!("The input file could not be read past line {}", line)
            }
            Self::SinkInitError { path, .. } => format!("Cannot open output file '{}'", path),
            Self::Cancelled => "The run was cancelled before it finished".to_string(),
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, PigeonError>;
