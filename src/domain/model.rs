use serde::{Deserialize, Serialize};
use std::fmt;

/// A candidate mail domain, trimmed and lower-cased on construction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Domain(String);

impl Domain {
    pub fn new(raw: &str) -> Self {
        Self(raw.trim().to_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Domain {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

/// Outcome of validating one domain. Built once, never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ValidationResult {
    pub domain: Domain,
    pub valid: bool,
    pub error: Option<String>,
}

impl ValidationResult {
    pub fn valid(domain: Domain) -> Self {
        Self {
            domain,
            valid: true,
            error: None,
        }
    }

    pub fn invalid(domain: Domain, error: impl Into<String>) -> Self {
        Self {
            domain,
            valid: false,
            error: Some(error.into()),
        }
    }

    pub fn error_message(&self) -> &str {
        self.error.as_deref().unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MxRecord {
    pub host: String,
    pub preference: u16,
}

impl MxRecord {
    pub fn new(host: impl Into<String>, preference: u16) -> Self {
        Self {
            host: host.into(),
            preference,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub total: u64,
    pub valid_count: u64,
    pub invalid_count: u64,
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Processed {} domains: {} valid, {} invalid",
            self.total, self.valid_count, self.invalid_count
        )
    }
}

/// Resolver failure classes. Only `Timeout`, `ServerFailure` and
/// `Transport` are worth another attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DnsFailureKind {
    Timeout,
    ServerFailure,
    Transport,
    NotFound,
    Refused,
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DnsFailure {
    pub kind: DnsFailureKind,
    pub message: String,
}

impl DnsFailure {
    pub fn new(kind: DnsFailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn is_temporary(&self) -> bool {
        matches!(
            self.kind,
            DnsFailureKind::Timeout | DnsFailureKind::ServerFailure | DnsFailureKind::Transport
        )
    }
}

impl fmt::Display for DnsFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for DnsFailure {}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recipient {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Message {
    pub from: String,
    pub to: Vec<Recipient>,
    pub subject: String,
    pub body: String,
}
