use crate::domain::model::{DnsFailure, Message, MxRecord};
use crate::utils::error::Result;
use async_trait::async_trait;

/// MX lookup. An empty list means the name exists but publishes no MX.
#[async_trait]
pub trait MxResolver: Send + Sync {
    async fn lookup_mx(&self, domain: &str) -> std::result::Result<Vec<MxRecord>, DnsFailure>;
}

/// Bare TCP reachability check against a mail host.
#[async_trait]
pub trait SmtpProbe: Send + Sync {
    async fn connect(&self, host: &str, port: u16) -> std::io::Result<()>;
}

/// Recipient address check run before an address is batched for sending.
#[async_trait]
pub trait AddressCheck: Send + Sync {
    async fn check(&self, address: &str) -> std::result::Result<(), String>;
}

#[async_trait]
pub trait EmailSender: Send + Sync {
    async fn send(&self, message: &Message) -> Result<()>;
}

/// Append-only tabular output.
pub trait ResultSink: Send {
    fn append(&mut self, record: &[&str]) -> Result<()>;
}

pub trait ProgressReporter: Send + Sync {
    fn report(&self, processed: u64, total: u64);
}
