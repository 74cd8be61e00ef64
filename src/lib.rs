pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;
pub use config::{DomainCheckConfig, SendConfig, TomlConfig};

pub use adapters::{CsvAppendSink, HickoryMxResolver, HttpEmailSender, TcpSmtpProbe};
pub use core::{
    cancel::Cancellation,
    dispatch::Dispatcher,
    engine::{DomainCheckEngine, PipelineSettings},
    validator::DomainValidator,
};
pub use domain::model::{Domain, RunSummary, ValidationResult};
pub use utils::error::{PigeonError, Result};
