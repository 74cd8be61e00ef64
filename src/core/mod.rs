pub mod aggregator;
pub mod cancel;
pub mod counters;
pub mod dispatch;
pub mod engine;
pub mod source;
pub mod validator;
pub mod worker_pool;

pub use crate::domain::model::{Domain, MxRecord, RunSummary, ValidationResult};
pub use crate::domain::ports::{EmailSender, MxResolver, ProgressReporter, ResultSink, SmtpProbe};
pub use crate::utils::error::Result;
