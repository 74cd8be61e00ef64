use crate::core::cancel::Cancellation;
use crate::core::counters::RunCounters;
use crate::domain::model::Domain;
use crate::utils::error::{PigeonError, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

/// Rows whose first field contains this (case-insensitively) are headers.
pub const HEADER_TOKEN: &str = "domain";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
#[serde(rename_all = "lowercase")]
pub enum Delimiter {
    #[default]
    Tab,
    Comma,
}

impl Delimiter {
    pub fn as_byte(self) -> u8 {
        match self {
            Delimiter::Tab => b'\t',
            Delimiter::Comma => b',',
        }
    }
}

/// How the source started, reported once before any domain is consumed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceStart {
    FirstDomain,
    Empty,
    Failed { line: u64, message: String },
}

pub struct SourceHandle {
    pub started: oneshot::Receiver<SourceStart>,
    /// Resolves to the number of domains queued, or the read failure.
    pub task: JoinHandle<Result<u64>>,
}

/// Streams domains from the first column of a delimited file.
pub struct DomainSource<R: Read + Send + 'static> {
    reader: csv::Reader<R>,
}

impl DomainSource<File> {
    pub fn open<P: AsRef<Path>>(path: P, delimiter: Delimiter) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| PigeonError::SourceReadError {
            line: 0,
            message: format!("cannot open {}: {}", path.display(), e),
        })?;
        Ok(Self::from_reader(file, delimiter))
    }
}

impl<R: Read + Send + 'static> DomainSource<R> {
    pub fn from_reader(reader: R, delimiter: Delimiter) -> Self {
        let reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .delimiter(delimiter.as_byte())
            .from_reader(reader);
        Self { reader }
    }

    /// Reads on a blocking thread and pushes into `output`. Dropping the
    /// sender at the end closes the queue for the workers. A read failure
    /// cancels the run.
    pub fn spawn(
        self,
        output: mpsc::Sender<Domain>,
        counters: Arc<RunCounters>,
        cancel: Cancellation,
    ) -> SourceHandle {
        let (started_tx, started) = oneshot::channel();

        let task = tokio::task::spawn_blocking(move || {
            let result = self.produce(&output, &counters, &cancel, started_tx);
            match &result {
                Ok(count) => tracing::debug!("Domain source finished after {} domains", count),
                Err(PigeonError::Cancelled) => tracing::debug!("Domain source stopped by cancellation"),
                Err(e) => {
                    tracing::error!("Error reading input: {}", e);
                    cancel.cancel();
                }
            }
            result
        });

        SourceHandle { started, task }
    }

    fn produce(
        mut self,
        output: &mpsc::Sender<Domain>,
        counters: &RunCounters,
        cancel: &Cancellation,
        started: oneshot::Sender<SourceStart>,
    ) -> Result<u64> {
        let mut started = Some(started);
        let mut queued = 0u64;
        let mut record = csv::StringRecord::new();

        loop {
            if cancel.is_cancelled() {
                return Err(PigeonError::Cancelled);
            }

            match self.reader.read_record(&mut record) {
                Ok(true) => {}
                Ok(false) => break,
                Err(e) => {
                    let line = e.position().map(|p| p.line()).unwrap_or(queued + 1);
                    let message = e.to_string();
                    if let Some(tx) = started.take() {
                        let _ = tx.send(SourceStart::Failed {
                            line,
                            message: message.clone(),
                        });
                    }
                    return Err(PigeonError::SourceReadError { line, message });
                }
            }

            let Some(field) = record.get(0).map(str::trim) else {
                continue;
            };
            if field.is_empty() || field.to_lowercase().contains(HEADER_TOKEN) {
                continue;
            }

            counters.record_input();
            if let Some(tx) = started.take() {
                let _ = tx.send(SourceStart::FirstDomain);
            }
            // 接收端全部關閉代表工作者已因取消而退出
            if output.blocking_send(Domain::new(field)).is_err() {
                return Err(PigeonError::Cancelled);
            }
            queued += 1;
        }

        if let Some(tx) = started.take() {
            let _ = tx.send(SourceStart::Empty);
        }
        Ok(queued)
    }
}
