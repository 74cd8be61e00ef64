use crate::adapters::csv_sink::{CsvAppendSink, INVALID_HEADER, VALID_HEADER};
use crate::core::aggregator::{Aggregator, StdoutProgress};
use crate::core::cancel::Cancellation;
use crate::core::counters::RunCounters;
use crate::core::source::{Delimiter, DomainSource, SourceStart};
use crate::core::validator::DomainValidator;
use crate::core::worker_pool::{WorkerPool, DEFAULT_CONCURRENCY};
use crate::domain::model::RunSummary;
use crate::domain::ports::{MxResolver, ProgressReporter, SmtpProbe};
use crate::utils::error::{PigeonError, Result};
use crate::utils::monitor::SystemMonitor;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;

pub const DEFAULT_QUEUE_CAPACITY: usize = 100;
pub const VALID_FILE: &str = "domains_valid.csv";
pub const INVALID_FILE: &str = "domains_invalid.csv";

#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub input: PathBuf,
    pub delimiter: Delimiter,
    pub concurrency: usize,
    pub queue_capacity: usize,
    pub output_dir: PathBuf,
    pub valid_file: String,
    pub invalid_file: String,
}

impl PipelineSettings {
    pub fn new(input: impl Into<PathBuf>) -> Self {
        Self {
            input: input.into(),
            delimiter: Delimiter::Tab,
            concurrency: DEFAULT_CONCURRENCY,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            output_dir: PathBuf::from("."),
            valid_file: VALID_FILE.to_string(),
            invalid_file: INVALID_FILE.to_string(),
        }
    }

    pub fn valid_path(&self) -> PathBuf {
        self.output_dir.join(&self.valid_file)
    }

    pub fn invalid_path(&self) -> PathBuf {
        self.output_dir.join(&self.invalid_file)
    }
}

/// Wires source → worker pool → aggregator for one input file.
pub struct DomainCheckEngine<R: MxResolver + 'static, P: SmtpProbe + 'static> {
    validator: Arc<DomainValidator<R, P>>,
    settings: PipelineSettings,
    progress: Arc<dyn ProgressReporter>,
    monitor: SystemMonitor,
}

impl<R: MxResolver + 'static, P: SmtpProbe + 'static> DomainCheckEngine<R, P> {
    pub fn new(validator: Arc<DomainValidator<R, P>>, settings: PipelineSettings) -> Self {
        Self {
            validator,
            settings,
            progress: Arc::new(StdoutProgress),
            monitor: SystemMonitor::new(false),
        }
    }

    pub fn with_progress(mut self, progress: Arc<dyn ProgressReporter>) -> Self {
        self.progress = progress;
        self
    }

    pub fn with_monitoring(mut self, enabled: bool) -> Self {
        self.monitor = SystemMonitor::new(enabled);
        self
    }

    pub async fn run(&self, cancel: Cancellation) -> Result<RunSummary> {
        let settings = &self.settings;
        tracing::info!(
            "Checking domains from {} with {} workers",
            settings.input.display(),
            settings.concurrency
        );
        self.monitor.log_stats("Start");

        let counters = Arc::new(RunCounters::new());
        let source = DomainSource::open(&settings.input, settings.delimiter)?;
        let (domain_tx, domain_rx) = mpsc::channel(settings.queue_capacity.max(1));
        let handle = source.spawn(domain_tx, Arc::clone(&counters), cancel.clone());

        // 等待來源回報第一筆或空輸入，取代固定等待時間
        match handle.started.await {
            Ok(SourceStart::FirstDomain) => {}
            Ok(SourceStart::Empty) => {
                let _ = handle.task.await;
                tracing::error!("No domains found in {}", settings.input.display());
                return Err(PigeonError::EmptyInput {
                    path: settings.input.display().to_string(),
                });
            }
            Ok(SourceStart::Failed { line, message }) => {
                let _ = handle.task.await;
                return Err(PigeonError::SourceReadError { line, message });
            }
            // 來源在回報前結束：取消或執行緒失敗
            Err(_) => {
                return match handle.task.await {
                    Ok(Err(e)) => Err(e),
                    _ => Err(PigeonError::Cancelled),
                };
            }
        }

        let sinks = CsvAppendSink::open(settings.valid_path(), &VALID_HEADER).and_then(|valid| {
            CsvAppendSink::open(settings.invalid_path(), &INVALID_HEADER).map(|invalid| (valid, invalid))
        });
        let (valid_sink, invalid_sink) = match sinks {
            Ok(sinks) => sinks,
            Err(e) => {
                tracing::error!("Error initializing output files: {}", e);
                cancel.cancel();
                drop(domain_rx);
                let _ = handle.task.await;
                return Err(e);
            }
        };

        let concurrency = settings.concurrency.max(1);
        let (result_tx, result_rx) = mpsc::channel(concurrency);
        let aggregator = Aggregator::new(
            valid_sink,
            invalid_sink,
            Arc::clone(&counters),
            Arc::clone(&self.progress),
        );
        let aggregator_task = tokio::spawn(aggregator.run(result_rx, cancel.clone()));

        let pool = WorkerPool::new(Arc::clone(&self.validator), concurrency);
        let emitted = pool.run(domain_rx, result_tx, cancel.clone()).await;
        self.monitor.log_stats("Workers finished");

        let source_result = handle.task.await;
        let summary = aggregator_task.await?;
        self.monitor.log_final_stats();

        source_result??;
        if cancel.is_cancelled() {
            tracing::warn!("Run cancelled after {} results: {}", emitted, summary);
            return Err(PigeonError::Cancelled);
        }

        tracing::info!("{}", summary);
        Ok(summary)
    }
}
