use crate::core::cancel::Cancellation;
use crate::core::counters::RunCounters;
use crate::domain::model::{RunSummary, ValidationResult};
use crate::domain::ports::{ProgressReporter, ResultSink};
use std::sync::Arc;
use tokio::sync::mpsc;

pub const PROGRESS_INTERVAL: u64 = 100;

/// Prints `Processed n/total domains (pct%)` to stdout.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdoutProgress;

impl ProgressReporter for StdoutProgress {
    fn report(&self, processed: u64, total: u64) {
        let percent = if total == 0 {
            100.0
        } else {
            processed as f64 / total as f64 * 100.0
        };
        println!("Processed {}/{} domains ({:.2}%)", processed, total, percent);
    }
}

/// Single consumer of the result queue. It owns both sinks, so every file
/// append happens on this one task.
pub struct Aggregator<V: ResultSink, I: ResultSink> {
    valid_sink: V,
    invalid_sink: I,
    counters: Arc<RunCounters>,
    progress: Arc<dyn ProgressReporter>,
    interval: u64,
}

impl<V: ResultSink, I: ResultSink> Aggregator<V, I> {
    pub fn new(
        valid_sink: V,
        invalid_sink: I,
        counters: Arc<RunCounters>,
        progress: Arc<dyn ProgressReporter>,
    ) -> Self {
        Self {
            valid_sink,
            invalid_sink,
            counters,
            progress,
            interval: PROGRESS_INTERVAL,
        }
    }

    pub fn with_interval(mut self, interval: u64) -> Self {
        self.interval = interval.max(1);
        self
    }

    /// Consumes results until the queue is closed and drained. On
    /// cancellation the queue is closed and whatever is already buffered is
    /// still written.
    pub async fn run(
        mut self,
        mut results: mpsc::Receiver<ValidationResult>,
        cancel: Cancellation,
    ) -> RunSummary {
        let mut last_reported = 0u64;
        let mut closing = false;

        loop {
            let next = if closing {
                results.recv().await
            } else {
                tokio::select! {
                    result = results.recv() => result,
                    _ = cancel.cancelled() => {
                        tracing::debug!("Aggregator draining after cancellation");
                        results.close();
                        closing = true;
                        continue;
                    }
                }
            };
            let Some(result) = next else {
                break;
            };

            let processed = self.record(&result);
            if processed % self.interval == 0 {
                self.progress.report(processed, self.counters.total());
                last_reported = processed;
            }
        }

        // 最後一筆不一定落在整百，補印一次
        let processed = self.counters.processed();
        if processed != last_reported {
            self.progress.report(processed, self.counters.total());
        }

        self.counters.snapshot()
    }

    fn record(&mut self, result: &ValidationResult) -> u64 {
        let domain = result.domain.as_str();
        if result.valid {
            if let Err(e) = self.valid_sink.append(&[domain]) {
                tracing::error!("Error writing {} to valid results: {}", domain, e);
            }
        } else if let Err(e) = self.invalid_sink.append(&[domain, result.error_message()]) {
            tracing::error!("Error writing {} to invalid results: {}", domain, e);
        }
        self.counters.record_result(result.valid)
    }
}
