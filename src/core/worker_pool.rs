use crate::core::cancel::Cancellation;
use crate::core::validator::DomainValidator;
use crate::domain::model::{Domain, ValidationResult};
use crate::domain::ports::{MxResolver, SmtpProbe};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinSet;

pub const DEFAULT_CONCURRENCY: usize = 10;

/// Fixed number of workers sharing one input queue and one output queue.
pub struct WorkerPool<R: MxResolver + 'static, P: SmtpProbe + 'static> {
    validator: Arc<DomainValidator<R, P>>,
    concurrency: usize,
}

impl<R: MxResolver + 'static, P: SmtpProbe + 'static> WorkerPool<R, P> {
    pub fn new(validator: Arc<DomainValidator<R, P>>, concurrency: usize) -> Self {
        Self {
            validator,
            concurrency: concurrency.max(1),
        }
    }

    /// Runs until the input queue is closed and drained, or the run is
    /// cancelled. `outputs` is dropped only after every worker has returned,
    /// which closes the result queue. Returns how many results were emitted.
    pub async fn run(
        &self,
        inputs: mpsc::Receiver<Domain>,
        outputs: mpsc::Sender<ValidationResult>,
        cancel: Cancellation,
    ) -> u64 {
        let inputs = Arc::new(Mutex::new(inputs));
        let mut workers = JoinSet::new();

        for id in 0..self.concurrency {
            workers.spawn(worker_loop(
                id,
                Arc::clone(&self.validator),
                Arc::clone(&inputs),
                outputs.clone(),
                cancel.clone(),
            ));
        }
        // 只留工作者持有接收端，全部退出後來源端的 send 才會失敗
        drop(inputs);

        let mut emitted = 0u64;
        while let Some(joined) = workers.join_next().await {
            match joined {
                Ok(count) => emitted += count,
                Err(e) => tracing::error!("Worker task failed: {}", e),
            }
        }

        drop(outputs);
        tracing::debug!(
            "All {} workers finished, {} results emitted",
            self.concurrency,
            emitted
        );
        emitted
    }
}

async fn worker_loop<R: MxResolver, P: SmtpProbe>(
    id: usize,
    validator: Arc<DomainValidator<R, P>>,
    inputs: Arc<Mutex<mpsc::Receiver<Domain>>>,
    outputs: mpsc::Sender<ValidationResult>,
    cancel: Cancellation,
) -> u64 {
    let mut emitted = 0u64;

    loop {
        let next = {
            let mut rx = inputs.lock().await;
            tokio::select! {
                domain = rx.recv() => domain,
                _ = cancel.cancelled() => None,
            }
        };
        let Some(domain) = next else {
            break;
        };

        let result = validator.validate(domain).await;

        tokio::select! {
            sent = outputs.send(result) => {
                if sent.is_err() {
                    tracing::warn!("Worker {}: result queue closed early", id);
                    break;
                }
            }
            _ = cancel.cancelled() => break,
        }
        emitted += 1;
    }

    tracing::debug!("Worker {} exiting after {} domains", id, emitted);
    emitted
}
