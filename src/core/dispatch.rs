use crate::core::cancel::Cancellation;
use crate::domain::model::{Message, Recipient};
use crate::domain::ports::{AddressCheck, EmailSender};
use crate::utils::error::{PigeonError, Result};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::mpsc;

pub const DEFAULT_BATCH_SIZE: usize = 50;
pub const DEFAULT_SKIP_ROWS: usize = 1;

#[derive(Debug, Clone)]
pub struct DispatchSettings {
    pub sender: String,
    pub subject: String,
    pub body: String,
    pub batch_size: usize,
    pub skip_rows: usize,
}

/// Reads recipients (email in the first column, optional name in the
/// second) and pushes them into `output`. Runs on a blocking thread.
pub fn load_recipients<R: Read>(
    reader: R,
    skip_rows: usize,
    output: &mpsc::Sender<Recipient>,
    cancel: &Cancellation,
) -> Result<u64> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(reader);

    let mut loaded = 0u64;
    for (index, record) in reader.records().enumerate() {
        let line = index as u64 + 1;
        if index < skip_rows {
            continue;
        }
        if cancel.is_cancelled() {
            return Err(PigeonError::Cancelled);
        }

        let record = record.map_err(|e| PigeonError::SourceReadError {
            line,
            message: format!("failed to read CSV record: {}", e),
        })?;
        let email = match record.get(0).map(str::trim) {
            Some(email) if !email.is_empty() => email.to_string(),
            _ => {
                return Err(PigeonError::SourceReadError {
                    line,
                    message: format!("expected an email in the first column, got {} columns", record.len()),
                })
            }
        };
        let name = record
            .get(1)
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string);

        if output.blocking_send(Recipient { name, email }).is_err() {
            return Err(PigeonError::Cancelled);
        }
        loaded += 1;
    }

    Ok(loaded)
}

/// 讀取收件者 → 分批 → 交給 EmailSender 發送
pub struct Dispatcher<S: EmailSender> {
    sender: S,
    settings: DispatchSettings,
    address_check: Option<Arc<dyn AddressCheck>>,
}

impl<S: EmailSender> Dispatcher<S> {
    pub fn new(sender: S, settings: DispatchSettings) -> Self {
        Self {
            sender,
            settings,
            address_check: None,
        }
    }

    /// Recipients failing `check` are logged and left out of every batch.
    pub fn with_address_check(mut self, check: Arc<dyn AddressCheck>) -> Self {
        self.address_check = Some(check);
        self
    }

    pub async fn run_file<P: AsRef<Path>>(&self, path: P, cancel: Cancellation) -> Result<u64> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| PigeonError::SourceReadError {
            line: 0,
            message: format!("cannot open {}: {}", path.display(), e),
        })?;
        self.run(file, cancel).await
    }

    /// Sends every recipient in `reader`, batch by batch. A read failure
    /// cancels the run and is returned; provider failures are logged and
    /// the run moves on to the next batch. Returns recipients processed.
    pub async fn run<R: Read + Send + 'static>(&self, reader: R, cancel: Cancellation) -> Result<u64> {
        let batch_size = self.settings.batch_size.max(1);
        let skip_rows = self.settings.skip_rows;
        let (tx, mut rx) = mpsc::channel(batch_size);

        let loader_cancel = cancel.clone();
        let loader = tokio::task::spawn_blocking(move || {
            let result = load_recipients(reader, skip_rows, &tx, &loader_cancel);
            if let Err(e) = &result {
                if !matches!(e, PigeonError::Cancelled) {
                    tracing::error!("Error loading recipients: {}", e);
                    loader_cancel.cancel();
                }
            }
            result
        });

        let mut batch = Vec::with_capacity(batch_size);
        let mut processed = 0u64;
        let mut skipped = 0u64;

        loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                recipient = rx.recv() => recipient,
            };
            match next {
                Some(recipient) => {
                    if let Some(check) = &self.address_check {
                        if let Err(reason) = check.check(&recipient.email).await {
                            tracing::warn!("Skipping recipient {}: {}", recipient.email, reason);
                            skipped += 1;
                            continue;
                        }
                    }
                    batch.push(recipient);
                    if batch.len() == batch_size {
                        processed += self.flush(&mut batch).await;
                    }
                }
                None => {
                    if !batch.is_empty() {
                        processed += self.flush(&mut batch).await;
                    }
                    break;
                }
            }
        }
        drop(rx);

        loader.await??;
        if cancel.is_cancelled() {
            return Err(PigeonError::Cancelled);
        }

        tracing::info!(
            "Email sending completed, processed {} recipients, skipped {}",
            processed,
            skipped
        );
        Ok(processed)
    }

    async fn flush(&self, batch: &mut Vec<Recipient>) -> u64 {
        let message = Message {
            from: self.settings.sender.clone(),
            to: std::mem::take(batch),
            subject: self.settings.subject.clone(),
            body: self.settings.body.clone(),
        };
        let count = message.to.len() as u64;

        if let Err(e) = self.sender.send(&message).await {
            tracing::error!("Error sending email batch of {}: {}", count, e);
        }
        count
    }
}
