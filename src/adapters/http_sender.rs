use crate::domain::model::Message;
use crate::domain::ports::EmailSender;
use crate::utils::error::{PigeonError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Default, Deserialize)]
struct SendResponse {
    #[serde(default)]
    failures: Vec<RecipientFailure>,
}

#[derive(Debug, Deserialize)]
struct RecipientFailure {
    email: String,
    #[serde(default)]
    error: String,
}

/// Posts each batch as one JSON message to a bulk-mail provider endpoint.
pub struct HttpEmailSender {
    client: Client,
    endpoint: String,
    api_key: Option<String>,
}

impl HttpEmailSender {
    pub fn new(endpoint: String, api_key: Option<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint,
            api_key,
        })
    }
}

#[async_trait]
impl EmailSender for HttpEmailSender {
    async fn send(&self, message: &Message) -> Result<()> {
        tracing::debug!(
            "Posting batch of {} recipients to {}",
            message.to.len(),
            self.endpoint
        );

        let mut request = self.client.post(&self.endpoint).json(message);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(PigeonError::DispatchError {
                message: format!("provider returned {}: {}", status, body.trim()),
            });
        }

        // 個別收件者失敗只記錄，不中斷整批
        if !body.trim().is_empty() {
            match serde_json::from_str::<SendResponse>(&body) {
                Ok(parsed) => {
                    for failure in parsed.failures {
                        tracing::warn!("Failed to send email to {}: {}", failure.email, failure.error);
                    }
                }
                Err(e) => tracing::debug!("Ignoring unparseable provider response: {}", e),
            }
        }

        Ok(())
    }
}
