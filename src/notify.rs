//! Reliable terminal-status notification.
//!
//! Builds the fixed-shape callback payload and delivers it with bounded
//! retries and exponential backoff. Delivery failure never changes the job's
//! own recorded outcome; it only affects whether the external party hears
//! about it.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::config::RetryPolicy;
use crate::job::JobResult;

/// Terminal status on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotifyStatus {
    Success,
    Failed,
}

/// The wire contract. `output_url` is always the artifact URL on success and
/// always empty on failure; `status` and `output_url` are mutually determined.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallbackPayload {
    pub build_id: String,
    pub client_id: String,
    pub output_url: String,
    pub status: NotifyStatus,
    pub message: String,
}

impl CallbackPayload {
    /// Derives the payload from a job's terminal result. The mutual-exclusion
    /// invariant holds by construction: only the success arm carries a URL.
    pub fn from_result(job_id: Uuid, client_id: &str, result: &JobResult) -> Self {
        match result {
            JobResult::Success { artifact_url, .. } => Self {
                build_id: job_id.to_string(),
                client_id: client_id.to_string(),
                output_url: artifact_url.clone(),
                status: NotifyStatus::Success,
                message: "Build completed successfully".to_string(),
            },
            JobResult::Failure { error } => Self {
                build_id: job_id.to_string(),
                client_id: client_id.to_string(),
                output_url: String::new(),
                status: NotifyStatus::Failed,
                message: error.to_string(),
            },
        }
    }
}

/// How a notification attempt sequence ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifyOutcome {
    /// A 2xx response was received on the given attempt.
    Delivered { attempts: u32 },
    /// All attempts failed; the outcome stands unreported.
    Exhausted { attempts: u32 },
    /// No callback URL was supplied.
    Skipped,
}

/// Synchronous POST of a payload to a callback endpoint.
#[async_trait]
pub trait CallbackTransport: Send + Sync {
    /// Returns the HTTP status code, or an error on transport failure.
    async fn post(&self, url: &str, payload: &CallbackPayload) -> Result<u16>;
}

/// Production transport over reqwest.
pub struct HttpCallbackTransport {
    http: reqwest::Client,
}

impl HttpCallbackTransport {
    pub fn new(http: reqwest::Client) -> Self {
        Self { http }
    }
}

#[async_trait]
impl CallbackTransport for HttpCallbackTransport {
    async fn post(&self, url: &str, payload: &CallbackPayload) -> Result<u16> {
        let response = self
            .http
            .post(url)
            .json(payload)
            .send()
            .await
            .with_context(|| format!("callback POST to {} failed", url))?;
        Ok(response.status().as_u16())
    }
}

pub struct Notifier {
    transport: Arc<dyn CallbackTransport>,
    policy: RetryPolicy,
}

impl Notifier {
    pub fn new(transport: Arc<dyn CallbackTransport>, policy: RetryPolicy) -> Self {
        Self { transport, policy }
    }

    /// Delivers `payload` to `url`, retrying per the policy.
    ///
    /// The backoff schedule comes from [`RetryPolicy::delay_before`]; the
    /// sleep suspends only this job's task.
    pub async fn notify(&self, url: &str, payload: &CallbackPayload) -> NotifyOutcome {
        for attempt in 1..=self.policy.max_attempts {
            if let Some(delay) = self.policy.delay_before(attempt) {
                tokio::time::sleep(delay).await;
            }

            match self.transport.post(url, payload).await {
                Ok(code) if (200..300).contains(&code) => {
                    info!(build_id = %payload.build_id, attempt, "callback delivered");
                    return NotifyOutcome::Delivered { attempts: attempt };
                }
                Ok(code) => {
                    warn!(
                        build_id = %payload.build_id,
                        attempt,
                        max_attempts = self.policy.max_attempts,
                        code,
                        "callback rejected, will retry"
                    );
                }
                Err(e) => {
                    warn!(
                        build_id = %payload.build_id,
                        attempt,
                        max_attempts = self.policy.max_attempts,
                        error = %e,
                        "callback attempt failed, will retry"
                    );
                }
            }
        }

        error!(
            build_id = %payload.build_id,
            attempts = self.policy.max_attempts,
            "callback delivery exhausted all attempts"
        );
        NotifyOutcome::Exhausted {
            attempts: self.policy.max_attempts,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StageError;

    fn success_result() -> JobResult {
        JobResult::Success {
            artifact_name: "site.zip".to_string(),
            artifact_url: "https://store.example/output/site.zip".to_string(),
        }
    }

    #[test]
    fn test_success_payload_carries_url() {
        let payload = CallbackPayload::from_result(Uuid::nil(), "c1", &success_result());
        assert_eq!(payload.status, NotifyStatus::Success);
        assert_eq!(payload.output_url, "https://store.example/output/site.zip");
        assert_eq!(payload.client_id, "c1");
    }

    #[test]
    fn test_failure_payload_has_empty_url() {
        let result = JobResult::Failure {
            error: StageError::Fetch("failed to download archive: HTTP 404".to_string()),
        };
        let payload = CallbackPayload::from_result(Uuid::nil(), "c1", &result);
        assert_eq!(payload.status, NotifyStatus::Failed);
        assert_eq!(payload.output_url, "");
        assert!(payload.message.contains("download"));
    }

    #[test]
    fn test_payload_wire_shape() {
        let payload = CallbackPayload::from_result(Uuid::nil(), "c1", &success_result());
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["status"], "success");
        assert_eq!(
            json.as_object().unwrap().keys().len(),
            5,
            "payload must carry exactly build_id, client_id, output_url, status, message"
        );
        assert!(json["build_id"].is_string());
    }
}
