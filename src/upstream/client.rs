use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use log::{debug, error, warn};
use reqwest::{header, Client, Response};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use urlencoding::encode;

use super::models::{AlertsEnvelope, ExternalAlert};
use super::retry::{is_retryable, RetryPolicy};
use super::{AlertSource, FetchError};

/// HTTP client for the upstream alert source with bounded retries.
pub struct UpstreamClient {
    url: String,
    client: Client,
    policy: RetryPolicy,
}

impl UpstreamClient {
    pub fn new(
        url: &str,
        timeout_secs: u64,
        connect_timeout: u64,
        policy: RetryPolicy,
    ) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(connect_timeout))
            .build()
            .map_err(FetchError::Client)?;

        Ok(Self {
            url: url.trim_end_matches('/').to_string(),
            client,
            policy,
        })
    }

    fn alerts_url(&self, cursor: Option<DateTime<Utc>>) -> String {
        match cursor {
            Some(since) => {
                let since = since.to_rfc3339_opts(SecondsFormat::AutoSi, true);
                format!("{}/alerts?since={}", self.url, encode(&since))
            }
            None => format!("{}/alerts", self.url),
        }
    }

    /// GET with retries on connection errors, 5xx and 429.
    ///
    /// Only a 2xx response is returned as `Ok`. Cancellation is checked before
    /// each attempt, during the request and during the backoff sleep.
    async fn get_with_retry(&self, cancel: &CancellationToken, url: &str) -> Result<Response, FetchError> {
        let mut retry = 0u32;

        loop {
            if cancel.is_cancelled() {
                return Err(FetchError::Cancelled);
            }

            let attempt = retry + 1;
            let sent = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(FetchError::Cancelled),
                sent = self.client.get(url).send() => sent,
            };

            let (reason, retry_after) = match sent {
                Ok(res) if res.status().is_success() => {
                    debug!("[RETRY] GET {} succeeded on attempt {}", url, attempt);
                    return Ok(res);
                }
                Ok(res) if is_retryable(res.status()) => {
                    let retry_after = retry_after(&res);
                    (format!("server returned {}", res.status()), retry_after)
                }
                Ok(res) => {
                    let status = res.status();
                    let body = res.text().await.unwrap_or_default();
                    warn!("[RETRY] GET {} returned {}, not retrying", url, status);
                    return Err(FetchError::Status { status, body });
                }
                Err(e) => (format!("connection error: {}", e), None),
            };

            if retry >= self.policy.max_retries {
                error!("[RETRY] GET {} failed after {} attempts: {}", url, attempt, reason);
                return Err(FetchError::Exhausted { attempts: attempt, last: reason });
            }

            let wait = self.policy.backoff(retry, retry_after);
            warn!(
                "[RETRY] GET {} attempt {}/{} failed: {}. Retrying in {:?}",
                url,
                attempt,
                self.policy.max_attempts(),
                reason,
                wait
            );

            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(FetchError::Cancelled),
                _ = tokio::time::sleep(wait) => {}
            }
            retry += 1;
        }
    }
}

fn retry_after(res: &Response) -> Option<Duration> {
    res.headers()
        .get(header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}

#[async_trait]
impl AlertSource for UpstreamClient {
    async fn check_health(&self, cancel: &CancellationToken) -> Result<(), FetchError> {
        let url = format!("{}/health", self.url);
        self.get_with_retry(cancel, &url).await.map(|_| ())
    }

    async fn fetch_since(
        &self,
        cancel: &CancellationToken,
        cursor: Option<DateTime<Utc>>,
    ) -> Result<Vec<ExternalAlert>, FetchError> {
        let url = self.alerts_url(cursor);
        let res = self.get_with_retry(cancel, &url).await?;

        let envelope = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(FetchError::Cancelled),
            body = res.json::<AlertsEnvelope>() => body.map_err(FetchError::Decode)?,
        };

        Ok(envelope.into_alerts())
    }
}
