pub(crate) mod client;
pub(crate) mod models;
mod retry;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

pub use client::UpstreamClient;
pub use models::ExternalAlert;
pub use retry::RetryPolicy;

#[derive(Debug, Error)]
pub enum FetchError {
    /// The caller's deadline or shutdown fired. Never a retry outcome.
    #[error("request cancelled")]
    Cancelled,

    #[error("upstream returned status {status}: {body}")]
    Status { status: StatusCode, body: String },

    #[error("giving up after {attempts} attempts: {last}")]
    Exhausted { attempts: u32, last: String },

    #[error("failed to decode upstream response: {0}")]
    Decode(#[source] reqwest::Error),

    #[error("failed to build upstream client: {0}")]
    Client(#[source] reqwest::Error),
}

impl FetchError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, FetchError::Cancelled)
    }
}

/// Where alerts come from.
#[async_trait]
pub trait AlertSource: Send + Sync {
    /// Advisory availability probe.
    async fn check_health(&self, cancel: &CancellationToken) -> Result<(), FetchError>;

    /// `None` asks for the full history the source is willing to serve,
    /// `Some(t)` only for alerts strictly newer than `t`.
    async fn fetch_since(
        &self,
        cancel: &CancellationToken,
        cursor: Option<DateTime<Utc>>,
    ) -> Result<Vec<ExternalAlert>, FetchError>;
}

pub fn init(url: &str) -> Result<UpstreamClient, FetchError> {
    UpstreamClient::new(url, 10, 5, RetryPolicy::default())
}
