use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use super::models::{Alert, NewAlert, RecencyWindow};

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("alert {0} not found")]
    NotFound(i64),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Storage contract for alerts and the sync watermark.
///
/// The watermark pair (`read_watermark` / `advance_watermark`) stays on this
/// trait even when a backend derives the watermark from stored rows, so a
/// backend with an independently stored watermark can replace it without
/// touching the sync pass.
#[async_trait]
pub trait AlertRepository: Send + Sync {
    /// Inserts a new alert and returns its id. Never an upsert.
    async fn create(&self, alert: NewAlert) -> Result<i64, RepoError>;

    /// All alerts, newest `created_at` first.
    async fn get_all(&self) -> Result<Vec<Alert>, RepoError>;

    async fn get_by_id(&self, id: i64) -> Result<Alert, RepoError>;

    /// Alerts created inside `window`, newest first.
    async fn get_by_recency_window(&self, window: RecencyWindow) -> Result<Vec<Alert>, RepoError>;

    /// Newest `created_at` ingested so far, `None` before the first alert.
    async fn read_watermark(&self) -> Result<Option<DateTime<Utc>>, RepoError>;

    async fn advance_watermark(&self, to: DateTime<Utc>) -> Result<(), RepoError>;
}
