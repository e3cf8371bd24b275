use std::sync::Arc;
use thiserror::Error;

use crate::db::{Alert, AlertRepository, InvalidWindow, RecencyWindow, RepoError};

#[derive(Debug, Error)]
pub enum QueryError {
    #[error(transparent)]
    InvalidWindow(#[from] InvalidWindow),

    #[error("alert {0} not found")]
    NotFound(String),

    #[error("storage error: {0}")]
    Storage(#[source] RepoError),
}

/// Read side of the alert store used by the HTTP layer.
pub struct AlertService {
    repo: Arc<dyn AlertRepository>,
}

impl AlertService {
    pub fn new(repo: Arc<dyn AlertRepository>) -> Self {
        Self { repo }
    }

    pub async fn all(&self) -> Result<Vec<Alert>, QueryError> {
        self.repo.get_all().await.map_err(QueryError::Storage)
    }

    /// Ids are integers; anything else cannot name an alert.
    pub async fn by_id(&self, id: &str) -> Result<Alert, QueryError> {
        let Ok(numeric) = id.trim().parse::<i64>() else {
            return Err(QueryError::NotFound(id.to_string()));
        };

        match self.repo.get_by_id(numeric).await {
            Ok(alert) => Ok(alert),
            Err(RepoError::NotFound(_)) => Err(QueryError::NotFound(id.to_string())),
            Err(e) => Err(QueryError::Storage(e)),
        }
    }

    /// Validates `days` before any storage access.
    pub async fn within_days(&self, days: i64) -> Result<Vec<Alert>, QueryError> {
        let window = RecencyWindow::days(days)?;
        self.repo
            .get_by_recency_window(window)
            .await
            .map_err(QueryError::Storage)
    }
}
