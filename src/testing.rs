//! In-memory doubles for the repository and the upstream source.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::db::{Alert, AlertRepository, NewAlert, RecencyWindow, RepoError};
use crate::upstream::{AlertSource, ExternalAlert, FetchError};

#[derive(Default)]
pub struct MemoryAlertRepository {
    alerts: Mutex<Vec<Alert>>,
    next_id: AtomicUsize,
    pub create_calls: AtomicUsize,
    pub read_calls: AtomicUsize,
    pub advance_calls: Mutex<Vec<DateTime<Utc>>>,
    failing_creates: HashSet<usize>,
    fail_reads: bool,
    fail_watermark: bool,
    cancel_after: Option<(usize, CancellationToken)>,
}

impl MemoryAlertRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the n-th `create` call (1-based) fail.
    pub fn failing_create(mut self, call: usize) -> Self {
        self.failing_creates.insert(call);
        self
    }

    pub fn failing_reads(mut self) -> Self {
        self.fail_reads = true;
        self
    }

    pub fn failing_watermark(mut self) -> Self {
        self.fail_watermark = true;
        self
    }

    /// Cancels `token` once `creates` alerts have been stored.
    pub fn cancel_after(mut self, creates: usize, token: CancellationToken) -> Self {
        self.cancel_after = Some((creates, token));
        self
    }

    pub fn seeded(self, alerts: Vec<NewAlert>) -> Self {
        for alert in alerts {
            self.insert(alert);
        }
        self
    }

    pub fn stored(&self) -> Vec<Alert> {
        self.alerts.lock().unwrap().clone()
    }

    pub fn creates(&self) -> usize {
        self.create_calls.load(Ordering::SeqCst)
    }

    fn insert(&self, alert: NewAlert) -> i64 {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) as i64 + 1;
        self.alerts.lock().unwrap().push(Alert {
            id,
            source: alert.source,
            severity: alert.severity,
            description: alert.description,
            raw_event: alert.raw_event,
            enrichment_type: alert.enrichment_type,
            origin_address: alert.origin_address,
            created_at: alert.created_at,
        });
        id
    }

    fn newest_first(mut alerts: Vec<Alert>) -> Vec<Alert> {
        alerts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        alerts
    }

    fn read_guard(&self) -> Result<(), RepoError> {
        self.read_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_reads {
            return Err(RepoError::Database(sqlx::Error::PoolTimedOut));
        }
        Ok(())
    }
}

#[async_trait]
impl AlertRepository for MemoryAlertRepository {
    async fn create(&self, alert: NewAlert) -> Result<i64, RepoError> {
        let call = self.create_calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.failing_creates.contains(&call) {
            return Err(RepoError::Database(sqlx::Error::Protocol("insert rejected".into())));
        }

        let id = self.insert(alert);

        if let Some((after, token)) = &self.cancel_after {
            if self.alerts.lock().unwrap().len() >= *after {
                token.cancel();
            }
        }
        Ok(id)
    }

    async fn get_all(&self) -> Result<Vec<Alert>, RepoError> {
        self.read_guard()?;
        Ok(Self::newest_first(self.stored()))
    }

    async fn get_by_id(&self, id: i64) -> Result<Alert, RepoError> {
        self.read_guard()?;
        self.stored()
            .into_iter()
            .find(|a| a.id == id)
            .ok_or(RepoError::NotFound(id))
    }

    async fn get_by_recency_window(&self, window: RecencyWindow) -> Result<Vec<Alert>, RepoError> {
        self.read_guard()?;
        let cutoff = window.cutoff(Utc::now());
        let recent = self.stored().into_iter().filter(|a| a.created_at >= cutoff).collect();
        Ok(Self::newest_first(recent))
    }

    async fn read_watermark(&self) -> Result<Option<DateTime<Utc>>, RepoError> {
        if self.fail_watermark {
            return Err(RepoError::Database(sqlx::Error::PoolTimedOut));
        }
        Ok(self.stored().iter().map(|a| a.created_at).max())
    }

    async fn advance_watermark(&self, to: DateTime<Utc>) -> Result<(), RepoError> {
        self.advance_calls.lock().unwrap().push(to);
        if self.fail_watermark {
            return Err(RepoError::Database(sqlx::Error::PoolTimedOut));
        }
        Ok(())
    }
}

/// Upstream double that serves a fixed batch and records every cursor.
#[derive(Default)]
pub struct ScriptedSource {
    alerts: Vec<ExternalAlert>,
    healthy: bool,
    fail_fetch: bool,
    fetch_delay: Option<Duration>,
    pub health_calls: AtomicUsize,
    pub cursors: Mutex<Vec<Option<DateTime<Utc>>>>,
}

impl ScriptedSource {
    pub fn serving(alerts: Vec<ExternalAlert>) -> Self {
        Self {
            alerts,
            healthy: true,
            ..Self::default()
        }
    }

    pub fn unhealthy(mut self) -> Self {
        self.healthy = false;
        self
    }

    pub fn failing(mut self) -> Self {
        self.fail_fetch = true;
        self
    }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.fetch_delay = Some(delay);
        self
    }

    pub fn cursors(&self) -> Vec<Option<DateTime<Utc>>> {
        self.cursors.lock().unwrap().clone()
    }
}

#[async_trait]
impl AlertSource for ScriptedSource {
    async fn check_health(&self, cancel: &CancellationToken) -> Result<(), FetchError> {
        self.health_calls.fetch_add(1, Ordering::SeqCst);
        if cancel.is_cancelled() {
            return Err(FetchError::Cancelled);
        }
        if self.healthy {
            Ok(())
        } else {
            Err(FetchError::Exhausted { attempts: 4, last: "connection refused".into() })
        }
    }

    async fn fetch_since(
        &self,
        cancel: &CancellationToken,
        cursor: Option<DateTime<Utc>>,
    ) -> Result<Vec<ExternalAlert>, FetchError> {
        self.cursors.lock().unwrap().push(cursor);

        if let Some(delay) = self.fetch_delay {
            tokio::select! {
                _ = cancel.cancelled() => return Err(FetchError::Cancelled),
                _ = tokio::time::sleep(delay) => {}
            }
        }
        if self.fail_fetch {
            return Err(FetchError::Exhausted { attempts: 4, last: "server returned 500".into() });
        }

        Ok(self
            .alerts
            .iter()
            .filter(|a| cursor.map_or(true, |since| a.created_at > since))
            .cloned()
            .collect())
    }
}

pub fn external(source: &str, severity: &str, created_at: DateTime<Utc>) -> ExternalAlert {
    ExternalAlert {
        source: source.to_string(),
        severity: severity.to_string(),
        description: format!("{} reported a {} event", source, severity),
        created_at,
    }
}
