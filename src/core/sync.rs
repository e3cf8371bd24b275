use chrono::{DateTime, SecondsFormat, Utc};
use log::{debug, error, info, warn};
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::core::enrichment::Enricher;
use crate::db::{AlertRepository, NewAlert};
use crate::upstream::{AlertSource, ExternalAlert, FetchError};

/// Terminal failure of a sync pass. Everything else degrades and continues.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("sync cancelled")]
    Cancelled,

    #[error("failed to fetch alerts from upstream: {0}")]
    Fetch(#[source] FetchError),
}

impl From<FetchError> for SyncError {
    fn from(e: FetchError) -> Self {
        match e {
            FetchError::Cancelled => SyncError::Cancelled,
            other => SyncError::Fetch(other),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub cursor: Option<DateTime<Utc>>,
    pub fetched: usize,
    pub persisted: usize,
    pub failed: usize,
}

/// Snapshot stored in `raw_event`.
#[derive(Serialize)]
struct RawEvent<'a> {
    source: &'a str,
    severity: &'a str,
    description: &'a str,
    created_at: DateTime<Utc>,
    synced_at: DateTime<Utc>,
}

pub struct SyncOrchestrator {
    source: Arc<dyn AlertSource>,
    repo: Arc<dyn AlertRepository>,
    enricher: Enricher,
}

impl SyncOrchestrator {
    pub fn new(source: Arc<dyn AlertSource>, repo: Arc<dyn AlertRepository>, enricher: Enricher) -> Self {
        Self { source, repo, enricher }
    }

    /// Runs one sync pass.
    ///
    /// Health probe, watermark read, per-record persistence and the watermark
    /// advance are all best-effort. Only a failed fetch or a cancellation ends
    /// the pass with an error; alerts stored before a cancellation stay stored.
    pub async fn perform_sync(&self, cancel: &CancellationToken) -> Result<SyncReport, SyncError> {
        info!("[SYNC] Starting sync pass...");

        match self.source.check_health(cancel).await {
            Ok(()) => debug!("[SYNC] Upstream is healthy"),
            Err(e) if e.is_cancelled() => return Err(SyncError::Cancelled),
            Err(e) => warn!("[SYNC] Health check failed: {}, proceeding anyway", e),
        }

        let cursor = self.read_cursor(cancel).await?;

        match cursor {
            Some(since) => info!("[SYNC] Fetching alerts since: {}", since.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
            None => info!("[SYNC] Fetching all alerts (no watermark)"),
        }

        let fetched = self.source.fetch_since(cancel, cursor).await?;
        info!("[SYNC] Fetched {} alerts from upstream", fetched.len());

        let mut report = SyncReport {
            cursor,
            fetched: fetched.len(),
            ..SyncReport::default()
        };

        if fetched.is_empty() {
            info!("[SYNC] No new alerts to sync");
            return Ok(report);
        }

        let mut newest: Option<DateTime<Utc>> = None;

        for external in fetched {
            if cancel.is_cancelled() {
                warn!("[SYNC] Sync cancelled after persisting {}/{} alerts", report.persisted, report.fetched);
                return Err(SyncError::Cancelled);
            }

            let created_at = external.created_at;
            let alert = self.prepare(external);

            let stored = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    warn!("[SYNC] Sync cancelled after persisting {}/{} alerts", report.persisted, report.fetched);
                    return Err(SyncError::Cancelled);
                }
                stored = self.repo.create(alert) => stored,
            };

            match stored {
                Ok(id) => {
                    debug!("[SYNC] Stored alert {}", id);
                    report.persisted += 1;
                    newest = newest.max(Some(created_at));
                }
                Err(e) => {
                    error!("[SYNC] Error storing alert: {}", e);
                    report.failed += 1;
                }
            }
        }

        if let Some(newest) = newest {
            if let Err(e) = self.repo.advance_watermark(newest).await {
                warn!("[SYNC] Warning: Failed to advance watermark: {}", e);
            }
        }

        info!(
            "[SYNC] Successfully synced {}/{} alerts ({} failed)",
            report.persisted, report.fetched, report.failed
        );
        Ok(report)
    }

    /// Unreadable watermark means a full fetch, never an aborted pass.
    async fn read_cursor(&self, cancel: &CancellationToken) -> Result<Option<DateTime<Utc>>, SyncError> {
        let read = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(SyncError::Cancelled),
            read = self.repo.read_watermark() => read,
        };

        Ok(read.unwrap_or_else(|e| {
            warn!("[SYNC] Warning: Could not read watermark: {}. Fetching all alerts.", e);
            None
        }))
    }

    fn prepare(&self, external: ExternalAlert) -> NewAlert {
        let raw_event = raw_event(&external, Utc::now());
        let enrichment = self.enricher.next();

        NewAlert {
            source: external.source,
            severity: external.severity,
            description: external.description,
            raw_event,
            enrichment_type: Some(enrichment.kind.as_str().to_string()),
            origin_address: Some(enrichment.origin_address.to_string()),
            created_at: external.created_at,
        }
    }
}

fn raw_event(external: &ExternalAlert, synced_at: DateTime<Utc>) -> Vec<u8> {
    let snapshot = RawEvent {
        source: &external.source,
        severity: &external.severity,
        description: &external.description,
        created_at: external.created_at,
        synced_at,
    };

    serde_json::to_vec(&snapshot).unwrap_or_else(|e| {
        warn!("[SYNC] Warning: Failed to serialize raw event: {}", e);
        b"{}".to_vec()
    })
}
