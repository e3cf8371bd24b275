use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::debug;
use sqlx::PgPool;

use super::models::{Alert, NewAlert, RecencyWindow};
use super::repository::{AlertRepository, RepoError};

/// Postgres-backed [`AlertRepository`].
///
/// The watermark is not stored separately: it is `MAX(created_at)` over the
/// `alerts` table, so advancing it is a no-op.
#[derive(Clone)]
pub struct PgAlertRepository {
    pool: PgPool,
}

impl PgAlertRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AlertRepository for PgAlertRepository {
    async fn create(&self, alert: NewAlert) -> Result<i64, RepoError> {
        let id = sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO alerts (source, severity, description, raw_event, enrichment_type, origin_address, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id
            "#
        )
        .bind(alert.source)
        .bind(alert.severity)
        .bind(alert.description)
        .bind(alert.raw_event)
        .bind(alert.enrichment_type)
        .bind(alert.origin_address)
        .bind(alert.created_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(id)
    }

    async fn get_all(&self) -> Result<Vec<Alert>, RepoError> {
        let alerts = sqlx::query_as::<_, Alert>(
            r#"
            SELECT id, source, severity, description, raw_event, enrichment_type, origin_address, created_at
            FROM alerts
            ORDER BY created_at DESC
            "#
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(alerts)
    }

    async fn get_by_id(&self, id: i64) -> Result<Alert, RepoError> {
        sqlx::query_as::<_, Alert>(
            r#"
            SELECT id, source, severity, description, raw_event, enrichment_type, origin_address, created_at
            FROM alerts
            WHERE id = $1
            "#
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(RepoError::NotFound(id))
    }

    async fn get_by_recency_window(&self, window: RecencyWindow) -> Result<Vec<Alert>, RepoError> {
        let cutoff = window.cutoff(Utc::now());
        debug!("Loading alerts from the last {} days (since {})", window.as_days(), cutoff);

        let alerts = sqlx::query_as::<_, Alert>(
            r#"
            SELECT id, source, severity, description, raw_event, enrichment_type, origin_address, created_at
            FROM alerts
            WHERE created_at >= $1
            ORDER BY created_at DESC
            "#
        )
        .bind(cutoff)
        .fetch_all(&self.pool)
        .await?;

        Ok(alerts)
    }

    async fn read_watermark(&self) -> Result<Option<DateTime<Utc>>, RepoError> {
        let newest = sqlx::query_scalar::<_, Option<DateTime<Utc>>>("SELECT MAX(created_at) FROM alerts")
            .fetch_one(&self.pool)
            .await?;

        Ok(newest)
    }

    async fn advance_watermark(&self, to: DateTime<Utc>) -> Result<(), RepoError> {
        debug!("Watermark is derived from stored alerts, nothing to advance (newest {})", to);
        Ok(())
    }
}
