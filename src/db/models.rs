use base64::{engine::general_purpose::STANDARD as B64, Engine};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Serialize, Serializer};
use sqlx::FromRow;
use thiserror::Error;

/// A persisted alert.
///
/// `created_at` carries the upstream event time, not the ingestion time,
/// and is never rewritten after insert.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize)]
pub struct Alert {
    pub id: i64,
    pub source: String,
    pub severity: String,
    pub description: String,
    #[serde(serialize_with = "as_base64")]
    pub raw_event: Vec<u8>,
    pub enrichment_type: Option<String>,
    pub origin_address: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Insert payload for [`Alert`]. The id is assigned by the repository.
#[derive(Debug, Clone, PartialEq)]
pub struct NewAlert {
    pub source: String,
    pub severity: String,
    pub description: String,
    pub raw_event: Vec<u8>,
    pub enrichment_type: Option<String>,
    pub origin_address: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("days must be greater than 0, got {0}")]
pub struct InvalidWindow(pub i64);

/// A validated "last N days" window. Only positive day counts can be built.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecencyWindow {
    days: i64,
}

impl RecencyWindow {
    pub fn days(days: i64) -> Result<Self, InvalidWindow> {
        if days <= 0 {
            return Err(InvalidWindow(days));
        }
        Ok(Self { days })
    }

    pub fn as_days(&self) -> i64 {
        self.days
    }

    /// Oldest `created_at` still inside the window, relative to `now`.
    ///
    /// Never earlier than `earliest_storable()`, so huge windows still bind
    /// as a valid `TIMESTAMPTZ`.
    pub fn cutoff(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let floor = earliest_storable();
        Duration::try_days(self.days)
            .and_then(|span| now.checked_sub_signed(span))
            .map_or(floor, |cutoff| cutoff.max(floor))
    }
}

/// 0001-01-01T00:00:00Z. Postgres timestamps stop at 4713 BC.
fn earliest_storable() -> DateTime<Utc> {
    NaiveDate::from_ymd_opt(1, 1, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map_or(DateTime::<Utc>::UNIX_EPOCH, |t| t.and_utc())
}

fn as_base64<T, S>(bytes: &T, serializer: S) -> Result<S::Ok, S::Error>
where
    T: AsRef<[u8]>,
    S: Serializer,
{
    serializer.serialize_str(&B64.encode(bytes.as_ref()))
}
