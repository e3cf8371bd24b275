use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An alert as served by the upstream source. It has no identity of its own.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct ExternalAlert {
    pub source: String,
    pub severity: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

/// `GET /alerts` body. The upstream sends `null` instead of `[]` when empty.
#[derive(Deserialize, Serialize, Debug, Default)]
pub struct AlertsEnvelope {
    #[serde(default)]
    pub alerts: Option<Vec<ExternalAlert>>,
}

impl AlertsEnvelope {
    pub fn into_alerts(self) -> Vec<ExternalAlert> {
        self.alerts.unwrap_or_default()
    }
}
