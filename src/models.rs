use std::sync::Arc;
use crate::core::{AlertService, SyncTrigger};

/// Shared state behind every HTTP handler.
#[derive(Clone)]
pub struct AppState {
    pub alerts: Arc<AlertService>,
    pub sync: Arc<SyncTrigger>,
}
