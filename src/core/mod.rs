mod alerts;
pub(crate) mod enrichment;
pub(crate) mod scheduler;
pub(crate) mod sync;

pub use alerts::{AlertService, QueryError};
pub use enrichment::Enricher;
pub use scheduler::{spawn_periodic_sync, PassOrigin, SyncTrigger};
pub use sync::{SyncError, SyncOrchestrator, SyncReport};
