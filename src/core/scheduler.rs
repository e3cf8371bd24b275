use log::{error, info, warn};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Duration, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use super::sync::{SyncError, SyncOrchestrator, SyncReport};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassOrigin {
    Startup,
    Scheduled,
    Manual,
}

impl fmt::Display for PassOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PassOrigin::Startup => "STARTUP",
            PassOrigin::Scheduled => "SCHEDULED",
            PassOrigin::Manual => "MANUAL",
        })
    }
}

/// Single-slot "pass in progress" flag. Contenders are turned away, not queued.
#[derive(Default)]
pub struct PassLock {
    busy: AtomicBool,
}

pub struct PassGuard<'a> {
    lock: &'a PassLock,
}

impl PassLock {
    pub fn try_acquire(&self) -> Option<PassGuard<'_>> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| PassGuard { lock: self })
    }
}

impl Drop for PassGuard<'_> {
    fn drop(&mut self) {
        self.lock.busy.store(false, Ordering::Release);
    }
}

/// Runs sync passes on behalf of the ticker, startup and `POST /sync`.
pub struct SyncTrigger {
    orchestrator: Arc<SyncOrchestrator>,
    shutdown: CancellationToken,
    pass_timeout: Duration,
    lock: Option<PassLock>,
}

impl SyncTrigger {
    pub fn new(
        orchestrator: Arc<SyncOrchestrator>,
        shutdown: CancellationToken,
        pass_timeout: Duration,
        exclusive: bool,
    ) -> Self {
        Self {
            orchestrator,
            shutdown,
            pass_timeout,
            lock: exclusive.then(PassLock::default),
        }
    }

    /// One pass under its own deadline, also cancelled by global shutdown.
    ///
    /// Returns `None` when the pass was dropped because another one holds
    /// the pass lock.
    pub async fn run_pass(&self, origin: PassOrigin) -> Option<Result<SyncReport, SyncError>> {
        let _slot = match &self.lock {
            Some(lock) => match lock.try_acquire() {
                Some(guard) => Some(guard),
                None => {
                    info!("[{}] Sync already in progress, dropping this pass", origin);
                    return None;
                }
            },
            None => None,
        };

        info!("[{}] Running sync...", origin);

        let pass = self.shutdown.child_token();
        spawn_deadline(pass.clone(), self.pass_timeout);
        let _deadline = pass.clone().drop_guard();

        let result = self.orchestrator.perform_sync(&pass).await;
        match &result {
            Ok(report) => info!("[{}] Sync completed successfully ({} new alerts)", origin, report.persisted),
            Err(e) => error!("[{}] Sync failed: {}", origin, e),
        }
        Some(result)
    }

    /// Fire-and-forget pass; the outcome only reaches the log.
    pub fn trigger_now(self: &Arc<Self>, origin: PassOrigin) -> JoinHandle<()> {
        let trigger = self.clone();
        tokio::spawn(async move {
            trigger.run_pass(origin).await;
        })
    }
}

/// Cancels `pass` once `after` elapses. Exits early when the pass ends first.
fn spawn_deadline(pass: CancellationToken, after: Duration) {
    tokio::spawn(async move {
        tokio::select! {
            _ = pass.cancelled() => {}
            _ = tokio::time::sleep(after) => {
                warn!("[SYNC] Pass exceeded {:?}, cancelling", after);
                pass.cancel();
            }
        }
    });
}

pub fn spawn_periodic_sync(trigger: Arc<SyncTrigger>, period: Duration) -> JoinHandle<()> {
    info!("[SCHEDULER] Starting periodic sync every {:?}", period);

    tokio::spawn(async move {
        start_periodic_sync(trigger, period).await;
    })
}

pub async fn start_periodic_sync(trigger: Arc<SyncTrigger>, period: Duration) {
    let mut interval = interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            biased;
            _ = trigger.shutdown.cancelled() => {
                info!("[SCHEDULER] Stopping periodic sync");
                break;
            }
            _ = interval.tick() => {
                trigger.run_pass(PassOrigin::Scheduled).await;
            }
        }
    }
}
