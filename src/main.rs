use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

extern crate pretty_env_logger;
#[macro_use] extern crate log;

use crate::config::{Settings, SHUTDOWN_GRACE};
use crate::core::{AlertService, Enricher, PassOrigin, SyncOrchestrator, SyncTrigger};
use crate::db::PgAlertRepository;
use crate::models::AppState;

mod api;
mod config;
mod core;
mod db;
mod models;
mod upstream;
#[cfg(test)]
mod testing;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    pretty_env_logger::init();

    let shutdown = CancellationToken::new();

    info!("🚀 Starting alert sync service.");

    let settings = Settings::load()
        .validate()
        .context("Error checking env variables.")?;

    let db_pool = db::init(settings.connect_options()?, &settings.migrations)
        .await
        .context("Error initializing database pool.")?;

    let repo = Arc::new(PgAlertRepository::new(db_pool.clone()));
    let source = Arc::new(upstream::init(&settings.upstream_url).context("Error building upstream client.")?);

    let enricher = match settings.seed()? {
        Some(seed) => Enricher::with_seed(seed),
        None => Enricher::random(),
    };
    info!("🎲 Enrichment seed: {}", enricher.seed());

    let orchestrator = Arc::new(SyncOrchestrator::new(source, repo.clone(), enricher));
    let trigger = Arc::new(SyncTrigger::new(
        orchestrator,
        shutdown.clone(),
        settings.sync_timeout,
        settings.sync_exclusive,
    ));

    trigger.trigger_now(PassOrigin::Startup);
    let ticker = core::spawn_periodic_sync(trigger.clone(), settings.sync_interval);

    let state = AppState {
        alerts: Arc::new(AlertService::new(repo)),
        sync: trigger,
    };

    let listener = TcpListener::bind(settings.bind_addr.as_str())
        .await
        .with_context(|| format!("Error binding {}", settings.bind_addr))?;
    info!("✅ Listening on {}", settings.bind_addr);

    let graceful = shutdown.clone().cancelled_owned();
    let mut server = tokio::spawn(async move {
        axum::serve(listener, api::router(state))
            .with_graceful_shutdown(graceful)
            .await
    });

    tokio::select! {
        _ = shutdown_signal() => info!("Shutdown signal received."),
        res = &mut server => match res {
            Ok(Ok(())) => warn!("HTTP server stopped on its own."),
            Ok(Err(e)) => error!("HTTP server failed: {}", e),
            Err(e) => error!("HTTP server task panicked: {}", e),
        },
    }

    info!("Graceful Shutdown...");
    shutdown.cancel();

    if !server.is_finished() && tokio::time::timeout(SHUTDOWN_GRACE, &mut server).await.is_err() {
        warn!("HTTP server did not drain within {:?}, aborting.", SHUTDOWN_GRACE);
        server.abort();
    }

    if tokio::time::timeout(SHUTDOWN_GRACE, ticker).await.is_err() {
        warn!("Scheduler did not stop within {:?}.", SHUTDOWN_GRACE);
    }

    db_pool.close().await;

    info!("Database connection closed.");
    Ok(())
}

/// Resolves on Ctrl+C, or SIGTERM from Docker/OS.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for ctrl+c: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
