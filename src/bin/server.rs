//! HTTP server binary.
//!
//! Builds the component graph (store, notifier, scheduler, optional
//! watsonx client), performs the cold-start rebuild, starts the periodic
//! resync loop, and serves the API until ctrl-c.

use ingatin::config::AppConfig;
use ingatin::notify::{Notifier, WhatsAppNotifier};
use ingatin::reminder::{ReminderScheduler, spawn_resync};
use ingatin::server::{AppState, router};
use ingatin::store::TaskStore;
use ingatin::watsonx::WatsonxClient;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = Arc::new(AppConfig::load(None)?);

    let store = Arc::new(TaskStore::new(config.storage.data_file.clone()));
    store.ensure_exists().await?;

    let notifier: Arc<dyn Notifier> = Arc::new(WhatsAppNotifier::new(&config.whatsapp));
    if !config.whatsapp.is_configured() {
        warn!("whatsapp credentials missing; reminders will be logged but not delivered");
    }

    let scheduler = ReminderScheduler::new(notifier);

    // Cold start: derive the schedule from the persisted snapshot.
    match store.read_all().await {
        Ok(tasks) => scheduler.rebuild(&tasks).await,
        Err(e) => warn!("initial schedule rebuild skipped: {e}"),
    }

    let resync = spawn_resync(
        Arc::clone(&scheduler),
        Arc::clone(&store),
        Duration::from_secs(config.scheduler.resync_interval_secs),
    );

    let watsonx = config
        .watsonx
        .is_configured()
        .then(|| Arc::new(WatsonxClient::new(config.watsonx.clone())));
    if watsonx.is_none() {
        info!("watsonx not configured; the parse endpoint uses the heuristic fallback");
    }

    let state = AppState {
        store,
        scheduler: Arc::clone(&scheduler),
        watsonx,
        config: Arc::clone(&config),
    };

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("API ready on http://{}", listener.local_addr()?);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    resync.abort();
    scheduler.shutdown().await;
    info!("server shut down cleanly");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("cannot listen for ctrl-c: {e}");
    }
}
