use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use leadvault_core::LeadStore;
use leadvault_relay::WebhookRelay;
use leadvault_service::config::Args;
use leadvault_service::dispatch::spawn_dispatcher;
use leadvault_service::telemetry::ServiceTelemetry;
use leadvault_service::{app, ServiceState};
use leadvault_store_json::JsonFileLeadStore;

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    setup_tracing();
    let args = Args::parse();

    let store = Arc::new(JsonFileLeadStore::new(&args.data_file));
    store
        .ensure_initialized()
        .with_context(|| format!("failed to initialize lead store at {}", args.data_file.display()))?;

    let telemetry = Arc::new(ServiceTelemetry::default());
    let (relay, relay_worker) = match args.relay_config()? {
        Some(config) => {
            tracing::info!(timeout_ms = config.timeout_ms, "webhook relay enabled");
            let (handle, worker) = spawn_dispatcher(
                Arc::new(WebhookRelay::new(config)),
                args.relay_queue_capacity,
                Arc::clone(&telemetry),
            );
            (Some(handle), Some(worker))
        }
        None => {
            tracing::info!("webhook relay not configured; leads are stored locally only");
            (None, None)
        }
    };

    let state = ServiceState::new(store, relay, telemetry);
    let bind = args.bind_addr();
    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .with_context(|| format!("failed to bind {bind}"))?;
    tracing::info!(
        addr = %listener.local_addr()?,
        data_file = %args.data_file.display(),
        "leadvault service listening"
    );

    axum::serve(listener, app(state)).with_graceful_shutdown(shutdown_signal()).await?;

    if let Some(worker) = relay_worker {
        let grace = Duration::from_millis(args.relay_timeout_ms.saturating_mul(2));
        if tokio::time::timeout(grace, worker).await.is_err() {
            tracing::warn!("relay queue not drained before shutdown");
        }
    }
    Ok(())
}

fn setup_tracing() {
    if tracing::dispatcher::has_been_set() {
        return;
    }
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}
