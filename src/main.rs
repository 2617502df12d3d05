use anyhow::Context;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use entry_ledger::api::{self, AppState};
use entry_ledger::config::AppConfig;
use entry_ledger::ledger::{Ledger, OpenOutcome};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "entry_ledger=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting entry ledger");

    let config = AppConfig::load().context("Failed to load configuration")?;
    info!("Configuration loaded: {:?}", config);

    let secret = config.ledger.secret_key()?;
    let ledger = if config.ledger.quarantine_corrupt {
        let (ledger, outcome) = Ledger::open_or_quarantine(&config.ledger.chain_path, secret)?;
        if let OpenOutcome::Quarantined { moved_to } = &outcome {
            warn!("Started a fresh chain; corrupt file kept at {:?}", moved_to);
        }
        ledger
    } else {
        Ledger::open(&config.ledger.chain_path, secret).with_context(|| {
            format!(
                "Failed to open chain file {:?}",
                config.ledger.chain_path
            )
        })?
    };

    if config.ledger.verify_on_startup {
        let report = ledger.verify().await;
        if report.is_valid() {
            info!("{}", report.summary());
        } else {
            error!("{}", report.summary());
        }
    }

    let app = api::router(AppState::new(Arc::new(ledger)));

    let addr = config.bind_address();
    info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}
