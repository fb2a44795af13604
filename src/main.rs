//! WAGER LEDGER: bet outcome ingestion service.
//!
//! Entry point. Loads configuration, initialises structured logging,
//! prepares the database, starts the reconciliation sweeper and serves
//! the HTTP API until Ctrl+C.

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{error, info, warn};

use wager_ledger::api::{self, routes::ApiState};
use wager_ledger::config;
use wager_ledger::engine::{IngestionService, Sweeper};
use wager_ledger::storage::{self, accounts};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (non-fatal if missing)
    let _ = dotenv::dotenv();

    let config_path = std::env::var("WAGER_CONFIG").unwrap_or_else(|_| "config.toml".into());
    let cfg = config::AppConfig::load(&config_path)?;

    init_logging();

    info!(
        config = %config_path,
        listen = %cfg.listen_addr(),
        identity = %cfg.account.identity,
        sweeper_enabled = cfg.sweeper.enabled,
        sweep_interval_secs = cfg.sweeper.interval_secs,
        "Wager ledger starting up"
    );

    // -- Database --------------------------------------------------------

    let pool = storage::connect(&cfg).await?;
    storage::bootstrap(&pool, &cfg).await?;

    {
        let mut conn = pool.acquire().await?;
        if let Some(account) = accounts::find_account(&mut conn, &cfg.account.identity).await? {
            info!(account_id = account.id, balance = account.balance, "Account loaded");
        }
    }

    // -- Reconciliation sweeper ------------------------------------------

    let sweeper_handle = if cfg.sweeper.enabled {
        let sweeper = Sweeper::new(pool.clone(), cfg.account.identity.as_str(), cfg.sweeper.batch_size);
        Some(tokio::spawn(sweeper.run(cfg.sweeper.interval())))
    } else {
        warn!("Sweeper disabled, ingestion is the only balance mutator");
        None
    };

    // -- HTTP API --------------------------------------------------------

    let state = Arc::new(ApiState {
        ingestion: IngestionService::new(pool.clone(), cfg.account.identity.as_str()),
    });
    let listener = tokio::net::TcpListener::bind(cfg.listen_addr())
        .await
        .with_context(|| format!("Failed to bind {}", cfg.listen_addr()))?;

    let served = api::serve(listener, state, shutdown_signal()).await;

    if let Some(handle) = sweeper_handle {
        handle.abort();
    }
    pool.close().await;

    match served {
        Ok(()) => {
            info!("Wager ledger shut down cleanly.");
            Ok(())
        }
        Err(e) => {
            error!(error = %e, "Server stopped with an error");
            Err(e)
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received.");
}

/// Initialise the `tracing` subscriber.
fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("wager_ledger=info,tower_http=info"));

    let json_logging = std::env::var("WAGER_LOG_JSON").is_ok();

    if json_logging {
        fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_thread_ids(true)
            .init();
    } else {
        fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .init();
    }
}
