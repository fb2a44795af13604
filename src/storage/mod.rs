//! Persistence layer.
//!
//! SQLite via `sqlx`. Three tables: `accounts` (the balance row),
//! `sources` (the source registry) and `bets` (the bet ledger).
//! Every mutating transaction starts by locking the account row, see
//! [`accounts::lock_account`].

pub mod accounts;
pub mod bets;
pub mod sources;

use anyhow::{Context, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info};

use crate::config::AppConfig;

const CREATE_ACCOUNTS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS accounts (
    id       INTEGER PRIMARY KEY AUTOINCREMENT,
    balance  INTEGER NOT NULL CHECK (balance >= 0),
    identity TEXT    NOT NULL UNIQUE
)"#;

const CREATE_SOURCES_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS sources (
    id    INTEGER PRIMARY KEY AUTOINCREMENT,
    value TEXT    NOT NULL UNIQUE
)"#;

const CREATE_BETS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS bets (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    external_id TEXT    NOT NULL UNIQUE,
    account_id  INTEGER NOT NULL REFERENCES accounts (id),
    outcome     TEXT    NOT NULL,
    amount      INTEGER NOT NULL,
    source_id   INTEGER NOT NULL REFERENCES sources (id),
    processed   INTEGER NOT NULL DEFAULT 0,
    created_at  TEXT    NOT NULL
)"#;

const CREATE_BETS_UNPROCESSED_INDEX: &str = r#"
CREATE INDEX IF NOT EXISTS bets_unprocessed_idx
    ON bets (account_id, processed, created_at)"#;

/// Open a connection pool.
///
/// WAL mode lets readers proceed while a transaction holds the write lock;
/// `busy_timeout` bounds how long a writer queues behind the lock holder.
pub async fn open_pool(url: &str, max_connections: u32, busy_timeout: Duration) -> Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str(url)
        .with_context(|| format!("Invalid database URL: {url}"))?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .foreign_keys(true)
        .busy_timeout(busy_timeout);

    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections)
        .connect_with(options)
        .await
        .with_context(|| format!("Failed to connect to database: {url}"))?;

    debug!(url, max_connections, "Database pool opened");
    Ok(pool)
}

/// Open the pool described by the application config.
pub async fn connect(cfg: &AppConfig) -> Result<SqlitePool> {
    open_pool(
        &cfg.database_url(),
        cfg.database.max_connections,
        Duration::from_secs(cfg.database.busy_timeout_secs),
    )
    .await
}

/// Create tables if missing and seed the configured account and sources.
/// Safe to run on every startup.
pub async fn bootstrap(pool: &SqlitePool, cfg: &AppConfig) -> Result<()> {
    for ddl in [
        CREATE_ACCOUNTS_TABLE,
        CREATE_SOURCES_TABLE,
        CREATE_BETS_TABLE,
        CREATE_BETS_UNPROCESSED_INDEX,
    ] {
        sqlx::query(ddl)
            .execute(pool)
            .await
            .context("Failed to create schema")?;
    }

    let mut tx = pool.begin().await?;
    for label in &cfg.sources.labels {
        sources::register_source(&mut tx, label)
            .await
            .with_context(|| format!("Failed to seed source {label:?}"))?;
    }
    let created = accounts::ensure_account(&mut tx, &cfg.account.identity, cfg.account.initial_balance)
        .await
        .context("Failed to seed account")?;
    tx.commit().await?;

    info!(
        identity = %cfg.account.identity,
        sources = cfg.sources.labels.len(),
        account_created = created,
        "Schema ready"
    );
    Ok(())
}

/// Single-connection in-memory database with the default config applied.
#[cfg(test)]
pub(crate) async fn test_pool() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    bootstrap(&pool, &AppConfig::default()).await.unwrap();
    pool
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
