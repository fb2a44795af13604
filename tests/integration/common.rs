//! Shared fixtures for integration tests.

use sqlx::SqlitePool;
use std::path::PathBuf;
use std::time::Duration;

use wager_ledger::config::AppConfig;
use wager_ledger::storage::{self, accounts, bets};
use wager_ledger::types::BetSubmission;

pub const IDENTITY: &str = "betplacer@gmail.com";

/// A bootstrapped database file that is deleted on drop.
pub struct TestDb {
    pub pool: SqlitePool,
    path: PathBuf,
}

impl TestDb {
    pub async fn new() -> Self {
        let mut path = std::env::temp_dir();
        path.push(format!("wager_test_{}.db", uuid::Uuid::new_v4()));
        let url = format!("sqlite://{}", path.display());

        let pool = storage::open_pool(&url, 8, Duration::from_secs(30)).await.unwrap();
        storage::bootstrap(&pool, &AppConfig::default()).await.unwrap();
        Self { pool, path }
    }

    pub async fn balance(&self) -> i64 {
        let mut conn = self.pool.acquire().await.unwrap();
        accounts::find_account(&mut conn, IDENTITY).await.unwrap().unwrap().balance
    }

    pub async fn bet_count(&self) -> i64 {
        let mut conn = self.pool.acquire().await.unwrap();
        bets::count_bets(&mut conn).await.unwrap()
    }

    pub async fn unprocessed_count(&self) -> usize {
        let mut conn = self.pool.acquire().await.unwrap();
        let account = accounts::find_account(&mut conn, IDENTITY).await.unwrap().unwrap();
        bets::fetch_unprocessed(&mut conn, account.id, u32::MAX).await.unwrap().len()
    }
}

impl Drop for TestDb {
    fn drop(&mut self) {
        for suffix in ["", "-wal", "-shm"] {
            let mut file = self.path.clone().into_os_string();
            file.push(suffix);
            let _ = std::fs::remove_file(file);
        }
    }
}

pub fn submission(id: &str, outcome: &str, amount: &str) -> BetSubmission {
    BetSubmission {
        external_id: id.into(),
        outcome: outcome.into(),
        amount: amount.into(),
        source: "game".into(),
    }
}
