//! Bet ledger: recorded bet events keyed by external id.

use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;

use crate::types::{BetEvent, Outcome, Result, SourceId};

/// A row about to be written to the ledger.
#[derive(Debug, Clone)]
pub struct NewBet<'a> {
    pub external_id: &'a str,
    pub account_id: i64,
    pub outcome: Outcome,
    pub amount: i64,
    pub source_id: SourceId,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Insertion {
    Inserted,
    /// The external id is already in the ledger.
    Duplicate,
}

/// Insert a bet, reporting a unique-key clash on `external_id` as
/// [`Insertion::Duplicate`] instead of an error.
pub async fn insert_bet(conn: &mut SqliteConnection, bet: &NewBet<'_>) -> Result<Insertion> {
    let result = sqlx::query(
        "INSERT INTO bets (external_id, account_id, outcome, amount, source_id, processed, created_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, 0, ?6)",
    )
    .bind(bet.external_id)
    .bind(bet.account_id)
    .bind(bet.outcome.as_str())
    .bind(bet.amount)
    .bind(bet.source_id)
    .bind(bet.created_at)
    .execute(&mut *conn)
    .await;

    match result {
        Ok(_) => Ok(Insertion::Inserted),
        Err(sqlx::Error::Database(db)) if db.is_unique_violation() => Ok(Insertion::Duplicate),
        Err(e) => Err(e.into()),
    }
}

/// Up to `limit` unprocessed bets of an account, newest first.
pub async fn fetch_unprocessed(
    conn: &mut SqliteConnection,
    account_id: i64,
    limit: u32,
) -> Result<Vec<BetEvent>> {
    let bets = sqlx::query_as::<_, BetEvent>(
        "SELECT external_id, account_id, outcome, amount, source_id, processed, created_at \
         FROM bets \
         WHERE account_id = ?1 AND processed = 0 \
         ORDER BY created_at DESC, id DESC \
         LIMIT ?2",
    )
    .bind(account_id)
    .bind(i64::from(limit))
    .fetch_all(&mut *conn)
    .await?;
    Ok(bets)
}

pub async fn mark_processed(conn: &mut SqliteConnection, external_id: &str) -> Result<()> {
    sqlx::query("UPDATE bets SET processed = 1 WHERE external_id = ?1")
        .bind(external_id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

pub async fn find_bet(conn: &mut SqliteConnection, external_id: &str) -> Result<Option<BetEvent>> {
    let bet = sqlx::query_as::<_, BetEvent>(
        "SELECT external_id, account_id, outcome, amount, source_id, processed, created_at \
         FROM bets WHERE external_id = ?1",
    )
    .bind(external_id)
    .fetch_optional(&mut *conn)
    .await?;
    Ok(bet)
}

pub async fn count_bets(conn: &mut SqliteConnection) -> Result<i64> {
    let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM bets")
        .fetch_one(&mut *conn)
        .await?;
    Ok(count)
}
