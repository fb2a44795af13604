//! Ingestion: records one bet outcome and settles it against the account.
//!
//! Everything happens in a single transaction that opens by locking the
//! account row: resolve the source, parse the amount and outcome, insert
//! the bet, apply the outcome to the balance, commit. Any failure drops the
//! transaction, which rolls it back.

use chrono::Utc;
use sqlx::{Sqlite, SqlitePool, Transaction};
use std::sync::Arc;
use tracing::{debug, info};

use crate::storage::bets::{self, Insertion, NewBet};
use crate::storage::{accounts, sources};
use crate::types::{parse_amount, BetSubmission, IngestOutcome, LedgerError, Outcome, Result};

#[derive(Debug, Clone)]
pub struct IngestionService {
    pool: SqlitePool,
    identity: Arc<str>,
}

impl IngestionService {
    pub fn new(pool: SqlitePool, identity: impl Into<Arc<str>>) -> Self {
        Self {
            pool,
            identity: identity.into(),
        }
    }

    /// Record a submission exactly once.
    ///
    /// A submission whose external id is already in the ledger returns
    /// [`IngestOutcome::Replayed`] and changes nothing.
    pub async fn ingest(&self, submission: &BetSubmission) -> Result<IngestOutcome> {
        let mut tx = self.pool.begin().await?;

        // The lock has to be the first statement of the transaction.
        let account = accounts::lock_account(&mut tx, &self.identity).await?;

        let source_id = sources::resolve_source(&mut tx, &submission.source)
            .await?
            .ok_or_else(|| LedgerError::UnknownSource(submission.source.clone()))?;

        let amount = parse_amount(&submission.amount)?;

        // A known external id is a replay even when the outcome is invalid.
        let outcome = match submission.outcome.parse::<Outcome>() {
            Ok(outcome) => outcome,
            Err(e) => {
                if bets::find_bet(&mut tx, &submission.external_id).await?.is_some() {
                    return replayed(tx, &submission.external_id).await;
                }
                return Err(e);
            }
        };

        let bet = NewBet {
            external_id: &submission.external_id,
            account_id: account.id,
            outcome,
            amount,
            source_id,
            created_at: Utc::now(),
        };
        if bets::insert_bet(&mut tx, &bet).await? == Insertion::Duplicate {
            return replayed(tx, &submission.external_id).await;
        }

        let balance = account.apply_delta(outcome.settlement_delta(amount))?;

        accounts::set_balance(&mut tx, account.id, balance).await?;
        tx.commit().await?;

        info!(
            external_id = %submission.external_id,
            outcome = %outcome,
            amount,
            source = %submission.source,
            balance,
            "Bet recorded"
        );
        Ok(IngestOutcome::Recorded { balance })
    }
}

async fn replayed(tx: Transaction<'_, Sqlite>, external_id: &str) -> Result<IngestOutcome> {
    tx.rollback().await?;
    debug!(external_id, "Bet already recorded, replay ignored");
    Ok(IngestOutcome::Replayed)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
