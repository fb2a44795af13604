//! Reconciliation sweeper: periodic pass over unprocessed bets.
//!
//! Each sweep locks the account, takes the newest unprocessed bets (up to
//! the batch size), nets their reconciliation deltas, flags them processed
//! and writes the new balance, all in one transaction. Rows with an
//! unknown outcome count for nothing but are still flagged. A failed sweep
//! leaves everything as it was, so the next tick retries the same bets.

use sqlx::SqlitePool;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use crate::storage::{accounts, bets};
use crate::types::{LedgerError, Result};

/// What a single sweep did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SweepReport {
    pub processed: usize,
    pub delta: i64,
    pub balance_before: i64,
    pub balance_after: i64,
}

#[derive(Debug, Clone)]
pub struct Sweeper {
    pool: SqlitePool,
    identity: Arc<str>,
    batch_size: u32,
}

impl Sweeper {
    pub fn new(pool: SqlitePool, identity: impl Into<Arc<str>>, batch_size: u32) -> Self {
        Self {
            pool,
            identity: identity.into(),
            batch_size,
        }
    }

    /// Run one sweep.
    pub async fn sweep(&self) -> Result<SweepReport> {
        let mut tx = self.pool.begin().await?;
        let account = accounts::lock_account(&mut tx, &self.identity).await?;

        let batch = bets::fetch_unprocessed(&mut tx, account.id, self.batch_size).await?;
        if batch.is_empty() {
            tx.rollback().await?;
            return Ok(SweepReport {
                processed: 0,
                delta: 0,
                balance_before: account.balance,
                balance_after: account.balance,
            });
        }

        let mut delta: i64 = 0;
        for bet in &batch {
            if bet.outcome().is_none() {
                warn!(
                    external_id = %bet.external_id,
                    outcome = %bet.outcome,
                    "Unknown outcome, settling with no balance effect"
                );
            }
            delta = delta
                .checked_add(bet.reconciliation_delta())
                .ok_or(LedgerError::BalanceOverflow {
                    balance: account.balance,
                    delta,
                })?;
        }

        for bet in &batch {
            bets::mark_processed(&mut tx, &bet.external_id).await?;
        }

        let balance = account.apply_delta(delta)?;
        accounts::set_balance(&mut tx, account.id, balance).await?;
        tx.commit().await?;

        Ok(SweepReport {
            processed: batch.len(),
            delta,
            balance_before: account.balance,
            balance_after: balance,
        })
    }

    /// Sweep every `interval` until the task is dropped or aborted.
    ///
    /// The first sweep happens one full interval after start. Errors are
    /// logged and never stop the loop.
    pub async fn run(self, interval: Duration) {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker.tick().await;

        info!(
            interval_ms = interval.as_millis() as u64,
            batch_size = self.batch_size,
            "Sweeper started"
        );

        loop {
            ticker.tick().await;
            match self.sweep().await {
                Ok(report) if report.processed > 0 => log_sweep_report(&report),
                Ok(_) => debug!("Sweep found nothing to process"),
                Err(e) => error!(error = %e, "Sweep failed, retrying next tick"),
            }
        }
    }
}

fn log_sweep_report(report: &SweepReport) {
    info!(
        processed = report.processed,
        delta = report.delta,
        balance_before = report.balance_before,
        balance_after = report.balance_after,
        "Sweep complete"
    );
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
