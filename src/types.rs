//! Shared types for the wager ledger.
//!
//! The data model (accounts, bet events, outcomes) and the error taxonomy
//! used by the storage, engine, and API layers.

use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use std::fmt;
use std::str::FromStr;

/// Minor currency units per whole unit of a submitted decimal amount.
pub const MINOR_UNITS_PER_UNIT: i64 = 1000;

/// Internal identifier of a Source Registry entry.
pub type SourceId = i64;

pub type Result<T> = std::result::Result<T, LedgerError>;

// ---------------------------------------------------------------------------
// Outcome
// ---------------------------------------------------------------------------

/// Reported result of a bet. Wire and storage form is lowercase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Outcome {
    Win,
    Lost,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Win => "win",
            Outcome::Lost => "lost",
        }
    }

    /// Balance effect applied when an event is ingested.
    pub fn settlement_delta(&self, amount: i64) -> i64 {
        match self {
            Outcome::Win => amount,
            Outcome::Lost => -amount,
        }
    }

    /// Balance effect applied when the sweeper processes an event.
    /// Opposite sign to [`Outcome::settlement_delta`].
    pub fn reconciliation_delta(&self, amount: i64) -> i64 {
        match self {
            Outcome::Win => -amount,
            Outcome::Lost => amount,
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Outcome {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "win" => Ok(Outcome::Win),
            "lost" => Ok(Outcome::Lost),
            other => Err(LedgerError::InvalidOutcome(other.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// Amounts
// ---------------------------------------------------------------------------

/// Convert a decimal amount string into minor units, truncating toward zero.
///
/// Accepts plain (`"15.5"`) and scientific (`"1.55e1"`) notation.
pub fn parse_amount(raw: &str) -> Result<i64> {
    let value = Decimal::from_str(raw)
        .or_else(|_| Decimal::from_scientific(raw))
        .map_err(|_| LedgerError::InvalidAmount(raw.to_string()))?;

    value
        .checked_mul(Decimal::from(MINOR_UNITS_PER_UNIT))
        .and_then(|scaled| scaled.trunc().to_i64())
        .ok_or_else(|| LedgerError::InvalidAmount(raw.to_string()))
}

// ---------------------------------------------------------------------------
// Account
// ---------------------------------------------------------------------------

/// The balance-bearing account row.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct Account {
    pub id: i64,
    /// Minor currency units, never negative at a transaction boundary.
    pub balance: i64,
    pub identity: String,
}

impl Account {
    /// Balance after applying `delta`, or an error if it would go negative.
    pub fn apply_delta(&self, delta: i64) -> Result<i64> {
        let next = self
            .balance
            .checked_add(delta)
            .ok_or(LedgerError::BalanceOverflow {
                balance: self.balance,
                delta,
            })?;

        if next < 0 {
            return Err(LedgerError::InsufficientBalance {
                balance: self.balance,
                delta,
            });
        }
        Ok(next)
    }
}

// ---------------------------------------------------------------------------
// Bet events
// ---------------------------------------------------------------------------

/// A recorded bet outcome.
///
/// `outcome` is the stored label as-is. Rows written by other tools may
/// carry labels the ledger does not know.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct BetEvent {
    pub external_id: String,
    pub account_id: i64,
    pub outcome: String,
    pub amount: i64,
    pub source_id: SourceId,
    pub processed: bool,
    pub created_at: DateTime<Utc>,
}

impl BetEvent {
    /// The parsed outcome, or `None` for an unknown label.
    pub fn outcome(&self) -> Option<Outcome> {
        self.outcome.parse().ok()
    }

    /// Sweeper balance effect of this row. Unknown labels contribute zero.
    pub fn reconciliation_delta(&self) -> i64 {
        self.outcome()
            .map_or(0, |outcome| outcome.reconciliation_delta(self.amount))
    }
}

/// An inbound event as handed over by the transport layer.
///
/// Outcome and amount stay raw here; the ingestion service validates them
/// inside its transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BetSubmission {
    pub external_id: String,
    pub outcome: String,
    pub amount: String,
    pub source: String,
}

/// What ingestion did with a submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestOutcome {
    /// New event stored and its effect applied.
    Recorded { balance: i64 },
    /// The external id was already known; nothing changed.
    Replayed,
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("Unknown source type: {0:?}")]
    UnknownSource(String),

    #[error("Invalid bet outcome: {0:?}")]
    InvalidOutcome(String),

    #[error("Insufficient balance: balance {balance}, delta {delta}")]
    InsufficientBalance { balance: i64, delta: i64 },

    #[error("Invalid amount: {0:?}")]
    InvalidAmount(String),

    #[error("Account not found: {0}")]
    AccountNotFound(String),

    #[error("Balance overflow: balance {balance}, delta {delta}")]
    BalanceOverflow { balance: i64, delta: i64 },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl LedgerError {
    /// Whether the caller sent something the ledger refuses, as opposed to
    /// the ledger failing internally. Malformed amounts count as internal.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            LedgerError::UnknownSource(_)
                | LedgerError::InvalidOutcome(_)
                | LedgerError::InsufficientBalance { .. }
        )
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
