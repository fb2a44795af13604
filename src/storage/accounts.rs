//! Account store: the single balance row.

use sqlx::SqliteConnection;

use crate::types::{Account, LedgerError, Result};

/// Lock the account row for the rest of the enclosing transaction and
/// return its current state.
///
/// SQLite has no `SELECT ... FOR UPDATE`; a no-op write to the row takes
/// the database write lock instead, and holds it until commit or rollback.
/// Must be the first statement of the transaction, otherwise a concurrent
/// writer can invalidate the read snapshot before the lock is taken.
pub async fn lock_account(conn: &mut SqliteConnection, identity: &str) -> Result<Account> {
    sqlx::query_as::<_, Account>(
        "UPDATE accounts SET balance = balance WHERE identity = ?1 \
         RETURNING id, balance, identity",
    )
    .bind(identity)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| LedgerError::AccountNotFound(identity.to_string()))
}

/// Plain read of the account, without locking.
pub async fn find_account(conn: &mut SqliteConnection, identity: &str) -> Result<Option<Account>> {
    let account = sqlx::query_as::<_, Account>(
        "SELECT id, balance, identity FROM accounts WHERE identity = ?1",
    )
    .bind(identity)
    .fetch_optional(&mut *conn)
    .await?;
    Ok(account)
}

pub async fn set_balance(conn: &mut SqliteConnection, account_id: i64, balance: i64) -> Result<()> {
    let result = sqlx::query("UPDATE accounts SET balance = ?1 WHERE id = ?2")
        .bind(balance)
        .bind(account_id)
        .execute(&mut *conn)
        .await?;

    if result.rows_affected() == 0 {
        return Err(LedgerError::AccountNotFound(account_id.to_string()));
    }
    Ok(())
}

/// Create the account if it does not exist yet. Returns whether it was created.
pub async fn ensure_account(
    conn: &mut SqliteConnection,
    identity: &str,
    initial_balance: i64,
) -> Result<bool> {
    let result = sqlx::query(
        "INSERT INTO accounts (balance, identity) VALUES (?1, ?2) \
         ON CONFLICT (identity) DO NOTHING",
    )
    .bind(initial_balance)
    .bind(identity)
    .execute(&mut *conn)
    .await?;
    Ok(result.rows_affected() > 0)
}
