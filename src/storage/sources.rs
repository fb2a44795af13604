//! Source registry: opaque source labels to internal identifiers.

use sqlx::SqliteConnection;

use crate::types::{Result, SourceId};

/// Look up a source label. `None` means the label is not registered.
pub async fn resolve_source(conn: &mut SqliteConnection, label: &str) -> Result<Option<SourceId>> {
    let id = sqlx::query_scalar::<_, SourceId>("SELECT id FROM sources WHERE value = ?1")
        .bind(label)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(id)
}

/// Register a label if it is not present yet.
pub async fn register_source(conn: &mut SqliteConnection, label: &str) -> Result<()> {
    sqlx::query("INSERT INTO sources (value) VALUES (?1) ON CONFLICT (value) DO NOTHING")
        .bind(label)
        .execute(&mut *conn)
        .await?;
    Ok(())
}
