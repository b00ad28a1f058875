//! Schema migrations, tracked in a `_migrations` table.

use super::Error;
use tokio_rusqlite::rusqlite::Transaction;
use tokio_rusqlite::{Connection, params};

/// Schema versions in apply order.
const MIGRATIONS: &[(i64, &str)] = &[
    (1, include_str!("../../migrations/001_cache_generations.sql")),
    (2, include_str!("../../migrations/002_registrations.sql")),
];

/// Bring the schema up to the latest version. Each pending version is
/// applied together with its bookkeeping row in one transaction.
pub async fn run(conn: &Connection) -> Result<(), Error> {
    conn.call(|conn| -> Result<(), Error> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS _migrations (
                version INTEGER PRIMARY KEY,
                applied_at TEXT NOT NULL
            )",
        )?;

        let current: i64 = conn.query_row("SELECT COALESCE(MAX(version), 0) FROM _migrations", [], |row| row.get(0))?;

        for &(version, sql) in MIGRATIONS.iter().filter(|(version, _)| *version > current) {
            let tx = conn.transaction()?;
            apply(&tx, version, sql)?;
            tx.commit()?;
            tracing::debug!(version, "applied cache migration");
        }

        Ok(())
    })
    .await
    .map_err(Error::from)
}

fn apply(tx: &Transaction<'_>, version: i64, sql: &str) -> Result<(), Error> {
    tx.execute_batch(sql)
        .map_err(|e| Error::MigrationFailed(format!("version {version}: {e}")))?;
    tx.execute(
        "INSERT INTO _migrations (version, applied_at) VALUES (?1, ?2)",
        params![version, chrono::Utc::now().to_rfc3339()],
    )?;
    Ok(())
}
