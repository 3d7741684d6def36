//! Schema for the generation store.
//!
//! `generations` holds one row per named bucket; `entries` holds the stored
//! responses and cascades on generation delete, so dropping a stale version
//! is a single `DELETE`. Applied versions are recorded in `_migrations`.

use tokio_rusqlite::{Connection, params, rusqlite};

use super::Error;

/// A numbered schema step.
struct Migration {
    version: i64,
    sql: &'static str,
}

/// Applied in ascending `version` order, each inside its own transaction.
const MIGRATIONS: &[Migration] = &[Migration { version: 1, sql: include_str!("../../migrations/001_generations.sql") }];

fn applied_version(conn: &rusqlite::Connection) -> Result<i64, Error> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS _migrations (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL
        )",
        [],
    )?;
    let version = conn.query_row("SELECT COALESCE(MAX(version), 0) FROM _migrations", [], |row| row.get(0))?;
    Ok(version)
}

/// Bring the generation schema up to date.
///
/// # Errors
///
/// Returns `Error::MigrationFailed` naming the step whose SQL was rejected.
/// A failed step leaves no partial tables behind.
pub async fn run(conn: &Connection) -> Result<(), Error> {
    conn.call(|conn| -> Result<(), Error> {
        let current = applied_version(conn)?;

        for step in MIGRATIONS.iter().filter(|m| m.version > current) {
            let tx = conn.transaction()?;
            tx.execute_batch(step.sql)
                .map_err(|e| Error::MigrationFailed(format!("v{}: {e}", step.version)))?;
            tx.execute(
                "INSERT INTO _migrations (version, applied_at) VALUES (?1, ?2)",
                params![step.version, chrono::Utc::now().to_rfc3339()],
            )?;
            tx.commit()?;
            tracing::debug!(version = step.version, "applied generation schema step");
        }

        Ok(())
    })
    .await
    .map_err(Error::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn table_exists(conn: &Connection, name: &'static str) -> bool {
        conn.call(move |conn| {
            conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type='table' AND name=?1)",
                [name],
                |row| row.get(0),
            )
        })
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn test_creates_generation_tables() {
        let conn = Connection::open_in_memory().await.unwrap();
        run(&conn).await.unwrap();

        assert!(table_exists(&conn, "generations").await);
        assert!(table_exists(&conn, "entries").await);
    }

    #[tokio::test]
    async fn test_rerun_applies_nothing_new() {
        let conn = Connection::open_in_memory().await.unwrap();
        run(&conn).await.unwrap();
        run(&conn).await.unwrap();

        let rows: i64 = conn
            .call(|conn| conn.query_row("SELECT COUNT(*) FROM _migrations", [], |row| row.get(0)))
            .await
            .unwrap();
        assert_eq!(rows, MIGRATIONS.len() as i64);
    }

    #[tokio::test]
    async fn test_entries_reference_generations() {
        let conn = Connection::open_in_memory().await.unwrap();
        run(&conn).await.unwrap();

        let parent: String = conn
            .call(|conn| conn.query_row("SELECT \"table\" FROM pragma_foreign_key_list('entries')", [], |row| row.get(0)))
            .await
            .unwrap();
        assert_eq!(parent, "generations");
    }
}
