//! Key-addressed storage substrate.
//!
//! [`Storage`] is the narrow capability the worker needs from persistent
//! storage: named buckets (generations) of key → snapshot. A miss is
//! `Ok(None)`, never an error. `CacheDb` is the SQLite implementation.

use async_trait::async_trait;
use chrono::Utc;
use tokio_rusqlite::{params, rusqlite};

use super::connection::CacheDb;
use super::snapshots::Snapshot;
use crate::Error;

/// Named-generation storage.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Create the generation if it does not exist. Idempotent.
    async fn open_generation(&self, name: &str) -> Result<(), Error>;

    async fn get(&self, name: &str, key: &str) -> Result<Option<Snapshot>, Error>;

    /// Store `snapshot` under `key`, replacing any previous entry.
    async fn put(&self, name: &str, key: &str, snapshot: &Snapshot) -> Result<(), Error>;

    /// Store every entry or none of them.
    ///
    /// The default implementation is not atomic; backends that can offer a
    /// transaction should override it.
    async fn put_all(&self, name: &str, entries: &[(String, Snapshot)]) -> Result<(), Error> {
        for (key, snapshot) in entries {
            self.put(name, key, snapshot).await?;
        }
        Ok(())
    }

    async fn list_names(&self) -> Result<Vec<String>, Error>;

    /// Drop a generation and everything in it. Returns whether it existed.
    async fn delete(&self, name: &str) -> Result<bool, Error>;

    /// URLs stored in a generation, sorted.
    async fn urls(&self, name: &str) -> Result<Vec<String>, Error>;
}

fn insert_entry(conn: &rusqlite::Connection, name: &str, key: &str, snapshot: &Snapshot) -> Result<(), Error> {
    let headers_json =
        serde_json::to_string(&snapshot.headers).map_err(|e| Error::CorruptEntry(format!("headers: {e}")))?;
    let now = Utc::now().to_rfc3339();

    conn.execute(
        "INSERT OR IGNORE INTO generations (name, created_at) VALUES (?1, ?2)",
        params![name, &now],
    )?;
    conn.execute(
        "INSERT INTO entries (
            generation, key, url, status, content_type, headers_json, body, fetched_at, stored_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
        ON CONFLICT(generation, key) DO UPDATE SET
            url = excluded.url,
            status = excluded.status,
            content_type = excluded.content_type,
            headers_json = excluded.headers_json,
            body = excluded.body,
            fetched_at = excluded.fetched_at,
            stored_at = excluded.stored_at",
        params![
            name,
            key,
            &snapshot.url,
            snapshot.status,
            &snapshot.content_type,
            headers_json,
            &snapshot.body,
            &snapshot.fetched_at,
            now,
        ],
    )?;
    Ok(())
}

#[async_trait]
impl Storage for CacheDb {
    async fn open_generation(&self, name: &str) -> Result<(), Error> {
        let name = name.to_string();
        let now = Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT OR IGNORE INTO generations (name, created_at) VALUES (?1, ?2)",
                    params![name, now],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    async fn get(&self, name: &str, key: &str) -> Result<Option<Snapshot>, Error> {
        let name = name.to_string();
        let key = key.to_string();
        self.conn
            .call(move |conn| -> Result<Option<Snapshot>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT url, status, content_type, headers_json, body, fetched_at
                    FROM entries WHERE generation = ?1 AND key = ?2",
                )?;

                let result = stmt.query_row(params![name, key], |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, u16>(1)?,
                        row.get::<_, Option<String>>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, Vec<u8>>(4)?,
                        row.get::<_, String>(5)?,
                    ))
                });

                match result {
                    Ok((url, status, content_type, headers_json, body, fetched_at)) => {
                        let headers = serde_json::from_str(&headers_json)
                            .map_err(|e| Error::CorruptEntry(format!("{url}: {e}")))?;
                        Ok(Some(Snapshot { url, status, content_type, headers, body, fetched_at }))
                    }
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }

    async fn put(&self, name: &str, key: &str, snapshot: &Snapshot) -> Result<(), Error> {
        let name = name.to_string();
        let key = key.to_string();
        let snapshot = snapshot.clone();
        self.conn
            .call(move |conn| -> Result<(), Error> { insert_entry(conn, &name, &key, &snapshot) })
            .await
            .map_err(Error::from)
    }

    async fn put_all(&self, name: &str, entries: &[(String, Snapshot)]) -> Result<(), Error> {
        let name = name.to_string();
        let entries = entries.to_vec();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                let tx = conn.transaction()?;
                for (key, snapshot) in &entries {
                    insert_entry(&tx, &name, key, snapshot)?;
                }
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    async fn list_names(&self) -> Result<Vec<String>, Error> {
        self.conn
            .call(|conn| -> Result<Vec<String>, Error> {
                let mut stmt = conn.prepare("SELECT name FROM generations ORDER BY name")?;
                let names = stmt
                    .query_map([], |row| row.get::<_, String>(0))?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(names)
            })
            .await
            .map_err(Error::from)
    }

    async fn delete(&self, name: &str) -> Result<bool, Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let count = conn.execute("DELETE FROM generations WHERE name = ?1", params![name])?;
                Ok(count > 0)
            })
            .await
            .map_err(Error::from)
    }

    async fn urls(&self, name: &str) -> Result<Vec<String>, Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<Vec<String>, Error> {
                let mut stmt = conn.prepare("SELECT url FROM entries WHERE generation = ?1 ORDER BY url")?;
                let urls = stmt
                    .query_map(params![name], |row| row.get::<_, String>(0))?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(urls)
            })
            .await
            .map_err(Error::from)
    }
}
