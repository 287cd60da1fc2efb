//! SQLite implementation of the Store trait.
//!
//! This is the primary storage backend. It uses rusqlite with bundled
//! SQLite behind an r2d2 pool, wrapped in async via tokio::spawn_blocking.

use std::path::Path;

use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};

use nostr_ingest_core::{d_tag_value, supersedes, Event, EventId, PublicKey, ReplacementKey, Tag};

use crate::error::{Result, StoreError};
use crate::migration;
use crate::pool::{create_memory_pool, create_pool, DbPool, PoolSettings};
use crate::traits::{AuthorList, InsertResult, ReplaceResult, Store, StoreStats};

const EVENT_COLUMNS: &str = "id, pubkey, created_at, kind, tags, content, sig";

/// SQLite-based store implementation.
///
/// Thread-safe via the connection pool. All operations use spawn_blocking
/// to avoid blocking the async runtime.
#[derive(Clone)]
pub struct SqliteStore {
    pool: DbPool,
}

impl SqliteStore {
    /// Open a SQLite database at the given path.
    ///
    /// Creates the file and runs migrations if needed.
    pub fn open(path: impl AsRef<Path>, settings: PoolSettings) -> Result<Self> {
        let pool = create_pool(path, settings)?;
        Self::from_pool(pool)
    }

    /// Open an in-memory SQLite database.
    ///
    /// Useful for testing.
    pub fn open_memory() -> Result<Self> {
        Self::from_pool(create_memory_pool()?)
    }

    fn from_pool(pool: DbPool) -> Result<Self> {
        let mut conn = pool.get()?;
        migration::migrate(&mut conn)?;
        drop(conn);
        Ok(Self { pool })
    }

    /// The underlying pool, for maintenance tooling.
    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    /// Run a blocking operation on a pooled connection.
    async fn blocking<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = pool.get()?;
            f(&mut conn)
        })
        .await
        .map_err(|e| StoreError::Task(format!("spawn_blocking failed: {}", e)))?
    }
}

// Helper to convert a row to Event
fn row_to_event(row: &rusqlite::Row<'_>) -> rusqlite::Result<Event> {
    let tags_json: String = row.get("tags")?;
    let tags: Vec<Tag> = serde_json::from_str(&tags_json).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(4, rusqlite::types::Type::Text, Box::new(e))
    })?;

    Ok(Event {
        id: EventId::new(row.get::<_, String>("id")?),
        pubkey: PublicKey::new(row.get::<_, String>("pubkey")?),
        created_at: row.get::<_, i64>("created_at")? as u64,
        kind: row.get::<_, i64>("kind")? as u32,
        tags,
        content: row.get("content")?,
        sig: row.get("sig")?,
    })
}

/// Insert the event row and its tag index. Returns false when the id exists.
fn insert_row(conn: &Connection, event: &Event) -> Result<bool> {
    let created_at = i64::try_from(event.created_at)
        .map_err(|_| StoreError::TimestampOutOfRange(event.created_at))?;
    let tags_json =
        serde_json::to_string(&event.tags).map_err(|e| StoreError::Serialization(e.to_string()))?;

    let inserted = conn.execute(
        "INSERT OR IGNORE INTO event (id, pubkey, created_at, kind, tags, content, sig, d_tag)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            event.id.as_str(),
            event.pubkey.as_str(),
            created_at,
            event.kind as i64,
            tags_json,
            event.content,
            event.sig,
            d_tag_value(event),
        ],
    )?;

    if inserted == 0 {
        return Ok(false);
    }

    let mut stmt = conn.prepare_cached(
        "INSERT INTO event_tag (event_id, position, name, value) VALUES (?1, ?2, ?3, ?4)",
    )?;
    for (position, tag) in event.tags.iter().enumerate() {
        if let (Some(name), Some(value)) = (tag.name(), tag.value()) {
            stmt.execute(params![event.id.as_str(), position as i64, name, value])?;
        }
    }

    Ok(true)
}

/// Current holders of a slot, read inside the caller's transaction.
fn select_slot(conn: &Connection, key: &ReplacementKey) -> Result<Vec<Event>> {
    let events = match &key.d_tag {
        None => {
            let mut stmt = conn.prepare_cached(&format!(
                "SELECT {} FROM event WHERE pubkey = ?1 AND kind = ?2",
                EVENT_COLUMNS
            ))?;
            let rows = stmt
                .query_map(params![key.author.as_str(), key.kind as i64], row_to_event)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            rows
        }
        Some(d) => {
            let mut stmt = conn.prepare_cached(&format!(
                "SELECT {} FROM event WHERE pubkey = ?1 AND kind = ?2 AND d_tag = ?3",
                EVENT_COLUMNS
            ))?;
            let rows = stmt
                .query_map(
                    params![key.author.as_str(), key.kind as i64, d],
                    row_to_event,
                )?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            rows
        }
    };
    Ok(events)
}

#[async_trait]
impl Store for SqliteStore {
    async fn insert_event(&self, event: &Event) -> Result<InsertResult> {
        let event = event.clone();

        self.blocking(move |conn| {
            let tx = conn.transaction()?;
            let inserted = insert_row(&tx, &event)?;
            tx.commit()?;

            Ok(if inserted {
                InsertResult::Inserted
            } else {
                InsertResult::AlreadyExists
            })
        })
        .await
    }

    async fn replace_event(&self, event: &Event, key: &ReplacementKey) -> Result<ReplaceResult> {
        let event = event.clone();
        let key = key.clone();

        self.blocking(move |conn| {
            // IMMEDIATE takes the write lock up front, so the read of the
            // current holder and the write below form one serialized step
            // across every connection and process on this file.
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

            let holders = select_slot(&tx, &key)?;
            if holders.iter().any(|h| h.id == event.id) {
                return Ok(ReplaceResult::AlreadyExists);
            }
            if let Some(keeper) = holders.iter().find(|h| !supersedes(&event, h)) {
                return Ok(ReplaceResult::Stale {
                    current: keeper.id.clone(),
                });
            }

            let mut replaced = Vec::with_capacity(holders.len());
            for holder in holders {
                tx.execute("DELETE FROM event WHERE id = ?1", params![holder.id.as_str()])?;
                replaced.push(holder.id);
            }

            if !insert_row(&tx, &event)? {
                return Ok(ReplaceResult::AlreadyExists);
            }
            tx.commit()?;

            tracing::debug!(
                event_id = %event.id,
                kind = event.kind,
                replaced = replaced.len(),
                "replaced slot holder"
            );
            Ok(ReplaceResult::Inserted { replaced })
        })
        .await
    }

    async fn delete_event(&self, id: &EventId) -> Result<bool> {
        let id = id.clone();

        self.blocking(move |conn| {
            let deleted = conn.execute("DELETE FROM event WHERE id = ?1", params![id.as_str()])?;
            Ok(deleted > 0)
        })
        .await
    }

    async fn get_event(&self, id: &EventId) -> Result<Option<Event>> {
        let id = id.clone();

        self.blocking(move |conn| {
            conn.query_row(
                &format!("SELECT {} FROM event WHERE id = ?1", EVENT_COLUMNS),
                params![id.as_str()],
                row_to_event,
            )
            .optional()
            .map_err(StoreError::from)
        })
        .await
    }

    async fn count_events(&self) -> Result<u64> {
        self.blocking(|conn| {
            let count: i64 = conn.query_row("SELECT COUNT(*) FROM event", [], |row| row.get(0))?;
            Ok(count as u64)
        })
        .await
    }

    async fn query_by_author_and_kind(&self, author: &PublicKey, kind: u32) -> Result<Vec<Event>> {
        let author = author.clone();

        self.blocking(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM event WHERE pubkey = ?1 AND kind = ?2
                 ORDER BY created_at DESC, id ASC",
                EVENT_COLUMNS
            ))?;
            let events = stmt
                .query_map(params![author.as_str(), kind as i64], row_to_event)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(events)
        })
        .await
    }

    async fn query_by_author_kind_and_tag(
        &self,
        author: &PublicKey,
        kind: u32,
        tag_name: &str,
        tag_value: &str,
    ) -> Result<Vec<Event>> {
        let author = author.clone();
        let tag_name = tag_name.to_owned();
        let tag_value = tag_value.to_owned();

        self.blocking(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT e.id, e.pubkey, e.created_at, e.kind, e.tags, e.content, e.sig
                 FROM event e
                 WHERE e.pubkey = ?1 AND e.kind = ?2 AND EXISTS (
                     SELECT 1 FROM event_tag t
                     WHERE t.event_id = e.id AND t.name = ?3 AND t.value = ?4
                 )
                 ORDER BY e.created_at DESC, e.id ASC",
            )?;
            let events = stmt
                .query_map(
                    params![author.as_str(), kind as i64, tag_name, tag_value],
                    row_to_event,
                )?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(events)
        })
        .await
    }

    async fn load_author_list(&self, list: AuthorList) -> Result<Vec<PublicKey>> {
        self.blocking(move |conn| {
            let mut stmt = conn.prepare(&format!("SELECT pubkey FROM {}", list.table()))?;
            let authors = stmt
                .query_map([], |row| row.get::<_, String>(0).map(PublicKey::new))?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(authors)
        })
        .await
    }

    async fn add_author(&self, list: AuthorList, author: &PublicKey) -> Result<()> {
        let author = author.clone();

        self.blocking(move |conn| {
            conn.execute(
                &format!(
                    "INSERT INTO {table} (pubkey)
                     SELECT ?1 WHERE NOT EXISTS (SELECT 1 FROM {table} WHERE pubkey = ?1)",
                    table = list.table()
                ),
                params![author.as_str()],
            )?;
            Ok(())
        })
        .await
    }

    async fn remove_author(&self, list: AuthorList, author: &PublicKey) -> Result<bool> {
        let author = author.clone();

        self.blocking(move |conn| {
            let removed = conn.execute(
                &format!("DELETE FROM {} WHERE pubkey = ?1", list.table()),
                params![author.as_str()],
            )?;
            Ok(removed > 0)
        })
        .await
    }

    fn stats(&self) -> StoreStats {
        let state = self.pool.state();
        StoreStats {
            open_connections: state.connections,
            idle_connections: state.idle_connections,
        }
    }
}
