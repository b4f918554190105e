//! Append-only audit log store.
//!
//! # Invariants
//! - Events are only ever inserted; the schema rejects UPDATE and DELETE.
//! - `id` order is append order.

use crate::model::event::{NewEvent, ProjectEvent, StoredEvent};
use crate::repo::{ensure_tables, RepoResult};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row};

/// Audit log contract.
pub trait EventRepository {
    /// Appends one event and returns it with its store-assigned id and time.
    fn store(&self, event: &NewEvent) -> RepoResult<StoredEvent>;
    /// Lists events in append order, optionally capped to the first `limit`.
    fn list_events(&self, limit: Option<u32>) -> RepoResult<Vec<StoredEvent>>;
}

/// SQLite-backed audit log.
pub struct SqliteEventRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteEventRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_tables(conn, &["events"])?;
        Ok(Self { conn })
    }
}

impl EventRepository for SqliteEventRepository<'_> {
    fn store(&self, event: &NewEvent) -> RepoResult<StoredEvent> {
        let payload = event.event.payload_json()?;
        self.conn.execute(
            "INSERT INTO events (type, created_by, data) VALUES (?1, ?2, ?3);",
            params![
                event.event.event_type(),
                event.created_by.as_str(),
                payload
            ],
        )?;
        let id = self.conn.last_insert_rowid();
        let created_at: i64 = self.conn.query_row(
            "SELECT created_at FROM events WHERE id = ?1;",
            [id],
            |row| row.get(0),
        )?;

        Ok(StoredEvent {
            id,
            created_by: event.created_by.clone(),
            created_at,
            event: event.event.clone(),
        })
    }

    fn list_events(&self, limit: Option<u32>) -> RepoResult<Vec<StoredEvent>> {
        let mut sql = String::from(
            "SELECT id, type, created_by, data, created_at
             FROM events
             ORDER BY id ASC",
        );
        let mut bind_values: Vec<Value> = Vec::new();
        if let Some(limit) = limit {
            sql.push_str(" LIMIT ?");
            bind_values.push(Value::Integer(i64::from(limit)));
        }

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut events = Vec::new();
        while let Some(row) = rows.next()? {
            events.push(parse_event_row(row)?);
        }
        Ok(events)
    }
}

fn parse_event_row(row: &Row<'_>) -> RepoResult<StoredEvent> {
    let event_type: String = row.get("type")?;
    let payload: String = row.get("data")?;
    Ok(StoredEvent {
        id: row.get("id")?,
        created_by: row.get("created_by")?,
        created_at: row.get("created_at")?,
        event: ProjectEvent::from_parts(&event_type, &payload)?,
    })
}
