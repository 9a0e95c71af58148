//! SQLite-based store implementation

use chrono::{DateTime, Utc};
use classifieds_model::{DueHints, Entity, EntityKind, Listing, Version, Versioned};
use classifieds_util::StoreId;
use rusqlite::{Connection, OptionalExtension, params};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, warn};

use crate::{AuditEvent, AuditEventType, Persistence, StoreError, StoreResult};

/// SQLite-based store
pub struct SqlitePersistence {
    conn: Mutex<Connection>,
    hints: DueHints,
}

impl SqlitePersistence {
    /// Open or create a store at the given path
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let conn = Connection::open(path)?;
        let store = Self {
            conn: Mutex::new(conn),
            hints: DueHints::default(),
        };
        store.init_schema()?;
        Ok(store)
    }

    /// Create an in-memory store (for testing)
    pub fn in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Mutex::new(conn),
            hints: DueHints::default(),
        };
        store.init_schema()?;
        Ok(store)
    }

    /// Use policy lead times for store scheduling and reschedule every
    /// existing record under them
    pub fn with_due_hints(mut self, hints: DueHints) -> StoreResult<Self> {
        self.hints = hints;
        self.reschedule_all()?;
        Ok(self)
    }

    fn conn(&self) -> StoreResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| StoreError::Unavailable("connection lock poisoned".into()))
    }

    fn init_schema(&self) -> StoreResult<()> {
        let conn = self.conn()?;

        conn.execute_batch(
            r#"
            -- Audit log (append-only)
            CREATE TABLE IF NOT EXISTS audit_log (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                timestamp TEXT NOT NULL,
                event_json TEXT NOT NULL
            );

            -- Lifecycle records, one row per (kind, id)
            CREATE TABLE IF NOT EXISTS entities (
                kind TEXT NOT NULL,
                id TEXT NOT NULL,
                version INTEGER NOT NULL,
                store_id TEXT,
                next_due_ms INTEGER,
                body_json TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                PRIMARY KEY (kind, id)
            );

            -- Indexes
            CREATE INDEX IF NOT EXISTS idx_audit_timestamp ON audit_log(timestamp);
            CREATE INDEX IF NOT EXISTS idx_entities_due ON entities(kind, next_due_ms);
            CREATE INDEX IF NOT EXISTS idx_entities_store ON entities(store_id);
            "#,
        )?;

        debug!("Store schema initialized");
        Ok(())
    }

    fn reschedule_all(&self) -> StoreResult<()> {
        let conn = self.conn()?;

        let rows: Vec<(String, String)> = {
            let mut stmt = conn.prepare("SELECT kind, body_json FROM entities")?;
            let mapped = stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?;
            mapped.collect::<Result<_, _>>()?
        };

        let mut rescheduled = 0usize;
        for (kind_str, body) in rows {
            let entity = decode(parse_kind(&kind_str)?, &body)?;
            rescheduled += conn.execute(
                "UPDATE entities SET next_due_ms = ? WHERE kind = ? AND id = ?",
                params![self.due_ms(&entity), kind_str, entity.id()],
            )?;
        }

        debug!(rescheduled, "Due times recomputed");
        Ok(())
    }

    fn due_ms(&self, entity: &Entity) -> Option<i64> {
        entity
            .next_due_at(&self.hints)
            .map(|due| due.timestamp_millis())
    }
}

fn parse_kind(s: &str) -> StoreResult<EntityKind> {
    EntityKind::ALL
        .into_iter()
        .find(|k| k.as_str() == s)
        .ok_or_else(|| StoreError::Serialization(format!("unknown entity kind '{}'", s)))
}

fn encode(entity: &Entity) -> StoreResult<String> {
    let json = match entity {
        Entity::Listing(l) => serde_json::to_string(l)?,
        Entity::Store(s) => serde_json::to_string(s)?,
        Entity::Discount(d) => serde_json::to_string(d)?,
        Entity::Campaign(c) => serde_json::to_string(c)?,
    };
    Ok(json)
}

fn decode(kind: EntityKind, json: &str) -> StoreResult<Entity> {
    let entity = match kind {
        EntityKind::Listing => Entity::Listing(serde_json::from_str(json)?),
        EntityKind::Store => Entity::Store(serde_json::from_str(json)?),
        EntityKind::Discount => Entity::Discount(serde_json::from_str(json)?),
        EntityKind::Campaign => Entity::Campaign(serde_json::from_str(json)?),
    };
    Ok(entity)
}

impl Persistence for SqlitePersistence {
    fn append_audit(&self, mut event: AuditEvent) -> StoreResult<()> {
        let conn = self.conn()?;
        let event_json = serde_json::to_string(&event.event)?;

        conn.execute(
            "INSERT INTO audit_log (timestamp, event_json) VALUES (?, ?)",
            params![event.timestamp.to_rfc3339(), event_json],
        )?;

        event.id = conn.last_insert_rowid();
        debug!(event_id = event.id, "Audit event appended");

        Ok(())
    }

    fn get_recent_audits(&self, limit: usize) -> StoreResult<Vec<AuditEvent>> {
        let conn = self.conn()?;

        let mut stmt = conn.prepare(
            "SELECT id, timestamp, event_json FROM audit_log ORDER BY id DESC LIMIT ?",
        )?;

        let rows = stmt.query_map([limit as i64], |row| {
            let id: i64 = row.get(0)?;
            let timestamp_str: String = row.get(1)?;
            let event_json: String = row.get(2)?;
            Ok((id, timestamp_str, event_json))
        })?;

        let mut events = Vec::new();
        for row in rows {
            let (id, timestamp_str, event_json) = row?;
            let timestamp = DateTime::parse_from_rfc3339(&timestamp_str)
                .map(|dt| dt.with_timezone(&Utc))
                .map_err(|e| StoreError::Serialization(e.to_string()))?;
            let event: AuditEventType = serde_json::from_str(&event_json)?;

            events.push(AuditEvent {
                id,
                timestamp,
                event,
            });
        }

        Ok(events)
    }

    fn load_due(
        &self,
        kind: EntityKind,
        now: DateTime<Utc>,
        limit: usize,
    ) -> StoreResult<Vec<Versioned<Entity>>> {
        let conn = self.conn()?;

        let mut stmt = conn.prepare(
            r#"
            SELECT version, body_json FROM entities
            WHERE kind = ? AND next_due_ms IS NOT NULL AND next_due_ms <= ?
            ORDER BY next_due_ms ASC
            LIMIT ?
            "#,
        )?;

        let rows = stmt.query_map(
            params![kind.as_str(), now.timestamp_millis(), limit as i64],
            |row| {
                let version: i64 = row.get(0)?;
                let body: String = row.get(1)?;
                Ok((version, body))
            },
        )?;

        let mut due = Vec::new();
        for row in rows {
            let (version, body) = row?;
            due.push(Versioned::new(decode(kind, &body)?, version as Version));
        }

        debug!(kind = %kind, count = due.len(), "Loaded due records");
        Ok(due)
    }

    fn load(&self, kind: EntityKind, id: &str) -> StoreResult<Option<Versioned<Entity>>> {
        let conn = self.conn()?;

        let row: Option<(i64, String)> = conn
            .query_row(
                "SELECT version, body_json FROM entities WHERE kind = ? AND id = ?",
                params![kind.as_str(), id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        match row {
            Some((version, body)) => Ok(Some(Versioned::new(
                decode(kind, &body)?,
                version as Version,
            ))),
            None => Ok(None),
        }
    }

    fn listings_for_store(&self, store_id: &StoreId) -> StoreResult<Vec<Versioned<Listing>>> {
        let conn = self.conn()?;

        let mut stmt = conn.prepare(
            "SELECT version, body_json FROM entities WHERE kind = ? AND store_id = ? ORDER BY id",
        )?;

        let rows = stmt.query_map(
            params![EntityKind::Listing.as_str(), store_id.as_str()],
            |row| {
                let version: i64 = row.get(0)?;
                let body: String = row.get(1)?;
                Ok((version, body))
            },
        )?;

        let mut listings = Vec::new();
        for row in rows {
            let (version, body) = row?;
            let listing: Listing = serde_json::from_str(&body)?;
            listings.push(Versioned::new(listing, version as Version));
        }

        Ok(listings)
    }

    fn insert(&self, entity: &Entity) -> StoreResult<Version> {
        let conn = self.conn()?;
        let body = encode(entity)?;

        let result = conn.execute(
            r#"
            INSERT INTO entities (kind, id, version, store_id, next_due_ms, body_json, updated_at)
            VALUES (?, ?, 1, ?, ?, ?, ?)
            "#,
            params![
                entity.kind().as_str(),
                entity.id(),
                entity.owner_store().map(|s| s.as_str()),
                self.due_ms(entity),
                body,
                classifieds_util::now().to_rfc3339(),
            ],
        );

        match result {
            Ok(_) => {
                debug!(kind = %entity.kind(), id = entity.id(), "Record inserted");
                Ok(1)
            }
            Err(rusqlite::Error::SqliteFailure(err, _))
                if err.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                Err(StoreError::AlreadyExists {
                    kind: entity.kind(),
                    id: entity.id().to_string(),
                })
            }
            Err(e) => Err(e.into()),
        }
    }

    fn commit(&self, entity: &Entity, expected: Version) -> StoreResult<Version> {
        let conn = self.conn()?;
        let body = encode(entity)?;

        let changed = conn.execute(
            r#"
            UPDATE entities
            SET version = version + 1, store_id = ?, next_due_ms = ?, body_json = ?, updated_at = ?
            WHERE kind = ? AND id = ? AND version = ?
            "#,
            params![
                entity.owner_store().map(|s| s.as_str()),
                self.due_ms(entity),
                body,
                classifieds_util::now().to_rfc3339(),
                entity.kind().as_str(),
                entity.id(),
                expected as i64,
            ],
        )?;

        if changed == 1 {
            debug!(
                kind = %entity.kind(),
                id = entity.id(),
                version = expected + 1,
                "Record committed"
            );
            return Ok(expected + 1);
        }

        let exists: Option<i64> = conn
            .query_row(
                "SELECT version FROM entities WHERE kind = ? AND id = ?",
                params![entity.kind().as_str(), entity.id()],
                |row| row.get(0),
            )
            .optional()?;

        match exists {
            Some(_) => Err(StoreError::VersionConflict {
                kind: entity.kind(),
                id: entity.id().to_string(),
                expected,
            }),
            None => Err(StoreError::NotFound {
                kind: entity.kind(),
                id: entity.id().to_string(),
            }),
        }
    }

    fn defer(&self, kind: EntityKind, id: &str, until: DateTime<Utc>) -> StoreResult<()> {
        let conn = self.conn()?;
        let changed = conn.execute(
            "UPDATE entities SET next_due_ms = ? WHERE kind = ? AND id = ?",
            params![until.timestamp_millis(), kind.as_str(), id],
        )?;

        if changed == 0 {
            return Err(StoreError::NotFound {
                kind,
                id: id.to_string(),
            });
        }

        debug!(kind = %kind, id, until = %until, "Record deferred");
        Ok(())
    }

    fn is_healthy(&self) -> bool {
        match self.conn.lock() {
            Ok(conn) => conn.query_row("SELECT 1", [], |_| Ok(())).is_ok(),
            Err(_) => {
                warn!("Store lock poisoned");
                false
            }
        }
    }
}
