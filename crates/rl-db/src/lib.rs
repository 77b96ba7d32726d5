//! Storage layer for reading-log sessions.
//!
//! Persists sessions, their readings and their protocol tree using `rusqlite`,
//! and serves them back as [`SessionAggregate`]s through the
//! [`SessionStore`] trait.
//!
//! # Thread Safety
//!
//! The [`Database`] type wraps a `rusqlite::Connection`, which is `Send` but not `Sync`.
//! A `Database` instance can be moved between threads but cannot be shared
//! across threads without external synchronization. Statistics requests only
//! read, so separate `Database` instances per thread work without coordination.
//!
//! # Schema
//!
//! ## Timestamp Format
//!
//! Timestamps are stored as TEXT in RFC 3339 format with nanosecond precision
//! (e.g., `2024-01-15T10:30:00.000000000Z`). With a fixed width and a `Z`
//! suffix, lexicographic ordering matches chronological ordering, and a
//! loaded reading carries exactly the instant it was stored with.
//!
//! ## Protocol Storage
//!
//! The protocol tree is stored as a JSON blob in `protocols.items`. It is parsed
//! into the typed [`Protocol`] tree here, so statistics code never sees raw text.

use std::path::Path;

use chrono::{DateTime, SecondsFormat, Utc};
use rl_core::{Protocol, Reading, ReadingKind, SessionAggregate, SessionId, SessionStore};
use rusqlite::{Connection, OptionalExtension, params};
use thiserror::Error;

/// Database errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// An error from the underlying database.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    /// Failed to parse a stored reading timestamp.
    #[error("invalid timestamp for reading {reading_id}: {timestamp}")]
    TimestampParse {
        reading_id: i64,
        timestamp: String,
        #[source]
        source: chrono::ParseError,
    },
    /// A stored reading has an unknown kind.
    #[error("invalid kind for reading {reading_id}")]
    InvalidReadingKind {
        reading_id: i64,
        #[source]
        source: rl_core::UnknownReadingKind,
    },
    /// The stored protocol tree could not be parsed or serialized.
    #[error("invalid protocol for session {session_id}")]
    ProtocolParse {
        session_id: String,
        #[source]
        source: serde_json::Error,
    },
    /// A stored identifier failed validation.
    #[error("invalid stored value: {0}")]
    Validation(#[from] rl_core::ValidationError),
}

/// Database connection wrapper.
///
/// See the [module documentation](self) for thread safety considerations.
pub struct Database {
    conn: Connection,
}

/// Session metadata stored in the database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionRecord {
    pub id: SessionId,
    pub name: Option<String>,
    pub created_at: String,
    pub reading_count: i64,
}

impl Database {
    /// Opens a database at the given path, creating it if necessary.
    ///
    /// The database schema is automatically initialized on first open.
    pub fn open(path: &Path) -> Result<Self, DbError> {
        let conn = Connection::open(path)?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Opens an in-memory database.
    ///
    /// Useful for testing. The database is destroyed when the connection closes.
    pub fn open_in_memory() -> Result<Self, DbError> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Initializes the database schema.
    ///
    /// This is idempotent - safe to call on an already-initialized database.
    fn init(&self) -> Result<(), DbError> {
        self.conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        self.conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS sessions (
                id TEXT PRIMARY KEY,
                name TEXT,
                created_at TEXT NOT NULL
            );

            -- One protocol tree per session, stored as JSON
            CREATE TABLE IF NOT EXISTS protocols (
                session_id TEXT PRIMARY KEY,
                items TEXT NOT NULL,
                FOREIGN KEY (session_id) REFERENCES sessions(id) ON DELETE CASCADE
            );

            -- Readings: the immutable event log of a session
            -- kind: start | stop | pause_start | pause_end | data
            -- at: RFC 3339 with nanoseconds (e.g., '2024-01-15T10:30:00.000000000Z')
            CREATE TABLE IF NOT EXISTS readings (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                session_id TEXT NOT NULL,
                kind TEXT NOT NULL,
                name TEXT,
                at TEXT NOT NULL,
                FOREIGN KEY (session_id) REFERENCES sessions(id) ON DELETE CASCADE
            );

            CREATE INDEX IF NOT EXISTS idx_readings_session_at ON readings(session_id, at);
            ",
        )?;
        Ok(())
    }

    /// Stores a session with its readings and protocol.
    ///
    /// An existing session with the same ID is replaced. Returns the number of
    /// readings written.
    pub fn insert_session(&mut self, session: &SessionAggregate) -> Result<usize, DbError> {
        let items = serde_json::to_string(&session.protocol.items).map_err(|source| {
            DbError::ProtocolParse {
                session_id: session.session_id.to_string(),
                source,
            }
        })?;
        let session_id = session.session_id.as_str();

        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM sessions WHERE id = ?", params![session_id])?;
        tx.execute(
            "INSERT INTO sessions (id, name, created_at) VALUES (?, ?, ?)",
            params![session_id, session.name, format_timestamp(Utc::now())],
        )?;
        tx.execute(
            "INSERT INTO protocols (session_id, items) VALUES (?, ?)",
            params![session_id, items],
        )?;
        let mut inserted = 0;
        {
            let mut stmt = tx.prepare(
                "
                INSERT INTO readings (session_id, kind, name, at)
                VALUES (?, ?, ?, ?)
                ",
            )?;
            for reading in &session.readings {
                inserted += stmt.execute(params![
                    session_id,
                    reading.kind.as_str(),
                    reading.name,
                    format_timestamp(reading.at),
                ])?;
            }
        }
        tx.commit()?;

        tracing::debug!(session = session_id, readings = inserted, "stored session");
        Ok(inserted)
    }

    /// Lists stored sessions ordered by ID.
    pub fn list_sessions(&self) -> Result<Vec<SessionRecord>, DbError> {
        let mut stmt = self.conn.prepare(
            "
            SELECT s.id, s.name, s.created_at, COUNT(r.id)
            FROM sessions s
            LEFT JOIN readings r ON r.session_id = s.id
            GROUP BY s.id
            ORDER BY s.id ASC
            ",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, Option<String>>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, i64>(3)?,
            ))
        })?;
        let mut sessions = Vec::new();
        for row in rows {
            let (id, name, created_at, reading_count) = row?;
            sessions.push(SessionRecord {
                id: SessionId::new(id)?,
                name,
                created_at,
                reading_count,
            });
        }
        Ok(sessions)
    }

    /// Loads a session with its readings and parsed protocol.
    ///
    /// Returns `None` when the session, or its protocol, is absent. Readings
    /// are ordered by time, then by insertion order.
    pub fn load_session(
        &self,
        session_id: &SessionId,
    ) -> Result<Option<SessionAggregate>, DbError> {
        let header: Option<(Option<String>, String)> = self
            .conn
            .query_row(
                "
                SELECT s.name, p.items
                FROM sessions s
                JOIN protocols p ON p.session_id = s.id
                WHERE s.id = ?
                ",
                params![session_id.as_str()],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;
        let Some((name, items)) = header else {
            tracing::debug!(session = %session_id, "session or protocol not found");
            return Ok(None);
        };

        let protocol = Protocol {
            items: serde_json::from_str(&items).map_err(|source| DbError::ProtocolParse {
                session_id: session_id.to_string(),
                source,
            })?,
        };
        let readings = self.readings(session_id)?;

        Ok(Some(SessionAggregate {
            session_id: session_id.clone(),
            name,
            readings,
            protocol,
        }))
    }

    fn readings(&self, session_id: &SessionId) -> Result<Vec<Reading>, DbError> {
        let mut stmt = self.conn.prepare(
            "
            SELECT id, kind, name, at
            FROM readings
            WHERE session_id = ?
            ORDER BY at ASC, id ASC
            ",
        )?;
        let rows = stmt.query_map(params![session_id.as_str()], |row| {
            Ok(ReadingRow {
                id: row.get(0)?,
                kind: row.get(1)?,
                name: row.get(2)?,
                at: row.get(3)?,
            })
        })?;
        let mut readings = Vec::new();
        for row in rows {
            readings.push(row?.into_reading()?);
        }
        Ok(readings)
    }
}

impl SessionStore for Database {
    type Error = DbError;

    fn fetch_session(
        &self,
        session_id: &SessionId,
    ) -> Result<Option<SessionAggregate>, DbError> {
        self.load_session(session_id)
    }
}

#[derive(Debug)]
struct ReadingRow {
    id: i64,
    kind: String,
    name: Option<String>,
    at: String,
}

impl ReadingRow {
    fn into_reading(self) -> Result<Reading, DbError> {
        let kind: ReadingKind = self
            .kind
            .parse()
            .map_err(|source| DbError::InvalidReadingKind {
                reading_id: self.id,
                source,
            })?;
        let at = parse_timestamp(&self.at, self.id)?;
        Ok(Reading {
            name: self.name,
            kind,
            at,
        })
    }
}

fn parse_timestamp(timestamp: &str, reading_id: i64) -> Result<DateTime<Utc>, DbError> {
    DateTime::parse_from_rfc3339(timestamp)
        .map(|parsed| parsed.with_timezone(&Utc))
        .map_err(|source| DbError::TimestampParse {
            reading_id,
            timestamp: timestamp.to_string(),
            source,
        })
}

fn format_timestamp(timestamp: DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Nanos, true)
}
