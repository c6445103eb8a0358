//! SQLite-backed storage for ports, lanes, route history and popularity.
//!
//! One [`SqliteStore`] implements every collaborator trait in
//! [`crate::repository`]. The connection sits behind a mutex so a single store
//! can be shared across concurrent requests; each trait method takes the lock
//! for the duration of one statement batch only.

mod history;
mod lanes;
mod popularity;
mod ports;

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use rusqlite::types::Type;
use rusqlite::{Connection, Row};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::Result;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS ports (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    continent TEXT NOT NULL,
    latitude REAL NOT NULL,
    longitude REAL NOT NULL,
    disabled INTEGER NOT NULL DEFAULT 0,
    disabled_reason TEXT,
    disabled_by TEXT,
    disabled_at TEXT,
    UNIQUE (name, continent)
);

CREATE TABLE IF NOT EXISTS lanes (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    from_name TEXT NOT NULL,
    from_continent TEXT NOT NULL,
    to_name TEXT NOT NULL,
    to_continent TEXT NOT NULL,
    distance_km REAL NOT NULL
);

CREATE INDEX IF NOT EXISTS lanes_endpoints_idx ON lanes (from_name, to_name);

CREATE TABLE IF NOT EXISTS route_history (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    tenant_id TEXT,
    user_id TEXT,
    route_id TEXT,
    origin_port_id INTEGER,
    origin_port_name TEXT,
    destination_port_id INTEGER,
    destination_port_name TEXT,
    waypoint_port_ids TEXT NOT NULL,
    avoided_port_ids TEXT NOT NULL,
    computed_at TEXT NOT NULL,
    engine_version TEXT,
    total_distance_km REAL,
    duration_estimate REAL,
    cost_estimate REAL,
    status TEXT NOT NULL,
    source TEXT NOT NULL,
    notes TEXT,
    path_encoding TEXT,
    geojson TEXT,
    dedup_hash TEXT NOT NULL,
    archived INTEGER NOT NULL DEFAULT 0,
    metadata TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS route_history_user_idx ON route_history (user_id, computed_at);
CREATE INDEX IF NOT EXISTS route_history_dedup_idx ON route_history (dedup_hash);

CREATE TABLE IF NOT EXISTS route_popularity (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    route_id TEXT,
    origin_port_id INTEGER NOT NULL,
    origin_port_name TEXT NOT NULL,
    destination_port_id INTEGER NOT NULL,
    destination_port_name TEXT NOT NULL,
    searches_count INTEGER NOT NULL,
    created_at TEXT NOT NULL,
    last_searched_at TEXT NOT NULL,
    UNIQUE (origin_port_id, destination_port_id)
);
"#;

/// Storage backend over a single SQLite connection.
#[derive(Debug)]
pub struct SqliteStore {
    connection: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) a database file and ensure the schema exists.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let connection = Connection::open(path)?;
        debug!(path = %path.display(), "opened route database");
        Self::from_connection(connection)
    }

    /// Open a private in-memory database.
    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(connection: Connection) -> Result<Self> {
        connection.execute_batch("PRAGMA foreign_keys = ON;")?;
        connection.execute_batch(SCHEMA)?;
        Ok(Self {
            connection: Mutex::new(connection),
        })
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.connection
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Decode a JSON text column.
fn json_column<T: DeserializeOwned>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T> {
    let text: String = row.get(idx)?;
    serde_json::from_str(&text)
        .map_err(|err| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(err)))
}

/// Decode an optional JSON text column.
fn optional_json_column<T: DeserializeOwned>(
    row: &Row<'_>,
    idx: usize,
) -> rusqlite::Result<Option<T>> {
    let text: Option<String> = row.get(idx)?;
    text.map(|text| {
        serde_json::from_str(&text).map_err(|err| {
            rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(err))
        })
    })
    .transpose()
}

/// Decode a text column through `FromStr`.
fn parsed_column<T>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T>
where
    T: std::str::FromStr<Err = String>,
{
    let text: String = row.get(idx)?;
    text.parse::<T>()
        .map_err(|msg| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, msg.into()))
}
