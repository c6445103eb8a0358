use std::collections::HashSet;

use chrono::{DateTime, Utc};
use rusqlite::{params, ErrorCode, OptionalExtension, Row};

use super::SqliteStore;
use crate::error::{Error, Result};
use crate::port::{Coordinates, DisabledState, Port, PortId, PortKey};
use crate::repository::{PortLookup, PortWriter};

const PORT_COLUMNS: &str = "id, name, continent, latitude, longitude, disabled, \
                            disabled_reason, disabled_by, disabled_at";

fn row_to_port(row: &Row<'_>) -> rusqlite::Result<Port> {
    let id: PortId = row.get(0)?;
    let name: String = row.get(1)?;
    let continent: String = row.get(2)?;
    let latitude: f64 = row.get(3)?;
    let longitude: f64 = row.get(4)?;
    let disabled: bool = row.get(5)?;
    let reason: Option<String> = row.get(6)?;
    let actor: Option<String> = row.get(7)?;
    let at: Option<DateTime<Utc>> = row.get(8)?;

    let disabled = if disabled {
        Some(DisabledState {
            reason,
            actor,
            at: at.unwrap_or(DateTime::<Utc>::UNIX_EPOCH),
        })
    } else {
        None
    };

    Ok(Port {
        id: Some(id),
        name,
        continent,
        coordinates: Coordinates::new(latitude, longitude),
        disabled,
    })
}

impl PortLookup for SqliteStore {
    fn find_by_id(&self, id: PortId) -> Result<Option<Port>> {
        let conn = self.conn();
        let sql = format!("SELECT {PORT_COLUMNS} FROM ports WHERE id = ?1");
        Ok(conn.query_row(&sql, [id], row_to_port).optional()?)
    }

    fn find_by_key(&self, key: &PortKey) -> Result<Option<Port>> {
        let conn = self.conn();
        let sql = format!("SELECT {PORT_COLUMNS} FROM ports WHERE name = ?1 AND continent = ?2");
        Ok(conn
            .query_row(&sql, params![key.name, key.continent], row_to_port)
            .optional()?)
    }

    fn find_disabled(&self) -> Result<HashSet<PortId>> {
        let conn = self.conn();
        let mut stmt = conn.prepare("SELECT id FROM ports WHERE disabled = 1")?;
        let rows = stmt.query_map([], |row| row.get::<_, PortId>(0))?;
        let mut ids = HashSet::new();
        for row in rows {
            ids.insert(row?);
        }
        Ok(ids)
    }

    fn all_ports(&self) -> Result<Vec<Port>> {
        let conn = self.conn();
        let sql = format!("SELECT {PORT_COLUMNS} FROM ports ORDER BY id");
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map([], row_to_port)?;
        let mut ports = Vec::new();
        for row in rows {
            ports.push(row?);
        }
        Ok(ports)
    }
}

impl PortWriter for SqliteStore {
    fn insert_port(&self, port: &Port) -> Result<PortId> {
        let conn = self.conn();
        let state = port.disabled.as_ref();
        let result = conn.execute(
            "INSERT INTO ports (name, continent, latitude, longitude, disabled, \
             disabled_reason, disabled_by, disabled_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                port.name,
                port.continent,
                port.coordinates.latitude,
                port.coordinates.longitude,
                state.is_some(),
                state.and_then(|s| s.reason.as_deref()),
                state.and_then(|s| s.actor.as_deref()),
                state.map(|s| s.at),
            ],
        );

        match result {
            Ok(_) => Ok(conn.last_insert_rowid()),
            Err(rusqlite::Error::SqliteFailure(err, _))
                if err.code == ErrorCode::ConstraintViolation =>
            {
                Err(Error::DuplicatePort {
                    name: port.name.clone(),
                    continent: port.continent.clone(),
                })
            }
            Err(err) => Err(err.into()),
        }
    }

    fn update_port(&self, port: &Port) -> Result<()> {
        let id = port.id.ok_or_else(|| Error::InvalidPort {
            message: format!("{} has no storage id", port.key()),
        })?;
        let conn = self.conn();
        let state = port.disabled.as_ref();
        let changed = conn.execute(
            "UPDATE ports SET disabled = ?1, disabled_reason = ?2, disabled_by = ?3, \
             disabled_at = ?4 WHERE id = ?5",
            params![
                state.is_some(),
                state.and_then(|s| s.reason.as_deref()),
                state.and_then(|s| s.actor.as_deref()),
                state.map(|s| s.at),
                id,
            ],
        )?;
        if changed == 0 {
            return Err(Error::unknown_port_id(id));
        }
        Ok(())
    }

    fn delete_port(&self, id: PortId) -> Result<bool> {
        let conn = self.conn();
        let changed = conn.execute("DELETE FROM ports WHERE id = ?1", [id])?;
        Ok(changed > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_with_callao() -> (SqliteStore, PortId) {
        let store = SqliteStore::open_in_memory().unwrap();
        let id = store
            .insert_port(&Port::new(
                "Callao",
                "South America",
                Coordinates::new(-12.05, -77.13),
            ))
            .unwrap();
        (store, id)
    }

    #[test]
    fn inserted_port_round_trips_by_id_and_key() {
        let (store, id) = store_with_callao();
        let by_id = store.find_by_id(id).unwrap().unwrap();
        assert_eq!(by_id.name, "Callao");
        assert_eq!(by_id.coordinates, Coordinates::new(-12.05, -77.13));

        let by_key = store
            .find_by_key(&PortKey::new("Callao", "South America"))
            .unwrap()
            .unwrap();
        assert_eq!(by_key.id, Some(id));
        assert!(store
            .find_by_key(&PortKey::new("Callao", "Asia"))
            .unwrap()
            .is_none());
    }

    #[test]
    fn duplicate_key_is_rejected() {
        let (store, _) = store_with_callao();
        let err = store
            .insert_port(&Port::new(
                "Callao",
                "South America",
                Coordinates::new(0.0, 0.0),
            ))
            .unwrap_err();
        assert!(matches!(err, Error::DuplicatePort { .. }));
    }

    #[test]
    fn disabled_stamp_is_persisted() {
        let (store, id) = store_with_callao();
        let mut port = store.find_by_id(id).unwrap().unwrap();
        port.disable(Some("strike".into()), Some("ops".into()), Utc::now());
        store.update_port(&port).unwrap();

        assert_eq!(store.find_disabled().unwrap(), HashSet::from([id]));
        let stored = store.find_by_id(id).unwrap().unwrap();
        let state = stored.disabled.unwrap();
        assert_eq!(state.reason.as_deref(), Some("strike"));
        assert_eq!(state.actor.as_deref(), Some("ops"));
    }

    #[test]
    fn delete_reports_whether_a_row_was_removed() {
        let (store, id) = store_with_callao();
        assert!(store.delete_port(id).unwrap());
        assert!(!store.delete_port(id).unwrap());
        assert!(store.all_ports().unwrap().is_empty());
    }
}
