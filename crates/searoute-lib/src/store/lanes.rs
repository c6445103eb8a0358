use rusqlite::{params, OptionalExtension, Row};

use super::SqliteStore;
use crate::error::Result;
use crate::lane::{Lane, LaneId};
use crate::port::PortKey;
use crate::repository::{LaneLookup, LaneWriter};

const LANE_COLUMNS: &str = "id, from_name, from_continent, to_name, to_continent, distance_km";

fn row_to_lane(row: &Row<'_>) -> rusqlite::Result<Lane> {
    let id: LaneId = row.get(0)?;
    let from = PortKey::new(row.get::<_, String>(1)?, row.get::<_, String>(2)?);
    let to = PortKey::new(row.get::<_, String>(3)?, row.get::<_, String>(4)?);
    let distance_km: f64 = row.get(5)?;
    Ok(Lane::new(from, to, distance_km).with_id(id))
}

impl LaneLookup for SqliteStore {
    fn all_lanes(&self) -> Result<Vec<Lane>> {
        let conn = self.conn();
        let sql = format!("SELECT {LANE_COLUMNS} FROM lanes ORDER BY id");
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map([], row_to_lane)?;
        let mut lanes = Vec::new();
        for row in rows {
            lanes.push(row?);
        }
        Ok(lanes)
    }

    fn find_lane(&self, id: LaneId) -> Result<Option<Lane>> {
        let conn = self.conn();
        let sql = format!("SELECT {LANE_COLUMNS} FROM lanes WHERE id = ?1");
        Ok(conn.query_row(&sql, [id], row_to_lane).optional()?)
    }

    fn find_by_endpoints(&self, name_a: &str, name_b: &str) -> Result<Option<Lane>> {
        let conn = self.conn();
        let sql = format!(
            "SELECT {LANE_COLUMNS} FROM lanes \
             WHERE (from_name = ?1 AND to_name = ?2) OR (from_name = ?2 AND to_name = ?1) \
             ORDER BY distance_km, id LIMIT 1"
        );
        Ok(conn
            .query_row(&sql, params![name_a, name_b], row_to_lane)
            .optional()?)
    }
}

impl LaneWriter for SqliteStore {
    fn insert_lane(&self, lane: &Lane) -> Result<LaneId> {
        let conn = self.conn();
        conn.execute(
            "INSERT INTO lanes (from_name, from_continent, to_name, to_continent, distance_km) \
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                lane.from.name,
                lane.from.continent,
                lane.to.name,
                lane.to.continent,
                lane.distance_km,
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }
}
