use rusqlite::types::ToSql;
use rusqlite::{params, params_from_iter, OptionalExtension, Row};

use super::{json_column, optional_json_column, parsed_column, SqliteStore};
use crate::error::{Error, Result};
use crate::history::{HistoryId, HistoryQuery, Page, PageRequest, RouteHistory};
use crate::repository::HistoryRepository;

const HISTORY_COLUMNS: &str = "id, tenant_id, user_id, route_id, origin_port_id, \
    origin_port_name, destination_port_id, destination_port_name, waypoint_port_ids, \
    avoided_port_ids, computed_at, engine_version, total_distance_km, duration_estimate, \
    cost_estimate, status, source, notes, path_encoding, geojson, dedup_hash, archived, metadata";

fn row_to_history(row: &Row<'_>) -> rusqlite::Result<RouteHistory> {
    Ok(RouteHistory {
        id: Some(row.get(0)?),
        tenant_id: row.get(1)?,
        user_id: row.get(2)?,
        route_id: row.get(3)?,
        origin_port_id: row.get(4)?,
        origin_port_name: row.get(5)?,
        destination_port_id: row.get(6)?,
        destination_port_name: row.get(7)?,
        waypoint_port_ids: json_column(row, 8)?,
        avoided_port_ids: json_column(row, 9)?,
        computed_at: row.get(10)?,
        engine_version: row.get(11)?,
        total_distance_km: row.get(12)?,
        duration_estimate: row.get(13)?,
        cost_estimate: row.get(14)?,
        status: parsed_column(row, 15)?,
        source: parsed_column(row, 16)?,
        notes: row.get(17)?,
        path_encoding: row.get(18)?,
        geojson: optional_json_column(row, 19)?,
        dedup_hash: row.get(20)?,
        archived: row.get(21)?,
        metadata: json_column(row, 22)?,
    })
}

/// Build the WHERE clause and bound values for a history query.
fn where_clause(query: &HistoryQuery) -> (String, Vec<Box<dyn ToSql>>) {
    let mut conditions: Vec<String> = Vec::new();
    let mut values: Vec<Box<dyn ToSql>> = Vec::new();

    let mut push = |column: &str, op: &str, value: Box<dyn ToSql>| {
        values.push(value);
        conditions.push(format!("{column} {op} ?{}", values.len()));
    };

    if let Some(tenant) = &query.tenant_id {
        push("tenant_id", "=", Box::new(tenant.clone()));
    }
    if let Some(user) = &query.user_id {
        push("user_id", "=", Box::new(user.clone()));
    }
    if let Some(route) = &query.route_id {
        push("route_id", "=", Box::new(route.clone()));
    }
    if let Some(status) = query.status {
        push("status", "=", Box::new(status.as_str()));
    }
    if let Some(source) = query.source {
        push("source", "=", Box::new(source.as_str()));
    }
    if let Some(archived) = query.archived {
        push("archived", "=", Box::new(archived));
    }
    if let Some(from) = query.from {
        push("computed_at", ">=", Box::new(from));
    }
    if let Some(to) = query.to {
        push("computed_at", "<=", Box::new(to));
    }

    let clause = if conditions.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", conditions.join(" AND "))
    };
    (clause, values)
}

fn to_json(entry_field: &impl serde::Serialize) -> Result<String> {
    Ok(serde_json::to_string(entry_field)?)
}

impl HistoryRepository for SqliteStore {
    fn insert(&self, entry: &RouteHistory) -> Result<HistoryId> {
        let waypoints = to_json(&entry.waypoint_port_ids)?;
        let avoided = to_json(&entry.avoided_port_ids)?;
        let geojson = entry.geojson.as_ref().map(to_json).transpose()?;
        let metadata = to_json(&entry.metadata)?;

        let conn = self.conn();
        conn.execute(
            "INSERT INTO route_history (tenant_id, user_id, route_id, origin_port_id, \
             origin_port_name, destination_port_id, destination_port_name, waypoint_port_ids, \
             avoided_port_ids, computed_at, engine_version, total_distance_km, \
             duration_estimate, cost_estimate, status, source, notes, path_encoding, geojson, \
             dedup_hash, archived, metadata) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, \
             ?17, ?18, ?19, ?20, ?21, ?22)",
            params![
                entry.tenant_id,
                entry.user_id,
                entry.route_id,
                entry.origin_port_id,
                entry.origin_port_name,
                entry.destination_port_id,
                entry.destination_port_name,
                waypoints,
                avoided,
                entry.computed_at,
                entry.engine_version,
                entry.total_distance_km,
                entry.duration_estimate,
                entry.cost_estimate,
                entry.status.as_str(),
                entry.source.as_str(),
                entry.notes,
                entry.path_encoding,
                geojson,
                entry.dedup_hash,
                entry.archived,
                metadata,
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    fn find_by_id(&self, id: HistoryId) -> Result<Option<RouteHistory>> {
        let conn = self.conn();
        let sql = format!("SELECT {HISTORY_COLUMNS} FROM route_history WHERE id = ?1");
        Ok(conn.query_row(&sql, [id], row_to_history).optional()?)
    }

    fn update(&self, entry: &RouteHistory) -> Result<()> {
        let id = entry.id.ok_or_else(|| Error::CorruptRecord {
            table: "route_history",
            message: "cannot update an entry without an id".to_string(),
        })?;
        let conn = self.conn();
        let changed = conn.execute(
            "UPDATE route_history SET archived = ?1, notes = ?2 WHERE id = ?3",
            params![entry.archived, entry.notes, id],
        )?;
        if changed == 0 {
            return Err(Error::HistoryNotFound { id });
        }
        Ok(())
    }

    fn search(&self, query: &HistoryQuery, page: PageRequest) -> Result<Page<RouteHistory>> {
        let (clause, values) = where_clause(query);
        let conn = self.conn();

        let count_sql = format!("SELECT COUNT(*) FROM route_history{clause}");
        let total: i64 = conn.query_row(
            &count_sql,
            params_from_iter(values.iter().map(|v| v.as_ref())),
            |row| row.get(0),
        )?;

        let limit_idx = values.len() + 1;
        let offset_idx = values.len() + 2;
        let sql = format!(
            "SELECT {HISTORY_COLUMNS} FROM route_history{clause} \
             ORDER BY computed_at DESC, id DESC LIMIT ?{limit_idx} OFFSET ?{offset_idx}"
        );
        let limit = i64::from(page.size);
        let offset = i64::try_from(page.offset()).unwrap_or(i64::MAX);
        let bound = values
            .iter()
            .map(|v| v.as_ref())
            .chain([&limit as &dyn ToSql, &offset as &dyn ToSql]);

        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(bound), row_to_history)?;
        let mut items = Vec::new();
        for row in rows {
            items.push(row?);
        }

        Ok(Page {
            items,
            page: page.page,
            size: page.size,
            total: u64::try_from(total).unwrap_or_default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, TimeDelta, Utc};
    use serde_json::{json, Map};

    use super::*;
    use crate::history::{RouteHistorySource, RouteHistoryStatus};

    fn entry(user: &str, computed_at: DateTime<Utc>, status: RouteHistoryStatus) -> RouteHistory {
        let mut metadata = Map::new();
        metadata.insert("schemaVersion".into(), json!(1));
        RouteHistory {
            id: None,
            tenant_id: Some("acme".into()),
            user_id: Some(user.into()),
            route_id: Some("7".into()),
            origin_port_id: Some(1),
            origin_port_name: Some("Callao".into()),
            destination_port_id: Some(3),
            destination_port_name: Some("Yokohama".into()),
            waypoint_port_ids: vec![2],
            avoided_port_ids: vec![4],
            computed_at,
            engine_version: Some("1.0.0".into()),
            total_distance_km: Some(16340.0),
            duration_estimate: None,
            cost_estimate: None,
            status,
            source: RouteHistorySource::Manual,
            notes: None,
            path_encoding: None,
            geojson: Some(json!({"type": "LineString", "coordinates": []})),
            dedup_hash: "abc".into(),
            archived: false,
            metadata,
        }
    }

    #[test]
    fn entry_round_trips_through_storage() {
        let store = SqliteStore::open_in_memory().unwrap();
        let original = entry("ana", Utc::now(), RouteHistoryStatus::Success);
        let id = store.insert(&original).unwrap();

        let stored = store.find_by_id(id).unwrap().unwrap();
        assert_eq!(stored.id, Some(id));
        assert_eq!(stored.waypoint_port_ids, vec![2]);
        assert_eq!(stored.avoided_port_ids, vec![4]);
        assert_eq!(stored.geojson, original.geojson);
        assert_eq!(stored.metadata, original.metadata);
        assert_eq!(stored.status, RouteHistoryStatus::Success);
    }

    #[test]
    fn search_filters_orders_and_pages() {
        let store = SqliteStore::open_in_memory().unwrap();
        let base = Utc::now();
        for minutes in 0..5 {
            store
                .insert(&entry(
                    "ana",
                    base + TimeDelta::minutes(minutes),
                    RouteHistoryStatus::Success,
                ))
                .unwrap();
        }
        store
            .insert(&entry("bo", base, RouteHistoryStatus::NoViableRoute))
            .unwrap();

        let query = HistoryQuery {
            user_id: Some("ana".into()),
            ..HistoryQuery::default()
        };
        let page = store.search(&query, PageRequest::new(0, 2)).unwrap();
        assert_eq!(page.total, 5);
        assert_eq!(page.items.len(), 2);
        assert!(page.items[0].computed_at > page.items[1].computed_at);

        let last = store.search(&query, PageRequest::new(2, 2)).unwrap();
        assert_eq!(last.items.len(), 1);

        let failures = HistoryQuery {
            status: Some(RouteHistoryStatus::NoViableRoute),
            ..HistoryQuery::default()
        };
        let page = store.search(&failures, PageRequest::default()).unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.items[0].user_id.as_deref(), Some("bo"));
    }

    #[test]
    fn update_persists_archive_flag_and_notes() {
        let store = SqliteStore::open_in_memory().unwrap();
        let id = store
            .insert(&entry("ana", Utc::now(), RouteHistoryStatus::Success))
            .unwrap();
        let mut stored = store.find_by_id(id).unwrap().unwrap();
        stored.archived = true;
        stored.notes = Some("superseded".into());
        store.update(&stored).unwrap();

        let reread = store.find_by_id(id).unwrap().unwrap();
        assert!(reread.archived);
        assert_eq!(reread.notes.as_deref(), Some("superseded"));
    }
}
