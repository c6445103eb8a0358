use rusqlite::{params, OptionalExtension, Row};

use super::SqliteStore;
use crate::error::Result;
use crate::popularity::RoutePopularity;
use crate::port::PortId;
use crate::repository::PopularityRepository;

const POPULARITY_COLUMNS: &str = "id, route_id, origin_port_id, origin_port_name, \
    destination_port_id, destination_port_name, searches_count, created_at, last_searched_at";

fn row_to_popularity(row: &Row<'_>) -> rusqlite::Result<RoutePopularity> {
    let count: i64 = row.get(6)?;
    Ok(RoutePopularity {
        id: Some(row.get(0)?),
        route_id: row.get(1)?,
        origin_port_id: row.get(2)?,
        origin_port_name: row.get(3)?,
        destination_port_id: row.get(4)?,
        destination_port_name: row.get(5)?,
        searches_count: u64::try_from(count).unwrap_or_default(),
        created_at: row.get(7)?,
        last_searched_at: row.get(8)?,
    })
}

impl PopularityRepository for SqliteStore {
    fn find_pair(&self, origin: PortId, destination: PortId) -> Result<Option<RoutePopularity>> {
        let conn = self.conn();
        let sql = format!(
            "SELECT {POPULARITY_COLUMNS} FROM route_popularity \
             WHERE origin_port_id = ?1 AND destination_port_id = ?2"
        );
        Ok(conn
            .query_row(&sql, params![origin, destination], row_to_popularity)
            .optional()?)
    }

    fn increment(&self, record: &RoutePopularity) -> Result<RoutePopularity> {
        // The guard is held across the write and the read-back.
        let conn = self.conn();
        conn.execute(
            "INSERT INTO route_popularity (route_id, origin_port_id, origin_port_name, \
             destination_port_id, destination_port_name, searches_count, created_at, \
             last_searched_at) VALUES (?1, ?2, ?3, ?4, ?5, 1, ?6, ?7) \
             ON CONFLICT (origin_port_id, destination_port_id) DO UPDATE SET \
             route_id = excluded.route_id, origin_port_name = excluded.origin_port_name, \
             destination_port_name = excluded.destination_port_name, \
             searches_count = route_popularity.searches_count + 1, \
             last_searched_at = excluded.last_searched_at",
            params![
                record.route_id,
                record.origin_port_id,
                record.origin_port_name,
                record.destination_port_id,
                record.destination_port_name,
                record.created_at,
                record.last_searched_at,
            ],
        )?;

        let sql = format!(
            "SELECT {POPULARITY_COLUMNS} FROM route_popularity \
             WHERE origin_port_id = ?1 AND destination_port_id = ?2"
        );
        Ok(conn.query_row(
            &sql,
            params![record.origin_port_id, record.destination_port_id],
            row_to_popularity,
        )?)
    }

    fn top(&self, limit: usize) -> Result<Vec<RoutePopularity>> {
        let conn = self.conn();
        let sql = format!(
            "SELECT {POPULARITY_COLUMNS} FROM route_popularity \
             ORDER BY searches_count DESC, last_searched_at DESC, id ASC LIMIT ?1"
        );
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map([limit], row_to_popularity)?;
        let mut records = Vec::new();
        for row in rows {
            records.push(row?);
        }
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use chrono::{TimeDelta, Utc};

    use super::*;

    fn record(origin: PortId, destination: PortId, count: u64) -> RoutePopularity {
        let now = Utc::now();
        RoutePopularity {
            id: None,
            route_id: None,
            origin_port_id: origin,
            origin_port_name: format!("port-{origin}"),
            destination_port_id: destination,
            destination_port_name: format!("port-{destination}"),
            searches_count: count,
            created_at: now,
            last_searched_at: now,
        }
    }

    #[test]
    fn increment_adds_one_to_existing_pair() {
        let store = SqliteStore::open_in_memory().unwrap();
        let first = store.increment(&record(1, 2, 1)).unwrap();
        let mut next = record(1, 2, 40);
        next.route_id = Some("lane-3".into());
        next.last_searched_at = first.last_searched_at + TimeDelta::seconds(5);
        let second = store.increment(&next).unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(first.searches_count, 1);
        assert_eq!(second.searches_count, 2);
        assert_eq!(second.created_at, first.created_at);
        assert_eq!(second.last_searched_at, next.last_searched_at);
        assert_eq!(second.route_id.as_deref(), Some("lane-3"));
    }

    #[test]
    fn concurrent_increments_are_not_lost() {
        let store = Arc::new(SqliteStore::open_in_memory().unwrap());
        let workers: Vec<_> = (0..8)
            .map(|_| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    for _ in 0..200 {
                        store.increment(&record(1, 2, 1)).unwrap();
                    }
                })
            })
            .collect();
        for worker in workers {
            worker.join().unwrap();
        }

        let counter = store.find_pair(1, 2).unwrap().unwrap();
        assert_eq!(counter.searches_count, 1600);
    }

    #[test]
    fn top_orders_by_count() {
        let store = SqliteStore::open_in_memory().unwrap();
        for (origin, destination, searches) in [(1, 2, 3), (2, 3, 9), (3, 1, 5)] {
            for _ in 0..searches {
                store.increment(&record(origin, destination, 1)).unwrap();
            }
        }

        let top = store.top(2).unwrap();
        let counts: Vec<_> = top.iter().map(|r| r.searches_count).collect();
        assert_eq!(counts, vec![9, 5]);
        assert!(store.find_pair(2, 1).unwrap().is_none());
    }
}
