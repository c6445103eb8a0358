//! Search counters per (origin, destination) pair.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::warn;

use crate::clock::Clock;
use crate::error::Result;
use crate::port::{Port, PortId};
use crate::repository::PopularityRepository;

/// Upper bound for [`PopularityTracker::top_routes`].
pub const MAX_TOP_ROUTES: usize = 50;

/// Counter row for one (origin, destination) pair.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoutePopularity {
    pub id: Option<i64>,
    pub route_id: Option<String>,
    pub origin_port_id: PortId,
    pub origin_port_name: String,
    pub destination_port_id: PortId,
    pub destination_port_name: String,
    pub searches_count: u64,
    pub created_at: DateTime<Utc>,
    pub last_searched_at: DateTime<Utc>,
}

/// Records searches and reports the most requested pairs.
pub struct PopularityTracker {
    repository: Arc<dyn PopularityRepository>,
    clock: Arc<dyn Clock>,
}

impl PopularityTracker {
    pub fn new(repository: Arc<dyn PopularityRepository>, clock: Arc<dyn Clock>) -> Self {
        Self { repository, clock }
    }

    /// Count one search of `origin` → `destination`.
    ///
    /// Ports without a storage id are skipped with a warning.
    pub fn register_search(
        &self,
        origin: &Port,
        destination: &Port,
        route_id: Option<&str>,
    ) -> Result<Option<RoutePopularity>> {
        let (Some(origin_id), Some(destination_id)) = (origin.id, destination.id) else {
            warn!(
                origin = %origin.name,
                destination = %destination.name,
                "route.popularity.skip missing identifiers"
            );
            return Ok(None);
        };

        let now = self.clock.now();
        let hit = RoutePopularity {
            id: None,
            route_id: route_id.map(str::to_string),
            origin_port_id: origin_id,
            origin_port_name: origin.name.clone(),
            destination_port_id: destination_id,
            destination_port_name: destination.name.clone(),
            searches_count: 1,
            created_at: now,
            last_searched_at: now,
        };
        self.repository.increment(&hit).map(Some)
    }

    /// The most searched pairs, at most [`MAX_TOP_ROUTES`]. A zero limit yields nothing.
    pub fn top_routes(&self, limit: usize) -> Result<Vec<RoutePopularity>> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        self.repository.top(limit.min(MAX_TOP_ROUTES))
    }
}
