//! Storage collaborator interfaces consumed by the routing core.
//!
//! [`crate::store::SqliteStore`] implements every trait here; tests and
//! embedding applications may supply their own.

use std::collections::HashSet;

use crate::error::Result;
use crate::history::{HistoryId, HistoryQuery, Page, PageRequest, RouteHistory};
use crate::lane::{Lane, LaneId};
use crate::popularity::RoutePopularity;
use crate::port::{Port, PortId, PortKey};

/// Read access to the port registry.
pub trait PortLookup: Send + Sync {
    fn find_by_id(&self, id: PortId) -> Result<Option<Port>>;

    fn find_by_key(&self, key: &PortKey) -> Result<Option<Port>>;

    /// Ids of every port currently disabled, read as one snapshot.
    fn find_disabled(&self) -> Result<HashSet<PortId>>;

    fn all_ports(&self) -> Result<Vec<Port>>;
}

/// Read access to documented lanes.
pub trait LaneLookup: Send + Sync {
    /// Every lane in insertion order.
    fn all_lanes(&self) -> Result<Vec<Lane>>;

    fn find_lane(&self, id: LaneId) -> Result<Option<Lane>>;

    /// Shortest documented lane joining the two named ports, in either
    /// direction. Equal distances resolve to the lowest lane id.
    fn find_by_endpoints(&self, name_a: &str, name_b: &str) -> Result<Option<Lane>>;
}

/// Persistence for route history entries.
pub trait HistoryRepository: Send + Sync {
    fn insert(&self, entry: &RouteHistory) -> Result<HistoryId>;

    fn find_by_id(&self, id: HistoryId) -> Result<Option<RouteHistory>>;

    /// Persist the mutable fields (`archived`, `notes`) of an existing entry.
    fn update(&self, entry: &RouteHistory) -> Result<()>;

    fn search(&self, query: &HistoryQuery, page: PageRequest) -> Result<Page<RouteHistory>>;
}

/// Persistence for (origin, destination) search counters.
pub trait PopularityRepository: Send + Sync {
    fn find_pair(&self, origin: PortId, destination: PortId) -> Result<Option<RoutePopularity>>;

    /// Count one search of the record's (origin, destination) pair.
    ///
    /// Creates the counter at one or adds one to the stored value in a single
    /// step, refreshing names, route id and `last_searched_at`. The record's own
    /// `searches_count` is ignored.
    fn increment(&self, record: &RoutePopularity) -> Result<RoutePopularity>;

    /// Highest counters first.
    fn top(&self, limit: usize) -> Result<Vec<RoutePopularity>>;
}

/// Mutations used by port administration.
pub trait PortWriter: Send + Sync {
    /// Insert a new port and return its assigned id.
    fn insert_port(&self, port: &Port) -> Result<PortId>;

    /// Persist the availability stamp of an existing port.
    fn update_port(&self, port: &Port) -> Result<()>;

    /// Remove a port; returns `false` when nothing was deleted.
    fn delete_port(&self, id: PortId) -> Result<bool>;
}

/// Mutations used by lane administration.
pub trait LaneWriter: Send + Sync {
    fn insert_lane(&self, lane: &Lane) -> Result<LaneId>;
}

/// Everything the port registry needs from storage.
pub trait RegistryStore: PortLookup + PortWriter + LaneLookup + LaneWriter {}

impl<T> RegistryStore for T where T: PortLookup + PortWriter + LaneLookup + LaneWriter {}
