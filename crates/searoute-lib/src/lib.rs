//! Searoute library entry points.
//!
//! This crate keeps the port and lane registries, builds a weighted route
//! graph from them, computes shortest routes around disabled or avoided ports,
//! and records every computation in a queryable history. Higher-level
//! consumers (the CLI) should only depend on the items exported here instead
//! of reimplementing behavior.
//!

pub mod audit;
pub mod clock;
pub mod config;
pub mod distance;
pub mod error;
pub mod graph;
pub mod history;
pub mod import;
pub mod lane;
pub mod path;
pub mod popularity;
pub mod port;
pub mod registry;
pub mod repository;
pub mod routing;
pub mod safety;
pub mod store;

pub use audit::{AuditEvent, AuditSink, MemoryAuditSink, TracingAuditSink};
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::{default_database_path, resolve_database_path, RoutingConfig};
pub use distance::{haversine_km, DistanceResolver};
pub use error::{Error, Result, RouteFailure};
pub use graph::{build_route_graph, RouteGraph};
pub use history::{
    HistoryContext, HistoryId, HistoryQuery, HistoryRecord, Page, PageRequest, RouteHistory,
    RouteHistoryService, RouteHistorySource, RouteHistoryStatus,
};
pub use import::{import_lanes, import_ports, ImportSummary};
pub use lane::{Lane, LaneId, NewLane};
pub use popularity::{PopularityTracker, RoutePopularity};
pub use port::{Coordinates, NewPort, Port, PortId, PortKey};
pub use registry::{PortFilter, PortRegistry};
pub use routing::{
    DijkstraCalculator, RecalculationRequest, RouteCalculation, RouteCalculator,
    RouteRecalculation, RouteRequest, RouteService,
};
pub use safety::{CompositeValidator, NoHazards, PolarWatersValidator, SafetyValidator};
pub use store::SqliteStore;
