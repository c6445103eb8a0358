//! Route orchestration.
//!
//! This module provides:
//! - [`RouteRequest`] / [`RecalculationRequest`] - single request structs with optional parts
//! - [`RouteCalculation`] / [`RouteRecalculation`] - serialisable results
//! - [`RouteService`] - combines port availability, graph building, search,
//!   distance resolution, safety validation, history and popularity
//!
//! # Strategy Pattern
//!
//! The search itself is delegated to a [`RouteCalculator`]; hazard checks to a
//! [`SafetyValidator`]. Both are injected at construction.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use searoute_lib::{RouteRequest, RouteService, SqliteStore};
//!
//! let store = Arc::new(SqliteStore::open_in_memory()?);
//! let service = RouteService::new(store.clone(), store);
//! let route = service.calculate_optimal_route(&RouteRequest::new(1, 3))?;
//! println!("{} km", route.total_distance_km);
//! ```

mod calculator;

pub use calculator::{DijkstraCalculator, RouteCalculator};

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::Arc;

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::audit::{AuditEvent, AuditSink, TracingAuditSink};
use crate::clock::{Clock, SystemClock};
use crate::config::RoutingConfig;
use crate::distance::DistanceResolver;
use crate::error::{Error, Result, RouteFailure};
use crate::graph::build_route_graph;
use crate::history::{
    HistoryContext, HistoryRecord, RouteHistoryService, RouteHistorySource, RouteHistoryStatus,
};
use crate::lane::LaneId;
use crate::popularity::PopularityTracker;
use crate::port::{Coordinates, Port, PortId, PortKey};
use crate::repository::{LaneLookup, PortLookup};
use crate::safety::{CompositeValidator, NoHazards, PolarWatersValidator, SafetyValidator};
use crate::store::SqliteStore;

/// Request to compute the best route between two registered ports.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RouteRequest {
    pub start: PortId,
    pub end: PortId,
    /// Ports the caller wants excluded in addition to the disabled ones.
    pub avoid: BTreeSet<PortId>,
    /// History is written only when a context with a user id is present.
    pub history: Option<HistoryContext>,
}

impl RouteRequest {
    pub fn new(start: PortId, end: PortId) -> Self {
        Self {
            start,
            end,
            ..Self::default()
        }
    }

    pub fn avoiding(mut self, ports: impl IntoIterator<Item = PortId>) -> Self {
        self.avoid.extend(ports);
        self
    }

    pub fn with_history(mut self, history: HistoryContext) -> Self {
        self.history = Some(history);
        self
    }
}

/// Request to re-verify a stored route against current port availability.
#[derive(Debug, Clone, PartialEq)]
pub struct RecalculationRequest {
    pub route_id: LaneId,
    pub history: Option<HistoryContext>,
}

impl RecalculationRequest {
    pub fn new(route_id: LaneId) -> Self {
        Self {
            route_id,
            history: None,
        }
    }

    pub fn with_history(mut self, history: HistoryContext) -> Self {
        self.history = Some(history);
        self
    }
}

/// Result of a successful route calculation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouteCalculation {
    /// Port names in travel order.
    pub path: Vec<String>,
    pub port_ids: Vec<PortId>,
    pub total_distance_km: f64,
    pub warnings: Vec<String>,
    pub coordinates_by_id: BTreeMap<PortId, Coordinates>,
}

impl RouteCalculation {
    pub fn hop_count(&self) -> usize {
        self.path.len().saturating_sub(1)
    }
}

/// Result of a route recalculation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouteRecalculation {
    pub route_id: LaneId,
    pub path: Vec<String>,
    pub recalculated: bool,
    pub avoided_port_ids: Vec<PortId>,
}

/// A computed route with the ports and exclusions it was derived from.
struct ComputedRoute {
    ports: Vec<Port>,
    calculation: RouteCalculation,
    effective_avoid: BTreeSet<PortId>,
}

/// Orchestrates route computations against the port and lane registries.
pub struct RouteService {
    ports: Arc<dyn PortLookup>,
    lanes: Arc<dyn LaneLookup>,
    distances: DistanceResolver,
    calculator: Arc<dyn RouteCalculator>,
    safety: Arc<dyn SafetyValidator>,
    history: Option<Arc<RouteHistoryService>>,
    popularity: Option<Arc<PopularityTracker>>,
    audit: Arc<dyn AuditSink>,
    engine_version: String,
    default_source: RouteHistorySource,
}

impl RouteService {
    /// A service with Dijkstra search, no hazard rules, tracing audit output and
    /// neither history nor popularity tracking.
    pub fn new(ports: Arc<dyn PortLookup>, lanes: Arc<dyn LaneLookup>) -> Self {
        Self {
            ports,
            distances: DistanceResolver::new(lanes.clone()),
            lanes,
            calculator: Arc::new(DijkstraCalculator),
            safety: Arc::new(NoHazards),
            history: None,
            popularity: None,
            audit: Arc::new(TracingAuditSink),
            engine_version: env!("CARGO_PKG_VERSION").to_string(),
            default_source: RouteHistorySource::default(),
        }
    }

    /// A fully wired service over one SQLite store.
    pub fn from_store(
        store: Arc<SqliteStore>,
        config: &RoutingConfig,
        clock: Arc<dyn Clock>,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        let history = RouteHistoryService::new(store.clone(), clock.clone(), audit.clone())
            .with_max_page_size(config.max_history_page_size);
        let popularity = PopularityTracker::new(store.clone(), clock);

        let mut safety = CompositeValidator::default();
        if let Some(limit) = config.polar_latitude_limit {
            safety = safety.push(Arc::new(PolarWatersValidator::new(limit)));
        }

        Self::new(store.clone(), store)
            .with_safety_validator(Arc::new(safety))
            .with_history(Arc::new(history))
            .with_popularity(Arc::new(popularity))
            .with_audit_sink(audit)
            .with_engine_version(config.engine_version.clone())
            .with_default_source(config.default_history_source)
    }

    /// Convenience constructor using the system clock and tracing audit sink.
    pub fn with_defaults(store: Arc<SqliteStore>, config: &RoutingConfig) -> Self {
        Self::from_store(store, config, Arc::new(SystemClock), Arc::new(TracingAuditSink))
    }

    pub fn with_calculator(mut self, calculator: Arc<dyn RouteCalculator>) -> Self {
        self.calculator = calculator;
        self
    }

    pub fn with_safety_validator(mut self, safety: Arc<dyn SafetyValidator>) -> Self {
        self.safety = safety;
        self
    }

    pub fn with_history(mut self, history: Arc<RouteHistoryService>) -> Self {
        self.history = Some(history);
        self
    }

    pub fn with_popularity(mut self, popularity: Arc<PopularityTracker>) -> Self {
        self.popularity = Some(popularity);
        self
    }

    pub fn with_audit_sink(mut self, audit: Arc<dyn AuditSink>) -> Self {
        self.audit = audit;
        self
    }

    pub fn with_engine_version(mut self, engine_version: impl Into<String>) -> Self {
        self.engine_version = engine_version.into();
        self
    }

    pub fn with_default_source(mut self, source: RouteHistorySource) -> Self {
        self.default_source = source;
        self
    }

    /// Compute the shortest route between two ports by id.
    ///
    /// Disabled ports and the request's avoid-set are excluded. A disabled
    /// endpoint fails with [`Error::RouteNotFound`] before any search runs.
    pub fn calculate_optimal_route(&self, request: &RouteRequest) -> Result<RouteCalculation> {
        let start = self.port_by_id(request.start)?;
        let end = self.port_by_id(request.end)?;
        let disabled = self.ports.find_disabled()?;

        let computed = self.compute_route(&start, &end, &request.avoid, &disabled, false)?;

        let context = request.history.as_ref();
        let route_id = context.and_then(|ctx| ctx.route_id.clone());
        self.persist_success(context, &start, &end, &computed, route_id.clone());
        self.register_popularity(&start, &end, route_id.as_deref());

        Ok(computed.calculation)
    }

    /// Re-verify the route stored as lane `route_id` against current availability.
    ///
    /// Returns the current path unchanged when it crosses no disabled port.
    /// Otherwise routes around the disabled ports it crosses, unless one of
    /// them is an endpoint, in which case no detour is attempted.
    pub fn recalculate_route(&self, request: &RecalculationRequest) -> Result<RouteRecalculation> {
        let lane = self
            .lanes
            .find_lane(request.route_id)?
            .ok_or(Error::LaneNotFound {
                id: request.route_id,
            })?;
        let start = self.port_by_key(&lane.from)?;
        let end = self.port_by_key(&lane.to)?;
        let route_id = request.route_id.to_string();
        let context = request.history.as_ref();
        let disabled = self.ports.find_disabled()?;

        let disabled_endpoints: BTreeSet<PortId> = [start.id, end.id]
            .into_iter()
            .flatten()
            .filter(|id| disabled.contains(id))
            .collect();

        let current = match self.compute_route(&start, &end, &BTreeSet::new(), &disabled, true) {
            Ok(current) => Some(current),
            Err(Error::RouteNotFound { .. }) if !disabled_endpoints.is_empty() => None,
            Err(err) => return Err(err),
        };

        let blocked: BTreeSet<PortId> = match &current {
            Some(current) => current
                .calculation
                .port_ids
                .iter()
                .filter(|id| disabled.contains(id))
                .copied()
                .collect(),
            None => disabled_endpoints.clone(),
        };

        if blocked.is_empty() {
            if let Some(current) = current {
                self.persist_success(context, &start, &end, &current, Some(route_id));
                return Ok(RouteRecalculation {
                    route_id: request.route_id,
                    path: current.calculation.path,
                    recalculated: false,
                    avoided_port_ids: Vec::new(),
                });
            }
        }

        if !disabled_endpoints.is_empty() {
            warn!(
                route_id = request.route_id,
                endpoints = ?disabled_endpoints,
                "route.recalculate endpoint disabled"
            );
            return Err(Error::NoViableRouteAvoidingDisabledPorts {
                route_id: request.route_id,
                avoided_port_ids: blocked.into_iter().collect(),
                message: format!(
                    "cannot recalculate route {route_id} because an endpoint is disabled"
                ),
            });
        }

        info!(
            route_id = request.route_id,
            avoided_port_count = blocked.len(),
            "route.recalculate"
        );

        match self.compute_route(&start, &end, &blocked, &disabled, false) {
            Ok(detour) => {
                self.persist_success(context, &start, &end, &detour, Some(route_id));
                let avoided_port_ids: Vec<PortId> = blocked.into_iter().collect();
                self.audit.record(AuditEvent::RouteRecalculated {
                    route_id: request.route_id,
                    avoided_port_ids: avoided_port_ids.clone(),
                });
                Ok(RouteRecalculation {
                    route_id: request.route_id,
                    path: detour.calculation.path,
                    recalculated: true,
                    avoided_port_ids,
                })
            }
            Err(err @ Error::RouteNotFound { .. }) => {
                self.persist_no_viable(context, &start, &end, &blocked, route_id.clone(), err.to_string());
                Err(Error::NoViableRouteAvoidingDisabledPorts {
                    route_id: request.route_id,
                    message: format!(
                        "no viable route for {route_id} when avoiding {} disabled ports",
                        blocked.len()
                    ),
                    avoided_port_ids: blocked.into_iter().collect(),
                })
            }
            Err(err) => Err(err),
        }
    }

    /// Total distance in kilometres along an explicit path of port ids.
    pub fn total_distance(&self, path: &[PortId]) -> Result<f64> {
        let ports = path
            .iter()
            .map(|id| self.port_by_id(*id))
            .collect::<Result<Vec<_>>>()?;
        self.distances.total_distance(&ports)
    }

    fn compute_route(
        &self,
        start: &Port,
        end: &Port,
        avoid: &BTreeSet<PortId>,
        disabled: &HashSet<PortId>,
        include_disabled: bool,
    ) -> Result<ComputedRoute> {
        let start_id = require_id(start)?;
        let end_id = require_id(end)?;

        if !include_disabled && (disabled.contains(&start_id) || disabled.contains(&end_id)) {
            return Err(self.route_failure(start, end, RouteFailure::EndpointDisabled));
        }

        let mut effective_avoid = avoid.clone();
        if !include_disabled {
            effective_avoid.extend(disabled.iter().copied());
        }

        let lanes = self.lanes.all_lanes()?;
        let graph = build_route_graph(&lanes, self.ports.as_ref(), &effective_avoid)?;
        let port_ids = match self.calculator.compute(&graph, start_id, end_id) {
            Ok(port_ids) => port_ids,
            Err(Error::EndpointUnavailable { .. }) => {
                return Err(self.route_failure(start, end, RouteFailure::EndpointAvoided))
            }
            Err(Error::NoViableRoute { .. }) => {
                return Err(self.route_failure(start, end, RouteFailure::Disconnected))
            }
            Err(err) => return Err(err),
        };

        let ports = port_ids
            .iter()
            .map(|id| graph.port(*id).cloned().ok_or_else(|| Error::unknown_port_id(*id)))
            .collect::<Result<Vec<_>>>()?;
        let total_distance_km = self.distances.total_distance(&ports)?;
        let warnings = self.safety.validate(&ports);

        metrics::counter!("routes_calculated_total").increment(1);
        debug!(
            start = %start.name,
            end = %end.name,
            hops = port_ids.len().saturating_sub(1),
            total_distance_km,
            avoided = effective_avoid.len(),
            "computed route"
        );

        let calculation = RouteCalculation {
            path: ports.iter().map(|port| port.name.clone()).collect(),
            coordinates_by_id: ports
                .iter()
                .filter_map(|port| port.id.map(|id| (id, port.coordinates)))
                .collect(),
            port_ids,
            total_distance_km,
            warnings,
        };

        Ok(ComputedRoute {
            ports,
            calculation,
            effective_avoid,
        })
    }

    fn route_failure(&self, start: &Port, end: &Port, reason: RouteFailure) -> Error {
        metrics::counter!("routes_failed_total", "reason" => reason.as_str()).increment(1);
        debug!(start = %start.name, end = %end.name, reason = reason.as_str(), "no route");
        Error::RouteNotFound {
            start: start.name.clone(),
            goal: end.name.clone(),
            reason,
        }
    }

    fn port_by_id(&self, id: PortId) -> Result<Port> {
        self.ports
            .find_by_id(id)?
            .ok_or_else(|| Error::unknown_port_id(id))
    }

    fn port_by_key(&self, key: &PortKey) -> Result<Port> {
        if let Some(port) = self.ports.find_by_key(key)? {
            return Ok(port);
        }
        let ports = self.ports.all_ports()?;
        let suggestions =
            crate::port::fuzzy_port_matches(ports.iter().map(|p| p.name.as_str()), &key.name, 3);
        Err(Error::PortNotFound {
            query: key.to_string(),
            suggestions,
        })
    }

    fn persist_success(
        &self,
        context: Option<&HistoryContext>,
        start: &Port,
        end: &Port,
        computed: &ComputedRoute,
        route_id: Option<String>,
    ) {
        let Some(context) = context.filter(|ctx| ctx.should_persist()) else {
            return;
        };
        let waypoint_port_ids = interior_ids(&computed.calculation.port_ids);
        let avoided_port_ids: Vec<PortId> = computed.effective_avoid.iter().copied().collect();
        let metadata = build_metadata(context, computed.ports.len(), avoided_port_ids.len());

        let record = HistoryRecord {
            total_distance_km: Some(computed.calculation.total_distance_km),
            status: Some(RouteHistoryStatus::Success),
            notes: context.notes.clone(),
            waypoint_port_ids,
            avoided_port_ids,
            metadata,
            ..self.base_record(context, start, end, route_id)
        };
        self.save_history(record);
    }

    fn persist_no_viable(
        &self,
        context: Option<&HistoryContext>,
        start: &Port,
        end: &Port,
        avoided: &BTreeSet<PortId>,
        route_id: String,
        notes: String,
    ) {
        let Some(context) = context.filter(|ctx| ctx.should_persist()) else {
            return;
        };
        let avoided_port_ids: Vec<PortId> = avoided.iter().copied().collect();
        let metadata = build_metadata(context, 0, avoided_port_ids.len());

        let record = HistoryRecord {
            status: Some(RouteHistoryStatus::NoViableRoute),
            notes: Some(notes),
            avoided_port_ids,
            metadata,
            ..self.base_record(context, start, end, Some(route_id))
        };
        self.save_history(record);
    }

    fn base_record(
        &self,
        context: &HistoryContext,
        start: &Port,
        end: &Port,
        route_id: Option<String>,
    ) -> HistoryRecord {
        HistoryRecord {
            tenant_id: context.tenant_id.clone(),
            user_id: context.user_id.clone(),
            route_id: route_id.or_else(|| context.route_id.clone()),
            origin_port_id: start.id,
            origin_port_name: Some(start.name.clone()),
            destination_port_id: end.id,
            destination_port_name: Some(end.name.clone()),
            duration_estimate: context.duration_estimate,
            cost_estimate: context.cost_estimate,
            source: Some(context.source.unwrap_or(self.default_source)),
            engine_version: Some(
                context
                    .engine_version
                    .clone()
                    .unwrap_or_else(|| self.engine_version.clone()),
            ),
            path_encoding: context.path_encoding.clone(),
            geojson: context.geojson.clone(),
            ..HistoryRecord::default()
        }
    }

    fn save_history(&self, record: HistoryRecord) {
        let Some(history) = &self.history else {
            return;
        };
        if let Err(err) = history.save(record) {
            warn!(error = %err, "failed to persist route history");
        }
    }

    fn register_popularity(&self, start: &Port, end: &Port, route_id: Option<&str>) {
        let Some(popularity) = &self.popularity else {
            return;
        };
        if let Err(err) = popularity.register_search(start, end, route_id) {
            warn!(
                error = %err,
                origin = %start.name,
                destination = %end.name,
                "failed to register route popularity"
            );
        }
    }
}

fn require_id(port: &Port) -> Result<PortId> {
    port.id.ok_or_else(|| Error::InvalidPort {
        message: format!("{} has no storage id", port.key()),
    })
}

fn interior_ids(port_ids: &[PortId]) -> Vec<PortId> {
    if port_ids.len() <= 2 {
        return Vec::new();
    }
    port_ids[1..port_ids.len() - 1].to_vec()
}

/// Route counts first, caller-supplied keys override them.
fn build_metadata(context: &HistoryContext, port_count: usize, avoided: usize) -> Map<String, Value> {
    let mut metadata = Map::new();
    metadata.insert("portCount".into(), Value::from(port_count));
    metadata.insert("avoidedPortCount".into(), Value::from(avoided));
    metadata.extend(context.metadata.clone());
    metadata
}
