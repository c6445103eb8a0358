//! Shortest-path strategies used by the route service.
//!
//! The [`RouteCalculator`] trait lets callers swap the search algorithm without
//! touching the orchestration in [`super::RouteService`].

use crate::error::{Error, Result};
use crate::graph::RouteGraph;
use crate::path::find_route_dijkstra;
use crate::port::PortId;

/// Trait for route calculation strategies.
pub trait RouteCalculator: Send + Sync {
    /// Compute an ordered port path from `start` to `end`, both included.
    ///
    /// Fails with [`Error::EndpointUnavailable`] before searching when either
    /// endpoint is not a node of `graph`, and with [`Error::NoViableRoute`]
    /// when the graph does not connect them.
    fn compute(&self, graph: &RouteGraph, start: PortId, end: PortId) -> Result<Vec<PortId>>;
}

/// Dijkstra's algorithm over lane distances.
#[derive(Debug, Clone, Copy, Default)]
pub struct DijkstraCalculator;

impl RouteCalculator for DijkstraCalculator {
    fn compute(&self, graph: &RouteGraph, start: PortId, end: PortId) -> Result<Vec<PortId>> {
        for endpoint in [start, end] {
            if !graph.contains(endpoint) {
                return Err(Error::EndpointUnavailable { port: endpoint });
            }
        }

        find_route_dijkstra(graph, start, end)
            .ok_or(Error::NoViableRoute { start, goal: end })
    }
}
