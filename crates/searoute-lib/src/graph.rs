use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;

use tracing::{debug, warn};

use crate::error::Result;
use crate::lane::{Lane, LaneId};
use crate::port::{Port, PortId, PortKey};
use crate::repository::PortLookup;

/// Edge within the route graph.
#[derive(Debug, Clone, PartialEq)]
pub struct Edge {
    pub target: PortId,
    pub distance: f64,
    /// Lane that produced this edge; `None` for edges added in memory.
    pub lane: Option<LaneId>,
}

/// Read-only, undirected weighted multigraph over registered ports.
///
/// Ports in the exclusion set never appear as nodes and contribute no edges.
/// Neighbour lists keep lane insertion order, which the calculator relies on
/// for its tie-break between equal-cost paths.
#[derive(Debug, Clone, Default)]
pub struct RouteGraph {
    adjacency: Arc<HashMap<PortId, Vec<Edge>>>,
    ports: Arc<HashMap<PortId, Port>>,
    excluded: Arc<HashSet<PortId>>,
}

impl RouteGraph {
    /// Return the neighbours for a given port id.
    pub fn neighbours(&self, port: PortId) -> &[Edge] {
        self.adjacency
            .get(&port)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Whether `port` is a node of this graph.
    pub fn contains(&self, port: PortId) -> bool {
        self.ports.contains_key(&port)
    }

    /// Whether `port` was removed from the graph by the exclusion set.
    pub fn is_excluded(&self, port: PortId) -> bool {
        self.excluded.contains(&port)
    }

    pub fn port(&self, id: PortId) -> Option<&Port> {
        self.ports.get(&id)
    }

    pub fn node_count(&self) -> usize {
        self.ports.len()
    }

    /// Number of undirected edges, counting parallel lanes separately.
    pub fn edge_count(&self) -> usize {
        self.adjacency.values().map(Vec::len).sum::<usize>() / 2
    }

    /// Iterate every directed half-edge as `(source, edge)`.
    pub fn edges(&self) -> impl Iterator<Item = (PortId, &Edge)> {
        self.adjacency
            .iter()
            .flat_map(|(source, edges)| edges.iter().map(move |edge| (*source, edge)))
    }
}

/// Incrementally assembles a [`RouteGraph`].
#[derive(Debug, Default)]
pub struct RouteGraphBuilder {
    adjacency: HashMap<PortId, Vec<Edge>>,
    ports: HashMap<PortId, Port>,
    excluded: HashSet<PortId>,
}

impl RouteGraphBuilder {
    pub fn new(excluded: impl IntoIterator<Item = PortId>) -> Self {
        Self {
            excluded: excluded.into_iter().collect(),
            ..Self::default()
        }
    }

    /// Add a port as a node unless it is excluded or lacks a storage id.
    pub fn add_port(&mut self, port: Port) -> bool {
        let Some(id) = port.id else {
            return false;
        };
        if self.excluded.contains(&id) {
            return false;
        }
        self.adjacency.entry(id).or_default();
        self.ports.insert(id, port);
        true
    }

    /// Add an undirected edge. Returns `false` when either endpoint is not a node.
    pub fn add_edge(&mut self, a: PortId, b: PortId, distance: f64, lane: Option<LaneId>) -> bool {
        if !self.ports.contains_key(&a) || !self.ports.contains_key(&b) {
            return false;
        }
        self.adjacency.entry(a).or_default().push(Edge {
            target: b,
            distance,
            lane,
        });
        self.adjacency.entry(b).or_default().push(Edge {
            target: a,
            distance,
            lane,
        });
        true
    }

    pub fn build(self) -> RouteGraph {
        RouteGraph {
            adjacency: Arc::new(self.adjacency),
            ports: Arc::new(self.ports),
            excluded: Arc::new(self.excluded),
        }
    }
}

/// Build a route graph from `lanes`, resolving endpoints against `ports` and
/// dropping every port in `avoid`.
///
/// Lanes whose endpoints do not resolve are skipped with a warning. An empty
/// or disconnected result is not an error.
pub fn build_route_graph(
    lanes: &[Lane],
    ports: &dyn PortLookup,
    avoid: &BTreeSet<PortId>,
) -> Result<RouteGraph> {
    let registered = ports.all_ports()?;
    let mut by_key: HashMap<PortKey, PortId> = HashMap::with_capacity(registered.len());
    let mut builder = RouteGraphBuilder::new(avoid.iter().copied());
    for port in registered {
        if let Some(id) = port.id {
            by_key.insert(port.key(), id);
        }
        builder.add_port(port);
    }

    let mut skipped = 0usize;
    let mut avoided = 0usize;
    for lane in lanes {
        let (Some(&from), Some(&to)) = (by_key.get(&lane.from), by_key.get(&lane.to)) else {
            warn!(
                lane_id = lane.id,
                from = %lane.from,
                to = %lane.to,
                "skipping lane with unresolved endpoint"
            );
            skipped += 1;
            continue;
        };

        if avoid.contains(&from) || avoid.contains(&to) {
            avoided += 1;
            continue;
        }

        builder.add_edge(from, to, lane.distance_km, lane.id);
    }

    let graph = builder.build();
    debug!(
        nodes = graph.node_count(),
        edges = graph.edge_count(),
        skipped,
        avoided,
        "built route graph"
    );
    Ok(graph)
}
