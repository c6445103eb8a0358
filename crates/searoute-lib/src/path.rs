use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap, HashSet};

use crate::graph::RouteGraph;
use crate::port::PortId;

/// Run Dijkstra's algorithm from `start` and stop as soon as `goal` is settled.
///
/// Among equal-cost candidates the one discovered first is expanded first, and
/// a node's parent is only replaced by a strictly cheaper path. Since
/// neighbours are visited in lane insertion order, ties resolve to the path
/// found first under that order. Parallel edges reduce to their minimum.
pub fn find_route_dijkstra(graph: &RouteGraph, start: PortId, goal: PortId) -> Option<Vec<PortId>> {
    if start == goal {
        return graph.contains(start).then(|| vec![start]);
    }

    let mut distances: HashMap<PortId, f64> = HashMap::new();
    let mut parents: HashMap<PortId, Option<PortId>> = HashMap::new();
    let mut settled: HashSet<PortId> = HashSet::new();
    let mut queue = BinaryHeap::new();
    let mut sequence = 0u64;

    distances.insert(start, 0.0);
    parents.insert(start, None);
    queue.push(QueueEntry::new(start, 0.0, sequence));

    while let Some(entry) = queue.pop() {
        if !settled.insert(entry.node) {
            continue;
        }
        if entry.node == goal {
            return Some(reconstruct_path(&parents, start, goal));
        }

        let current_distance = entry.cost.0;
        for edge in graph.neighbours(entry.node) {
            let next = edge.target;
            if settled.contains(&next) {
                continue;
            }

            let next_cost = current_distance + edge.distance;
            if next_cost < *distances.get(&next).unwrap_or(&f64::INFINITY) {
                distances.insert(next, next_cost);
                parents.insert(next, Some(entry.node));
                sequence += 1;
                queue.push(QueueEntry::new(next, next_cost, sequence));
            }
        }
    }

    None
}

/// Sum of the cheapest edge weights along `path`, or `None` if a hop has no edge.
pub fn path_cost(graph: &RouteGraph, path: &[PortId]) -> Option<f64> {
    path.windows(2).try_fold(0.0, |total, pair| {
        graph
            .neighbours(pair[0])
            .iter()
            .filter(|edge| edge.target == pair[1])
            .map(|edge| edge.distance)
            .min_by(f64::total_cmp)
            .map(|hop| total + hop)
    })
}

fn reconstruct_path(
    parents: &HashMap<PortId, Option<PortId>>,
    start: PortId,
    goal: PortId,
) -> Vec<PortId> {
    let mut path = Vec::new();
    let mut current = Some(goal);
    while let Some(node) = current {
        path.push(node);
        if node == start {
            break;
        }
        current = parents.get(&node).copied().flatten();
    }
    path.reverse();
    path
}

#[derive(Copy, Clone, Debug, Default)]
struct FloatOrd(f64);

impl PartialEq for FloatOrd {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for FloatOrd {}

impl PartialOrd for FloatOrd {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for FloatOrd {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
struct QueueEntry {
    node: PortId,
    cost: FloatOrd,
    sequence: u64,
}

impl QueueEntry {
    fn new(node: PortId, cost: f64, sequence: u64) -> Self {
        Self {
            node,
            cost: FloatOrd(cost),
            sequence,
        }
    }
}

impl Ord for QueueEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse ordering so BinaryHeap pops the cheapest, earliest-discovered entry.
        other
            .cost
            .cmp(&self.cost)
            .then_with(|| other.sequence.cmp(&self.sequence))
    }
}

impl PartialOrd for QueueEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::RouteGraphBuilder;
    use crate::port::{Coordinates, Port};

    fn graph(nodes: &[PortId], edges: &[(PortId, PortId, f64)], excluded: &[PortId]) -> RouteGraph {
        let mut builder = RouteGraphBuilder::new(excluded.iter().copied());
        for &id in nodes {
            builder.add_port(
                Port::new(format!("P{id}"), "Test", Coordinates::new(0.0, 0.0)).with_id(id),
            );
        }
        for &(a, b, km) in edges {
            builder.add_edge(a, b, km, None);
        }
        builder.build()
    }

    #[test]
    fn picks_cheapest_path_over_fewest_hops() {
        let g = graph(&[1, 2, 3, 4], &[(1, 4, 10.0), (1, 2, 2.0), (2, 3, 2.0), (3, 4, 2.0)], &[]);
        assert_eq!(find_route_dijkstra(&g, 1, 4), Some(vec![1, 2, 3, 4]));
        assert_eq!(path_cost(&g, &[1, 2, 3, 4]), Some(6.0));
    }

    #[test]
    fn parallel_edges_use_minimum() {
        let g = graph(&[1, 2], &[(1, 2, 9.0), (1, 2, 4.0)], &[]);
        assert_eq!(find_route_dijkstra(&g, 1, 2), Some(vec![1, 2]));
        assert_eq!(path_cost(&g, &[1, 2]), Some(4.0));
    }

    #[test]
    fn equal_cost_ties_follow_insertion_order() {
        let first = graph(&[1, 2, 3, 4], &[(1, 2, 1.0), (1, 3, 1.0), (2, 4, 1.0), (3, 4, 1.0)], &[]);
        assert_eq!(find_route_dijkstra(&first, 1, 4), Some(vec![1, 2, 4]));

        let swapped =
            graph(&[1, 2, 3, 4], &[(1, 3, 1.0), (1, 2, 1.0), (3, 4, 1.0), (2, 4, 1.0)], &[]);
        assert_eq!(find_route_dijkstra(&swapped, 1, 4), Some(vec![1, 3, 4]));
    }

    #[test]
    fn disconnected_and_trivial_cases() {
        let g = graph(&[1, 2, 3], &[(1, 2, 1.0)], &[]);
        assert_eq!(find_route_dijkstra(&g, 1, 3), None);
        assert_eq!(find_route_dijkstra(&g, 2, 2), Some(vec![2]));
        assert_eq!(path_cost(&g, &[1, 3]), None);
    }
}
