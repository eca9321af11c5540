//! Time-weighted Dijkstra over the conveyor graph.
//!
//! # Cost units
//!
//! Traversal times are fractional ticks; the heap works in integer
//! micro-ticks so cost comparisons are exact and tie-breaking on `EntityId`
//! stays deterministic.  The graph is node-weighted: stepping onto an entity
//! costs that entity's traversal time, and the start entity's own time is
//! part of the total.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use aim_core::EntityId;

use crate::graph::ConveyorGraph;
use crate::{SpatialError, SpatialResult};

/// Integer cost resolution: 1 tick = 1_000_000 micro-ticks.
const MICRO: f64 = 1e6;

// ── Route ─────────────────────────────────────────────────────────────────────

/// The result of a routing query: the ordered entities to traverse and the
/// total nominal traversal time in ticks.
#[derive(Debug, Clone)]
pub struct Route {
    /// Entities in traversal order, from start to destination inclusive.
    pub entities: Vec<EntityId>,
    /// Sum of nominal traversal times along the route, in ticks.
    pub total_time: f64,
}

// ── Dijkstra ──────────────────────────────────────────────────────────────────

/// Compute the fastest route from `from` to `to`.
///
/// `from == to` yields the single-entity route.  Returns
/// [`SpatialError::NoRoute`] when the destination is unreachable.
pub fn shortest_route(
    graph: &ConveyorGraph,
    from: EntityId,
    to: EntityId,
) -> SpatialResult<Route> {
    graph.entity(from)?;
    graph.entity(to)?;

    // Adjacency only ever names entities the builder validated, so the
    // fallback cost is unreachable in practice; MAX keeps it unselectable.
    let cost_of = |id: EntityId| -> u64 {
        graph
            .get(id)
            .map(|e| (e.traversal_time() * MICRO) as u64)
            .unwrap_or(u64::MAX)
    };

    let n = graph.len();
    let mut dist = vec![u64::MAX; n];
    let mut prev: Vec<Option<EntityId>> = vec![None; n];

    dist[from.index()] = cost_of(from);

    // Min-heap via Reverse; secondary key EntityId for deterministic ties.
    let mut heap: BinaryHeap<Reverse<(u64, EntityId)>> = BinaryHeap::new();
    heap.push(Reverse((dist[from.index()], from)));

    while let Some(Reverse((cost, node))) = heap.pop() {
        if node == to {
            return Ok(reconstruct(prev, to, cost));
        }

        // Skip stale heap entries.
        if cost > dist[node.index()] {
            continue;
        }

        for &neighbor in graph.neighbors(node) {
            let new_cost = cost.saturating_add(cost_of(neighbor));
            if new_cost < dist[neighbor.index()] {
                dist[neighbor.index()] = new_cost;
                prev[neighbor.index()] = Some(node);
                heap.push(Reverse((new_cost, neighbor)));
            }
        }
    }

    Err(SpatialError::NoRoute { from, to })
}

fn reconstruct(prev: Vec<Option<EntityId>>, to: EntityId, total: u64) -> Route {
    let mut entities = vec![to];
    let mut cur = to;
    while let Some(p) = prev[cur.index()] {
        entities.push(p);
        cur = p;
    }
    entities.reverse();
    Route {
        entities,
        total_time: total as f64 / MICRO,
    }
}
