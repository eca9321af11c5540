//! Conveyor graph: entities as nodes, declared connections as edges.
//!
//! The graph is small (dozens of belts, not millions of road segments), so a
//! plain adjacency-list layout is used; the router scans a node's neighbor
//! `Vec` directly.  Construction goes through [`ConveyorGraphBuilder`], which
//! validates geometry once so the rest of the crate can divide by lengths and
//! speeds without re-checking.

use aim_core::EntityId;

use crate::entity::{Entity, EntityKind};
use crate::{SpatialError, SpatialResult};

// ── ConveyorGraph ─────────────────────────────────────────────────────────────

/// Directed graph of spatial entities.  Do not construct directly; use
/// [`ConveyorGraphBuilder`].
pub struct ConveyorGraph {
    entities: Vec<Entity>,
    adjacency: Vec<Vec<EntityId>>,
}

impl ConveyorGraph {
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn contains(&self, id: EntityId) -> bool {
        id.index() < self.entities.len()
    }

    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(id.index())
    }

    /// Like [`get`](Self::get) but failing with `SpatialError::UnknownEntity`.
    pub fn entity(&self, id: EntityId) -> SpatialResult<&Entity> {
        self.get(id).ok_or(SpatialError::UnknownEntity(id))
    }

    /// Entities reachable directly from `id`, in declaration order.
    pub fn neighbors(&self, id: EntityId) -> &[EntityId] {
        self.adjacency
            .get(id.index())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Iterator over all entity ids in ascending order.
    pub fn ids(&self) -> impl Iterator<Item = EntityId> + '_ {
        (0..self.entities.len() as u32).map(EntityId)
    }
}

// ── ConveyorGraphBuilder ──────────────────────────────────────────────────────

/// Incrementally declare entities and connections, then [`build`](Self::build).
///
/// # Example
///
/// ```
/// use aim_spatial::ConveyorGraphBuilder;
///
/// let mut b = ConveyorGraphBuilder::new();
/// let feed = b.add_belt("feed", vec![[0.0, 0.0, 0.0], [10.0, 0.0, 0.0]], 2.0);
/// let out = b.add_belt("out", vec![[10.0, 0.0, 0.0], [20.0, 0.0, 0.0]], 2.0);
/// b.connect(feed, out);
/// let graph = b.build().unwrap();
/// assert_eq!(graph.len(), 2);
/// assert_eq!(graph.neighbors(feed), &[out]);
/// ```
#[derive(Default)]
pub struct ConveyorGraphBuilder {
    entities: Vec<Entity>,
    edges: Vec<(EntityId, EntityId)>,
}

impl ConveyorGraphBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a belt with a polyline path and a linear speed (distance/tick).
    pub fn add_belt(&mut self, name: &str, points: Vec<[f64; 3]>, speed: f64) -> EntityId {
        self.push(Entity {
            name: name.to_string(),
            kind: EntityKind::Belt { points, speed },
        })
    }

    /// Add a turntable rotating agents through `turn_angle` radians at
    /// `angular_speed` radians per tick.
    pub fn add_turntable(
        &mut self,
        name: &str,
        center: [f64; 3],
        radius: f64,
        angular_speed: f64,
        turn_angle: f64,
    ) -> EntityId {
        self.push(Entity {
            name: name.to_string(),
            kind: EntityKind::Turntable {
                center,
                radius,
                angular_speed,
                turn_angle,
            },
        })
    }

    fn push(&mut self, entity: Entity) -> EntityId {
        let id = EntityId(self.entities.len() as u32);
        self.entities.push(entity);
        id
    }

    /// Declare a **directed** connection from `from` to `to`.
    pub fn connect(&mut self, from: EntityId, to: EntityId) {
        self.edges.push((from, to));
    }

    /// Declare connections in both directions.
    pub fn link(&mut self, a: EntityId, b: EntityId) {
        self.connect(a, b);
        self.connect(b, a);
    }

    /// Validate geometry and produce the graph.
    pub fn build(self) -> SpatialResult<ConveyorGraph> {
        for entity in &self.entities {
            match &entity.kind {
                EntityKind::Belt { points, speed } => {
                    if points.len() < 2 {
                        return Err(SpatialError::ShortPolyline(entity.name.clone()));
                    }
                    if *speed <= 0.0 {
                        return Err(SpatialError::ZeroSpeed(entity.name.clone()));
                    }
                }
                EntityKind::Turntable {
                    radius,
                    angular_speed,
                    turn_angle,
                    ..
                } => {
                    if *radius <= 0.0 || *turn_angle <= 0.0 {
                        return Err(SpatialError::ZeroLength(entity.name.clone()));
                    }
                    if *angular_speed <= 0.0 {
                        return Err(SpatialError::ZeroSpeed(entity.name.clone()));
                    }
                }
            }
            if entity.length() <= 0.0 {
                return Err(SpatialError::ZeroLength(entity.name.clone()));
            }
        }

        let mut adjacency = vec![Vec::new(); self.entities.len()];
        for (from, to) in self.edges {
            if from.index() >= self.entities.len() {
                return Err(SpatialError::UnknownEntity(from));
            }
            if to.index() >= self.entities.len() {
                return Err(SpatialError::UnknownEntity(to));
            }
            adjacency[from.index()].push(to);
        }

        Ok(ConveyorGraph {
            entities: self.entities,
            adjacency,
        })
    }
}
