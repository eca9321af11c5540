//! Spatial entities: belts and turntables.
//!
//! Both kinds reduce to the same one-dimensional model the occupancy and
//! routing code works with: a traversable segment with a `length`, a linear
//! `speed` along it, and a world-space position for every progress fraction.
//! For a belt those come from its polyline; for a turntable from its arc —
//! `length = radius · turn_angle`, `speed = radius · angular_speed` — so a
//! turntable is just a short curved segment as far as collision and routing
//! are concerned.

// ── EntityKind ────────────────────────────────────────────────────────────────

/// The geometry of one spatial entity.
#[derive(Clone, Debug)]
pub enum EntityKind {
    /// A conveyor with a 3-D polyline path.  Agents enter at the first point
    /// (progress 0) and leave at the last (progress 1).
    Belt {
        points: Vec<[f64; 3]>,
        /// Linear speed in distance units per tick.
        speed: f64,
    },

    /// A rotating platform turning agents through `turn_angle` radians.
    Turntable {
        center: [f64; 3],
        radius: f64,
        /// Angular speed in radians per tick.
        angular_speed: f64,
        /// Total rotation an agent rides through, in radians.
        turn_angle: f64,
    },
}

// ── Entity ────────────────────────────────────────────────────────────────────

/// A named spatial entity within one conveyor graph.
#[derive(Clone, Debug)]
pub struct Entity {
    pub name: String,
    pub kind: EntityKind,
}

impl Entity {
    /// Traversable length in distance units (polyline length or arc length).
    pub fn length(&self) -> f64 {
        match &self.kind {
            EntityKind::Belt { points, .. } => polyline_length(points),
            EntityKind::Turntable {
                radius, turn_angle, ..
            } => radius * turn_angle,
        }
    }

    /// Linear speed along the entity in distance units per tick.
    pub fn speed(&self) -> f64 {
        match &self.kind {
            EntityKind::Belt { speed, .. } => *speed,
            EntityKind::Turntable {
                radius,
                angular_speed,
                ..
            } => radius * angular_speed,
        }
    }

    /// Time to traverse the whole entity at nominal speed, in ticks.
    /// This is the edge weight used by the router.
    pub fn traversal_time(&self) -> f64 {
        self.length() / self.speed()
    }

    /// World position at `progress` in `[0, 1]`.
    pub fn position_at(&self, progress: f64) -> [f64; 3] {
        let progress = progress.clamp(0.0, 1.0);
        match &self.kind {
            EntityKind::Belt { points, .. } => polyline_at(points, progress),
            EntityKind::Turntable {
                center,
                radius,
                turn_angle,
                ..
            } => {
                let angle = progress * turn_angle;
                [
                    center[0] + radius * angle.cos(),
                    center[1] + radius * angle.sin(),
                    center[2],
                ]
            }
        }
    }
}

// ── Polyline helpers ──────────────────────────────────────────────────────────

fn segment_length(a: [f64; 3], b: [f64; 3]) -> f64 {
    let dx = b[0] - a[0];
    let dy = b[1] - a[1];
    let dz = b[2] - a[2];
    (dx * dx + dy * dy + dz * dz).sqrt()
}

fn polyline_length(points: &[[f64; 3]]) -> f64 {
    points.windows(2).map(|w| segment_length(w[0], w[1])).sum()
}

/// Map a normalized arc-length fraction to a point on the polyline.
fn polyline_at(points: &[[f64; 3]], progress: f64) -> [f64; 3] {
    let Some(&first) = points.first() else {
        return [0.0; 3];
    };
    let total = polyline_length(points);
    if total <= 0.0 || progress <= 0.0 {
        return first;
    }
    if progress >= 1.0 {
        return points[points.len() - 1];
    }

    let target = progress * total;
    let mut walked = 0.0;
    for w in points.windows(2) {
        let seg = segment_length(w[0], w[1]);
        if walked + seg >= target {
            let local = if seg > 0.0 { (target - walked) / seg } else { 0.0 };
            return [
                w[0][0] + local * (w[1][0] - w[0][0]),
                w[0][1] + local * (w[1][1] - w[0][1]),
                w[0][2] + local * (w[1][2] - w[0][2]),
            ];
        }
        walked += seg;
    }
    points[points.len() - 1]
}
