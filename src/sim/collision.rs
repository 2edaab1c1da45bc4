//! Narrow-phase tests and impulse response
//!
//! Everything here is a pure function of body snapshots: the caller decides
//! which pairs to test (via the spatial grid) and writes the results back.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::body::{Body, BodySnapshot};
use super::grid::SpatialGrid;
use crate::SimConfig;

/// Axis-aligned building footprint
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Obstacle {
    pub min: Vec2,
    pub max: Vec2,
}

impl Obstacle {
    pub fn new(min: Vec2, max: Vec2) -> Self {
        Self {
            min: min.min(max),
            max: min.max(max),
        }
    }

    pub fn from_center(center: Vec2, size: Vec2) -> Self {
        let half = size.abs() * 0.5;
        Self::new(center - half, center + half)
    }

    #[inline]
    pub fn contains(&self, point: Vec2) -> bool {
        point_in_rect(point, self.min, self.max)
    }
}

/// Circle-circle narrow phase: touching iff distance < sum of radii
#[inline]
pub fn circles_overlap(a: Vec2, a_radius: f32, b: Vec2, b_radius: f32) -> bool {
    let reach = a_radius + b_radius;
    a.distance_squared(b) < reach * reach
}

#[inline]
pub fn point_in_rect(point: Vec2, min: Vec2, max: Vec2) -> bool {
    point.x >= min.x && point.x <= max.x && point.y >= min.y && point.y <= max.y
}

/// Response constants
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContactParams {
    pub restitution: f32,
    pub damage_per_speed: f32,
    pub min_damage: u32,
}

impl ContactParams {
    pub fn from_config(config: &SimConfig) -> Self {
        Self {
            restitution: config.restitution,
            damage_per_speed: config.damage_per_speed,
            min_damage: config.min_collision_damage,
        }
    }
}

impl Default for ContactParams {
    fn default() -> Self {
        Self::from_config(&SimConfig::default())
    }
}

/// Outcome of resolving one contact
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContactResolution {
    /// Unit normal from A to B
    pub normal: Vec2,
    /// Midpoint of the overlap
    pub point: Vec2,
    /// |vB - vA| before the impulse
    pub relative_speed: f32,
    /// Scalar impulse along the normal
    pub impulse: f32,
    /// New velocities (`None` for static bodies)
    pub velocity_a: Option<Vec2>,
    pub velocity_b: Option<Vec2>,
    /// Positions after overlap correction
    pub position_a: Vec2,
    pub position_b: Vec2,
    /// Damage for each body, 0 when at or below the threshold
    pub damage: u32,
}

impl ContactResolution {
    fn is_finite(&self) -> bool {
        self.position_a.is_finite()
            && self.position_b.is_finite()
            && self.velocity_a.is_none_or(|v| v.is_finite())
            && self.velocity_b.is_none_or(|v| v.is_finite())
    }
}

/// Resolve a contact between two bodies.
///
/// Returns `None` when the circles don't overlap, the centres coincide, or
/// the bodies are already separating along the normal.
pub fn resolve_contact(
    a: &BodySnapshot,
    b: &BodySnapshot,
    params: &ContactParams,
) -> Option<ContactResolution> {
    let delta = b.position - a.position;
    let distance = delta.length();
    let reach = a.radius + b.radius;
    if distance >= reach {
        return None;
    }
    // Coincident centres have no usable normal
    if distance <= f32::EPSILON {
        return None;
    }
    let normal = delta / distance;

    let va = a.velocity.unwrap_or(Vec2::ZERO);
    let vb = b.velocity.unwrap_or(Vec2::ZERO);
    let relative = vb - va;
    let closing = relative.dot(normal);
    if closing >= 0.0 {
        return None;
    }

    let impulse = -(1.0 + params.restitution) * closing;
    let total_mass = a.mass + b.mass;
    let velocity_a = a.velocity.map(|v| v - normal * (impulse * b.mass / total_mass));
    let velocity_b = b.velocity.map(|v| v + normal * (impulse * a.mass / total_mass));

    // Static bodies don't move; the other side takes the whole correction
    let overlap = reach - distance;
    let (share_a, share_b) = match (a.is_static(), b.is_static()) {
        (false, false) => (0.5, 0.5),
        (true, false) => (0.0, 1.0),
        (false, true) => (1.0, 0.0),
        (true, true) => (0.0, 0.0),
    };
    let position_a = a.position - normal * (overlap * share_a);
    let position_b = b.position + normal * (overlap * share_b);

    let relative_speed = relative.length();
    let raw_damage = (relative_speed * params.damage_per_speed).floor();
    let damage = if raw_damage > params.min_damage as f32 {
        raw_damage as u32
    } else {
        0
    };

    let resolution = ContactResolution {
        normal,
        point: a.position + normal * (a.radius - overlap * 0.5),
        relative_speed,
        impulse,
        velocity_a,
        velocity_b,
        position_a,
        position_b,
        damage,
    };
    resolution.is_finite().then_some(resolution)
}

/// Broad phase: every unordered pair `(i, j)`, `i < j`, the grid reports as
/// neighbours
pub fn candidate_pairs(grid: &SpatialGrid, body_count: usize) -> Vec<(usize, usize)> {
    let mut pairs = Vec::new();
    for i in 0..body_count {
        if !grid.contains(i) {
            continue;
        }
        pairs.extend(grid.query(i).into_iter().filter(|&j| j > i).map(|j| (i, j)));
    }
    pairs
}

/// Candidate pairs whose circles currently overlap
pub fn touching_pairs<B: Body>(
    grid: &SpatialGrid,
    bodies: &[B],
    default_radius: f32,
) -> Vec<(usize, usize)> {
    candidate_pairs(grid, bodies.len())
        .into_iter()
        .filter(|&(i, j)| {
            match (
                BodySnapshot::capture(&bodies[i], default_radius),
                BodySnapshot::capture(&bodies[j], default_radius),
            ) {
                (Some(a), Some(b)) => circles_overlap(a.position, a.radius, b.position, b.radius),
                _ => false,
            }
        })
        .collect()
}
