//! Simulated body contract
//!
//! Vehicles, pedestrians, police, the player and power-ups all reach the core
//! through [`Body`]. The core never inspects concrete types; it reads a
//! [`BodySnapshot`] per step and writes velocity, position and damage back
//! through the trait.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::consts::DEFAULT_MASS;

/// Game-assigned identity of a body
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BodyId(pub u32);

/// Gameplay category of a body
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BodyKind {
    Player,
    Vehicle,
    Pedestrian,
    Police,
    PowerUp,
    /// Round static prop (lamp post, hydrant); buildings are [`Obstacle`]s
    Obstacle,
}

impl BodyKind {
    /// Takes part in impulse resolution
    pub fn is_solid(self) -> bool {
        !matches!(self, BodyKind::PowerUp)
    }
}

/// Capability every simulated body exposes to the core
pub trait Body {
    fn id(&self) -> BodyId;
    fn kind(&self) -> BodyKind;
    fn position(&self) -> Vec2;
    fn set_position(&mut self, position: Vec2);
    /// Radius (or size surrogate). Non-finite or non-positive values are
    /// replaced by the configured default radius.
    fn collision_radius(&self) -> f32;
    /// `None` for static bodies
    fn velocity(&self) -> Option<Vec2> {
        None
    }
    fn set_velocity(&mut self, _velocity: Vec2) {}
    fn mass(&self) -> f32 {
        DEFAULT_MASS
    }
    fn is_alive(&self) -> bool;
    fn apply_damage(&mut self, _amount: u32) {}
}

/// Sanitised per-step copy of a body's physical state
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BodySnapshot {
    pub id: BodyId,
    pub kind: BodyKind,
    pub position: Vec2,
    pub radius: f32,
    pub velocity: Option<Vec2>,
    pub mass: f32,
}

impl BodySnapshot {
    /// Read a live, well-formed body. Returns `None` for dead bodies and for
    /// non-finite position or velocity so they stay out of both phases.
    pub fn capture<B: Body + ?Sized>(body: &B, default_radius: f32) -> Option<Self> {
        if !body.is_alive() {
            return None;
        }
        let position = body.position();
        if !position.is_finite() {
            return None;
        }
        let velocity = body.velocity();
        if velocity.is_some_and(|v| !v.is_finite()) {
            return None;
        }
        Some(Self {
            id: body.id(),
            kind: body.kind(),
            position,
            radius: sanitize_radius(body.collision_radius(), default_radius),
            velocity,
            mass: sanitize_mass(body.mass()),
        })
    }

    pub fn is_static(&self) -> bool {
        self.velocity.is_none()
    }
}

#[inline]
pub fn sanitize_radius(radius: f32, default_radius: f32) -> f32 {
    if radius.is_finite() && radius > 0.0 {
        radius
    } else {
        default_radius
    }
}

#[inline]
pub fn sanitize_mass(mass: f32) -> f32 {
    if mass.is_finite() && mass > 0.0 {
        mass
    } else {
        DEFAULT_MASS
    }
}

/// Plain-data body for callers that don't want their own [`Body`] impl
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Actor {
    pub id: BodyId,
    pub kind: BodyKind,
    pub pos: Vec2,
    /// `None` for static actors
    pub vel: Option<Vec2>,
    pub radius: f32,
    pub mass: f32,
    pub health: u32,
    /// Total damage taken (for scoring / debug)
    #[serde(default)]
    pub damage_taken: u32,
}

impl Actor {
    pub fn new(id: u32, kind: BodyKind, pos: Vec2, radius: f32) -> Self {
        Self {
            id: BodyId(id),
            kind,
            pos,
            vel: Some(Vec2::ZERO),
            radius,
            mass: DEFAULT_MASS,
            health: 100,
            damage_taken: 0,
        }
    }

    pub fn with_velocity(mut self, vel: Vec2) -> Self {
        self.vel = Some(vel);
        self
    }

    pub fn with_mass(mut self, mass: f32) -> Self {
        self.mass = mass;
        self
    }

    pub fn with_health(mut self, health: u32) -> Self {
        self.health = health;
        self
    }

    pub fn fixed(mut self) -> Self {
        self.vel = None;
        self
    }

    /// Integrate position (gameplay-side movement, not done by the core)
    pub fn integrate(&mut self, dt: f32) {
        if let Some(vel) = self.vel {
            self.pos += vel * dt;
        }
    }
}

impl Body for Actor {
    fn id(&self) -> BodyId {
        self.id
    }

    fn kind(&self) -> BodyKind {
        self.kind
    }

    fn position(&self) -> Vec2 {
        self.pos
    }

    fn set_position(&mut self, position: Vec2) {
        self.pos = position;
    }

    fn collision_radius(&self) -> f32 {
        self.radius
    }

    fn velocity(&self) -> Option<Vec2> {
        self.vel
    }

    fn set_velocity(&mut self, velocity: Vec2) {
        if self.vel.is_some() {
            self.vel = Some(velocity);
        }
    }

    fn mass(&self) -> f32 {
        self.mass
    }

    fn is_alive(&self) -> bool {
        self.health > 0
    }

    fn apply_damage(&mut self, amount: u32) {
        self.health = self.health.saturating_sub(amount);
        self.damage_taken = self.damage_taken.saturating_add(amount);
    }
}
