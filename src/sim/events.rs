//! Per-frame events emitted by the collision engine
//!
//! Gameplay, audio and UI consume these after each [`tick`](super::tick).
//! The core only reports; it never decides score, wanted level or pickups.

use glam::Vec2;
use serde::Serialize;

use super::body::{BodyId, BodyKind};
use super::projectile::Faction;

/// Body-body contact that produced an impulse
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ContactEvent {
    pub a: BodyId,
    pub b: BodyId,
    pub point: Vec2,
    pub relative_speed: f32,
    /// Damage dealt to each side (0 below the threshold)
    pub damage: u32,
}

/// What a projectile struck
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum HitTarget {
    Body(BodyId),
    /// Index into the obstacle slice passed to `tick`
    Building(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum FrameEvent {
    Contact(ContactEvent),
    ProjectileHit {
        faction: Faction,
        owner: Option<BodyId>,
        target: HitTarget,
        point: Vec2,
        damage: u32,
    },
    Explosion {
        point: Vec2,
        radius: f32,
        owner: Option<BodyId>,
    },
    /// Normalised shake strength in [0, 1]
    CameraShake { intensity: f32 },
    /// Wanted-level heat raised by the player's actions
    HeatIncrease { amount: f32 },
    PickupTouched { pickup: BodyId, player: BodyId },
    /// A body's health reached zero this frame
    BodyKilled { id: BodyId, kind: BodyKind, by: Option<BodyId> },
}

impl FrameEvent {
    /// Sum of heat raised in a batch of events
    pub fn total_heat(events: &[FrameEvent]) -> f32 {
        events
            .iter()
            .map(|e| match e {
                FrameEvent::HeatIncrease { amount } => *amount,
                _ => 0.0,
            })
            .sum()
    }
}
