//! Streetsim - simulation core of an open-world action game
//!
//! Core modules:
//! - `sim`: Spatial grid, object pools and impulse collision (one step per frame)
//! - `settings`: Tunable constants, loadable from JSON
//! - `error`: Configuration errors
//!
//! Rendering, audio, AI and mission logic live outside this crate. They hand
//! the core a snapshot of bodies each frame and consume the events, active
//! projectile/particle sets and statistics it returns.

pub mod error;
pub mod settings;
pub mod sim;

pub use error::ConfigError;
pub use settings::{QualityPreset, SimConfig};

use glam::Vec2;

/// Reference tuning constants (defaults for [`SimConfig`])
///
/// Time is measured in frames normalised to 60 Hz, so one rendered frame at
/// 60 fps advances the simulation by `FRAME_DT = 1.0`.
pub mod consts {
    /// Nominal step length
    pub const FRAME_DT: f32 = 1.0;
    /// Longest step accepted before clamping (a hitch of ~3 frames)
    pub const MAX_DT: f32 = 3.0;

    /// World extent
    pub const WORLD_WIDTH: f32 = 4000.0;
    pub const WORLD_HEIGHT: f32 = 4000.0;

    /// Grid cell size, close to the typical interaction radius
    pub const GRID_CELL_SIZE: f32 = 100.0;
    /// Extra search distance added to a body's radius on neighbour queries
    pub const QUERY_BUFFER: f32 = 50.0;
    /// Radius used when a body reports none
    pub const DEFAULT_RADIUS: f32 = 8.0;
    /// Mass used when a body reports none
    pub const DEFAULT_MASS: f32 = 1.0;

    /// Mostly inelastic
    pub const RESTITUTION: f32 = 0.3;
    /// Damage per unit of relative speed
    pub const DAMAGE_PER_SPEED: f32 = 2.0;
    /// Damage at or below this is ignored (grazing contacts)
    pub const MIN_COLLISION_DAMAGE: u32 = 5;
    /// Player contacts above this damage raise heat
    pub const HEAT_DAMAGE_THRESHOLD: u32 = 20;

    /// Projectile speed floor for lifetime computation
    pub const MIN_PROJECTILE_SPEED: f32 = 0.1;

    /// Pool sizes allocated up front
    pub const PROJECTILE_POOL_SIZE: usize = 100;
    pub const PARTICLE_POOL_SIZE: usize = 500;

    /// Projectile trail length kept for rendering
    pub const TRAIL_LENGTH: usize = 8;
}

/// Unit vector for an angle in radians
#[inline]
pub fn direction(angle: f32) -> Vec2 {
    Vec2::new(angle.cos(), angle.sin())
}

/// Convert polar (r, theta) to cartesian (x, y)
#[inline]
pub fn polar_to_cartesian(r: f32, theta: f32) -> Vec2 {
    direction(theta) * r
}

/// Clamp a point into the axis-aligned rectangle `[min, max]`
#[inline]
pub fn clamp_to_rect(p: Vec2, min: Vec2, max: Vec2) -> Vec2 {
    Vec2::new(p.x.max(min.x).min(max.x), p.y.max(min.y).min(max.y))
}
