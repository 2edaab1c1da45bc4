//! Deterministic simulation core
//!
//! Given the same config, bodies and inputs, every step produces the same
//! result:
//! - Bodies are addressed by slice index and pairs are visited in index order
//! - Grid queries return sorted, deduplicated indices
//! - The only RNG is the seeded one behind particle bursts, which never feeds
//!   back into body physics
//! - No rendering, audio or platform dependencies

pub mod body;
pub mod collision;
pub mod events;
pub mod grid;
pub mod particle;
pub mod pool;
pub mod pools;
pub mod projectile;
pub mod state;
pub mod tick;

pub use body::{Actor, Body, BodyId, BodyKind, BodySnapshot};
pub use collision::{ContactParams, ContactResolution, Obstacle, circles_overlap, resolve_contact};
pub use events::{ContactEvent, FrameEvent, HitTarget};
pub use grid::{GridStats, SpatialGrid};
pub use particle::{Particle, ParticleCategory, ParticlePool, ParticleSpawn};
pub use pool::{Handle, Pool, PoolStats, Recycle};
pub use pools::{ActiveSet, BurstSpec, PoolManager, PoolManagerStats};
pub use projectile::{Faction, Projectile, ProjectilePool, ProjectileSpawn};
pub use state::{FrameReport, SimContext, SimStats};
pub use tick::{clamp_dt, tick};
