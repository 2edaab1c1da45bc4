//! Pooled visual particles
//!
//! The caller names the category (explosion, smoke, ...) when it spawns a
//! particle; the pool looks up that category's physics profile and stamps it
//! onto the particle at reset time.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::pool::{Handle, Partition, Pool, PoolStats, Recycle};
use crate::settings::{ParticleProfile, ParticleProfiles};

/// Visual category chosen at the spawn site
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ParticleCategory {
    Explosion,
    Smoke,
    Blood,
    Spark,
    Energy,
    #[default]
    Generic,
}

impl ParticleCategory {
    pub const ALL: [ParticleCategory; 6] = [
        ParticleCategory::Explosion,
        ParticleCategory::Smoke,
        ParticleCategory::Blood,
        ParticleCategory::Spark,
        ParticleCategory::Energy,
        ParticleCategory::Generic,
    ];

    /// Default RGBA tint
    pub const fn base_color(&self) -> [f32; 4] {
        match self {
            ParticleCategory::Explosion => [1.0, 0.55, 0.1, 1.0], // Orange
            ParticleCategory::Smoke => [0.45, 0.45, 0.45, 0.7],   // Grey
            ParticleCategory::Blood => [0.7, 0.05, 0.05, 1.0],    // Dark red
            ParticleCategory::Spark => [1.0, 0.9, 0.5, 1.0],      // Yellow-white
            ParticleCategory::Energy => [0.4, 0.7, 1.0, 1.0],     // Blue
            ParticleCategory::Generic => [1.0, 1.0, 1.0, 1.0],
        }
    }
}

/// Everything needed to start a particle's life
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParticleSpawn {
    pub position: Vec2,
    pub velocity: Vec2,
    pub life: f32,
    pub size: f32,
    pub category: ParticleCategory,
    /// Overrides the category tint
    pub color: Option<[f32; 4]>,
}

impl ParticleSpawn {
    pub fn new(position: Vec2, velocity: Vec2, life: f32, category: ParticleCategory) -> Self {
        Self {
            position,
            velocity,
            life,
            size: 2.0,
            category,
            color: None,
        }
    }

    pub fn with_size(mut self, size: f32) -> Self {
        self.size = size;
        self
    }
}

/// A particle for visual effects
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Particle {
    pub pos: Vec2,
    pub vel: Vec2,
    /// Remaining lifetime (frames)
    pub life: f32,
    /// Lifetime at spawn, for fade interpolation
    pub max_life: f32,
    pub size: f32,
    pub start_size: f32,
    pub color: [f32; 4],
    pub category: ParticleCategory,
    pub profile: ParticleProfile,
}

impl Recycle for Particle {
    type Spawn = (ParticleSpawn, ParticleProfile);

    fn reset(&mut self, (spawn, profile): Self::Spawn) {
        self.pos = finite_or_zero(spawn.position);
        self.vel = finite_or_zero(spawn.velocity);
        self.life = non_negative(spawn.life);
        self.max_life = self.life;
        self.size = non_negative(spawn.size);
        self.start_size = self.size;
        self.color = spawn.color.unwrap_or(spawn.category.base_color());
        self.category = spawn.category;
        self.profile = profile;
    }
}

impl Particle {
    /// Age by `dt`; returns false once the particle has expired
    pub fn advance(&mut self, dt: f32) -> bool {
        let p = &self.profile;
        self.vel.y += p.gravity * dt;
        self.vel *= (1.0 - p.friction).max(0.0).powf(dt);
        self.pos += self.vel * dt;
        self.size = (self.size + p.growth * dt).max(0.0);
        self.life -= dt;
        self.life > 0.0
    }

    /// Opacity in [0, 1], fading linearly over the lifetime
    pub fn alpha(&self) -> f32 {
        if self.max_life > 0.0 {
            (self.life / self.max_life).clamp(0.0, 1.0)
        } else {
            0.0
        }
    }

    /// Render size; irregular categories wobble around the simulated size
    pub fn current_size(&self) -> f32 {
        if self.profile.irregular {
            self.size * (0.85 + 0.15 * (self.life * 0.7).sin())
        } else {
            self.size
        }
    }

    /// Flickering categories blink out every third frame of remaining life
    pub fn is_visible(&self) -> bool {
        !self.profile.flicker || (self.life as i32) % 3 != 0
    }
}

#[inline]
fn finite_or_zero(v: Vec2) -> Vec2 {
    if v.is_finite() { v } else { Vec2::ZERO }
}

#[inline]
fn non_negative(x: f32) -> f32 {
    if x.is_finite() { x.max(0.0) } else { 0.0 }
}

/// Particle pool that applies category profiles on spawn
pub struct ParticlePool {
    pool: Pool<Particle>,
    profiles: ParticleProfiles,
}

impl ParticlePool {
    pub fn new(capacity: usize, profiles: ParticleProfiles) -> Self {
        Self {
            pool: Pool::with_capacity(capacity),
            profiles,
        }
    }

    pub fn profiles(&self) -> &ParticleProfiles {
        &self.profiles
    }

    pub fn spawn(&mut self, spawn: ParticleSpawn) -> Handle<Particle> {
        let profile = *self.profiles.get(spawn.category);
        self.pool.acquire((spawn, profile))
    }

    pub fn release(&mut self, handle: Handle<Particle>) -> bool {
        self.pool.release(handle)
    }

    pub fn get(&self, handle: Handle<Particle>) -> Option<&Particle> {
        self.pool.get(handle)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Handle<Particle>, &Particle)> {
        self.pool.iter()
    }

    /// Age every particle, reaping the expired ones
    pub fn advance(&mut self, dt: f32) -> Partition<Particle> {
        self.pool.advance(|p| p.advance(dt))
    }

    pub fn clear(&mut self) {
        self.pool.release_all();
    }

    pub fn is_free_slot(&self, index: usize) -> bool {
        self.pool.is_free_slot(index)
    }

    pub fn stats(&self) -> PoolStats {
        self.pool.stats()
    }
}
