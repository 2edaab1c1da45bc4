//! Pool manager: single entry point for projectiles and particles
//!
//! Owns both specialised pools plus the RNG used for burst cosmetics. The
//! physics path never draws from this RNG.

use std::f32::consts::TAU;

use glam::Vec2;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use serde::Serialize;

use super::particle::{Particle, ParticleCategory, ParticlePool, ParticleSpawn};
use super::pool::{Handle, PoolStats};
use super::projectile::{Projectile, ProjectilePool, ProjectileSpawn};
use crate::settings::{QualityPreset, SimConfig, Span};

/// Request for a burst of particles around a point
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BurstSpec {
    pub origin: Vec2,
    pub count: usize,
    pub category: ParticleCategory,
    /// Jitter radius around `origin`
    pub spread: f32,
    /// Added to every particle's random velocity
    pub base_velocity: Vec2,
    /// Overrides of the category's profile ranges
    pub speed: Option<Span>,
    pub lifetime: Option<Span>,
    pub size: Option<Span>,
    pub color: Option<[f32; 4]>,
}

impl BurstSpec {
    pub fn new(origin: Vec2, count: usize, category: ParticleCategory) -> Self {
        Self {
            origin,
            count,
            category,
            spread: 0.0,
            base_velocity: Vec2::ZERO,
            speed: None,
            lifetime: None,
            size: None,
            color: None,
        }
    }

    pub fn with_spread(mut self, spread: f32) -> Self {
        self.spread = spread;
        self
    }

    pub fn with_speed(mut self, min: f32, max: f32) -> Self {
        self.speed = Some(Span::new(min, max));
        self
    }

    pub fn with_lifetime(mut self, min: f32, max: f32) -> Self {
        self.lifetime = Some(Span::new(min, max));
        self
    }

    pub fn with_size(mut self, min: f32, max: f32) -> Self {
        self.size = Some(Span::new(min, max));
        self
    }
}

/// Live objects after a pool update, for renderers and gameplay
#[derive(Debug, Default)]
pub struct ActiveSet {
    pub projectiles: Vec<Handle<Projectile>>,
    pub particles: Vec<Handle<Particle>>,
    /// Reaped during this update
    pub expired_projectiles: Vec<Handle<Projectile>>,
    pub expired_particles: Vec<Handle<Particle>>,
}

/// Counts of both pools
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PoolManagerStats {
    pub projectiles: PoolStats,
    pub particles: PoolStats,
}

pub struct PoolManager {
    projectiles: ProjectilePool,
    particles: ParticlePool,
    quality: QualityPreset,
    rng: Pcg32,
}

impl PoolManager {
    pub fn new(config: &SimConfig) -> Self {
        Self {
            projectiles: ProjectilePool::new(
                config.projectile_pool_size,
                config.min_projectile_speed,
                Vec2::new(config.world_width, config.world_height),
            ),
            particles: ParticlePool::new(config.particle_pool_size, config.particles.clone()),
            quality: config.quality,
            rng: Pcg32::seed_from_u64(config.seed),
        }
    }

    pub fn projectiles(&self) -> &ProjectilePool {
        &self.projectiles
    }

    pub fn particles(&self) -> &ParticlePool {
        &self.particles
    }

    /// Advance both pools, reaping spent objects
    pub fn update(&mut self, dt: f32) -> ActiveSet {
        let projectiles = self.projectiles.advance(dt);
        let particles = self.particles.advance(dt);
        ActiveSet {
            projectiles: projectiles.alive,
            particles: particles.alive,
            expired_projectiles: projectiles.expired,
            expired_particles: particles.expired,
        }
    }

    pub fn spawn_projectile(&mut self, spawn: ProjectileSpawn) -> Handle<Projectile> {
        self.projectiles.spawn(spawn)
    }

    pub fn release_projectile(&mut self, handle: Handle<Projectile>) -> bool {
        self.projectiles.release(handle)
    }

    pub fn spawn_particle(&mut self, spawn: ParticleSpawn) -> Handle<Particle> {
        self.particles.spawn(spawn)
    }

    pub fn release_particle(&mut self, handle: Handle<Particle>) -> bool {
        self.particles.release(handle)
    }

    /// Spawn a randomised burst; returns how many particles were spawned
    /// after quality scaling
    pub fn spawn_burst(&mut self, spec: BurstSpec) -> usize {
        if !spec.origin.is_finite() {
            return 0;
        }
        let profile = *self.particles.profiles().get(spec.category);
        let speed = spec.speed.unwrap_or(profile.speed);
        let lifetime = spec.lifetime.unwrap_or(profile.lifetime);
        let size = spec.size.unwrap_or(profile.size);
        let base_velocity = if spec.base_velocity.is_finite() {
            spec.base_velocity
        } else {
            Vec2::ZERO
        };

        let count = self.quality.scale_count(spec.count);
        for _ in 0..count {
            let angle = self.rng.random_range(0.0..TAU);
            let dir = Vec2::new(angle.cos(), angle.sin());
            let offset = if spec.spread.is_finite() && spec.spread > 0.0 {
                dir * sample(&mut self.rng, Span::new(0.0, spec.spread))
            } else {
                Vec2::ZERO
            };
            let velocity = dir * sample(&mut self.rng, speed) + base_velocity;
            let life = sample(&mut self.rng, lifetime);
            let particle_size = sample(&mut self.rng, size);

            self.particles.spawn(ParticleSpawn {
                position: spec.origin + offset,
                velocity,
                life,
                size: particle_size,
                category: spec.category,
                color: spec.color,
            });
        }
        count
    }

    pub fn clear(&mut self) {
        self.projectiles.clear();
        self.particles.clear();
    }

    pub fn stats(&self) -> PoolManagerStats {
        PoolManagerStats {
            projectiles: self.projectiles.stats(),
            particles: self.particles.stats(),
        }
    }
}

/// Uniform sample from a span, tolerating inverted or non-finite bounds.
/// Interpolates instead of drawing from `lo..=hi` so spans wider than
/// `f32::MAX` stay finite.
fn sample(rng: &mut Pcg32, span: Span) -> f32 {
    if !span.min.is_finite() || !span.max.is_finite() {
        return 0.0;
    }
    let (lo, hi) = (span.min.min(span.max), span.min.max(span.max));
    if hi <= lo {
        return lo;
    }
    let t: f32 = rng.random_range(0.0..=1.0);
    (lo * (1.0 - t) + hi * t).clamp(lo, hi)
}
