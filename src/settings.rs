//! Simulation tunables
//!
//! Every constant the core consults lives in [`SimConfig`] so it can be tuned
//! from a JSON file instead of being baked in. Missing fields fall back to
//! the reference values in [`crate::consts`].

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::consts::*;
use crate::error::ConfigError;
use crate::sim::particle::ParticleCategory;

/// Quality preset levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum QualityPreset {
    Low,
    #[default]
    Medium,
    High,
}

impl QualityPreset {
    pub fn as_str(&self) -> &'static str {
        match self {
            QualityPreset::Low => "Low",
            QualityPreset::Medium => "Medium",
            QualityPreset::High => "High",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "low" => Some(QualityPreset::Low),
            "medium" | "med" => Some(QualityPreset::Medium),
            "high" => Some(QualityPreset::High),
            _ => None,
        }
    }

    /// Fraction of requested burst particles actually spawned
    pub fn burst_density(&self) -> f32 {
        match self {
            QualityPreset::Low => 0.25,
            QualityPreset::Medium => 0.6,
            QualityPreset::High => 1.0,
        }
    }

    /// Scale a requested particle count, keeping at least one particle for
    /// any non-empty request
    pub fn scale_count(&self, requested: usize) -> usize {
        if requested == 0 {
            return 0;
        }
        ((requested as f32 * self.burst_density()).round() as usize).max(1)
    }
}

/// Inclusive `[min, max]` range sampled by burst spawns
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Span {
    pub min: f32,
    pub max: f32,
}

impl Span {
    pub const fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }

    fn validate(&self, field: &'static str) -> Result<(), ConfigError> {
        if !self.min.is_finite() || self.min < 0.0 {
            return Err(ConfigError::Negative { field, value: self.min });
        }
        if !self.max.is_finite() || self.max < self.min {
            return Err(ConfigError::InvertedRange {
                field,
                min: self.min,
                max: self.max,
            });
        }
        Ok(())
    }
}

/// Physical constants and burst defaults for one particle category
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ParticleProfile {
    /// Vertical acceleration per frame² (negative rises)
    pub gravity: f32,
    /// Fraction of velocity lost per frame
    pub friction: f32,
    /// Size change per frame
    pub growth: f32,
    /// Renderer should flicker this particle
    pub flicker: bool,
    /// Renderer should draw an irregular blob instead of a disc
    pub irregular: bool,
    pub speed: Span,
    pub lifetime: Span,
    pub size: Span,
}

/// Profile table keyed by [`ParticleCategory`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParticleProfiles {
    pub explosion: ParticleProfile,
    pub smoke: ParticleProfile,
    pub blood: ParticleProfile,
    pub spark: ParticleProfile,
    pub energy: ParticleProfile,
    pub generic: ParticleProfile,
}

impl Default for ParticleProfiles {
    fn default() -> Self {
        Self {
            explosion: ParticleProfile {
                gravity: 0.0,
                friction: 0.08,
                growth: -0.05,
                flicker: false,
                irregular: false,
                speed: Span::new(2.0, 6.0),
                lifetime: Span::new(20.0, 40.0),
                size: Span::new(3.0, 7.0),
            },
            smoke: ParticleProfile {
                gravity: -0.02,
                friction: 0.02,
                growth: 0.15,
                flicker: false,
                irregular: false,
                speed: Span::new(0.5, 1.5),
                lifetime: Span::new(40.0, 80.0),
                size: Span::new(4.0, 8.0),
            },
            blood: ParticleProfile {
                gravity: 0.15,
                friction: 0.05,
                growth: 0.0,
                flicker: false,
                irregular: true,
                speed: Span::new(1.0, 3.0),
                lifetime: Span::new(20.0, 40.0),
                size: Span::new(2.0, 4.0),
            },
            spark: ParticleProfile {
                gravity: 0.05,
                friction: 0.12,
                growth: -0.03,
                flicker: true,
                irregular: false,
                speed: Span::new(3.0, 7.0),
                lifetime: Span::new(8.0, 18.0),
                size: Span::new(1.0, 2.5),
            },
            energy: ParticleProfile {
                gravity: 0.0,
                friction: 0.04,
                growth: 0.02,
                flicker: true,
                irregular: false,
                speed: Span::new(1.0, 3.0),
                lifetime: Span::new(15.0, 30.0),
                size: Span::new(2.0, 4.0),
            },
            generic: ParticleProfile {
                gravity: 0.05,
                friction: 0.03,
                growth: 0.0,
                flicker: false,
                irregular: false,
                speed: Span::new(1.0, 4.0),
                lifetime: Span::new(20.0, 40.0),
                size: Span::new(2.0, 4.0),
            },
        }
    }
}

impl ParticleProfiles {
    pub fn get(&self, category: ParticleCategory) -> &ParticleProfile {
        match category {
            ParticleCategory::Explosion => &self.explosion,
            ParticleCategory::Smoke => &self.smoke,
            ParticleCategory::Blood => &self.blood,
            ParticleCategory::Spark => &self.spark,
            ParticleCategory::Energy => &self.energy,
            ParticleCategory::Generic => &self.generic,
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        for category in ParticleCategory::ALL {
            let p = self.get(category);
            finite("particles.gravity", p.gravity)?;
            finite("particles.growth", p.growth)?;
            if !p.friction.is_finite() || !(0.0..=1.0).contains(&p.friction) {
                return Err(ConfigError::OutOfRange {
                    field: "particles.friction",
                    value: p.friction,
                    min: 0.0,
                    max: 1.0,
                });
            }
            p.speed.validate("particles.speed")?;
            p.lifetime.validate("particles.lifetime")?;
            p.size.validate("particles.size")?;
        }
        Ok(())
    }
}

/// All simulation tunables
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    // === World / grid ===
    pub world_width: f32,
    pub world_height: f32,
    pub cell_size: f32,
    pub query_buffer: f32,
    pub default_radius: f32,
    /// Clamp bodies back into the world after overlap correction
    pub clamp_to_world: bool,

    // === Collision response ===
    pub restitution: f32,
    pub damage_per_speed: f32,
    pub min_collision_damage: u32,
    pub heat_damage_threshold: u32,
    /// Heat requested when the player crashes hard
    pub collision_heat: f32,
    /// Heat requested when a player projectile hits police or a pedestrian
    pub shooting_heat: f32,
    /// Camera shake intensity per unit of relative speed (capped at 1.0)
    pub camera_shake_scale: f32,

    // === Feedback bursts ===
    pub contact_sparks: usize,
    pub contact_smoke: usize,
    pub hit_particles: usize,
    pub explosion_particles: usize,

    // === Pools ===
    pub projectile_pool_size: usize,
    pub particle_pool_size: usize,
    pub min_projectile_speed: f32,

    // === Stepping ===
    pub max_dt: f32,
    /// Seed for cosmetic particle randomness
    pub seed: u64,

    pub quality: QualityPreset,
    pub particles: ParticleProfiles,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            world_width: WORLD_WIDTH,
            world_height: WORLD_HEIGHT,
            cell_size: GRID_CELL_SIZE,
            query_buffer: QUERY_BUFFER,
            default_radius: DEFAULT_RADIUS,
            clamp_to_world: true,

            restitution: RESTITUTION,
            damage_per_speed: DAMAGE_PER_SPEED,
            min_collision_damage: MIN_COLLISION_DAMAGE,
            heat_damage_threshold: HEAT_DAMAGE_THRESHOLD,
            collision_heat: 5.0,
            shooting_heat: 10.0,
            camera_shake_scale: 0.05,

            contact_sparks: 8,
            contact_smoke: 4,
            hit_particles: 6,
            explosion_particles: 30,

            projectile_pool_size: PROJECTILE_POOL_SIZE,
            particle_pool_size: PARTICLE_POOL_SIZE,
            min_projectile_speed: MIN_PROJECTILE_SPEED,

            max_dt: MAX_DT,
            seed: 0x5eed,

            quality: QualityPreset::default(),
            particles: ParticleProfiles::default(),
        }
    }
}

impl SimConfig {
    /// Parse and validate a JSON config; absent fields take defaults
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a JSON config file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)?;
        let config = Self::from_json(&json)?;
        log::info!("Loaded sim config from {}", path.display());
        Ok(config)
    }

    pub fn to_json(&self) -> String {
        // Plain data with string keys only; serialization cannot fail
        serde_json::to_string_pretty(self).unwrap_or_default()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        positive("world_width", self.world_width)?;
        positive("world_height", self.world_height)?;
        positive("cell_size", self.cell_size)?;
        positive("default_radius", self.default_radius)?;
        positive("min_projectile_speed", self.min_projectile_speed)?;
        positive("max_dt", self.max_dt)?;
        non_negative("query_buffer", self.query_buffer)?;
        non_negative("damage_per_speed", self.damage_per_speed)?;
        non_negative("collision_heat", self.collision_heat)?;
        non_negative("shooting_heat", self.shooting_heat)?;
        non_negative("camera_shake_scale", self.camera_shake_scale)?;
        if !self.restitution.is_finite() || !(0.0..=1.0).contains(&self.restitution) {
            return Err(ConfigError::Restitution(self.restitution));
        }
        self.particles.validate()
    }
}

fn finite(field: &'static str, value: f32) -> Result<(), ConfigError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(ConfigError::NotFinite { field, value })
    }
}

fn positive(field: &'static str, value: f32) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::NotPositive { field, value })
    }
}

fn non_negative(field: &'static str, value: f32) -> Result<(), ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::Negative { field, value })
    }
}
