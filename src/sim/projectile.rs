//! Pooled projectiles
//!
//! A projectile flies in a straight line from its muzzle until it has covered
//! its range, outlived its time-to-live, left the world or hit something.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::body::{BodyId, BodyKind};
use super::pool::{Handle, Partition, Pool, PoolStats, Recycle};
use crate::consts::TRAIL_LENGTH;
use crate::direction;

/// Side that fired a projectile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Faction {
    #[default]
    Player,
    /// Armed NPCs (gang members, robbers)
    Civilian,
    Police,
}

impl Faction {
    /// Whether a projectile of this faction may hit a body of `kind`.
    ///
    /// Round props (`BodyKind::Obstacle`) are never hit: bullets pass lamp
    /// posts and hydrants and only stop at rectangular buildings.
    pub fn can_hit(self, kind: BodyKind) -> bool {
        match self {
            Faction::Police => kind == BodyKind::Player,
            Faction::Player | Faction::Civilian => matches!(
                kind,
                BodyKind::Pedestrian | BodyKind::Vehicle | BodyKind::Police
            ),
        }
    }

    /// Whether a projectile of this faction stops at buildings
    pub fn hits_buildings(self) -> bool {
        self != Faction::Police
    }
}

/// Fire request from weapon or AI code
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProjectileSpawn {
    pub origin: Vec2,
    /// Heading in radians
    pub angle: f32,
    /// Units per frame
    pub speed: f32,
    pub damage: u32,
    pub range: f32,
    pub size: f32,
    /// Packed 0xRRGGBB tint
    pub color: u32,
    pub explosive: bool,
    pub explosion_radius: f32,
    pub faction: Faction,
    /// Shooter, never hit by its own projectile
    pub owner: Option<BodyId>,
}

impl ProjectileSpawn {
    pub fn new(origin: Vec2, angle: f32, speed: f32, faction: Faction) -> Self {
        Self {
            origin,
            angle,
            speed,
            damage: 10,
            range: 600.0,
            size: 3.0,
            color: 0xffee58,
            explosive: false,
            explosion_radius: 0.0,
            faction,
            owner: None,
        }
    }

    pub fn with_damage(mut self, damage: u32) -> Self {
        self.damage = damage;
        self
    }

    pub fn with_range(mut self, range: f32) -> Self {
        self.range = range;
        self
    }

    pub fn with_owner(mut self, owner: BodyId) -> Self {
        self.owner = Some(owner);
        self
    }

    pub fn explosive(mut self, radius: f32) -> Self {
        self.explosive = true;
        self.explosion_radius = radius;
        self
    }
}

/// A projectile in flight
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Projectile {
    pub pos: Vec2,
    pub vel: Vec2,
    pub angle: f32,
    pub speed: f32,
    pub damage: u32,
    pub range: f32,
    pub traveled: f32,
    /// Frames left before forced despawn
    pub lifetime: f32,
    pub size: f32,
    pub color: u32,
    pub explosive: bool,
    pub explosion_radius: f32,
    pub faction: Faction,
    pub owner: Option<BodyId>,
    /// Recent positions for rendering (newest first)
    pub trail: Vec<Vec2>,
}

impl Recycle for Projectile {
    /// Spawn request plus the speed floor used for lifetime
    type Spawn = (ProjectileSpawn, f32);

    fn reset(&mut self, (spawn, speed_floor): Self::Spawn) {
        let angle = if spawn.angle.is_finite() { spawn.angle } else { 0.0 };
        let speed = finite_non_negative(spawn.speed);
        let range = finite_non_negative(spawn.range);

        self.pos = if spawn.origin.is_finite() { spawn.origin } else { Vec2::ZERO };
        self.angle = angle;
        self.speed = speed;
        self.vel = direction(angle) * speed;
        self.damage = spawn.damage;
        self.range = range;
        self.traveled = 0.0;
        self.lifetime = range / speed.max(speed_floor.max(f32::EPSILON));
        self.size = finite_non_negative(spawn.size);
        self.color = spawn.color;
        self.explosive = spawn.explosive;
        self.explosion_radius = finite_non_negative(spawn.explosion_radius);
        self.faction = spawn.faction;
        self.owner = spawn.owner;
        self.trail.clear();
    }
}

impl Projectile {
    /// Move by one step; returns false once the projectile is spent
    pub fn advance(&mut self, dt: f32, world_min: Vec2, world_max: Vec2) -> bool {
        self.record_trail();
        let step = self.vel * dt;
        self.pos += step;
        self.traveled += step.length();
        self.lifetime -= dt;

        let in_world = self.pos.x >= world_min.x
            && self.pos.x <= world_max.x
            && self.pos.y >= world_min.y
            && self.pos.y <= world_max.y;
        in_world && self.traveled < self.range && self.lifetime > 0.0
    }

    fn record_trail(&mut self) {
        self.trail.insert(0, self.pos);
        if self.trail.len() > TRAIL_LENGTH {
            self.trail.pop();
        }
    }
}

#[inline]
fn finite_non_negative(x: f32) -> f32 {
    if x.is_finite() { x.max(0.0) } else { 0.0 }
}

/// Projectile pool bounded by the world rectangle
pub struct ProjectilePool {
    pool: Pool<Projectile>,
    speed_floor: f32,
    world_min: Vec2,
    world_max: Vec2,
}

impl ProjectilePool {
    pub fn new(capacity: usize, speed_floor: f32, world_size: Vec2) -> Self {
        Self {
            pool: Pool::with_capacity(capacity),
            speed_floor,
            world_min: Vec2::ZERO,
            world_max: world_size,
        }
    }

    pub fn spawn(&mut self, spawn: ProjectileSpawn) -> Handle<Projectile> {
        self.pool.acquire((spawn, self.speed_floor))
    }

    pub fn release(&mut self, handle: Handle<Projectile>) -> bool {
        self.pool.release(handle)
    }

    pub fn get(&self, handle: Handle<Projectile>) -> Option<&Projectile> {
        self.pool.get(handle)
    }

    pub fn handles(&self) -> Vec<Handle<Projectile>> {
        self.pool.handles()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Handle<Projectile>, &Projectile)> {
        self.pool.iter()
    }

    /// Fly every projectile one step, reaping the spent ones
    pub fn advance(&mut self, dt: f32) -> Partition<Projectile> {
        let (min, max) = (self.world_min, self.world_max);
        self.pool.advance(|p| p.advance(dt, min, max))
    }

    pub fn clear(&mut self) {
        self.pool.release_all();
    }

    pub fn stats(&self) -> PoolStats {
        self.pool.stats()
    }
}
