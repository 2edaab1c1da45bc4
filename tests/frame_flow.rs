//! Full frames driven through the public API with a caller-owned body type

use glam::Vec2;
use streetsim::SimConfig;
use streetsim::sim::{
    Body, BodyId, BodyKind, BurstSpec, Faction, FrameEvent, HitTarget, Obstacle, ParticleCategory,
    ProjectileSpawn, SimContext, tick,
};

/// Minimal game-side entity with its own storage layout
#[derive(Debug, Clone, PartialEq)]
struct Car {
    id: u32,
    x: f32,
    y: f32,
    vx: f32,
    vy: f32,
    hp: i32,
    police: bool,
}

impl Car {
    fn new(id: u32, x: f32, y: f32, vx: f32, vy: f32) -> Self {
        Self {
            id,
            x,
            y,
            vx,
            vy,
            hp: 100,
            police: false,
        }
    }
}

impl Body for Car {
    fn id(&self) -> BodyId {
        BodyId(self.id)
    }

    fn kind(&self) -> BodyKind {
        if self.police { BodyKind::Police } else { BodyKind::Vehicle }
    }

    fn position(&self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }

    fn set_position(&mut self, position: Vec2) {
        self.x = position.x;
        self.y = position.y;
    }

    fn collision_radius(&self) -> f32 {
        // No explicit radius: the core falls back to its default
        0.0
    }

    fn velocity(&self) -> Option<Vec2> {
        Some(Vec2::new(self.vx, self.vy))
    }

    fn set_velocity(&mut self, velocity: Vec2) {
        self.vx = velocity.x;
        self.vy = velocity.y;
    }

    fn is_alive(&self) -> bool {
        self.hp > 0
    }

    fn apply_damage(&mut self, amount: u32) {
        self.hp -= amount as i32;
    }
}

fn context() -> SimContext {
    SimContext::new(SimConfig::default()).unwrap()
}

#[test]
fn test_default_radius_applies_to_custom_bodies() {
    let mut ctx = context();
    // 12 apart with default radius 8 on both sides
    let mut cars = vec![Car::new(1, 500.0, 500.0, 2.0, 0.0), Car::new(2, 512.0, 500.0, -2.0, 0.0)];
    let report = tick(&mut ctx, &mut cars, &[], 1.0);
    assert_eq!(report.contacts, 1);
    assert!(cars[1].x - cars[0].x >= 16.0 - 1e-4);
    assert!(cars[0].vx < 0.0 && cars[1].vx > 0.0);
}

#[test]
fn test_malformed_body_skipped_without_corrupting_others() {
    let mut ctx = context();
    let mut cars = vec![
        Car::new(1, f32::NAN, 500.0, 1.0, 0.0),
        Car::new(2, 600.0, 600.0, 3.0, 0.0),
        Car::new(3, 610.0, 600.0, -3.0, 0.0),
    ];
    let report = tick(&mut ctx, &mut cars, &[], 1.0);

    assert_eq!(report.contacts, 1);
    assert_eq!(ctx.stats().grid.skipped, 1);
    assert_eq!(ctx.stats().grid.indexed, 2);
    assert!(cars[0].x.is_nan(), "malformed body is left alone");
    assert!(cars[1].x.is_finite() && cars[2].x.is_finite());
}

#[test]
fn test_shot_through_traffic_into_building() {
    let mut ctx = context();
    let building = Obstacle::new(Vec2::new(900.0, 400.0), Vec2::new(1100.0, 600.0));
    let mut cars = vec![Car::new(1, 300.0, 300.0, 0.0, 0.0)];
    ctx.pools_mut().spawn_projectile(
        ProjectileSpawn::new(Vec2::new(800.0, 500.0), 0.0, 12.0, Faction::Player).with_range(1000.0),
    );

    let mut hit_frame = None;
    for frame in 0..30 {
        let report = tick(&mut ctx, &mut cars, &[building], 1.0);
        if report.events.iter().any(|e| {
            matches!(
                e,
                FrameEvent::ProjectileHit {
                    target: HitTarget::Building(0),
                    ..
                }
            )
        }) {
            hit_frame = Some(frame);
            break;
        }
    }
    // 800 -> 900 at 12 per frame
    assert_eq!(hit_frame, Some(9));
    assert_eq!(ctx.stats().pools.projectiles.active, 0);
}

#[test]
fn test_police_shot_ignores_buildings_and_cars() {
    let mut ctx = context();
    let building = Obstacle::new(Vec2::new(900.0, 400.0), Vec2::new(1100.0, 600.0));
    let mut cars = vec![Car::new(1, 950.0, 500.0, 0.0, 0.0)];
    ctx.pools_mut()
        .spawn_projectile(ProjectileSpawn::new(Vec2::new(940.0, 500.0), 0.0, 10.0, Faction::Police));
    let report = tick(&mut ctx, &mut cars, &[building], 1.0);
    assert_eq!(report.projectile_hits, 0);
    assert_eq!(cars[0].hp, 100);
}

#[test]
fn test_pools_recycle_under_sustained_fire() {
    let mut ctx = SimContext::new(SimConfig {
        projectile_pool_size: 8,
        particle_pool_size: 64,
        ..Default::default()
    })
    .unwrap();
    let mut cars: Vec<Car> = Vec::new();

    for frame in 0..200 {
        let angle = frame as f32 * 0.1;
        ctx.pools_mut().spawn_projectile(
            ProjectileSpawn::new(Vec2::new(2000.0, 2000.0), angle, 10.0, Faction::Player).with_range(50.0),
        );
        ctx.pools_mut()
            .spawn_burst(BurstSpec::new(Vec2::new(2000.0, 2000.0), 2, ParticleCategory::Spark));
        tick(&mut ctx, &mut cars, &[], 1.0);
    }

    let stats = ctx.stats();
    // Each shot lives 5 frames, each spark at most 18
    assert!(stats.pools.projectiles.total <= 8);
    assert!(stats.pools.particles.total <= 64);
    assert_eq!(stats.frame, 200);
    assert_eq!(
        stats.pools.projectiles.active + stats.pools.projectiles.free,
        stats.pools.projectiles.total
    );
}

#[test]
fn test_crash_chain_is_deterministic() {
    let run = || {
        let mut ctx = context();
        let mut cars: Vec<Car> = (0..40)
            .map(|i| {
                let x = 1000.0 + (i % 8) as f32 * 15.0;
                let y = 1000.0 + (i / 8) as f32 * 15.0;
                let mut car = Car::new(i, x, y, ((i * 7) % 5) as f32 - 2.0, ((i * 3) % 5) as f32 - 2.0);
                car.police = i % 9 == 0;
                car
            })
            .collect();
        let mut events = 0;
        for _ in 0..60 {
            events += tick(&mut ctx, &mut cars, &[], 1.0).events.len();
            for car in &mut cars {
                car.x += car.vx;
                car.y += car.vy;
            }
        }
        (cars, events)
    };
    assert_eq!(run(), run());
}

#[test]
fn test_reset_returns_everything_to_the_pools() {
    let mut ctx = context();
    ctx.pools_mut()
        .spawn_projectile(ProjectileSpawn::new(Vec2::new(10.0, 10.0), 0.0, 1.0, Faction::Civilian));
    ctx.pools_mut()
        .spawn_burst(BurstSpec::new(Vec2::new(10.0, 10.0), 10, ParticleCategory::Smoke));
    ctx.reset();
    let stats = ctx.stats();
    assert_eq!(stats.frame, 0);
    assert_eq!(stats.pools.projectiles.active, 0);
    assert_eq!(stats.pools.particles.active, 0);
}
