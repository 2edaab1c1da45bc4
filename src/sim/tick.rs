//! One simulation step
//!
//! Order within a frame:
//! 1. Rebuild the spatial grid from the caller's bodies
//! 2. Resolve body-body contacts (each unordered pair once)
//! 3. Test live projectiles against bodies and buildings
//! 4. Advance both pools, reaping spent projectiles and particles
//!
//! Bodies are addressed by their index in the slice for the whole frame.

use glam::Vec2;

use super::body::{Body, BodyId, BodyKind, BodySnapshot};
use super::collision::{ContactParams, Obstacle, candidate_pairs, circles_overlap, resolve_contact};
use super::events::{ContactEvent, FrameEvent, HitTarget};
use super::particle::ParticleCategory;
use super::pools::{BurstSpec, PoolManager};
use super::projectile::Faction;
use super::state::{FrameReport, SimContext};
use crate::{SimConfig, clamp_to_rect};

/// Advance the simulation by `dt` frames
pub fn tick<B: Body>(
    ctx: &mut SimContext,
    bodies: &mut [B],
    obstacles: &[Obstacle],
    dt: f32,
) -> FrameReport {
    let clamped = clamp_dt(dt, ctx.config.max_dt);
    if clamped != dt {
        log::debug!("Step {} clamped to {}", dt, clamped);
    }
    let dt = clamped;
    ctx.frame += 1;

    let SimContext {
        config,
        grid,
        pools,
        frame,
    } = ctx;
    let config: &SimConfig = config;

    grid.rebuild(bodies);

    let mut events = Vec::new();
    let mut feedback = Feedback {
        config,
        pools,
        events: &mut events,
    };

    let mut contacts = 0;
    for (i, j) in candidate_pairs(grid, bodies.len()) {
        if resolve_pair(&mut feedback, bodies, i, j) {
            contacts += 1;
        }
    }

    let mut projectile_hits = 0;
    for handle in feedback.pools.projectiles().handles() {
        let Some(shot) = feedback.pools.projectiles().get(handle).map(Shot::from) else {
            continue;
        };
        let Some(target) = find_target(&shot, grid.query_point(shot.pos, shot.size), bodies, obstacles, config)
        else {
            continue;
        };
        feedback.pools.release_projectile(handle);
        projectile_hits += 1;
        feedback.projectile_hit(&shot, target, bodies);
        if shot.explosive {
            let direct = match target {
                Target::Body(index) => Some(index),
                Target::Building(_) => None,
            };
            let nearby = grid.query_point(shot.pos, shot.explosion_radius);
            feedback.explode(&shot, nearby, direct, bodies);
        }
    }

    let active = feedback.pools.update(dt);

    log::trace!(
        "Frame {}: {} contacts, {} hits, {} events, {} projectiles, {} particles",
        frame,
        contacts,
        projectile_hits,
        events.len(),
        active.projectiles.len(),
        active.particles.len()
    );

    FrameReport {
        frame: *frame,
        events,
        contacts,
        projectile_hits,
        active,
    }
}

/// Non-finite or negative steps become 0; long hitches are capped
pub fn clamp_dt(dt: f32, max_dt: f32) -> f32 {
    if !dt.is_finite() || dt < 0.0 {
        0.0
    } else {
        dt.min(max_dt)
    }
}

/// Mutable borrows of two distinct slots, `i < j`
fn pair_mut<T>(slice: &mut [T], i: usize, j: usize) -> (&mut T, &mut T) {
    debug_assert!(i < j);
    let (head, tail) = slice.split_at_mut(j);
    (&mut head[i], &mut tail[0])
}

/// Narrow phase and response for one candidate pair. Returns true if an
/// impulse was applied.
fn resolve_pair<B: Body>(fx: &mut Feedback<'_>, bodies: &mut [B], i: usize, j: usize) -> bool {
    // Earlier pairs may have killed or moved either body
    let radius = fx.config.default_radius;
    let (Some(a), Some(b)) = (
        BodySnapshot::capture(&bodies[i], radius),
        BodySnapshot::capture(&bodies[j], radius),
    ) else {
        return false;
    };

    if !(a.kind.is_solid() && b.kind.is_solid()) {
        fx.check_pickup(&a, &b);
        return false;
    }

    let Some(res) = resolve_contact(&a, &b, &ContactParams::from_config(fx.config)) else {
        return false;
    };

    let world = fx.world_max();
    let (body_a, body_b) = pair_mut(bodies, i, j);
    write_back(body_a, res.velocity_a, res.position_a, world);
    write_back(body_b, res.velocity_b, res.position_b, world);

    fx.events.push(FrameEvent::Contact(ContactEvent {
        a: a.id,
        b: b.id,
        point: res.point,
        relative_speed: res.relative_speed,
        damage: res.damage,
    }));

    fx.burst(BurstSpec::new(res.point, fx.config.contact_sparks, ParticleCategory::Spark));
    let player_involved = a.kind == BodyKind::Player || b.kind == BodyKind::Player;
    if player_involved {
        fx.shake(res.relative_speed * fx.config.camera_shake_scale);
    }
    if res.damage > 0 {
        fx.damage(body_a, res.damage, Some(b.id));
        fx.damage(body_b, res.damage, Some(a.id));
        fx.burst(
            BurstSpec::new(res.point, fx.config.contact_smoke, ParticleCategory::Smoke).with_spread(4.0),
        );
        if player_involved && res.damage > fx.config.heat_damage_threshold {
            fx.heat(fx.config.collision_heat);
        }
    }
    true
}

fn write_back<B: Body>(body: &mut B, velocity: Option<Vec2>, position: Vec2, world: Option<Vec2>) {
    // Static bodies are never moved
    let Some(velocity) = velocity else {
        return;
    };
    body.set_velocity(velocity);
    body.set_position(match world {
        Some(max) => clamp_to_rect(position, Vec2::ZERO, max),
        None => position,
    });
}

/// Copy of the projectile fields the hit test needs
#[derive(Debug, Clone, Copy)]
struct Shot {
    pos: Vec2,
    vel: Vec2,
    size: f32,
    damage: u32,
    faction: Faction,
    owner: Option<BodyId>,
    explosive: bool,
    explosion_radius: f32,
}

impl From<&super::projectile::Projectile> for Shot {
    fn from(p: &super::projectile::Projectile) -> Self {
        Self {
            pos: p.pos,
            vel: p.vel,
            size: p.size,
            damage: p.damage,
            faction: p.faction,
            owner: p.owner,
            explosive: p.explosive,
            explosion_radius: p.explosion_radius,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Target {
    Body(usize),
    Building(usize),
}

/// Nearest hittable body touching the shot, else the first building
/// containing it
fn find_target<B: Body>(
    shot: &Shot,
    candidates: Vec<usize>,
    bodies: &[B],
    obstacles: &[Obstacle],
    config: &SimConfig,
) -> Option<Target> {
    let mut best: Option<(usize, f32)> = None;
    for index in candidates {
        let Some(snap) = BodySnapshot::capture(&bodies[index], config.default_radius) else {
            continue;
        };
        if !shot.faction.can_hit(snap.kind) || shot.owner == Some(snap.id) {
            continue;
        }
        if !circles_overlap(shot.pos, shot.size, snap.position, snap.radius) {
            continue;
        }
        let distance = shot.pos.distance_squared(snap.position);
        if best.is_none_or(|(_, d)| distance < d) {
            best = Some((index, distance));
        }
    }
    if let Some((index, _)) = best {
        return Some(Target::Body(index));
    }

    if shot.faction.hits_buildings() {
        return obstacles.iter().position(|o| o.contains(shot.pos)).map(Target::Building);
    }
    None
}

/// Event, particle and damage sink for one frame
struct Feedback<'a> {
    config: &'a SimConfig,
    pools: &'a mut PoolManager,
    events: &'a mut Vec<FrameEvent>,
}

impl Feedback<'_> {
    fn world_max(&self) -> Option<Vec2> {
        self.config
            .clamp_to_world
            .then(|| Vec2::new(self.config.world_width, self.config.world_height))
    }

    fn burst(&mut self, spec: BurstSpec) {
        if spec.count > 0 {
            self.pools.spawn_burst(spec);
        }
    }

    fn shake(&mut self, intensity: f32) {
        let intensity = intensity.clamp(0.0, 1.0);
        if intensity > 0.0 {
            self.events.push(FrameEvent::CameraShake { intensity });
        }
    }

    fn heat(&mut self, amount: f32) {
        if amount > 0.0 {
            self.events.push(FrameEvent::HeatIncrease { amount });
        }
    }

    /// Apply damage, reporting a kill on the alive-to-dead transition
    fn damage<B: Body>(&mut self, body: &mut B, amount: u32, by: Option<BodyId>) {
        if amount == 0 || !body.is_alive() {
            return;
        }
        body.apply_damage(amount);
        if body.is_alive() {
            return;
        }

        let (id, kind, pos) = (body.id(), body.kind(), body.position());
        self.events.push(FrameEvent::BodyKilled { id, kind, by });
        if !pos.is_finite() {
            return;
        }
        let hit = self.config.hit_particles;
        match kind {
            BodyKind::Player | BodyKind::Pedestrian => {
                self.burst(BurstSpec::new(pos, hit * 2, ParticleCategory::Blood).with_spread(6.0));
            }
            BodyKind::Vehicle | BodyKind::Police => {
                self.burst(BurstSpec::new(pos, hit * 2, ParticleCategory::Explosion).with_spread(10.0));
                self.burst(BurstSpec::new(pos, hit, ParticleCategory::Smoke).with_spread(10.0));
            }
            BodyKind::PowerUp | BodyKind::Obstacle => {}
        }
    }

    /// A power-up overlapping the player is reported, never pushed
    fn check_pickup(&mut self, a: &BodySnapshot, b: &BodySnapshot) {
        let (pickup, player) = match (a.kind, b.kind) {
            (BodyKind::PowerUp, BodyKind::Player) => (a, b),
            (BodyKind::Player, BodyKind::PowerUp) => (b, a),
            _ => return,
        };
        if circles_overlap(pickup.position, pickup.radius, player.position, player.radius) {
            self.events.push(FrameEvent::PickupTouched {
                pickup: pickup.id,
                player: player.id,
            });
        }
    }

    fn projectile_hit<B: Body>(&mut self, shot: &Shot, target: Target, bodies: &mut [B]) {
        let (hit, category) = match target {
            Target::Body(index) => {
                let body = &mut bodies[index];
                let (id, kind) = (body.id(), body.kind());
                self.damage(body, shot.damage, shot.owner);
                if shot.faction == Faction::Player && matches!(kind, BodyKind::Police | BodyKind::Pedestrian) {
                    self.heat(self.config.shooting_heat);
                }
                let category = match kind {
                    BodyKind::Vehicle => ParticleCategory::Spark,
                    _ => ParticleCategory::Blood,
                };
                (HitTarget::Body(id), category)
            }
            Target::Building(index) => (HitTarget::Building(index), ParticleCategory::Spark),
        };

        self.events.push(FrameEvent::ProjectileHit {
            faction: shot.faction,
            owner: shot.owner,
            target: hit,
            point: shot.pos,
            damage: shot.damage,
        });

        // Debris kicks back against the direction of travel
        let kick = -shot.vel.normalize_or_zero() * 1.5;
        let mut spec = BurstSpec::new(shot.pos, self.config.hit_particles, category).with_spread(2.0);
        spec.base_velocity = kick;
        self.burst(spec);
    }

    /// Radial damage with linear falloff; the shooter and the directly hit
    /// body are spared
    fn explode<B: Body>(&mut self, shot: &Shot, nearby: Vec<usize>, direct: Option<usize>, bodies: &mut [B]) {
        let radius = shot.explosion_radius;
        self.events.push(FrameEvent::Explosion {
            point: shot.pos,
            radius,
            owner: shot.owner,
        });
        self.shake(radius / 100.0);

        let count = self.config.explosion_particles;
        self.burst(
            BurstSpec::new(shot.pos, count, ParticleCategory::Explosion).with_spread(radius * 0.25),
        );
        self.burst(BurstSpec::new(shot.pos, count / 2, ParticleCategory::Smoke).with_spread(radius * 0.5));

        if radius <= 0.0 {
            return;
        }
        let mut provoked = false;
        for index in nearby {
            if Some(index) == direct {
                continue;
            }
            let Some(snap) = BodySnapshot::capture(&bodies[index], self.config.default_radius) else {
                continue;
            };
            if !snap.kind.is_solid() || shot.owner == Some(snap.id) {
                continue;
            }
            let reach = radius + snap.radius;
            let distance = shot.pos.distance(snap.position);
            if distance >= reach {
                continue;
            }
            let amount = (shot.damage as f32 * (1.0 - distance / reach)).floor() as u32;
            self.damage(&mut bodies[index], amount, shot.owner);
            if matches!(snap.kind, BodyKind::Police | BodyKind::Pedestrian) {
                provoked = true;
            }
        }
        if provoked && shot.faction == Faction::Player {
            self.heat(self.config.shooting_heat);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::body::Actor;
    use crate::sim::projectile::ProjectileSpawn;

    fn ctx() -> SimContext {
        SimContext::new(SimConfig::default()).unwrap()
    }

    fn car(id: u32, x: f32, y: f32, vx: f32) -> Actor {
        Actor::new(id, BodyKind::Vehicle, Vec2::new(x, y), 10.0).with_velocity(Vec2::new(vx, 0.0))
    }

    #[test]
    fn test_clamp_dt() {
        assert_eq!(clamp_dt(1.0, 3.0), 1.0);
        assert_eq!(clamp_dt(10.0, 3.0), 3.0);
        assert_eq!(clamp_dt(-1.0, 3.0), 0.0);
        assert_eq!(clamp_dt(f32::NAN, 3.0), 0.0);
        assert_eq!(clamp_dt(f32::INFINITY, 3.0), 0.0);
    }

    #[test]
    fn test_head_on_crash() {
        let mut ctx = ctx();
        let mut bodies = vec![car(1, 100.0, 100.0, 5.0), car(2, 115.0, 100.0, -5.0)];
        let report = tick(&mut ctx, &mut bodies, &[], 1.0);

        assert_eq!(report.contacts, 1);
        assert!((bodies[0].vel.unwrap().x + 1.5).abs() < 1e-5);
        assert!((bodies[1].vel.unwrap().x - 1.5).abs() < 1e-5);
        assert!((bodies[0].pos.x - 97.5).abs() < 1e-4);
        assert!((bodies[1].pos.x - 117.5).abs() < 1e-4);
        assert_eq!(bodies[0].health, 80);
        assert_eq!(bodies[1].health, 80);

        let contact = report.events.iter().find_map(|e| match e {
            FrameEvent::Contact(c) => Some(*c),
            _ => None,
        });
        let contact = contact.unwrap();
        assert_eq!((contact.a, contact.b), (BodyId(1), BodyId(2)));
        assert_eq!(contact.damage, 20);
        assert!(ctx.pools().stats().particles.active > 0);
    }

    fn shakes(report: &FrameReport) -> Vec<f32> {
        report
            .events
            .iter()
            .filter_map(|e| match e {
                FrameEvent::CameraShake { intensity } => Some(*intensity),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_grazing_player_contact_shakes_without_heat() {
        let mut ctx = ctx();
        let player = Actor::new(1, BodyKind::Player, Vec2::new(100.0, 100.0), 10.0)
            .with_velocity(Vec2::new(2.0, 0.0));
        let mut bodies = vec![player, car(2, 115.0, 100.0, 0.0)];
        let report = tick(&mut ctx, &mut bodies, &[], 1.0);

        assert_eq!(report.contacts, 1);
        // floor(2 * 2) = 4, below the damage threshold
        assert_eq!(bodies[0].health, 100);
        let shakes = shakes(&report);
        assert_eq!(shakes.len(), 1);
        assert!((shakes[0] - 2.0 * ctx.config().camera_shake_scale).abs() < 1e-6);
        assert_eq!(FrameEvent::total_heat(&report.events), 0.0);
    }

    #[test]
    fn test_hard_player_crash_shakes_and_raises_heat() {
        let mut ctx = ctx();
        let player = Actor::new(1, BodyKind::Player, Vec2::new(100.0, 100.0), 10.0)
            .with_velocity(Vec2::new(15.0, 0.0));
        let mut bodies = vec![player, car(2, 115.0, 100.0, 0.0)];
        let report = tick(&mut ctx, &mut bodies, &[], 1.0);

        // floor(15 * 2) = 30 > 20
        assert_eq!(bodies[0].health, 70);
        assert_eq!(shakes(&report).len(), 1);
        assert_eq!(FrameEvent::total_heat(&report.events), ctx.config().collision_heat);
    }

    #[test]
    fn test_traffic_crash_sends_no_player_feedback() {
        let mut ctx = ctx();
        let mut bodies = vec![car(1, 100.0, 100.0, 15.0), car(2, 115.0, 100.0, 0.0)];
        let report = tick(&mut ctx, &mut bodies, &[], 1.0);

        assert_eq!(report.contacts, 1);
        assert_eq!(bodies[1].health, 70);
        assert!(shakes(&report).is_empty());
        assert_eq!(FrameEvent::total_heat(&report.events), 0.0);
    }

    #[test]
    fn test_static_prop_not_moved() {
        let mut ctx = ctx();
        let post = Actor::new(1, BodyKind::Obstacle, Vec2::new(200.0, 200.0), 5.0).fixed();
        let mut bodies = vec![post, car(2, 212.0, 200.0, -4.0)];
        tick(&mut ctx, &mut bodies, &[], 1.0);
        assert_eq!(bodies[0].pos, Vec2::new(200.0, 200.0));
        assert!((bodies[1].pos.x - 215.0).abs() < 1e-4);
    }

    #[test]
    fn test_correction_clamped_to_world() {
        let mut ctx = ctx();
        let mut bodies = vec![car(1, 2.0, 100.0, 3.0), car(2, 12.0, 100.0, -3.0)];
        tick(&mut ctx, &mut bodies, &[], 1.0);
        assert!(bodies[0].pos.x >= 0.0);
    }

    #[test]
    fn test_dead_body_ignored() {
        let mut ctx = ctx();
        let mut bodies = vec![car(1, 100.0, 100.0, 5.0).with_health(0), car(2, 115.0, 100.0, -5.0)];
        let report = tick(&mut ctx, &mut bodies, &[], 1.0);
        assert_eq!(report.contacts, 0);
        assert_eq!(bodies[1].vel, Some(Vec2::new(-5.0, 0.0)));
    }

    #[test]
    fn test_pickup_reported_without_impulse() {
        let mut ctx = ctx();
        let player = Actor::new(1, BodyKind::Player, Vec2::new(300.0, 300.0), 10.0)
            .with_velocity(Vec2::new(2.0, 0.0));
        let power_up = Actor::new(2, BodyKind::PowerUp, Vec2::new(305.0, 300.0), 6.0).fixed();
        let mut bodies = vec![player, power_up];
        let report = tick(&mut ctx, &mut bodies, &[], 1.0);

        assert_eq!(report.contacts, 0);
        assert_eq!(bodies[0].vel, Some(Vec2::new(2.0, 0.0)));
        assert!(report.events.contains(&FrameEvent::PickupTouched {
            pickup: BodyId(2),
            player: BodyId(1),
        }));
    }

    #[test]
    fn test_police_bullet_hits_only_player() {
        let mut ctx = ctx();
        let cop = Actor::new(1, BodyKind::Police, Vec2::new(100.0, 500.0), 10.0);
        let civ = Actor::new(2, BodyKind::Pedestrian, Vec2::new(110.0, 500.0), 6.0);
        let player = Actor::new(3, BodyKind::Player, Vec2::new(300.0, 500.0), 10.0);
        let mut bodies = vec![cop, civ, player];
        ctx.pools_mut().spawn_projectile(
            ProjectileSpawn::new(Vec2::new(110.0, 500.0), 0.0, 10.0, Faction::Police).with_owner(BodyId(1)),
        );

        let report = tick(&mut ctx, &mut bodies, &[], 1.0);
        assert_eq!(report.projectile_hits, 0);
        assert_eq!(bodies[1].health, 100);
        assert_eq!(report.active.projectiles.len(), 1);
    }

    #[test]
    fn test_player_bullet_hits_and_raises_heat() {
        let mut ctx = ctx();
        let player = Actor::new(1, BodyKind::Player, Vec2::new(100.0, 500.0), 10.0);
        let cop = Actor::new(2, BodyKind::Police, Vec2::new(104.0, 500.0), 10.0);
        let mut bodies = vec![player, cop];
        ctx.pools_mut().spawn_projectile(
            ProjectileSpawn::new(Vec2::new(102.0, 500.0), 0.0, 10.0, Faction::Player)
                .with_damage(25)
                .with_owner(BodyId(1)),
        );

        let report = tick(&mut ctx, &mut bodies, &[], 1.0);
        assert_eq!(report.projectile_hits, 1);
        assert_eq!(bodies[0].health, 100, "never hits the shooter");
        assert_eq!(bodies[1].health, 75);
        assert_eq!(FrameEvent::total_heat(&report.events), ctx.config().shooting_heat);
        assert_eq!(ctx.pools().stats().projectiles.active, 0);
    }

    #[test]
    fn test_building_stops_player_bullet() {
        let mut ctx = ctx();
        let building = Obstacle::new(Vec2::new(500.0, 500.0), Vec2::new(600.0, 600.0));
        ctx.pools_mut()
            .spawn_projectile(ProjectileSpawn::new(Vec2::new(550.0, 550.0), 0.0, 10.0, Faction::Civilian));
        let mut bodies: Vec<Actor> = Vec::new();
        let report = tick(&mut ctx, &mut bodies, &[building], 1.0);
        assert_eq!(report.projectile_hits, 1);
        assert!(report.events.iter().any(|e| matches!(
            e,
            FrameEvent::ProjectileHit {
                target: HitTarget::Building(0),
                ..
            }
        )));
    }

    #[test]
    fn test_explosion_falloff_spares_owner() {
        let mut ctx = ctx();
        let player = Actor::new(1, BodyKind::Player, Vec2::new(1000.0, 1000.0), 10.0);
        let target = Actor::new(2, BodyKind::Vehicle, Vec2::new(1040.0, 1000.0), 10.0).with_health(500);
        let near = Actor::new(3, BodyKind::Vehicle, Vec2::new(1040.0, 1030.0), 10.0).with_health(500);
        let far = Actor::new(4, BodyKind::Vehicle, Vec2::new(1040.0, 1200.0), 10.0).with_health(500);
        let mut bodies = vec![player, target, near, far];
        ctx.pools_mut().spawn_projectile(
            ProjectileSpawn::new(Vec2::new(1035.0, 1000.0), 0.0, 10.0, Faction::Player)
                .with_damage(100)
                .with_owner(BodyId(1))
                .explosive(60.0),
        );

        let report = tick(&mut ctx, &mut bodies, &[], 1.0);
        assert_eq!(bodies[0].health, 100);
        assert_eq!(bodies[1].health, 400, "direct hit only");
        assert!(bodies[2].health < 500 && bodies[2].health > 400);
        assert_eq!(bodies[3].health, 500);
        assert!(report.events.iter().any(|e| matches!(e, FrameEvent::Explosion { .. })));
    }

    #[test]
    fn test_kill_reported_once() {
        let mut ctx = ctx();
        let ped = Actor::new(2, BodyKind::Pedestrian, Vec2::new(200.0, 200.0), 6.0).with_health(5);
        let mut bodies = vec![ped];
        for _ in 0..2 {
            ctx.pools_mut()
                .spawn_projectile(ProjectileSpawn::new(Vec2::new(200.0, 200.0), 0.0, 1.0, Faction::Player));
        }
        let report = tick(&mut ctx, &mut bodies, &[], 1.0);
        let kills = report
            .events
            .iter()
            .filter(|e| matches!(e, FrameEvent::BodyKilled { .. }))
            .count();
        assert_eq!(kills, 1);
        assert_eq!(report.projectile_hits, 1, "second bullet passes the corpse");
    }

    #[test]
    fn test_deterministic_replay() {
        let run = || {
            let mut ctx = ctx();
            let mut bodies: Vec<Actor> = (0..30)
                .map(|i| {
                    let x = 100.0 + (i % 6) as f32 * 14.0;
                    let y = 100.0 + (i / 6) as f32 * 14.0;
                    car(i, x, y, if i % 2 == 0 { 2.0 } else { -2.0 })
                })
                .collect();
            for _ in 0..20 {
                tick(&mut ctx, &mut bodies, &[], 1.0);
                for body in &mut bodies {
                    body.integrate(1.0);
                }
            }
            bodies
        };
        assert_eq!(run(), run());
    }
}
