//! Streetsim headless soak run
//!
//! Builds a seeded street scene, drives it for a number of frames with random
//! traffic and gunfire, then prints the core's statistics as JSON.
//!
//! Usage: `streetsim [frames] [seed] [config.json]`

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    env_logger::init();

    let mut args = std::env::args().skip(1);
    let frames: u64 = args.next().and_then(|a| a.parse().ok()).unwrap_or(600);
    let seed: Option<u64> = args.next().and_then(|a| a.parse().ok());
    let config_path = args.next();

    let mut config = match config_path {
        Some(path) => match streetsim::SimConfig::load(&path) {
            Ok(config) => config,
            Err(e) => {
                log::error!("{}", e);
                std::process::exit(1);
            }
        },
        None => streetsim::SimConfig::default(),
    };
    if let Some(seed) = seed {
        config.seed = seed;
    }

    match soak::run(config, frames) {
        Ok(summary) => match serde_json::to_string_pretty(&summary) {
            Ok(json) => println!("{}", json),
            Err(e) => log::error!("Failed to encode stats: {}", e),
        },
        Err(e) => {
            log::error!("{}", e);
            std::process::exit(1);
        }
    }
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // The core is embedded as a library on the web; nothing to run here
}

#[cfg(not(target_arch = "wasm32"))]
mod soak {
    use glam::Vec2;
    use rand::{Rng, SeedableRng};
    use rand_pcg::Pcg32;
    use serde::Serialize;

    use streetsim::consts::FRAME_DT;
    use streetsim::sim::{
        Actor, BodyId, BodyKind, Faction, FrameEvent, Obstacle, ProjectileSpawn, SimContext,
        SimStats, tick,
    };
    use streetsim::{ConfigError, SimConfig, polar_to_cartesian};

    const PLAYER: BodyId = BodyId(0);

    #[derive(Debug, Default, Serialize)]
    pub struct Totals {
        pub contacts: usize,
        pub projectile_hits: usize,
        pub kills: usize,
        pub pickups: usize,
        pub explosions: usize,
        pub heat: f32,
    }

    #[derive(Debug, Serialize)]
    pub struct Summary {
        pub frames: u64,
        pub seed: u64,
        pub totals: Totals,
        pub stats: SimStats,
    }

    pub fn run(config: SimConfig, frames: u64) -> Result<Summary, ConfigError> {
        let seed = config.seed;
        let world = Vec2::new(config.world_width, config.world_height);
        let mut ctx = SimContext::new(config)?;
        let mut rng = Pcg32::seed_from_u64(seed ^ 0x9e37_79b9);

        let mut bodies = populate(&mut rng, world);
        let obstacles = city_blocks(world);
        let mut totals = Totals::default();

        for _ in 0..frames {
            steer(&mut rng, &mut bodies, world);
            fire(&mut rng, &mut ctx, &bodies);

            let report = tick(&mut ctx, &mut bodies, &obstacles, FRAME_DT);
            totals.contacts += report.contacts;
            totals.projectile_hits += report.projectile_hits;
            for event in &report.events {
                match event {
                    FrameEvent::BodyKilled { .. } => totals.kills += 1,
                    FrameEvent::PickupTouched { .. } => totals.pickups += 1,
                    FrameEvent::Explosion { .. } => totals.explosions += 1,
                    FrameEvent::HeatIncrease { amount } => totals.heat += amount,
                    _ => {}
                }
            }

            for body in &mut bodies {
                body.integrate(FRAME_DT);
            }
        }

        let stats = ctx.stats();
        log::info!(
            "Soak done: {} frames, {} contacts, {} hits, {} kills",
            frames,
            totals.contacts,
            totals.projectile_hits,
            totals.kills
        );
        Ok(Summary {
            frames,
            seed,
            totals,
            stats,
        })
    }

    fn populate(rng: &mut Pcg32, world: Vec2) -> Vec<Actor> {
        let mut bodies = Vec::new();
        let center = world * 0.5;
        bodies.push(Actor::new(PLAYER.0, BodyKind::Player, center, 10.0).with_health(1000));

        let mut id = 1;
        for _ in 0..120 {
            let pos = random_point(rng, world);
            bodies.push(Actor::new(id, BodyKind::Vehicle, pos, 14.0).with_mass(4.0));
            id += 1;
        }
        for _ in 0..200 {
            let pos = random_point(rng, world);
            bodies.push(Actor::new(id, BodyKind::Pedestrian, pos, 6.0).with_health(30));
            id += 1;
        }
        for _ in 0..20 {
            let pos = random_point(rng, world);
            bodies.push(Actor::new(id, BodyKind::Police, pos, 12.0).with_mass(3.0));
            id += 1;
        }
        for _ in 0..40 {
            let pos = random_point(rng, world);
            bodies.push(Actor::new(id, BodyKind::Obstacle, pos, 4.0).fixed());
            id += 1;
        }
        for _ in 0..10 {
            let pos = random_point(rng, world);
            bodies.push(Actor::new(id, BodyKind::PowerUp, pos, 6.0).fixed());
            id += 1;
        }
        bodies
    }

    fn random_point(rng: &mut Pcg32, world: Vec2) -> Vec2 {
        Vec2::new(rng.random_range(0.0..world.x), rng.random_range(0.0..world.y))
    }

    /// A regular grid of buildings separated by streets
    fn city_blocks(world: Vec2) -> Vec<Obstacle> {
        let block = 300.0;
        let street = 100.0;
        let mut obstacles = Vec::new();
        let mut y = street;
        while y + block < world.y {
            let mut x = street;
            while x + block < world.x {
                obstacles.push(Obstacle::new(Vec2::new(x, y), Vec2::new(x + block, y + block)));
                x += block + street;
            }
            y += block + street;
        }
        obstacles
    }

    /// Nudge velocities so traffic keeps moving and colliding
    fn steer(rng: &mut Pcg32, bodies: &mut [Actor], world: Vec2) {
        for body in bodies.iter_mut() {
            let Some(vel) = body.vel else {
                continue;
            };
            if rng.random_bool(0.05) {
                let top_speed = match body.kind {
                    BodyKind::Vehicle | BodyKind::Police => 6.0,
                    BodyKind::Player => 8.0,
                    _ => 1.5,
                };
                let heading = rng.random_range(0.0..std::f32::consts::TAU);
                body.vel = Some(polar_to_cartesian(rng.random_range(0.0..top_speed), heading));
            } else if body.pos.x <= 0.0 || body.pos.x >= world.x || body.pos.y <= 0.0 || body.pos.y >= world.y {
                body.vel = Some(-vel);
            }
            body.pos = streetsim::clamp_to_rect(body.pos, Vec2::ZERO, world);
        }
    }

    /// Random gunfire from the player and nearby police
    fn fire(rng: &mut Pcg32, ctx: &mut SimContext, bodies: &[Actor]) {
        let player = &bodies[0];
        if rng.random_bool(0.1) {
            let angle = rng.random_range(0.0..std::f32::consts::TAU);
            let mut shot = ProjectileSpawn::new(player.pos, angle, 12.0, Faction::Player).with_owner(PLAYER);
            if rng.random_bool(0.1) {
                shot = shot.with_damage(60).explosive(80.0);
            }
            ctx.pools_mut().spawn_projectile(shot);
        }

        for cop in bodies.iter().filter(|b| b.kind == BodyKind::Police && b.health > 0) {
            let to_player = player.pos - cop.pos;
            if to_player.length() < 400.0 && rng.random_bool(0.02) {
                let angle = to_player.y.atan2(to_player.x);
                ctx.pools_mut().spawn_projectile(
                    ProjectileSpawn::new(cop.pos, angle, 10.0, Faction::Police)
                        .with_damage(5)
                        .with_owner(cop.id),
                );
            }
        }
    }
}
