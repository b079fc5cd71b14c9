//! Headless simulation run.
//!
//! A boss drifts across the playfield firing ring waves while four
//! familiars orbit it. Halfway through, enemy time slows to half speed.

use crate::config::SimConfig;
use crate::patterns::{RingPattern, RingSettings};
use crate::timing::FixedTimestep;
use crate::world::BulletWorld;
use danmaku_common::{ActorId, DanmakuResult, PrototypeId};
use danmaku_motion::{
    MotionEvent, Owner, PoolStats, Projectile, Prototype, SpawnParams, TimeCategory,
};
use glam::Vec2;
use tracing::info;

/// Prototype of ring bullets.
pub const RING_BULLET: PrototypeId = PrototypeId::new(1);
/// Prototype of orbiting familiars.
pub const FAMILIAR: PrototypeId = PrototypeId::new(2);

/// Counters gathered over a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Fixed ticks simulated
    pub ticks: u64,
    /// Projectiles spawned
    pub spawned: usize,
    /// Most projectiles alive at once
    pub peak_active: usize,
    /// Summon windows completed
    pub summons: usize,
    /// Phase changes observed
    pub phase_changes: usize,
    /// Phase loops observed
    pub loops: usize,
    /// Projectiles that ran out of phases
    pub finished: usize,
    /// Projectiles returned to their pool
    pub released: usize,
    /// Pool counters at the end of the run
    pub pool: PoolStats,
}

impl RunSummary {
    fn record(&mut self, event: &MotionEvent) {
        match event {
            MotionEvent::SummonCompleted { .. } => self.summons += 1,
            MotionEvent::PhaseChanged { .. } => self.phase_changes += 1,
            MotionEvent::Looped { .. } => self.loops += 1,
            MotionEvent::Finished { .. } => self.finished += 1,
            MotionEvent::Released { .. } => self.released += 1,
        }
    }
}

fn boss_position(world: &BulletWorld, t: f32) -> Vec2 {
    let field = world.playfield();
    let size = field.max - field.min;
    field.center() + Vec2::new((t * 0.8).sin() * size.x * 0.3, size.y * 0.25)
}

/// Run the scripted scene for `config.run_seconds` of simulated frames.
pub fn run(config: &SimConfig) -> DanmakuResult<RunSummary> {
    let mut world = BulletWorld::from_config(config);
    let mut summary = RunSummary::default();

    let boss = ActorId::new();
    let owner = Owner::enemy(boss);
    let start = boss_position(&world, 0.0);
    world.set_actor_position(boss, start);

    let ring_bullet = Prototype::new(RING_BULLET, Projectile::new());
    let familiar = Prototype::new(FAMILIAR, Projectile::new());
    world.register_prototype(&ring_bullet);
    world.register_prototype(&familiar);

    let mut ring = RingPattern::new(ring_bullet, owner, RingSettings::default())?;
    for i in 0..4 {
        let params = SpawnParams::orbit(owner, start, 40.0, 90.0 * i as f32, 0.0, 120.0);
        world.spawn(&familiar, params);
        summary.spawned += 1;
    }

    let mut timestep = FixedTimestep::new(config.tick_rate)
        .with_max_delta(config.max_frame_delta)
        .with_max_updates(config.max_updates_per_frame);
    let dt = timestep.fixed_dt();
    let frames = (config.run_seconds / config.frame_delta).ceil() as u64;
    let slowdown_at = tick_index(config.run_seconds * 0.5, dt);
    let log_every = u64::from(config.tick_rate);
    let mut sim_time = 0.0_f32;

    info!(
        "Running {} frames at {} Hz ({} s)",
        frames, config.tick_rate, config.run_seconds
    );

    for _ in 0..frames {
        for _ in 0..timestep.accumulate(config.frame_delta) {
            sim_time += dt;
            world.set_actor_position(boss, boss_position(&world, sim_time));
            summary.spawned += ring.update(&mut world);

            world.tick(dt);
            summary.ticks += 1;
            summary.peak_active = summary.peak_active.max(world.active_count());
            for event in world.events().drain() {
                summary.record(&event);
            }

            if summary.ticks == slowdown_at {
                world.set_time_scale(TimeCategory::Enemy, 0.5);
                info!("Enemy time slowed to 0.5 at {:.2}s", sim_time);
            }
            if summary.ticks % log_every == 0 {
                let stats = world.pool_stats();
                info!(
                    "t={:.1}s active={} free={} grown={}",
                    sim_time, stats.active, stats.free, stats.grown
                );
            }
        }
    }

    summary.pool = world.pool_stats();
    info!(
        "Run complete: {} ticks, {} spawned, peak {} active, {} released",
        summary.ticks, summary.spawned, summary.peak_active, summary.released
    );
    Ok(summary)
}

fn tick_index(seconds: f32, dt: f32) -> u64 {
    (seconds / dt).round().max(1.0) as u64
}
