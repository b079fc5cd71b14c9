//! Bullet world: owns the projectile pool and drives it each tick.
//!
//! Projectiles are updated in place while the pool is iterated. Releases
//! (finished or culled projectiles) are collected during the pass and
//! applied once iteration is over, so the pool never changes shape mid-loop.

use crate::config::SimConfig;
use ahash::AHashMap;
use danmaku_common::{ActorId, PrototypeId};
use danmaku_motion::{
    CallbackRegistry, EntityPool, MotionContext, MotionEvent, MotionEventBus, PoolHandle,
    PoolStats, Projectile, Prototype, SpawnParams, TickOutcome, TimeCategory, TimeScaleProvider,
};
use glam::Vec2;
use tracing::{debug, warn};

/// Axis-aligned play area.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Playfield {
    /// Lower-left corner
    pub min: Vec2,
    /// Upper-right corner
    pub max: Vec2,
}

impl Playfield {
    /// Playfield spanning `[0, width] x [0, height]`.
    #[must_use]
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            min: Vec2::ZERO,
            max: Vec2::new(width, height),
        }
    }

    /// Center of the play area.
    #[must_use]
    pub fn center(&self) -> Vec2 {
        (self.min + self.max) * 0.5
    }

    /// Check if `point` lies within the area grown by `margin`.
    #[must_use]
    pub fn contains(&self, point: Vec2, margin: f32) -> bool {
        let min = self.min - Vec2::splat(margin);
        let max = self.max + Vec2::splat(margin);
        point.cmpge(min).all() && point.cmple(max).all()
    }
}

/// Counters for one world tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorldTickStats {
    /// Projectiles ticked
    pub updated: usize,
    /// Projectiles that moved
    pub moved: usize,
    /// Projectiles still summoning
    pub summoning: usize,
    /// Projectiles that ran out of phases
    pub finished: usize,
    /// Projectiles culled for leaving the playfield
    pub culled: usize,
}

/// Headless bullet world.
#[derive(Debug)]
pub struct BulletWorld {
    pool: EntityPool<Projectile>,
    time: TimeScaleProvider,
    actors: AHashMap<ActorId, Vec2>,
    callbacks: CallbackRegistry,
    events: MotionEventBus,
    playfield: Playfield,
    cull_margin: f32,
    prefill_count: usize,
    pending_release: Vec<PoolHandle>,
    ticks: u64,
}

impl Default for BulletWorld {
    fn default() -> Self {
        Self::from_config(&SimConfig::default())
    }
}

impl BulletWorld {
    /// Create a world from configuration.
    #[must_use]
    pub fn from_config(config: &SimConfig) -> Self {
        Self {
            pool: EntityPool::with_default_size(config.default_pool_size),
            time: TimeScaleProvider::with_scales(config.enemy_time_scale, config.player_time_scale),
            actors: AHashMap::new(),
            callbacks: CallbackRegistry::new(),
            events: MotionEventBus::new(config.event_capacity),
            playfield: Playfield::new(config.playfield_width, config.playfield_height),
            cull_margin: config.cull_margin,
            prefill_count: config.prefill_count,
            pending_release: Vec::new(),
            ticks: 0,
        }
    }

    /// Register a bullet prototype with the configured prefill.
    pub fn register_prototype(&mut self, prototype: &Prototype<Projectile>) -> bool {
        self.pool.add_pool(prototype, self.prefill_count)
    }

    /// Acquire a projectile and start it.
    pub fn spawn(&mut self, prototype: &Prototype<Projectile>, params: SpawnParams) -> PoolHandle {
        let handle = self.pool.acquire(prototype);
        let started = self
            .pool
            .get_mut(handle)
            .is_some_and(|projectile| projectile.initialize(params));
        if !started {
            warn!("Spawned {:?} did not start", handle);
        }
        handle
    }

    /// Return a projectile to its pool.
    pub fn despawn(&mut self, handle: PoolHandle) -> bool {
        let released = self.pool.release(handle);
        if released {
            self.events.publish(MotionEvent::Released { handle });
        }
        released
    }

    /// Destroy pooled instances of a prototype.
    pub fn clear_prototype(&mut self, id: PrototypeId, destroy_active: bool) -> usize {
        self.pool.clear_pool(id, destroy_active)
    }

    /// Advance every live projectile by one frame of raw time.
    pub fn tick(&mut self, raw_dt: f32) -> WorldTickStats {
        self.time.advance(raw_dt);
        let ctx = MotionContext::new(self.time.snapshot(), &self.actors, &self.callbacks);
        let mut stats = WorldTickStats::default();

        for (handle, projectile) in self.pool.iter_active_mut() {
            let report = projectile.tick(raw_dt, &ctx);
            self.events.publish_report(handle, &report);
            stats.updated += 1;

            match report.outcome {
                TickOutcome::Moved => stats.moved += 1,
                TickOutcome::Summoning => stats.summoning += 1,
                TickOutcome::Finished => {
                    stats.finished += 1;
                    self.events.publish(MotionEvent::Finished { handle });
                    self.pending_release.push(handle);
                    continue;
                },
                _ => {},
            }

            if projectile.is_visible()
                && !self.playfield.contains(projectile.position(), self.cull_margin)
            {
                stats.culled += 1;
                self.pending_release.push(handle);
            }
        }

        for handle in std::mem::take(&mut self.pending_release) {
            if self.pool.release(handle) {
                self.events.publish(MotionEvent::Released { handle });
            }
        }

        self.ticks += 1;
        if stats.finished + stats.culled > 0 {
            debug!(
                "Tick {}: {} finished, {} culled",
                self.ticks, stats.finished, stats.culled
            );
        }
        stats
    }

    /// Set an actor's position.
    pub fn set_actor_position(&mut self, actor: ActorId, position: Vec2) {
        self.actors.insert(actor, position);
    }

    /// Forget an actor. Projectiles tracking it keep their last origin.
    pub fn remove_actor(&mut self, actor: ActorId) -> bool {
        self.actors.remove(&actor).is_some()
    }

    /// Position of an actor.
    #[must_use]
    pub fn actor_position(&self, actor: ActorId) -> Option<Vec2> {
        self.actors.get(&actor).copied()
    }

    /// Borrow a live projectile.
    #[must_use]
    pub fn projectile(&self, handle: PoolHandle) -> Option<&Projectile> {
        self.pool.get(handle)
    }

    /// Mutably borrow a live projectile (for forced phase jumps).
    pub fn projectile_mut(&mut self, handle: PoolHandle) -> Option<&mut Projectile> {
        self.pool.get_mut(handle)
    }

    /// Iterate live projectiles.
    pub fn projectiles(&self) -> impl Iterator<Item = (PoolHandle, &Projectile)> {
        self.pool.iter_active()
    }

    /// Live projectile count.
    #[must_use]
    pub fn active_count(&self) -> usize {
        self.pool.total_active()
    }

    /// Pool counters.
    #[must_use]
    pub fn pool_stats(&self) -> PoolStats {
        self.pool.stats()
    }

    /// Shared time-scale handle.
    #[must_use]
    pub fn time(&self) -> &TimeScaleProvider {
        &self.time
    }

    /// Set a category's time scale.
    pub fn set_time_scale(&self, category: TimeCategory, factor: f32) {
        self.time.set_scale(category, factor);
    }

    /// Acceleration callbacks used by projectiles.
    pub fn callbacks_mut(&mut self) -> &mut CallbackRegistry {
        &mut self.callbacks
    }

    /// Lifecycle event bus.
    #[must_use]
    pub fn events(&self) -> &MotionEventBus {
        &self.events
    }

    /// Play area.
    #[must_use]
    pub const fn playfield(&self) -> Playfield {
        self.playfield
    }

    /// World ticks run so far.
    #[must_use]
    pub const fn ticks(&self) -> u64 {
        self.ticks
    }
}
