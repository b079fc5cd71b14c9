//! Scripted bullet patterns.
//!
//! A pattern fires waves from its owner and waits between waves on the
//! owner's scaled clock, so slowing or pausing enemy time also delays the
//! next wave.

use crate::world::BulletWorld;
use danmaku_common::{polar_offset, DanmakuResult, PatternId};
use danmaku_motion::{
    CartesianPolarBuilder, MovementBuilder, MovementDescriptor, Owner, PolarBuilder, Projectile,
    Prototype, ScaledDelay, SpawnParams, WaitOutcome,
};
use futures::task::noop_waker_ref;
use futures::FutureExt;
use std::sync::Arc;
use std::task::{Context, Poll};
use tracing::{debug, info};

/// Shape of a ring pattern.
#[derive(Debug, Clone, PartialEq)]
pub struct RingSettings {
    /// Bullets per wave
    pub count: u32,
    /// Number of waves
    pub waves: u32,
    /// Scaled seconds between waves
    pub interval: f32,
    /// Initial outward speed
    pub speed: f32,
    /// Distance from the owner at which bullets appear
    pub spawn_radius: f32,
    /// Angle added to every wave, in degrees
    pub spin: f32,
    /// Invisible warm-up before each bullet moves
    pub summon_time: f32,
}

impl Default for RingSettings {
    fn default() -> Self {
        Self {
            count: 24,
            waves: 12,
            interval: 0.5,
            speed: 120.0,
            spawn_radius: 8.0,
            spin: 7.5,
            summon_time: 0.1,
        }
    }
}

/// Two-phase ring bullet: a decelerating outward spiral around the firing
/// point, then a curving dash that keeps the spiral's velocity.
pub fn ring_phases(speed: f32) -> DanmakuResult<Arc<[MovementDescriptor]>> {
    let spiral = PolarBuilder::new(speed, 30.0)
        .with_radial_acceleration(-speed)
        .with_min_radial_speed(speed * 0.25)
        .with_end_time(1.0)
        .build()?;
    let dash = CartesianPolarBuilder::new(0.0, 0.0)
        .with_start_time(1.0)
        .with_speed_from_previous(true)
        .with_tangential_acceleration(speed)
        .with_normal_acceleration(20.0_f32)
        .with_max_speed(speed * 2.0)
        .build()?;
    Ok(Arc::from(vec![spiral, dash]))
}

/// Ring waves fired from an actor.
#[derive(Debug)]
pub struct RingPattern {
    prototype: Prototype<Projectile>,
    owner: Owner,
    id: PatternId,
    settings: RingSettings,
    phases: Arc<[MovementDescriptor]>,
    fired: u32,
    delay: Option<ScaledDelay>,
    cancelled: bool,
}

impl RingPattern {
    /// Create a pattern. Fails if the bullet phases are invalid.
    pub fn new(
        prototype: Prototype<Projectile>,
        owner: Owner,
        settings: RingSettings,
    ) -> DanmakuResult<Self> {
        let phases = ring_phases(settings.speed)?;
        Ok(Self {
            prototype,
            owner,
            id: PatternId::new(),
            settings,
            phases,
            fired: 0,
            delay: None,
            cancelled: false,
        })
    }

    /// Pattern identity, stamped on every bullet it fires.
    #[must_use]
    pub const fn id(&self) -> PatternId {
        self.id
    }

    /// Waves fired so far.
    #[must_use]
    pub const fn waves_fired(&self) -> u32 {
        self.fired
    }

    /// Check if no more waves will be fired.
    #[must_use]
    pub fn is_done(&self) -> bool {
        self.cancelled || self.fired >= self.settings.waves
    }

    /// Stop firing.
    pub fn cancel(&mut self) {
        if let Some(delay) = self.delay.as_mut() {
            delay.cancel();
        }
        self.delay = None;
        self.cancelled = true;
        info!("Pattern {:?} cancelled after {} waves", self.id, self.fired);
    }

    /// Fire the next wave if its wait is over. Returns bullets spawned.
    pub fn update(&mut self, world: &mut BulletWorld) -> usize {
        if self.is_done() {
            return 0;
        }

        if let Some(delay) = self.delay.as_mut() {
            let mut cx = Context::from_waker(noop_waker_ref());
            match delay.poll_unpin(&mut cx) {
                Poll::Pending => return 0,
                Poll::Ready(WaitOutcome::Cancelled) => {
                    self.cancelled = true;
                    return 0;
                },
                Poll::Ready(WaitOutcome::Elapsed) => self.delay = None,
            }
        }

        let spawned = self.fire_wave(world);
        self.fired += 1;
        if !self.is_done() {
            self.delay = Some(
                world
                    .time()
                    .wait_scaled(self.owner.category, self.settings.interval),
            );
        }
        spawned
    }

    fn fire_wave(&self, world: &mut BulletWorld) -> usize {
        let center = world
            .actor_position(self.owner.actor)
            .unwrap_or_else(|| world.playfield().center());
        let count = self.settings.count.max(1);
        let step = 360.0 / count as f32;
        let offset = self.settings.spin * self.fired as f32;

        for i in 0..count {
            let angle = offset + step * i as f32;
            let params = SpawnParams::new(
                center + polar_offset(self.settings.spawn_radius, angle),
                Arc::clone(&self.phases),
            )
            .with_polar_origin(center)
            .with_rotation(angle)
            .with_owner(self.owner)
            .with_pattern(self.id)
            .with_summon_time(self.settings.summon_time);
            world.spawn(&self.prototype, params);
        }
        debug!("Pattern {:?} fired wave {} ({} bullets)", self.id, self.fired, count);
        count as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SimConfig;
    use danmaku_common::{ActorId, PrototypeId};
    use danmaku_motion::TimeCategory;
    use glam::Vec2;

    fn setup(settings: RingSettings) -> (BulletWorld, RingPattern) {
        let mut world = BulletWorld::from_config(&SimConfig::default());
        let boss = ActorId::new();
        world.set_actor_position(boss, Vec2::new(192.0, 300.0));
        let proto = Prototype::new(PrototypeId::new(1), Projectile::new());
        world.register_prototype(&proto);
        let pattern = RingPattern::new(proto, Owner::enemy(boss), settings).unwrap();
        (world, pattern)
    }

    #[test]
    fn test_ring_phases_are_valid() {
        let phases = ring_phases(100.0).unwrap();
        assert_eq!(phases.len(), 2);
        assert!(phases[1].set_speed_to_prev_movement());
        assert!(phases[0].limit_speed());
    }

    #[test]
    fn test_first_wave_fires_immediately() {
        let settings = RingSettings {
            count: 8,
            ..RingSettings::default()
        };
        let (mut world, mut pattern) = setup(settings);
        assert_eq!(pattern.update(&mut world), 8);
        assert_eq!(world.active_count(), 8);
        assert_eq!(pattern.update(&mut world), 0);

        let id = pattern.id();
        assert!(world.projectiles().all(|(_, p)| p.pattern() == Some(id)));
    }

    #[test]
    fn test_waits_on_enemy_clock() {
        let settings = RingSettings {
            count: 4,
            waves: 3,
            interval: 1.0,
            ..RingSettings::default()
        };
        let (mut world, mut pattern) = setup(settings);
        pattern.update(&mut world);

        world.set_time_scale(TimeCategory::Enemy, 0.5);
        world.tick(1.0);
        assert_eq!(pattern.update(&mut world), 0);
        world.tick(1.0);
        assert_eq!(pattern.update(&mut world), 4);
        assert_eq!(pattern.waves_fired(), 2);
    }

    #[test]
    fn test_cancel_stops_waves() {
        let (mut world, mut pattern) = setup(RingSettings::default());
        pattern.update(&mut world);
        pattern.cancel();
        world.tick(5.0);
        assert_eq!(pattern.update(&mut world), 0);
        assert!(pattern.is_done());
        assert_eq!(world.time().pending_waiters(), 0);
    }
}
