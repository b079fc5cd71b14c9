//! Ready-made single-phase spawns.

use crate::movement::{CartesianMotion, MotionKind, MovementDescriptor, PolarMotion};
use crate::projectile::{Owner, Projectile, SpawnParams};
use danmaku_common::polar_offset;
use glam::Vec2;

impl SpawnParams {
    /// Straight line at constant velocity from `from`.
    #[must_use]
    pub fn linear(from: Vec2, velocity: Vec2) -> Self {
        let phase = MovementDescriptor::from_kind(MotionKind::Cartesian(CartesianMotion {
            velocity,
            ..Default::default()
        }));
        Self::new(from, vec![phase])
    }

    /// Orbit `owner` at `radius`, starting at `start_angle` degrees.
    ///
    /// The orbit center follows the owner's live position.
    #[must_use]
    pub fn orbit(
        owner: Owner,
        center: Vec2,
        radius: f32,
        start_angle: f32,
        radial_speed: f32,
        angular_speed: f32,
    ) -> Self {
        let phase = MovementDescriptor::from_kind(MotionKind::Polar(PolarMotion {
            radial_speed,
            angular_speed,
            ..Default::default()
        }));
        Self::new(center + polar_offset(radius, start_angle), vec![phase])
            .with_polar_origin(center)
            .with_owner(owner)
            .tracking_owner(true)
    }
}

impl Projectile {
    /// Launch in a straight line. See [`SpawnParams::linear`].
    pub fn launch_linear(&mut self, from: Vec2, velocity: Vec2, owner: Option<Owner>) -> bool {
        let mut params = SpawnParams::linear(from, velocity);
        params.owner = owner;
        self.initialize(params)
    }

    /// Start orbiting an actor. See [`SpawnParams::orbit`].
    pub fn orbit_actor(
        &mut self,
        owner: Owner,
        center: Vec2,
        radius: f32,
        start_angle: f32,
        radial_speed: f32,
        angular_speed: f32,
    ) -> bool {
        self.initialize(SpawnParams::orbit(
            owner,
            center,
            radius,
            start_angle,
            radial_speed,
            angular_speed,
        ))
    }
}
