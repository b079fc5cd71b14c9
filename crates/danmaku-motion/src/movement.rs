//! Movement descriptors: one kinematic phase of a bullet's lifetime.
//!
//! A descriptor is produced by a builder (see [`crate::builder`]) and is
//! never changed afterwards, except for the per-bullet working copies the
//! integrator advances in place.

use crate::accel::{ScalarAccel, VectorAccel};
use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Coordinate convention of a movement phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum MovementMode {
    /// Explicit 2D velocity and acceleration vector.
    #[default]
    Cartesian,
    /// Scalar speed along a heading, with tangential/normal acceleration.
    CartesianPolar,
    /// Radial and angular speed around an origin.
    Polar,
}

/// Cartesian phase state.
#[derive(Debug, Clone, PartialEq)]
pub struct CartesianMotion {
    /// Velocity in units per second.
    pub velocity: Vec2,
    /// Acceleration over phase time.
    pub acceleration: VectorAccel,
    /// Per-axis lower velocity bound.
    pub min_velocity: Vec2,
    /// Per-axis upper velocity bound.
    pub max_velocity: Vec2,
    /// Lower bound of the velocity magnitude.
    pub min_magnitude: f32,
    /// Upper bound of the velocity magnitude.
    pub max_magnitude: f32,
}

impl Default for CartesianMotion {
    fn default() -> Self {
        Self {
            velocity: Vec2::ZERO,
            acceleration: VectorAccel::ZERO,
            min_velocity: Vec2::NEG_INFINITY,
            max_velocity: Vec2::INFINITY,
            min_magnitude: 0.0,
            max_magnitude: f32::INFINITY,
        }
    }
}

/// Cartesian-polar phase state.
#[derive(Debug, Clone, PartialEq)]
pub struct CartesianPolarMotion {
    /// Scalar speed along the heading.
    pub speed: f32,
    /// Heading in degrees.
    pub angle: f32,
    /// Change of speed per second.
    pub tangential_accel: ScalarAccel,
    /// Change of heading in degrees per second.
    pub normal_accel: ScalarAccel,
    /// Lower speed bound.
    pub min_speed: f32,
    /// Upper speed bound.
    pub max_speed: f32,
}

impl Default for CartesianPolarMotion {
    fn default() -> Self {
        Self {
            speed: 0.0,
            angle: 0.0,
            tangential_accel: ScalarAccel::ZERO,
            normal_accel: ScalarAccel::ZERO,
            min_speed: f32::NEG_INFINITY,
            max_speed: f32::INFINITY,
        }
    }
}

/// Polar phase state.
#[derive(Debug, Clone, PartialEq)]
pub struct PolarMotion {
    /// Radius change per second.
    pub radial_speed: f32,
    /// Angle change in degrees per second.
    pub angular_speed: f32,
    /// Radial acceleration.
    pub radial_accel: ScalarAccel,
    /// Angular acceleration in degrees per second squared.
    pub angular_accel: ScalarAccel,
    /// Lower radial speed bound.
    pub min_radial_speed: f32,
    /// Upper radial speed bound.
    pub max_radial_speed: f32,
    /// Lower angular speed bound.
    pub min_angular_speed: f32,
    /// Upper angular speed bound.
    pub max_angular_speed: f32,
}

impl Default for PolarMotion {
    fn default() -> Self {
        Self {
            radial_speed: 0.0,
            angular_speed: 0.0,
            radial_accel: ScalarAccel::ZERO,
            angular_accel: ScalarAccel::ZERO,
            min_radial_speed: f32::NEG_INFINITY,
            max_radial_speed: f32::INFINITY,
            min_angular_speed: f32::NEG_INFINITY,
            max_angular_speed: f32::INFINITY,
        }
    }
}

/// Mode-specific part of a descriptor.
#[derive(Debug, Clone, PartialEq)]
pub enum MotionKind {
    /// See [`MovementMode::Cartesian`].
    Cartesian(CartesianMotion),
    /// See [`MovementMode::CartesianPolar`].
    CartesianPolar(CartesianPolarMotion),
    /// See [`MovementMode::Polar`].
    Polar(PolarMotion),
}

impl MotionKind {
    /// Mode of this kind.
    #[must_use]
    pub const fn mode(&self) -> MovementMode {
        match self {
            Self::Cartesian(_) => MovementMode::Cartesian,
            Self::CartesianPolar(_) => MovementMode::CartesianPolar,
            Self::Polar(_) => MovementMode::Polar,
        }
    }
}

/// Independent rotation used when a bullet does not face its movement.
#[derive(Debug, Clone, PartialEq)]
pub struct RotationSpec {
    /// Degrees per second.
    pub speed: f32,
    /// Change of rotation speed over phase time.
    pub acceleration: ScalarAccel,
    /// Whether the speed bounds apply.
    pub limit_speed: bool,
    /// Lower rotation speed bound.
    pub min_speed: f32,
    /// Upper rotation speed bound.
    pub max_speed: f32,
}

impl Default for RotationSpec {
    fn default() -> Self {
        Self {
            speed: 0.0,
            acceleration: ScalarAccel::ZERO,
            limit_speed: false,
            min_speed: f32::NEG_INFINITY,
            max_speed: f32::INFINITY,
        }
    }
}

/// One phase of motion.
#[derive(Debug, Clone, PartialEq)]
pub struct MovementDescriptor {
    pub(crate) kind: MotionKind,
    pub(crate) start_time: f32,
    pub(crate) end_time: Option<f32>,
    pub(crate) limit_speed: bool,
    pub(crate) set_speed_to_prev_movement: bool,
    pub(crate) face_to_moving_direction: bool,
    pub(crate) rotation: RotationSpec,
    pub(crate) update_count: u64,
}

impl Default for MovementDescriptor {
    fn default() -> Self {
        Self::none()
    }
}

impl MovementDescriptor {
    /// The "no movement" placeholder: Cartesian, all zero, never ends.
    #[must_use]
    pub fn none() -> Self {
        Self {
            kind: MotionKind::Cartesian(CartesianMotion::default()),
            start_time: 0.0,
            end_time: None,
            limit_speed: false,
            set_speed_to_prev_movement: false,
            face_to_moving_direction: true,
            rotation: RotationSpec::default(),
            update_count: 0,
        }
    }

    /// Unbounded phase of `kind` starting at activation.
    pub(crate) fn from_kind(kind: MotionKind) -> Self {
        Self {
            kind,
            ..Self::none()
        }
    }

    /// Coordinate mode.
    #[must_use]
    pub const fn mode(&self) -> MovementMode {
        self.kind.mode()
    }

    /// Mode-specific state.
    #[must_use]
    pub const fn kind(&self) -> &MotionKind {
        &self.kind
    }

    /// Cartesian state, if this is a Cartesian phase.
    #[must_use]
    pub const fn as_cartesian(&self) -> Option<&CartesianMotion> {
        match &self.kind {
            MotionKind::Cartesian(c) => Some(c),
            _ => None,
        }
    }

    /// Cartesian-polar state, if this is a Cartesian-polar phase.
    #[must_use]
    pub const fn as_cartesian_polar(&self) -> Option<&CartesianPolarMotion> {
        match &self.kind {
            MotionKind::CartesianPolar(c) => Some(c),
            _ => None,
        }
    }

    /// Polar state, if this is a polar phase.
    #[must_use]
    pub const fn as_polar(&self) -> Option<&PolarMotion> {
        match &self.kind {
            MotionKind::Polar(p) => Some(p),
            _ => None,
        }
    }

    /// Seconds after activation at which this phase becomes active.
    #[must_use]
    pub const fn start_time(&self) -> f32 {
        self.start_time
    }

    /// Seconds after activation at which this phase stops, if any.
    #[must_use]
    pub const fn end_time(&self) -> Option<f32> {
        self.end_time
    }

    /// Check if the phase has an end time.
    #[must_use]
    pub const fn has_end_time(&self) -> bool {
        self.end_time.is_some()
    }

    /// Whether speed clamps apply.
    #[must_use]
    pub const fn limit_speed(&self) -> bool {
        self.limit_speed
    }

    /// Whether activation overwrites the initial velocity with the previous phase's.
    #[must_use]
    pub const fn set_speed_to_prev_movement(&self) -> bool {
        self.set_speed_to_prev_movement
    }

    /// Whether the heading follows the velocity.
    #[must_use]
    pub const fn face_to_moving_direction(&self) -> bool {
        self.face_to_moving_direction
    }

    /// Independent rotation settings.
    #[must_use]
    pub const fn rotation(&self) -> &RotationSpec {
        &self.rotation
    }

    /// Ticks this phase has been active for.
    #[must_use]
    pub const fn update_count(&self) -> u64 {
        self.update_count
    }

    /// Check if `elapsed` is past this phase's end.
    #[must_use]
    pub fn has_ended_at(&self, elapsed: f32) -> bool {
        self.end_time.is_some_and(|end| elapsed >= end)
    }

    /// Restore pristine values, keeping the diagnostic update counter.
    pub(crate) fn reset_from(&mut self, pristine: &Self) {
        let update_count = self.update_count;
        self.clone_from(pristine);
        self.update_count = update_count;
    }
}
