//! Fluent, validating builders for movement descriptors.
//!
//! One builder per coordinate mode. Timing, facing and rotation setters are
//! shared through the [`MovementBuilder`] trait. Setting any speed bound
//! turns speed limiting on; `build()` rejects out-of-order bounds.
//!
//! ```
//! use danmaku_motion::builder::{CartesianPolarBuilder, MovementBuilder};
//!
//! let phase = CartesianPolarBuilder::new(120.0, 90.0)
//!     .with_tangential_acceleration(-60.0_f32)
//!     .with_min_speed(20.0)
//!     .with_end_time(2.0)
//!     .build()
//!     .expect("bounds are ordered");
//! assert!(phase.limit_speed());
//! ```

use crate::accel::{ScalarAccel, VectorAccel};
use crate::movement::{
    CartesianMotion, CartesianPolarMotion, MotionKind, MovementDescriptor, PolarMotion,
    RotationSpec,
};
use danmaku_common::{InvalidMovementError, MovementBound};
use glam::Vec2;

/// Settings shared by every mode.
#[derive(Debug, Clone, PartialEq)]
pub struct PhaseSettings {
    start_time: f32,
    end_time: Option<f32>,
    limit_speed: bool,
    set_speed_to_prev_movement: bool,
    face_to_moving_direction: bool,
    rotation: RotationSpec,
}

impl Default for PhaseSettings {
    fn default() -> Self {
        Self {
            start_time: 0.0,
            end_time: None,
            limit_speed: false,
            set_speed_to_prev_movement: false,
            face_to_moving_direction: true,
            rotation: RotationSpec::default(),
        }
    }
}

impl PhaseSettings {
    fn validate(&self) -> Result<(), InvalidMovementError> {
        check_time("start_time", self.start_time)?;
        if let Some(end) = self.end_time {
            check_time("end_time", end)?;
            if end < self.start_time {
                return Err(InvalidMovementError::EndBeforeStart {
                    start: self.start_time,
                    end,
                });
            }
        }
        if self.rotation.limit_speed {
            check_order(
                MovementBound::RotationSpeed,
                self.rotation.min_speed,
                self.rotation.max_speed,
            )?;
        }
        Ok(())
    }

    fn into_descriptor(self, kind: MotionKind) -> MovementDescriptor {
        MovementDescriptor {
            kind,
            start_time: self.start_time,
            end_time: self.end_time,
            limit_speed: self.limit_speed,
            set_speed_to_prev_movement: self.set_speed_to_prev_movement,
            face_to_moving_direction: self.face_to_moving_direction,
            rotation: self.rotation,
            update_count: 0,
        }
    }
}

fn check_time(field: &'static str, value: f32) -> Result<(), InvalidMovementError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(InvalidMovementError::InvalidTime { field, value })
    }
}

fn check_order(bound: MovementBound, min: f32, max: f32) -> Result<(), InvalidMovementError> {
    // NaN bounds never compare as ordered
    if min <= max {
        Ok(())
    } else {
        Err(InvalidMovementError::BoundOrder { bound, min, max })
    }
}

/// Setters shared by all movement builders.
pub trait MovementBuilder: Sized {
    /// Access the shared settings.
    fn settings_mut(&mut self) -> &mut PhaseSettings;

    /// Validate and produce the descriptor.
    fn build(self) -> Result<MovementDescriptor, InvalidMovementError>;

    /// Set the activation-relative start time.
    #[must_use]
    fn with_start_time(mut self, seconds: f32) -> Self {
        self.settings_mut().start_time = seconds;
        self
    }

    /// Set the activation-relative end time.
    #[must_use]
    fn with_end_time(mut self, seconds: f32) -> Self {
        self.settings_mut().end_time = Some(seconds);
        self
    }

    /// Seed this phase from the previous phase's velocity on activation.
    #[must_use]
    fn with_speed_from_previous(mut self, enabled: bool) -> Self {
        self.settings_mut().set_speed_to_prev_movement = enabled;
        self
    }

    /// Whether the heading follows the velocity.
    #[must_use]
    fn facing_movement(mut self, enabled: bool) -> Self {
        self.settings_mut().face_to_moving_direction = enabled;
        self
    }

    /// Independent rotation speed in degrees per second.
    #[must_use]
    fn with_rotation_speed(mut self, degrees_per_second: f32) -> Self {
        self.settings_mut().rotation.speed = degrees_per_second;
        self
    }

    /// Independent rotation acceleration.
    #[must_use]
    fn with_rotation_acceleration(mut self, accel: impl Into<ScalarAccel>) -> Self {
        self.settings_mut().rotation.acceleration = accel.into();
        self
    }

    /// Lower rotation speed bound; enables rotation limiting.
    #[must_use]
    fn with_min_rotation_speed(mut self, min: f32) -> Self {
        let rotation = &mut self.settings_mut().rotation;
        rotation.min_speed = min;
        rotation.limit_speed = true;
        self
    }

    /// Upper rotation speed bound; enables rotation limiting.
    #[must_use]
    fn with_max_rotation_speed(mut self, max: f32) -> Self {
        let rotation = &mut self.settings_mut().rotation;
        rotation.max_speed = max;
        rotation.limit_speed = true;
        self
    }
}

/// Builder for [`MovementMode::Cartesian`](crate::movement::MovementMode::Cartesian) phases.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CartesianBuilder {
    settings: PhaseSettings,
    motion: CartesianMotion,
}

impl CartesianBuilder {
    /// Start a Cartesian phase with an initial velocity.
    #[must_use]
    pub fn new(velocity: Vec2) -> Self {
        Self {
            settings: PhaseSettings::default(),
            motion: CartesianMotion {
                velocity,
                ..CartesianMotion::default()
            },
        }
    }

    /// Set the acceleration (constant, curve or callback).
    #[must_use]
    pub fn with_acceleration(mut self, accel: impl Into<VectorAccel>) -> Self {
        self.motion.acceleration = accel.into();
        self
    }

    /// Per-axis lower velocity bound.
    #[must_use]
    pub fn with_min_velocity(mut self, min: Vec2) -> Self {
        self.motion.min_velocity = min;
        self.settings.limit_speed = true;
        self
    }

    /// Per-axis upper velocity bound.
    #[must_use]
    pub fn with_max_velocity(mut self, max: Vec2) -> Self {
        self.motion.max_velocity = max;
        self.settings.limit_speed = true;
        self
    }

    /// Lower velocity magnitude bound.
    #[must_use]
    pub fn with_min_magnitude(mut self, min: f32) -> Self {
        self.motion.min_magnitude = min;
        self.settings.limit_speed = true;
        self
    }

    /// Upper velocity magnitude bound.
    #[must_use]
    pub fn with_max_magnitude(mut self, max: f32) -> Self {
        self.motion.max_magnitude = max;
        self.settings.limit_speed = true;
        self
    }
}

impl MovementBuilder for CartesianBuilder {
    fn settings_mut(&mut self) -> &mut PhaseSettings {
        &mut self.settings
    }

    fn build(self) -> Result<MovementDescriptor, InvalidMovementError> {
        self.settings.validate()?;
        if self.settings.limit_speed {
            let m = &self.motion;
            check_order(MovementBound::VelocityX, m.min_velocity.x, m.max_velocity.x)?;
            check_order(MovementBound::VelocityY, m.min_velocity.y, m.max_velocity.y)?;
            check_order(MovementBound::Magnitude, m.min_magnitude, m.max_magnitude)?;
        }
        Ok(self
            .settings
            .into_descriptor(MotionKind::Cartesian(self.motion)))
    }
}

/// Builder for cartesian-polar (speed + heading) phases.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CartesianPolarBuilder {
    settings: PhaseSettings,
    motion: CartesianPolarMotion,
}

impl CartesianPolarBuilder {
    /// Start a phase moving at `speed` along `angle` degrees.
    #[must_use]
    pub fn new(speed: f32, angle: f32) -> Self {
        Self {
            settings: PhaseSettings::default(),
            motion: CartesianPolarMotion {
                speed,
                angle,
                ..CartesianPolarMotion::default()
            },
        }
    }

    /// Speed change per second.
    #[must_use]
    pub fn with_tangential_acceleration(mut self, accel: impl Into<ScalarAccel>) -> Self {
        self.motion.tangential_accel = accel.into();
        self
    }

    /// Heading change in degrees per second.
    #[must_use]
    pub fn with_normal_acceleration(mut self, accel: impl Into<ScalarAccel>) -> Self {
        self.motion.normal_accel = accel.into();
        self
    }

    /// Lower speed bound.
    #[must_use]
    pub fn with_min_speed(mut self, min: f32) -> Self {
        self.motion.min_speed = min;
        self.settings.limit_speed = true;
        self
    }

    /// Upper speed bound.
    #[must_use]
    pub fn with_max_speed(mut self, max: f32) -> Self {
        self.motion.max_speed = max;
        self.settings.limit_speed = true;
        self
    }
}

impl MovementBuilder for CartesianPolarBuilder {
    fn settings_mut(&mut self) -> &mut PhaseSettings {
        &mut self.settings
    }

    fn build(self) -> Result<MovementDescriptor, InvalidMovementError> {
        self.settings.validate()?;
        if self.settings.limit_speed {
            check_order(MovementBound::Speed, self.motion.min_speed, self.motion.max_speed)?;
        }
        Ok(self
            .settings
            .into_descriptor(MotionKind::CartesianPolar(self.motion)))
    }
}

/// Builder for polar (radial + angular) phases.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PolarBuilder {
    settings: PhaseSettings,
    motion: PolarMotion,
}

impl PolarBuilder {
    /// Start a polar phase.
    #[must_use]
    pub fn new(radial_speed: f32, angular_speed: f32) -> Self {
        Self {
            settings: PhaseSettings::default(),
            motion: PolarMotion {
                radial_speed,
                angular_speed,
                ..PolarMotion::default()
            },
        }
    }

    /// Radial acceleration.
    #[must_use]
    pub fn with_radial_acceleration(mut self, accel: impl Into<ScalarAccel>) -> Self {
        self.motion.radial_accel = accel.into();
        self
    }

    /// Angular acceleration in degrees per second squared.
    #[must_use]
    pub fn with_angular_acceleration(mut self, accel: impl Into<ScalarAccel>) -> Self {
        self.motion.angular_accel = accel.into();
        self
    }

    /// Lower radial speed bound.
    #[must_use]
    pub fn with_min_radial_speed(mut self, min: f32) -> Self {
        self.motion.min_radial_speed = min;
        self.settings.limit_speed = true;
        self
    }

    /// Upper radial speed bound.
    #[must_use]
    pub fn with_max_radial_speed(mut self, max: f32) -> Self {
        self.motion.max_radial_speed = max;
        self.settings.limit_speed = true;
        self
    }

    /// Lower angular speed bound.
    #[must_use]
    pub fn with_min_angular_speed(mut self, min: f32) -> Self {
        self.motion.min_angular_speed = min;
        self.settings.limit_speed = true;
        self
    }

    /// Upper angular speed bound.
    #[must_use]
    pub fn with_max_angular_speed(mut self, max: f32) -> Self {
        self.motion.max_angular_speed = max;
        self.settings.limit_speed = true;
        self
    }
}

impl MovementBuilder for PolarBuilder {
    fn settings_mut(&mut self) -> &mut PhaseSettings {
        &mut self.settings
    }

    fn build(self) -> Result<MovementDescriptor, InvalidMovementError> {
        self.settings.validate()?;
        if self.settings.limit_speed {
            let m = &self.motion;
            check_order(MovementBound::RadialSpeed, m.min_radial_speed, m.max_radial_speed)?;
            check_order(MovementBound::AngularSpeed, m.min_angular_speed, m.max_angular_speed)?;
        }
        Ok(self.settings.into_descriptor(MotionKind::Polar(self.motion)))
    }
}

impl MovementDescriptor {
    /// Start building a Cartesian phase.
    #[must_use]
    pub fn cartesian(velocity: Vec2) -> CartesianBuilder {
        CartesianBuilder::new(velocity)
    }

    /// Start building a cartesian-polar phase.
    #[must_use]
    pub fn cartesian_polar(speed: f32, angle: f32) -> CartesianPolarBuilder {
        CartesianPolarBuilder::new(speed, angle)
    }

    /// Start building a polar phase.
    #[must_use]
    pub fn polar(radial_speed: f32, angular_speed: f32) -> PolarBuilder {
        PolarBuilder::new(radial_speed, angular_speed)
    }
}
