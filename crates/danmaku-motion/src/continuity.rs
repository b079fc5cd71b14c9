//! Velocity continuity across phase boundaries.
//!
//! When a phase asks to inherit the previous phase's speed, the previous
//! phase's instantaneous velocity is converted to Cartesian form and then
//! re-projected into the next phase's representation, so neither speed nor
//! direction jumps at the boundary.

use crate::movement::{MotionKind, MovementDescriptor, MovementMode};
use danmaku_common::{direction_degrees, tangent_from_degrees, unit_from_degrees};
use glam::Vec2;

/// Radius below which angular speed is undefined.
const MIN_POLAR_RADIUS: f32 = 1e-4;

/// Polar frame of a bullet at the moment of the switch.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PhaseFrame {
    /// Distance from the polar origin.
    pub polar_radius: f32,
    /// Angle around the polar origin in degrees.
    pub polar_angle: f32,
}

/// Initial values for the next phase.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Seed {
    /// New Cartesian velocity.
    Cartesian {
        /// Velocity vector.
        velocity: Vec2,
    },
    /// New speed and heading.
    CartesianPolar {
        /// Scalar speed.
        speed: f32,
        /// Heading, `None` when the velocity had no direction.
        angle: Option<f32>,
    },
    /// New radial and angular speed.
    Polar {
        /// Radial speed.
        radial_speed: f32,
        /// Angular speed in degrees per second.
        angular_speed: f32,
    },
}

impl Seed {
    /// Mode this seed targets.
    #[must_use]
    pub const fn mode(&self) -> MovementMode {
        match self {
            Self::Cartesian { .. } => MovementMode::Cartesian,
            Self::CartesianPolar { .. } => MovementMode::CartesianPolar,
            Self::Polar { .. } => MovementMode::Polar,
        }
    }

    /// Overwrite the initial values of `next`. Returns false on a mode mismatch.
    pub fn apply_to(self, next: &mut MovementDescriptor) -> bool {
        match (self, &mut next.kind) {
            (Self::Cartesian { velocity }, MotionKind::Cartesian(c)) => {
                c.velocity = velocity;
            },
            (Self::CartesianPolar { speed, angle }, MotionKind::CartesianPolar(c)) => {
                c.speed = speed;
                if let Some(angle) = angle {
                    c.angle = angle;
                }
            },
            (
                Self::Polar {
                    radial_speed,
                    angular_speed,
                },
                MotionKind::Polar(p),
            ) => {
                p.radial_speed = radial_speed;
                p.angular_speed = angular_speed;
            },
            _ => return false,
        }
        true
    }
}

/// Cartesian velocity implied by a phase's current state.
#[must_use]
pub fn instantaneous_velocity(prev: &MovementDescriptor, frame: &PhaseFrame) -> Vec2 {
    match &prev.kind {
        MotionKind::Cartesian(c) => c.velocity,
        MotionKind::CartesianPolar(c) => unit_from_degrees(c.angle) * c.speed,
        MotionKind::Polar(p) => {
            let radial = unit_from_degrees(frame.polar_angle) * p.radial_speed;
            let tangential = tangent_from_degrees(frame.polar_angle)
                * (frame.polar_radius * p.angular_speed.to_radians());
            radial + tangential
        },
    }
}

/// Project a Cartesian velocity into `mode`'s representation.
#[must_use]
pub fn seed_for(mode: MovementMode, velocity: Vec2, frame: &PhaseFrame) -> Seed {
    match mode {
        MovementMode::Cartesian => Seed::Cartesian { velocity },
        MovementMode::CartesianPolar => Seed::CartesianPolar {
            speed: velocity.length(),
            angle: direction_degrees(velocity),
        },
        MovementMode::Polar => {
            let radial_speed = velocity.dot(unit_from_degrees(frame.polar_angle));
            let tangential = velocity.dot(tangent_from_degrees(frame.polar_angle));
            let angular_speed = if frame.polar_radius > MIN_POLAR_RADIUS {
                (tangential / frame.polar_radius).to_degrees()
            } else {
                0.0
            };
            Seed::Polar {
                radial_speed,
                angular_speed,
            }
        },
    }
}

/// Seed for `next_mode` continuing the motion of `prev`.
#[must_use]
pub fn sync(prev: &MovementDescriptor, frame: &PhaseFrame, next_mode: MovementMode) -> Seed {
    seed_for(next_mode, instantaneous_velocity(prev, frame), frame)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::{CartesianBuilder, CartesianPolarBuilder, MovementBuilder, PolarBuilder};

    const EPS: f32 = 1e-3;

    #[test]
    fn test_cartesian_to_cartesian_polar() {
        let prev = CartesianBuilder::new(Vec2::new(3.0, 0.0)).build().unwrap();
        let seed = sync(&prev, &PhaseFrame::default(), MovementMode::CartesianPolar);
        match seed {
            Seed::CartesianPolar { speed, angle } => {
                assert!((speed - 3.0).abs() < EPS);
                assert!(angle.is_some_and(|a| a.abs() < EPS));
            },
            other => panic!("unexpected seed {other:?}"),
        }
    }

    #[test]
    fn test_cartesian_polar_to_cartesian() {
        let prev = CartesianPolarBuilder::new(2.0, 90.0).build().unwrap();
        let v = instantaneous_velocity(&prev, &PhaseFrame::default());
        assert!(v.abs_diff_eq(Vec2::new(0.0, 2.0), EPS));
    }

    #[test]
    fn test_polar_velocity_combines_radial_and_tangential() {
        // At angle 0 and radius 10, radial moves +X and angular moves +Y.
        let prev = PolarBuilder::new(1.0, 180.0 / std::f32::consts::PI).build().unwrap();
        let frame = PhaseFrame {
            polar_radius: 10.0,
            polar_angle: 0.0,
        };
        let v = instantaneous_velocity(&prev, &frame);
        assert!(v.abs_diff_eq(Vec2::new(1.0, 10.0), EPS));
    }

    #[test]
    fn test_polar_round_trip_through_cartesian() {
        let frame = PhaseFrame {
            polar_radius: 5.0,
            polar_angle: 30.0,
        };
        let prev = PolarBuilder::new(2.0, 40.0).build().unwrap();
        let v = instantaneous_velocity(&prev, &frame);
        match seed_for(MovementMode::Polar, v, &frame) {
            Seed::Polar {
                radial_speed,
                angular_speed,
            } => {
                assert!((radial_speed - 2.0).abs() < EPS);
                assert!((angular_speed - 40.0).abs() < EPS);
            },
            other => panic!("unexpected seed {other:?}"),
        }
    }

    #[test]
    fn test_polar_seed_at_origin_has_no_angular_speed() {
        let seed = seed_for(MovementMode::Polar, Vec2::new(0.0, 4.0), &PhaseFrame::default());
        assert_eq!(
            seed,
            Seed::Polar {
                radial_speed: 0.0,
                angular_speed: 0.0
            }
        );
    }

    #[test]
    fn test_zero_velocity_keeps_heading() {
        let mut next = CartesianPolarBuilder::new(0.0, 123.0).build().unwrap();
        let seed = seed_for(MovementMode::CartesianPolar, Vec2::ZERO, &PhaseFrame::default());
        assert!(seed.apply_to(&mut next));
        assert_eq!(next.as_cartesian_polar().map(|c| c.angle), Some(123.0));
    }

    #[test]
    fn test_apply_mode_mismatch() {
        let mut next = PolarBuilder::new(0.0, 0.0).build().unwrap();
        let seed = Seed::Cartesian { velocity: Vec2::X };
        assert!(!seed.apply_to(&mut next));
    }
}
