//! Per-mode kinematic steps.
//!
//! Each step advances one working descriptor by `dt` and returns the
//! displacement it produced plus the heading implied by the motion. Velocity
//! used for the displacement is the value from before the acceleration is
//! applied (explicit Euler).

use crate::accel::AccelCallbacks;
use crate::continuity::PhaseFrame;
use crate::movement::{CartesianMotion, CartesianPolarMotion, PolarMotion, RotationSpec};
use danmaku_common::{direction_degrees, normalize_degrees, polar_offset, unit_from_degrees};
use glam::Vec2;

/// Result of one kinematic step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Step {
    pub displacement: Vec2,
    /// Heading of the motion, `None` when it has no direction.
    pub heading: Option<f32>,
}

/// Shared inputs of a step.
#[derive(Clone, Copy)]
pub(crate) struct StepInput<'a> {
    pub dt: f32,
    /// Seconds since the phase started.
    pub phase_time: f32,
    pub limit_speed: bool,
    pub callbacks: &'a dyn AccelCallbacks,
}

fn clamp_between(value: f32, min: f32, max: f32) -> f32 {
    value.max(min).min(max)
}

/// Clamp the magnitude first, then each axis.
///
/// The axis pass can pull the magnitude back out of its range.
pub(crate) fn clamp_cartesian(velocity: Vec2, motion: &CartesianMotion) -> Vec2 {
    let length = velocity.length();
    let mut v = velocity;
    if length > motion.max_magnitude {
        v *= motion.max_magnitude / length;
    } else if length < motion.min_magnitude && length > f32::EPSILON {
        v *= motion.min_magnitude / length;
    }
    v.max(motion.min_velocity).min(motion.max_velocity)
}

pub(crate) fn step_cartesian(motion: &mut CartesianMotion, input: StepInput<'_>) -> Step {
    let velocity = motion.velocity;
    let step = Step {
        displacement: velocity * input.dt,
        heading: direction_degrees(velocity),
    };

    let accel = motion.acceleration.sample(input.phase_time, input.callbacks);
    motion.velocity += accel * input.dt;
    if input.limit_speed {
        motion.velocity = clamp_cartesian(motion.velocity, motion);
    }
    step
}

pub(crate) fn step_cartesian_polar(
    motion: &mut CartesianPolarMotion,
    input: StepInput<'_>,
) -> Step {
    let step = Step {
        displacement: unit_from_degrees(motion.angle) * (motion.speed * input.dt),
        heading: Some(motion.angle),
    };

    let tangential = motion.tangential_accel.sample(input.phase_time, input.callbacks);
    let normal = motion.normal_accel.sample(input.phase_time, input.callbacks);
    motion.speed += tangential * input.dt;
    motion.angle = normalize_degrees(motion.angle + normal * input.dt);
    if input.limit_speed {
        motion.speed = clamp_between(motion.speed, motion.min_speed, motion.max_speed);
    }
    step
}

/// Advance `frame` around the origin. `origin_shift` is how far the origin
/// moved since the previous step.
pub(crate) fn step_polar(
    motion: &mut PolarMotion,
    frame: &mut PhaseFrame,
    origin_shift: Vec2,
    input: StepInput<'_>,
) -> Step {
    let before = polar_offset(frame.polar_radius, frame.polar_angle);

    frame.polar_radius += motion.radial_speed * input.dt;
    frame.polar_angle = normalize_degrees(frame.polar_angle + motion.angular_speed * input.dt);

    let radial = motion.radial_accel.sample(input.phase_time, input.callbacks);
    let angular = motion.angular_accel.sample(input.phase_time, input.callbacks);
    motion.radial_speed += radial * input.dt;
    motion.angular_speed += angular * input.dt;
    if input.limit_speed {
        motion.radial_speed = clamp_between(
            motion.radial_speed,
            motion.min_radial_speed,
            motion.max_radial_speed,
        );
        motion.angular_speed = clamp_between(
            motion.angular_speed,
            motion.min_angular_speed,
            motion.max_angular_speed,
        );
    }

    let after = polar_offset(frame.polar_radius, frame.polar_angle);
    let displacement = after - before + origin_shift;
    Step {
        displacement,
        heading: direction_degrees(displacement),
    }
}

/// Integrate a free-spinning rotation and return the new heading.
pub(crate) fn step_rotation(
    rotation: f32,
    spin: &mut RotationSpec,
    dt: f32,
    phase_time: f32,
    callbacks: &dyn AccelCallbacks,
) -> f32 {
    let next = normalize_degrees(rotation + spin.speed * dt);
    spin.speed += spin.acceleration.sample(phase_time, callbacks) * dt;
    if spin.limit_speed {
        spin.speed = clamp_between(spin.speed, spin.min_speed, spin.max_speed);
    }
    next
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accel::{NoCallbacks, ScalarAccel};
    use proptest::prelude::*;

    const EPS: f32 = 1e-4;

    fn input(dt: f32, limit_speed: bool) -> StepInput<'static> {
        StepInput {
            dt,
            phase_time: 0.0,
            limit_speed,
            callbacks: &NoCallbacks,
        }
    }

    #[test]
    fn test_cartesian_uses_velocity_before_accel() {
        let mut motion = CartesianMotion {
            velocity: Vec2::new(2.0, 0.0),
            acceleration: Vec2::new(0.0, 10.0).into(),
            ..Default::default()
        };
        let step = step_cartesian(&mut motion, input(0.5, false));
        assert_eq!(step.displacement, Vec2::new(1.0, 0.0));
        assert_eq!(step.heading, Some(0.0));
        assert_eq!(motion.velocity, Vec2::new(2.0, 5.0));
    }

    #[test]
    fn test_cartesian_zero_velocity_has_no_heading() {
        let mut motion = CartesianMotion::default();
        let step = step_cartesian(&mut motion, input(1.0, false));
        assert_eq!(step.heading, None);
        assert_eq!(step.displacement, Vec2::ZERO);
    }

    #[test]
    fn test_clamp_order_magnitude_then_axis() {
        // Magnitude clamp to 10 yields (6, 8); the axis clamp then cuts y to 2,
        // leaving a magnitude well below min_magnitude.
        let motion = CartesianMotion {
            min_velocity: Vec2::new(-100.0, -2.0),
            max_velocity: Vec2::new(100.0, 2.0),
            min_magnitude: 9.0,
            max_magnitude: 10.0,
            ..Default::default()
        };
        let clamped = clamp_cartesian(Vec2::new(30.0, 40.0), &motion);
        assert!(clamped.abs_diff_eq(Vec2::new(6.0, 2.0), EPS));
        assert!((clamped.length() - 40.0_f32.sqrt()).abs() < EPS);
    }

    #[test]
    fn test_cartesian_polar_turns_and_accelerates() {
        let mut motion = CartesianPolarMotion {
            speed: 4.0,
            angle: 350.0,
            tangential_accel: ScalarAccel::Constant(2.0),
            normal_accel: ScalarAccel::Constant(40.0),
            ..Default::default()
        };
        let step = step_cartesian_polar(&mut motion, input(0.5, false));
        assert!(step.displacement.abs_diff_eq(unit_from_degrees(350.0) * 2.0, EPS));
        assert_eq!(step.heading, Some(350.0));
        assert_eq!(motion.speed, 5.0);
        assert!((motion.angle - 10.0).abs() < EPS);
    }

    #[test]
    fn test_polar_quarter_orbit() {
        let mut motion = PolarMotion {
            angular_speed: 90.0,
            ..Default::default()
        };
        let mut frame = PhaseFrame {
            polar_radius: 10.0,
            polar_angle: 0.0,
        };
        let step = step_polar(&mut motion, &mut frame, Vec2::ZERO, input(1.0, false));
        assert!(step.displacement.abs_diff_eq(Vec2::new(-10.0, 10.0), EPS));
        assert!((frame.polar_angle - 90.0).abs() < EPS);
        assert!(step.heading.is_some_and(|h| (h - 135.0).abs() < 1e-2));
    }

    #[test]
    fn test_polar_adds_origin_shift() {
        let mut motion = PolarMotion::default();
        let mut frame = PhaseFrame {
            polar_radius: 3.0,
            polar_angle: 45.0,
        };
        let step = step_polar(&mut motion, &mut frame, Vec2::new(1.0, -1.0), input(1.0, false));
        assert!(step.displacement.abs_diff_eq(Vec2::new(1.0, -1.0), EPS));
    }

    #[test]
    fn test_rotation_clamped() {
        let mut spin = RotationSpec {
            speed: 100.0,
            acceleration: ScalarAccel::Constant(1000.0),
            limit_speed: true,
            min_speed: 0.0,
            max_speed: 180.0,
        };
        let heading = step_rotation(300.0, &mut spin, 1.0, 0.0, &NoCallbacks);
        assert!((heading - 40.0).abs() < EPS);
        assert_eq!(spin.speed, 180.0);
    }

    proptest! {
        #[test]
        fn prop_cartesian_polar_speed_converges(
            speed in -50.0f32..50.0,
            accel in -200.0f32..200.0,
        ) {
            let mut motion = CartesianPolarMotion {
                speed,
                tangential_accel: ScalarAccel::Constant(accel),
                min_speed: -5.0,
                max_speed: 5.0,
                ..Default::default()
            };
            step_cartesian_polar(&mut motion, input(1.0 / 60.0, true));
            prop_assert!((-5.0..=5.0).contains(&motion.speed));
        }

        #[test]
        fn prop_polar_speeds_converge(
            radial in -50.0f32..50.0,
            angular in -720.0f32..720.0,
        ) {
            let mut motion = PolarMotion {
                radial_speed: radial,
                angular_speed: angular,
                radial_accel: ScalarAccel::Constant(30.0),
                angular_accel: ScalarAccel::Constant(-90.0),
                min_radial_speed: -2.0,
                max_radial_speed: 2.0,
                min_angular_speed: -45.0,
                max_angular_speed: 45.0,
                ..Default::default()
            };
            let mut frame = PhaseFrame { polar_radius: 4.0, polar_angle: 0.0 };
            step_polar(&mut motion, &mut frame, Vec2::ZERO, input(1.0 / 60.0, true));
            prop_assert!((-2.0..=2.0).contains(&motion.radial_speed));
            prop_assert!((-45.0..=45.0).contains(&motion.angular_speed));
            prop_assert!((0.0..360.0).contains(&frame.polar_angle));
        }

        #[test]
        fn prop_cartesian_magnitude_converges(x in -100.0f32..100.0, y in -100.0f32..100.0) {
            let mut motion = CartesianMotion {
                velocity: Vec2::new(x, y),
                max_magnitude: 8.0,
                ..Default::default()
            };
            step_cartesian(&mut motion, input(1.0 / 60.0, true));
            prop_assert!(motion.velocity.length() <= 8.0 + 1e-3);
        }
    }
}
