//! Angle and vector helpers shared by every coordinate mode.
//!
//! All angles are in degrees, measured counter-clockwise from +X.

use glam::Vec2;

/// Squared length below which a vector has no usable direction.
pub const NEGLIGIBLE_SQ: f32 = 1e-10;

/// Wraps an angle into `[0, 360)`.
#[must_use]
pub fn normalize_degrees(angle: f32) -> f32 {
    if !angle.is_finite() {
        return 0.0;
    }
    let wrapped = angle.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360 for tiny negative inputs
    if wrapped >= 360.0 {
        0.0
    } else {
        wrapped
    }
}

/// Unit vector pointing along `angle` degrees.
#[must_use]
pub fn unit_from_degrees(angle: f32) -> Vec2 {
    let (sin, cos) = angle.to_radians().sin_cos();
    Vec2::new(cos, sin)
}

/// Unit vector perpendicular (counter-clockwise) to `angle` degrees.
#[must_use]
pub fn tangent_from_degrees(angle: f32) -> Vec2 {
    unit_from_degrees(angle).perp()
}

/// Heading of `v` in `[0, 360)`, or `None` when `v` is too short to have one.
#[must_use]
pub fn direction_degrees(v: Vec2) -> Option<f32> {
    if v.length_squared() <= NEGLIGIBLE_SQ {
        None
    } else {
        Some(normalize_degrees(v.y.atan2(v.x).to_degrees()))
    }
}

/// Offset of a point at `radius` along `angle` degrees.
#[must_use]
pub fn polar_offset(radius: f32, angle: f32) -> Vec2 {
    unit_from_degrees(angle) * radius
}

/// Polar coordinates `(radius, angle)` of `point` around `origin`.
///
/// A point sitting on the origin reports angle 0.
#[must_use]
pub fn to_polar(origin: Vec2, point: Vec2) -> (f32, f32) {
    let offset = point - origin;
    (offset.length(), direction_degrees(offset).unwrap_or(0.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_normalize_wraps_negative() {
        assert!((normalize_degrees(-90.0) - 270.0).abs() < 1e-4);
        assert!((normalize_degrees(720.0 + 45.0) - 45.0).abs() < 1e-3);
        assert_eq!(normalize_degrees(-1e-9), 0.0);
        assert_eq!(normalize_degrees(f32::NAN), 0.0);
    }

    #[test]
    fn test_direction_of_zero_vector() {
        assert_eq!(direction_degrees(Vec2::ZERO), None);
        let up = direction_degrees(Vec2::new(0.0, 2.0)).unwrap_or_default();
        assert!((up - 90.0).abs() < 1e-4);
    }

    #[test]
    fn test_polar_round_trip() {
        let origin = Vec2::new(10.0, -5.0);
        let point = origin + polar_offset(4.0, 135.0);
        let (r, a) = to_polar(origin, point);
        assert!((r - 4.0).abs() < 1e-4);
        assert!((a - 135.0).abs() < 1e-3);
    }

    proptest! {
        #[test]
        fn prop_normalized_angle_in_range(angle in -1.0e6f32..1.0e6f32) {
            let a = normalize_degrees(angle);
            prop_assert!((0.0..360.0).contains(&a));
        }
    }
}
