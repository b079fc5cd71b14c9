//! Error types for the danmaku motion core.

use std::fmt;
use thiserror::Error;

/// Top-level error type for danmaku operations.
#[derive(Debug, Error)]
pub enum DanmakuError {
    /// A movement descriptor failed validation
    #[error("Invalid movement: {0}")]
    InvalidMovement(#[from] InvalidMovementError),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A clamp bound governed by a movement descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MovementBound {
    /// Cartesian velocity X component
    VelocityX,
    /// Cartesian velocity Y component
    VelocityY,
    /// Cartesian velocity magnitude
    Magnitude,
    /// Cartesian-polar scalar speed
    Speed,
    /// Polar radial speed
    RadialSpeed,
    /// Polar angular speed
    AngularSpeed,
    /// Independent rotation speed
    RotationSpeed,
}

impl fmt::Display for MovementBound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::VelocityX => "velocity.x",
            Self::VelocityY => "velocity.y",
            Self::Magnitude => "velocity magnitude",
            Self::Speed => "speed",
            Self::RadialSpeed => "radial speed",
            Self::AngularSpeed => "angular speed",
            Self::RotationSpeed => "rotation speed",
        };
        f.write_str(name)
    }
}

/// Construction error raised by movement builders.
///
/// Never produced once `build()` has succeeded.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InvalidMovementError {
    /// A min/max pair is out of order
    #[error("min {bound} ({min}) exceeds max {bound} ({max})")]
    BoundOrder {
        /// Which bound was violated
        bound: MovementBound,
        /// Configured minimum
        min: f32,
        /// Configured maximum
        max: f32,
    },

    /// The phase ends before it starts
    #[error("end time {end} is before start time {start}")]
    EndBeforeStart {
        /// Phase start time
        start: f32,
        /// Phase end time
        end: f32,
    },

    /// A timing value is negative or not finite
    #[error("{field} must be finite and non-negative, got {value}")]
    InvalidTime {
        /// Name of the offending field
        field: &'static str,
        /// The rejected value
        value: f32,
    },
}

/// Result type alias for danmaku operations.
pub type DanmakuResult<T> = Result<T, DanmakuError>;
