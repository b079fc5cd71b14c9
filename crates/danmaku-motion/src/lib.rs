//! # Danmaku Motion
//!
//! Projectile motion core for bullet-hell patterns.
//!
//! This crate provides:
//! - Movement descriptors in Cartesian, cartesian-polar and polar form
//! - Validating builders for those descriptors
//! - The per-tick integrator with phases, looping and summon delays
//! - Velocity continuity across phase boundaries
//! - A prototype-keyed entity pool
//! - Per-category time scaling with pause/resume and scaled waits
//! - A lifecycle event bus

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod accel;
pub mod builder;
pub mod continuity;
pub mod events;
mod integrator;
pub mod movement;
pub mod pool;
mod presets;
pub mod projectile;
pub mod time_scale;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::accel::*;
    pub use crate::builder::*;
    pub use crate::continuity::{sync, PhaseFrame, Seed};
    pub use crate::events::*;
    pub use crate::movement::*;
    pub use crate::pool::*;
    pub use crate::projectile::*;
    pub use crate::time_scale::*;
}

pub use prelude::*;
