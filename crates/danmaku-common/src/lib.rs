//! # Danmaku Common
//!
//! Common types and shared abstractions for the danmaku motion core.
//!
//! This crate provides foundational types used by the other crates:
//! - Angle and vector helpers (degrees, polar conversion)
//! - ID types (ActorId, PatternId, PrototypeId, CallbackId)
//! - Common error types
//! - Prelude for convenient imports

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod coords;
pub mod error;
pub mod ids;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::coords::*;
    pub use crate::error::*;
    pub use crate::ids::*;
}

pub use prelude::*;
