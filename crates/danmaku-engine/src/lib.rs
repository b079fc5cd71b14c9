//! # Danmaku Engine
//!
//! Headless runtime around the danmaku motion core.
//!
//! This crate ties together:
//! - Configuration loaded from `danmaku.toml`
//! - A fixed timestep driver
//! - The bullet world (pool ownership, culling, lifecycle events)
//! - Scripted patterns waiting on scaled time
//! - The simulation run used by the `danmaku-sim` binary

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod config;
pub mod patterns;
pub mod sim;
pub mod timing;
pub mod world;


pub use config::SimConfig;
pub use timing::FixedTimestep;
pub use world::{BulletWorld, Playfield, WorldTickStats};
