//! # Core Module
//!
//! Engine-wide utilities that do not belong to a single subsystem.
//!
//! ## Key Components
//! - [`config::EngineConfig`]: serde-backed configuration with validation
//! - [`stopwatch::Stopwatches`]: named wall-clock timers used to profile frames
//!
//! ## Usage
//! ```rust
//! use voxel_engine::core::{config::EngineConfig, stopwatch::Stopwatches};
//!
//! let config = EngineConfig::default();
//! config.validate().unwrap();
//!
//! let mut stopwatches = Stopwatches::new();
//! stopwatches.start_timer("frame");
//! assert!(stopwatches.finish_timer("frame").is_some());
//! ```

pub mod config;
pub mod stopwatch;
