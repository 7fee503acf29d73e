//! Distant terrain generation for voxel worlds.
//!
//! The [`map`] crate holds the level of detail index and decodes persisted chunks, and the [`worldgen`] crate fills the
//! index from a pool of worker threads. This crate ties them together with a [`Config`] file.

mod config;

pub use config::{Config, ConfigError};

pub use horizon_core as core;
pub use horizon_map as map;
pub use horizon_worldgen as worldgen;
