//! The horizon map data model.
//!
//! # Level of Detail
//!
//! Distant terrain is summarized by [`LodNode`]s arranged in one quadtree per 512x512 block region. Level 0 is a single
//! block column, and every level above doubles the width of a node. Chunk-level nodes (level 4) are written by the
//! generator, and every complete set of four siblings is merged into its parent.
//!
//! Each node remembers the [`GenerationMode`] that produced it. A node may only ever be replaced by data of equal or higher
//! fidelity.
//!
//! # Persisted Chunks
//!
//! Chunks saved by the host game are read through a [`ChunkStorage`] backend and decoded by the [`SnapshotDecoder`] into
//! an ephemeral [`TerrainSnapshot`]. The persisted format changed several times, so decoding is driven by a table of
//! [`ChunkSchema`] strategies selected from the payload's data version.
//!
//! # Block States
//!
//! Block states are interned by a [`BlockStateCache`], which is constructed from a host [`BlockRegistry`] and owns the
//! canonical "air" state.

mod block_state;
mod config;
mod coordinates;
mod dimension;
mod index;
mod mode;
mod payload;
mod snapshot;
mod storage;
mod structure;
mod tag;
mod units;

pub use block_state::*;
pub use config::*;
pub use coordinates::*;
pub use dimension::*;
pub use index::*;
pub use mode::*;
pub use payload::*;
pub use snapshot::*;
pub use storage::*;
pub use structure::*;
pub use tag::*;
pub use units::*;

pub use horizon_core as core;
pub use horizon_core::glam;
