//! Off-thread generation of LOD terrain.
//!
//! A [`BatchGenerationEnvironment`] owns a fixed pool of worker threads. Each submitted [`GenerationRequest`] covers a square
//! footprint of chunks around a target chunk. For every chunk, a worker either finds that the [`LodIndex`](horizon_map::LodIndex)
//! already holds data of sufficient fidelity, decodes the chunk persisted by the host, or synthesizes an approximation. The
//! result is summarized into a chunk-level LOD node and merged up the region's quadtree.
//!
//! Requests can be cancelled from any thread with [`GenerationRequest::terminate`]. Workers notice at the next
//! [`GenerationContext::checkpoint`], which also counts as progress for the request's timeout.

mod config;
mod context;
mod environment;
mod error;
mod request;
mod summary;
mod synth;
mod ticks;
mod workers;

pub use config::*;
pub use context::*;
pub use environment::*;
pub use error::*;
pub use request::*;
pub use summary::*;
pub use synth::*;
pub use ticks::*;
pub use workers::*;

pub use horizon_map as map;
