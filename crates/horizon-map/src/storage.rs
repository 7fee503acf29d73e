mod chunk_key;
mod memory;
mod region_dir;
mod sled_store;

pub use chunk_key::ChunkDbKey;
pub use memory::MemoryChunkStore;
pub use region_dir::RegionDirStore;
pub use sled_store::SledChunkStore;

use crate::units::ChunkPos;

use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("database error: {0}")]
    Sled(#[from] sled::Error),
    #[error("corrupt chunk storage: {0}")]
    Corrupt(String),
}

/// Source of persisted chunk payloads.
///
/// A payload is a compression scheme byte followed by the compressed tag tree (see [`decompress_payload`]
/// (crate::decompress_payload)). Reads may block on I/O and are called from worker threads.
pub trait ChunkStorage: Send + Sync {
    fn read_chunk(&self, chunk: ChunkPos) -> Result<Option<Vec<u8>>, StorageError>;
}
