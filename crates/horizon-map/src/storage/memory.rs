use super::{ChunkStorage, StorageError};
use crate::core::SmallKeyHashMap;
use crate::units::ChunkPos;

use parking_lot::RwLock;

/// Chunk payloads held in memory.
#[derive(Default)]
pub struct MemoryChunkStore {
    chunks: RwLock<SmallKeyHashMap<ChunkPos, Vec<u8>>>,
}

impl MemoryChunkStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, chunk: ChunkPos, payload: Vec<u8>) -> Option<Vec<u8>> {
        self.chunks.write().insert(chunk, payload)
    }

    pub fn remove(&self, chunk: ChunkPos) -> Option<Vec<u8>> {
        self.chunks.write().remove(&chunk)
    }

    pub fn len(&self) -> usize {
        self.chunks.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.read().is_empty()
    }
}

impl ChunkStorage for MemoryChunkStore {
    fn read_chunk(&self, chunk: ChunkPos) -> Result<Option<Vec<u8>>, StorageError> {
        Ok(self.chunks.read().get(&chunk).cloned())
    }
}
