use super::{ChunkDbKey, ChunkStorage, StorageError};
use crate::core::glam::IVec2;
use crate::core::ilattice::prelude::Extent;
use crate::units::{ChunkPos, ChunkUnits};

use sled::{IVec, Tree};

/// Chunk payloads stored in a [`sled::Tree`] keyed by [`ChunkDbKey`].
pub struct SledChunkStore {
    tree: Tree,
}

impl SledChunkStore {
    /// Opens (or creates) the chunk tree of the world called `world_name`.
    pub fn open(db: &sled::Db, world_name: &str) -> Result<Self, StorageError> {
        let tree = db.open_tree(format!("{}-chunks", world_name))?;
        Ok(Self { tree })
    }

    pub fn write_chunk(&self, chunk: ChunkPos, payload: &[u8]) -> Result<Option<IVec>, StorageError> {
        Ok(self
            .tree
            .insert(ChunkDbKey::new(chunk).into_sled_key(), payload)?)
    }

    /// Positions of all stored chunks inside `extent`.
    pub fn chunks_in_extent(&self, extent: ChunkUnits<Extent<IVec2>>) -> Result<Vec<ChunkPos>, StorageError> {
        let ChunkUnits(extent) = extent;
        let range = ChunkDbKey::extent_range(extent);
        let mut found = Vec::new();
        for entry in self
            .tree
            .range(range.start().into_sled_key()..=range.end().into_sled_key())
        {
            let (key, _) = entry?;
            let chunk = ChunkDbKey::from_sled_key(&key).chunk();
            // The Morton range overshoots the extent.
            if extent.contains(chunk.into_inner()) {
                found.push(chunk);
            }
        }
        Ok(found)
    }
}

impl ChunkStorage for SledChunkStore {
    fn read_chunk(&self, chunk: ChunkPos) -> Result<Option<Vec<u8>>, StorageError> {
        let value = self.tree.get(ChunkDbKey::new(chunk).into_sled_key())?;
        Ok(value.map(|v| v.to_vec()))
    }
}

// ████████╗███████╗███████╗████████╗
// ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝
//    ██║   █████╗  ███████╗   ██║
//    ██║   ██╔══╝  ╚════██║   ██║
//    ██║   ███████╗███████║   ██║
//    ╚═╝   ╚══════╝╚══════╝   ╚═╝
