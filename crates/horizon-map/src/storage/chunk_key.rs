use crate::core::glam::IVec2;
use crate::core::ilattice::prelude::{Extent, Morton2i32};
use crate::units::ChunkPos;

use core::ops::RangeInclusive;

/// Database key of a chunk column, ordered along a Z curve so that nearby chunks are nearby in the tree.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, PartialOrd, Ord)]
pub struct ChunkDbKey {
    pub morton: Morton2i32,
}

impl ChunkDbKey {
    pub fn new(chunk: ChunkPos) -> Self {
        Self {
            morton: Morton2i32::from(chunk.into_inner()),
        }
    }

    pub fn chunk(&self) -> ChunkPos {
        ChunkPos::from(IVec2::from(self.morton))
    }

    /// Big-endian so that [`sled`]'s byte order matches the Morton order.
    pub fn into_sled_key(&self) -> [u8; 8] {
        self.morton.0.to_be_bytes()
    }

    pub fn from_sled_key(bytes: &[u8]) -> Self {
        let mut morton_bytes = [0; 8];
        morton_bytes.copy_from_slice(&bytes[..8]);
        Self {
            morton: Morton2i32(u64::from_be_bytes(morton_bytes)),
        }
    }

    /// Keys bounding every chunk in `extent`. The range also contains chunks outside of the extent.
    pub fn extent_range(extent: Extent<IVec2>) -> RangeInclusive<Self> {
        let min = Morton2i32::from(extent.minimum);
        let max = Morton2i32::from(extent.max());
        Self { morton: min }..=Self { morton: max }
    }
}

// ████████╗███████╗███████╗████████╗
// ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝
//    ██║   █████╗  ███████╗   ██║
//    ██║   ██╔══╝  ╚════██║   ██║
//    ██║   ███████╗███████║   ██║
//    ╚═╝   ╚══════╝╚══════╝   ╚═╝

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn sled_key_order_matches_morton_order() {
        let a = ChunkDbKey::new(ChunkPos::new(-3, 7));
        let b = ChunkDbKey::new(ChunkPos::new(4, -1));
        assert_eq!(a < b, a.into_sled_key() < b.into_sled_key());
        assert_eq!(ChunkDbKey::from_sled_key(&a.into_sled_key()), a);
        assert_eq!(a.chunk(), ChunkPos::new(-3, 7));
    }

    #[test]
    fn extent_range_contains_extent() {
        let extent = Extent::from_min_and_shape(IVec2::new(-2, -2), IVec2::splat(4));
        let range = ChunkDbKey::extent_range(extent);
        for p in extent.iter2() {
            assert!(range.contains(&ChunkDbKey::new(ChunkPos::from(p))));
        }
    }
}
