use crate::core::geometry::chessboard_distance;
use crate::core::glam::{IVec2, IVec3};
use crate::core::ilattice::prelude::Extent;
use crate::units::*;

/// Detail level of a quadtree node. A node at level `l` is `2^l` blocks wide.
pub type Level = u8;

/// Index of a child within its parent, in `0..4`.
pub type ChildIndex = u8;

pub const BLOCK_LEVEL: Level = 0;
pub const CHUNK_LEVEL: Level = 4;
pub const REGION_LEVEL: Level = 9;

pub const CHUNK_WIDTH: i32 = 1 << CHUNK_LEVEL;
pub const REGION_WIDTH: i32 = 1 << REGION_LEVEL;
pub const CHUNKS_PER_REGION_LOG2: i32 = (REGION_LEVEL - CHUNK_LEVEL) as i32;

/// Identifies a quadtree node by its level and its coordinates in the grid of that level.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct NodeKey {
    pub level: Level,
    pub coordinates: IVec2,
}

impl NodeKey {
    pub fn new(level: Level, coordinates: IVec2) -> Self {
        Self { level, coordinates }
    }

    pub fn chunk(chunk: ChunkPos) -> Self {
        Self::new(CHUNK_LEVEL, chunk.into_inner())
    }

    /// The node at `level` containing the block column `p`.
    pub fn containing(level: Level, p: BlockUnits<IVec2>) -> Self {
        Self::new(level, p.0 >> level as i32)
    }

    pub fn width(&self) -> i32 {
        1 << self.level
    }

    /// Block extent covered by this node.
    pub fn extent(&self) -> BlockUnits<Extent<IVec2>> {
        BlockUnits(Extent::from_min_and_shape(
            self.coordinates << self.level as i32,
            IVec2::splat(self.width()),
        ))
    }

    pub fn parent(&self) -> Option<Self> {
        (self.level < REGION_LEVEL).then(|| Self::new(self.level + 1, parent_coords(self.coordinates)))
    }

    /// Coordinates of the region tree that holds this node.
    pub fn region(&self) -> IVec2 {
        debug_assert!(self.level <= REGION_LEVEL);
        self.coordinates >> (REGION_LEVEL - self.level) as i32
    }

    pub fn ancestor(&self, level: Level) -> Self {
        debug_assert!(level >= self.level);
        Self::new(level, self.coordinates >> (level - self.level) as i32)
    }

    pub fn children(&self) -> [Self; 4] {
        debug_assert!(self.level > 0);
        let mut children = [*self; 4];
        visit_children(self.coordinates, |child_i, child_coords| {
            children[child_i as usize] = Self::new(self.level - 1, child_coords);
        });
        children
    }

    /// Chunk extent covered by this node; nodes below chunk level cover their containing chunk.
    pub fn chunk_extent(&self) -> ChunkUnits<Extent<IVec2>> {
        if self.level >= CHUNK_LEVEL {
            let levels_down = (self.level - CHUNK_LEVEL) as i32;
            ChunkUnits(Extent::from_min_and_shape(
                self.coordinates << levels_down,
                IVec2::splat(1 << levels_down),
            ))
        } else {
            let chunk = self.ancestor(CHUNK_LEVEL);
            ChunkUnits(Extent::from_min_and_shape(chunk.coordinates, IVec2::ONE))
        }
    }
}

impl std::fmt::Display for NodeKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "L{}[{}, {}]", self.level, self.coordinates.x, self.coordinates.y)
    }
}

pub fn min_child_coords(parent_coords: IVec2) -> IVec2 {
    parent_coords << 1
}

pub fn parent_coords(child_coords: IVec2) -> IVec2 {
    child_coords >> 1
}

/// Which child of its parent the node at `coords` is.
pub fn child_index(coords: IVec2) -> ChildIndex {
    ((coords.x & 1) | ((coords.y & 1) << 1)) as ChildIndex
}

pub fn visit_children(parent_coords: IVec2, mut visitor: impl FnMut(ChildIndex, IVec2)) {
    let min_child = min_child_coords(parent_coords);
    for child_i in 0..4 {
        let offset = IVec2::new((child_i & 1) as i32, (child_i >> 1) as i32);
        visitor(child_i, min_child + offset);
    }
}

/// Returns the [`ChunkUnits`] coordinates of the chunk that contains `p`.
pub fn in_chunk(p: BlockUnits<IVec2>) -> ChunkPos {
    ChunkUnits(p.0 >> CHUNK_LEVEL as i32)
}

pub fn in_chunk3(p: BlockUnits<IVec3>) -> ChunkPos {
    in_chunk(BlockUnits(IVec2::new(p.0.x, p.0.z)))
}

pub fn chunk_min(chunk: ChunkPos) -> BlockUnits<IVec2> {
    BlockUnits(chunk.0 << CHUNK_LEVEL as i32)
}

pub fn region_of_chunk(chunk: ChunkPos) -> IVec2 {
    chunk.0 >> CHUNKS_PER_REGION_LOG2
}

pub fn chunk_chessboard_distance(a: ChunkPos, b: ChunkPos) -> i32 {
    chessboard_distance(a.0, b.0)
}

/// Structure references persist chunk positions as `x | z << 32`.
pub fn unpack_chunk_pos(packed: i64) -> ChunkPos {
    ChunkPos::new(packed as i32, (packed >> 32) as i32)
}

pub fn pack_chunk_pos(chunk: ChunkPos) -> i64 {
    (chunk.x() as u32 as i64) | ((chunk.z() as i64) << 32)
}

// ████████╗███████╗███████╗████████╗
// ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝
//    ██║   █████╗  ███████╗   ██║
//    ██║   ██╔══╝  ╚════██║   ██║
//    ██║   ███████╗███████║   ██║
//    ╚═╝   ╚══════╝╚══════╝   ╚═╝
