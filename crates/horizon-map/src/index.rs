mod generate_search;
mod merge;
mod node;
mod region;
mod render_search;

pub use generate_search::*;
pub use merge::*;
pub use node::*;
pub use region::*;

use crate::config::IndexConfig;
use crate::coordinates::{Level, NodeKey, REGION_LEVEL};
use crate::core::glam::IVec2;
use crate::core::ilattice::prelude::Extent;
use crate::core::SmallKeyHashMap;
use crate::mode::GenerationMode;
use crate::units::BlockUnits;

use log::debug;
use parking_lot::RwLock;
use std::sync::Arc;

/// The square of regions currently held by a [`LodIndex`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Window {
    /// Region coordinates of the center.
    pub center: IVec2,
    /// Regions on each side of the center.
    pub radius: i32,
}

impl Window {
    pub fn contains(&self, region: IVec2) -> bool {
        (region - self.center).abs().max_element() <= self.radius
    }

    /// Extent in region coordinates.
    pub fn extent(&self) -> Extent<IVec2> {
        Extent::from_min_and_shape(
            self.center - IVec2::splat(self.radius),
            IVec2::splat(2 * self.radius + 1),
        )
    }
}

type SharedRegion = Arc<RwLock<RegionTree>>;

struct RegionTable {
    window: Window,
    regions: SmallKeyHashMap<IVec2, SharedRegion>,
}

/// Sparse LOD quadtrees for every region inside a movable window.
///
/// The region table lock is only held long enough to find or create a region; all node reads and writes synchronize on the
/// per-region lock. Writes may arrive in any order, so the never-downgrade rule of [`RegionTree::insert`] is the only thing
/// deciding which data survives.
///
/// When the window moves, regions that fall outside are dropped from the table. A writer still holding such a region writes
/// into a detached tree that is never reachable again, so re-entering regions always start empty.
pub struct LodIndex {
    table: RwLock<RegionTable>,
}

impl LodIndex {
    pub fn new(config: IndexConfig) -> Self {
        Self::with_window(Window {
            center: IVec2::ZERO,
            radius: config.window_radius.max(0),
        })
    }

    pub fn with_window(window: Window) -> Self {
        Self {
            table: RwLock::new(RegionTable {
                window,
                regions: SmallKeyHashMap::default(),
            }),
        }
    }

    pub fn window(&self) -> Window {
        self.table.read().window
    }

    /// Number of nodes holding a value across all regions.
    pub fn node_count(&self) -> usize {
        self.regions_in_window(|_| true)
            .iter()
            .map(|region| region.read().len())
            .sum()
    }

    pub fn region_count(&self) -> usize {
        self.table.read().regions.len()
    }

    /// Writes `node` if it is inside the window and does not downgrade the existing node. Returns true if the index
    /// changed.
    pub fn add(&self, node: LodNode) -> bool {
        match self.region_or_insert(node.key.region()) {
            Some(region) => region.write().insert(node),
            None => false,
        }
    }

    /// Like [`Self::add`], then re-summarizes each ancestor whose four children are present.
    pub fn add_and_propagate(&self, node: LodNode) -> bool {
        match self.region_or_insert(node.key.region()) {
            Some(region) => region.write().insert_and_propagate(node),
            None => false,
        }
    }

    pub fn lod_at_key(&self, key: NodeKey) -> Option<LodNode> {
        if key.level > REGION_LEVEL {
            return None;
        }
        let region = self.region(key.region())?;
        let tree = region.read();
        tree.get(key).cloned()
    }

    pub fn mode_at_key(&self, key: NodeKey) -> Option<GenerationMode> {
        if key.level > REGION_LEVEL {
            return None;
        }
        let region = self.region(key.region())?;
        let tree = region.read();
        tree.get(key).map(|n| n.mode)
    }

    /// The node at `level` covering block column `p`, if one was generated.
    pub fn lod_at(&self, p: BlockUnits<IVec2>, level: Level) -> Option<LodNode> {
        if level > REGION_LEVEL {
            return None;
        }
        self.lod_at_key(NodeKey::containing(level, p))
    }

    /// Recenters the window on region `center`. Returns the number of evicted regions.
    pub fn move_window(&self, center: IVec2) -> usize {
        let mut table = self.table.write();
        table.window.center = center;
        let window = table.window;
        let before = table.regions.len();
        table.regions.retain(|&coords, _| window.contains(coords));
        let evicted = before - table.regions.len();
        debug!("Moved LOD window to {:?}, evicted {} regions", center, evicted);
        evicted
    }

    fn region(&self, coords: IVec2) -> Option<SharedRegion> {
        let table = self.table.read();
        if !table.window.contains(coords) {
            return None;
        }
        table.regions.get(&coords).cloned()
    }

    fn region_or_insert(&self, coords: IVec2) -> Option<SharedRegion> {
        {
            let table = self.table.read();
            if !table.window.contains(coords) {
                return None;
            }
            if let Some(region) = table.regions.get(&coords) {
                return Some(region.clone());
            }
        }
        let mut table = self.table.write();
        // The window may have moved while unlocked.
        if !table.window.contains(coords) {
            return None;
        }
        Some(
            table
                .regions
                .entry(coords)
                .or_insert_with(|| Arc::new(RwLock::new(RegionTree::new(coords))))
                .clone(),
        )
    }

    fn regions_in_window(&self, mut filter: impl FnMut(IVec2) -> bool) -> Vec<SharedRegion> {
        let table = self.table.read();
        table
            .regions
            .iter()
            .filter(|(&coords, _)| filter(coords))
            .map(|(_, region)| region.clone())
            .collect()
    }
}

#[cfg(test)]
pub(crate) mod test_util {
    use super::*;
    use crate::block_state::{BlockState, BlockStateCache, NativeBlockState, SimpleBlockRegistry};

    pub struct TestStates {
        pub cache: BlockStateCache,
        pub stone: BlockState,
        pub sand: BlockState,
    }

    pub fn states() -> TestStates {
        let cache = BlockStateCache::new(Arc::new(SimpleBlockRegistry::overworld()));
        let stone = cache.from_native(&NativeBlockState::parse("minecraft:stone"));
        let sand = cache.from_native(&NativeBlockState::parse("minecraft:sand"));
        TestStates { cache, stone, sand }
    }

    pub fn data(material: &BlockState, min_height: i32, max_height: i32) -> LodDataPoint {
        LodDataPoint::new(min_height, max_height, material.clone(), 15)
    }
}

// ████████╗███████╗███████╗████████╗
// ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝
//    ██║   █████╗  ███████╗   ██║
//    ██║   ██╔══╝  ╚════██║   ██║
//    ██║   ███████╗███████║   ██║
//    ╚═╝   ╚══════╝╚══════╝   ╚═╝
