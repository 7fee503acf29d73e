use super::LodIndex;
use crate::coordinates::{Level, NodeKey, REGION_LEVEL};
use crate::core::geometry::{closest_distance, Annulus};
use crate::core::glam::{IVec2, Vec2};
use crate::mode::GenerationMode;
use crate::units::BlockUnits;

use float_ord::FloatOrd;
use std::collections::BinaryHeap;

/// A quadrant that lacks the requested fidelity.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GenerateCandidate {
    pub key: NodeKey,
    /// Distance from the search center to the closest point of the quadrant.
    pub distance: f32,
    /// Mode of the node currently in the index, if any.
    pub existing: Option<GenerationMode>,
}

impl LodIndex {
    /// Lazily enumerates the quadrants at `level` that intersect the annulus `[min_dist, max_dist)` around `center` and hold
    /// less than `mode` fidelity, nearest first.
    ///
    /// Only regions inside the current window are searched. Levels above [`REGION_LEVEL`] are clamped to it.
    pub fn nodes_to_generate(
        &self,
        center: BlockUnits<Vec2>,
        level: Level,
        mode: GenerationMode,
        min_dist: f32,
        max_dist: f32,
    ) -> GenerateSearch<'_> {
        let annulus = Annulus::new(center.into_inner(), min_dist, max_dist);
        let mut heap = BinaryHeap::new();
        for region in self.window().extent().iter2() {
            let key = NodeKey::new(REGION_LEVEL, region);
            if annulus.intersects(key.extent().into_inner()) {
                heap.push(GenerateSearchNode::new(key, annulus.center));
            }
        }

        GenerateSearch {
            index: self,
            target_level: level.min(REGION_LEVEL),
            mode,
            annulus,
            heap,
        }
    }
}

/// Iterator returned by [`LodIndex::nodes_to_generate`].
///
/// Each item is checked against the index when it is popped, so nodes written while the search is in progress are not
/// offered.
pub struct GenerateSearch<'a> {
    index: &'a LodIndex,
    target_level: Level,
    mode: GenerationMode,
    annulus: Annulus,
    heap: BinaryHeap<GenerateSearchNode>,
}

impl Iterator for GenerateSearch<'_> {
    type Item = GenerateCandidate;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(GenerateSearchNode {
            key,
            closest_dist_to_center,
        }) = self.heap.pop()
        {
            if key.level == self.target_level {
                let existing = self.index.mode_at_key(key);
                if existing.map_or(true, |m| m < self.mode) {
                    return Some(GenerateCandidate {
                        key,
                        distance: closest_dist_to_center.0,
                        existing,
                    });
                }
                continue;
            }

            for child in key.children() {
                if self.annulus.intersects(child.extent().into_inner()) {
                    self.heap
                        .push(GenerateSearchNode::new(child, self.annulus.center));
                }
            }
        }
        None
    }
}

#[derive(Clone, Copy)]
struct GenerateSearchNode {
    key: NodeKey,
    closest_dist_to_center: FloatOrd<f32>,
}

impl GenerateSearchNode {
    fn new(key: NodeKey, center: Vec2) -> Self {
        Self {
            key,
            closest_dist_to_center: FloatOrd(closest_distance(center, key.extent().into_inner())),
        }
    }

    /// Deeper nodes break ties so that equally close targets come out before their ancestors are expanded.
    fn priority(&self) -> (FloatOrd<f32>, Level, i32, i32) {
        let IVec2 { x, y } = self.key.coordinates;
        (self.closest_dist_to_center, self.key.level, x, y)
    }
}

impl PartialEq for GenerateSearchNode {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}
impl Eq for GenerateSearchNode {}

impl PartialOrd for GenerateSearchNode {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for GenerateSearchNode {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        // Reversed so the max-heap pops the closest node.
        self.priority().cmp(&other.priority()).reverse()
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
    use crate::config::IndexConfig;
    use crate::coordinates::CHUNK_LEVEL;
    use crate::index::test_util::{data, states};
    use crate::index::LodNode;

    #[test]
    fn nearest_first_within_annulus() {
        let index = LodIndex::new(IndexConfig { window_radius: 1 });
        let candidates: Vec<_> = index
            .nodes_to_generate(BlockUnits(Vec2::ZERO), CHUNK_LEVEL, GenerationMode::Surface, 32.0, 100.0)
            .collect();

        assert!(!candidates.is_empty());
        for pair in candidates.windows(2) {
            assert!(pair[0].distance <= pair[1].distance);
        }
        let annulus = Annulus::new(Vec2::ZERO, 32.0, 100.0);
        for c in candidates.iter() {
            assert_eq!(c.key.level, CHUNK_LEVEL);
            assert!(annulus.intersects(c.key.extent().into_inner()));
            assert_eq!(c.existing, None);
        }
        // The four chunks touching the origin are inside the hole.
        assert!(candidates
            .iter()
            .all(|c| !(-1..=0).contains(&c.key.coordinates.x) || !(-1..=0).contains(&c.key.coordinates.y)));
    }

    #[test]
    fn never_reoffers_satisfied_nodes() {
        let states = states();
        let index = LodIndex::new(IndexConfig { window_radius: 1 });
        let search = || {
            index.nodes_to_generate(BlockUnits(Vec2::new(8.0, 8.0)), CHUNK_LEVEL, GenerationMode::Surface, 0.0, 64.0)
        };

        let first: Vec<_> = search().collect();
        let (satisfied, lacking) = first.split_at(first.len() / 2);
        for c in satisfied {
            index.add(LodNode::new(c.key, data(&states.stone, 0, 1), GenerationMode::Features));
        }
        for c in lacking {
            index.add(LodNode::new(c.key, data(&states.stone, 0, 1), GenerationMode::BiomeOnly));
        }

        let second: Vec<_> = search().collect();
        assert_eq!(second.len(), lacking.len());
        for c in second {
            assert!(satisfied.iter().all(|s| s.key != c.key));
            assert_eq!(c.existing, Some(GenerationMode::BiomeOnly));
        }
    }

    #[test]
    fn lazily_sees_concurrent_writes() {
        let states = states();
        let index = LodIndex::new(IndexConfig { window_radius: 0 });
        let mut search =
            index.nodes_to_generate(BlockUnits(Vec2::ZERO), CHUNK_LEVEL, GenerationMode::Surface, 0.0, 40.0);
        let first = search.next().unwrap();

        // Satisfy everything before continuing.
        for x in 0..32 {
            for z in 0..32 {
                index.add(LodNode::new(
                    NodeKey::new(CHUNK_LEVEL, IVec2::new(x, z)),
                    data(&states.stone, 0, 1),
                    GenerationMode::Full,
                ));
            }
        }
        assert_eq!(first.key, NodeKey::new(CHUNK_LEVEL, IVec2::ZERO));
        assert!(search.next().is_none());
    }
}
