use super::{LodIndex, LodNode, VisitCommand};
use crate::coordinates::{Level, NodeKey, REGION_LEVEL};
use crate::core::geometry::Annulus;
use crate::core::glam::Vec2;
use crate::mode::ModeMask;
use crate::units::BlockUnits;

impl LodIndex {
    /// Returns the nodes at `level` that intersect the annulus `[min_dist, max_dist)` around `center` and whose mode is in
    /// `mask`.
    ///
    /// Only regions overlapping the annulus are locked, and subtrees outside of it are skipped.
    pub fn nodes_to_render(
        &self,
        center: BlockUnits<Vec2>,
        level: Level,
        min_dist: f32,
        max_dist: f32,
        mask: ModeMask,
    ) -> Vec<LodNode> {
        let level = level.min(REGION_LEVEL);
        let annulus = Annulus::new(center.into_inner(), min_dist, max_dist);
        let regions = self.regions_in_window(|coords| {
            annulus.intersects(NodeKey::new(REGION_LEVEL, coords).extent().into_inner())
        });

        let mut nodes = Vec::new();
        for region in regions {
            region.read().visit(level, |key, value| {
                if !annulus.intersects(key.extent().into_inner()) {
                    return VisitCommand::SkipDescendants;
                }
                if key.level == level {
                    if let Some(node) = value.filter(|n| mask.contains(n.mode)) {
                        nodes.push(node.clone());
                    }
                }
                VisitCommand::Continue
            });
        }
        nodes
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
    use crate::core::glam::IVec2;
    use crate::index::test_util::{data, states};
    use crate::mode::GenerationMode;

    #[test]
    fn filters_by_distance_and_mode() {
        let states = states();
        let index = LodIndex::new(IndexConfig { window_radius: 2 });
        let near = NodeKey::new(CHUNK_LEVEL, IVec2::new(2, 0));
        let near_biome = NodeKey::new(CHUNK_LEVEL, IVec2::new(0, 2));
        let far = NodeKey::new(CHUNK_LEVEL, IVec2::new(40, 0));
        index.add(LodNode::new(near, data(&states.stone, 0, 1), GenerationMode::Surface));
        index.add(LodNode::new(near_biome, data(&states.sand, 0, 1), GenerationMode::BiomeOnly));
        index.add(LodNode::new(far, data(&states.stone, 0, 1), GenerationMode::Full));

        let center = BlockUnits(Vec2::ZERO);
        let found = index.nodes_to_render(
            center,
            CHUNK_LEVEL,
            0.0,
            100.0,
            ModeMask::at_least(GenerationMode::Surface),
        );
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].key, near);

        let all = index.nodes_to_render(center, CHUNK_LEVEL, 0.0, 1000.0, ModeMask::ALL);
        assert_eq!(all.len(), 3);

        let band = index.nodes_to_render(center, CHUNK_LEVEL, 200.0, 1000.0, ModeMask::ALL);
        assert_eq!(band.len(), 1);
        assert_eq!(band[0].key, far);
    }
}
