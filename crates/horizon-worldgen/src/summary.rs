use horizon_map::{
    BlockState, ChunkPos, GenerationMode, LodDataPoint, LodNode, ModeCounter, NodeKey, ScheduledTick, TerrainSnapshot,
};

const COLUMNS: usize = 16 * 16;

/// The surface of one block column.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ColumnSample {
    /// One past the top opaque block.
    pub height: i32,
    pub material: BlockState,
    /// Packed like [`LodDataPoint::light`].
    pub light: u8,
}

/// The surface of a chunk, ready to be summarized into a chunk-level LOD node.
#[derive(Clone, Debug)]
pub struct ChunkColumns {
    pub position: ChunkPos,
    pub mode: GenerationMode,
    /// Indexed by `z * 16 + x`.
    pub columns: Vec<ColumnSample>,
    /// Ticks that were pending when the surface was produced.
    pub ticks: Vec<ScheduledTick>,
}

impl ChunkColumns {
    pub fn from_snapshot(snapshot: &TerrainSnapshot) -> Self {
        let mut columns = Vec::with_capacity(COLUMNS);
        for z in 0..16 {
            for x in 0..16 {
                let height = snapshot.surface_height(x, z);
                let material = snapshot.block_at(x, height - 1, z).clone();
                let light = if height >= snapshot.max_y() {
                    LodDataPoint::pack_light(0, 15)
                } else {
                    LodDataPoint::pack_light(
                        snapshot.block_light_at(x, height, z),
                        snapshot.sky_light_at(x, height, z),
                    )
                };
                columns.push(ColumnSample {
                    height,
                    material,
                    light,
                });
            }
        }
        Self {
            position: snapshot.position,
            mode: snapshot.mode(),
            columns,
            ticks: snapshot.pending_ticks().cloned().collect(),
        }
    }

    pub fn column(&self, x: u32, z: u32) -> &ColumnSample {
        &self.columns[(z * 16 + x) as usize]
    }

    /// The chunk-level node: height range over all columns, the most common surface material, and the light at the highest
    /// column.
    pub fn summarize(&self) -> LodNode {
        let mut materials = ModeCounter::default();
        let mut min_height = i32::MAX;
        let mut max_height = i32::MIN;
        let mut light = 0;
        for column in self.columns.iter() {
            materials.add(&column.material);
            min_height = min_height.min(column.height);
            if column.height > max_height {
                max_height = column.height;
                light = column.light;
            }
        }
        let material = materials
            .into_mode()
            .unwrap_or_else(|| self.columns[0].material.clone());

        LodNode::new(
            NodeKey::chunk(self.position),
            LodDataPoint::new(min_height, max_height, material, light),
            self.mode,
        )
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
    use horizon_map::{BlockStateCache, NativeBlockState, SimpleBlockRegistry};
    use std::sync::Arc;

    #[test]
    fn summary_takes_modal_material_and_tallest_light() {
        let cache = BlockStateCache::new(Arc::new(SimpleBlockRegistry::overworld()));
        let grass = cache.from_native(&NativeBlockState::parse("minecraft:grass_block").with("snowy", "false"));
        let sand = cache.from_native(&NativeBlockState::parse("minecraft:sand"));

        let mut columns: Vec<_> = (0..COLUMNS)
            .map(|_| ColumnSample {
                height: 70,
                material: grass.clone(),
                light: LodDataPoint::pack_light(0, 15),
            })
            .collect();
        columns[3] = ColumnSample {
            height: 64,
            material: sand.clone(),
            light: 0,
        };
        columns[200] = ColumnSample {
            height: 90,
            material: sand,
            light: LodDataPoint::pack_light(7, 12),
        };
        let chunk = ChunkColumns {
            position: ChunkPos::new(-1, 4),
            mode: GenerationMode::Surface,
            columns,
            ticks: Vec::new(),
        };

        let node = chunk.summarize();
        assert_eq!(node.key, NodeKey::chunk(ChunkPos::new(-1, 4)));
        assert_eq!(node.mode, GenerationMode::Surface);
        assert_eq!(node.data.min_height, 64);
        assert_eq!(node.data.max_height, 90);
        assert_eq!(node.data.material, grass);
        assert_eq!(node.data.block_light(), 7);
        assert_eq!(node.data.sky_light(), 12);
    }
}
