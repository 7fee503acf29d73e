use crate::context::GenerationContext;
use crate::error::GenerationError;
use crate::summary::{ChunkColumns, ColumnSample};

use horizon_map::glam::IVec3;
use horizon_map::{
    chunk_min, BlockState, BlockStateCache, ChunkPos, DimensionConfig, GenerationMode, GenerationStep, LodDataPoint,
    NativeBlockState, ScheduledTick,
};

use noise::{Fbm, MultiFractal, NoiseFn, Perlin};

/// Produces an approximate surface for chunks that were never generated by the host.
pub trait TerrainSynthesizer: Send + Sync {
    fn synthesize(
        &self,
        ctx: &GenerationContext,
        chunk: ChunkPos,
        step: GenerationStep,
    ) -> Result<ChunkColumns, GenerationError>;
}

const HEIGHT_FREQUENCY: f64 = 1.0 / 512.0;
const HEIGHT_OCTAVES: usize = 5;
const HEIGHT_AMPLITUDE: f64 = 48.0;
/// Columns this close above sea level are beaches.
const SHORE_HEIGHT: i32 = 2;
const SNOW_LINE: i32 = 40;
const FALLING_BLOCK_DELAY: i32 = 2;

struct Materials {
    grass: BlockState,
    sand: BlockState,
    snow: BlockState,
    water: BlockState,
}

/// A fractal Brownian motion height field around sea level.
pub struct NoiseSynthesizer {
    height: Fbm<Perlin>,
    sea_level: i32,
    min_y: i32,
    max_y: i32,
    materials: Materials,
}

impl NoiseSynthesizer {
    pub fn new(blocks: &BlockStateCache, dimension: &DimensionConfig) -> Self {
        let height = Fbm::<Perlin>::new(dimension.seed)
            .set_octaves(HEIGHT_OCTAVES)
            .set_frequency(HEIGHT_FREQUENCY);
        let state = |id: &str| blocks.from_native(&NativeBlockState::parse(id));
        let min_y = dimension.min_section * 16;
        Self {
            height,
            sea_level: dimension.sea_level,
            min_y,
            max_y: min_y + dimension.section_count as i32 * 16,
            materials: Materials {
                grass: blocks.from_native(&NativeBlockState::parse("minecraft:grass_block").with("snowy", "false")),
                sand: state("minecraft:sand"),
                snow: state("minecraft:snow_block"),
                water: blocks.from_native(&NativeBlockState::parse("minecraft:water").with("level", "0")),
            },
        }
    }

    /// Surface height of the noise field at a block column.
    pub fn height_at(&self, x: i32, z: i32) -> i32 {
        let n = self.height.get([x as f64, z as f64]);
        let h = self.sea_level + (n * HEIGHT_AMPLITUDE).round() as i32;
        h.clamp(self.min_y + 1, self.max_y)
    }

    fn column(&self, x: i32, z: i32, mode: GenerationMode, ticks: &mut Vec<ScheduledTick>) -> ColumnSample {
        let sky = LodDataPoint::pack_light(0, 15);
        let terrain = self.height_at(x, z);

        if mode <= GenerationMode::BiomeOnly {
            // Flat world; only the biome (ocean or land) is known.
            let material = if terrain < self.sea_level {
                self.materials.water.clone()
            } else {
                self.materials.grass.clone()
            };
            return ColumnSample {
                height: self.sea_level,
                material,
                light: sky,
            };
        }

        if terrain < self.sea_level {
            return ColumnSample {
                height: self.sea_level,
                material: self.materials.water.clone(),
                light: sky,
            };
        }
        let material = if terrain <= self.sea_level + SHORE_HEIGHT {
            ticks.push(ScheduledTick {
                id: "minecraft:sand".into(),
                pos: IVec3::new(x, terrain - 1, z),
                delay: FALLING_BLOCK_DELAY,
                priority: 0,
            });
            self.materials.sand.clone()
        } else if terrain >= self.sea_level + SNOW_LINE {
            self.materials.snow.clone()
        } else {
            self.materials.grass.clone()
        };
        ColumnSample {
            height: terrain,
            material,
            light: sky,
        }
    }
}

impl TerrainSynthesizer for NoiseSynthesizer {
    fn synthesize(
        &self,
        ctx: &GenerationContext,
        chunk: ChunkPos,
        step: GenerationStep,
    ) -> Result<ChunkColumns, GenerationError> {
        let mode = step.mode();
        let min = chunk_min(chunk).into_inner();
        let mut columns = Vec::with_capacity(16 * 16);
        let mut ticks = Vec::new();
        for z in 0..16 {
            ctx.checkpoint("synthesizing")?;
            for x in 0..16 {
                columns.push(self.column(min.x + x, min.y + z, mode, &mut ticks));
            }
        }
        Ok(ChunkColumns {
            position: chunk,
            mode,
            columns,
            ticks,
        })
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
    use horizon_map::SimpleBlockRegistry;
    use std::sync::Arc;

    fn synthesizer() -> NoiseSynthesizer {
        let blocks = BlockStateCache::new(Arc::new(SimpleBlockRegistry::overworld()));
        NoiseSynthesizer::new(&blocks, &DimensionConfig::default())
    }

    #[test]
    fn biome_only_terrain_is_flat() {
        let synth = synthesizer();
        let columns = synth
            .synthesize(&GenerationContext::live(), ChunkPos::new(5, -9), GenerationStep::Biomes)
            .unwrap();
        assert_eq!(columns.mode, GenerationMode::BiomeOnly);
        assert_eq!(columns.columns.len(), 256);
        assert!(columns.columns.iter().all(|c| c.height == 63));
        assert!(columns.ticks.is_empty());
    }

    #[test]
    fn synthesis_is_deterministic() {
        let a = synthesizer();
        let b = synthesizer();
        let chunk = ChunkPos::new(100, 37);
        let ca = a
            .synthesize(&GenerationContext::live(), chunk, GenerationStep::Features)
            .unwrap();
        let cb = b
            .synthesize(&GenerationContext::live(), chunk, GenerationStep::Features)
            .unwrap();
        assert_eq!(ca.columns, cb.columns);
        assert_eq!(ca.ticks, cb.ticks);
        assert_eq!(ca.mode, GenerationMode::Features);
    }

    #[test]
    fn beaches_schedule_falling_sand() {
        let synth = synthesizer();
        let mut found_beach = false;
        'search: for cx in -64..64 {
            let columns = synth
                .synthesize(&GenerationContext::live(), ChunkPos::new(cx, 0), GenerationStep::Surface)
                .unwrap();
            for c in columns.columns.iter() {
                if c.material.native().block.path == "sand" {
                    assert!(!columns.ticks.is_empty());
                    assert!(columns.ticks.iter().all(|t| t.id == "minecraft:sand"));
                    found_beach = true;
                    break 'search;
                }
            }
        }
        assert!(found_beach);
    }
}
