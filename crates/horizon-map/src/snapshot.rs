//! Decoding persisted chunks into [`TerrainSnapshot`]s.

mod heightmap;
mod packing;
mod schema;
mod section;

pub use heightmap::*;
pub use packing::*;
pub use schema::*;
pub use section::*;

use crate::block_state::{BlockState, BlockStateCache};
use crate::coordinates::chunk_chessboard_distance;
use crate::core::glam::IVec3;
use crate::dimension::{DimensionContext, SECTION_HEIGHT};
use crate::mode::{GenerationMode, GenerationStep, LightMode};
use crate::payload::decompress_payload;
use crate::structure::{StructureData, MAX_REFERENCE_DISTANCE};
use crate::tag::{read_root, Compound, Tag, TagError};
use crate::units::ChunkPos;

use log::{debug, error, trace, warn};
use std::io;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("malformed chunk: {0}")]
    Malformed(String),
    #[error("invalid tag data: {0}")]
    Tag(#[from] TagError),
    #[error("failed to decompress chunk: {0}")]
    Io(#[from] io::Error),
    #[error("unsupported data version {0:?}")]
    UnsupportedVersion(Option<i32>),
}

/// A block or fluid update that was pending when the chunk was saved.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ScheduledTick {
    pub id: String,
    /// Absolute block position.
    pub pos: IVec3,
    pub delay: i32,
    pub priority: i32,
}

impl ScheduledTick {
    fn read(tag: &Compound) -> Option<Self> {
        Some(Self {
            id: tag.get_str("i")?.to_string(),
            pos: IVec3::new(tag.get_i32("x")?, tag.get_i32("y")?, tag.get_i32("z")?),
            delay: tag.get_i32("t").unwrap_or(0),
            priority: tag.get_i32("p").unwrap_or(0),
        })
    }
}

/// A decoded chunk column. Built once per decode and dropped after generation consumes it.
#[derive(Clone, Debug)]
pub struct TerrainSnapshot {
    pub position: ChunkPos,
    pub data_version: i32,
    /// Name of the [`ChunkSchema`] that decoded this chunk.
    pub schema: &'static str,
    pub status: GenerationStep,
    pub light_on: bool,
    pub min_section: i32,
    /// Indexed from the bottom of the dimension. `None` sections are entirely air.
    pub sections: Vec<Option<Section>>,
    pub heightmaps: Heightmaps,
    /// Block positions packed per section as `x | z << 4 | y << 8`.
    pub post_processing: Vec<Vec<i16>>,
    pub block_ticks: Vec<ScheduledTick>,
    pub fluid_ticks: Vec<ScheduledTick>,
    pub structures: StructureData,
    has_sky_light: bool,
    air: BlockState,
    default_biome: Arc<str>,
}

impl TerrainSnapshot {
    pub fn mode(&self) -> GenerationMode {
        self.status.mode()
    }

    pub fn min_y(&self) -> i32 {
        self.min_section * SECTION_HEIGHT
    }

    /// Exclusive.
    pub fn max_y(&self) -> i32 {
        self.min_y() + self.sections.len() as i32 * SECTION_HEIGHT
    }

    fn section_at(&self, y: i32) -> Option<&Section> {
        let i = y.div_euclid(SECTION_HEIGHT) - self.min_section;
        if i < 0 {
            return None;
        }
        self.sections.get(i as usize)?.as_ref()
    }

    /// `x` and `z` are local to the chunk; `y` is absolute.
    pub fn block_at(&self, x: u32, y: i32, z: u32) -> &BlockState {
        match self.section_at(y) {
            Some(s) => s.block(x, y.rem_euclid(SECTION_HEIGHT) as u32, z),
            None => &self.air,
        }
    }

    pub fn biome_at(&self, x: u32, y: i32, z: u32) -> &Arc<str> {
        match self.section_at(y) {
            Some(s) => s.biome(x, y.rem_euclid(SECTION_HEIGHT) as u32, z),
            None => &self.default_biome,
        }
    }

    /// One past the highest non-air block of the column.
    pub fn surface_height(&self, x: u32, z: u32) -> i32 {
        self.heightmaps
            .get(HeightmapKind::WorldSurface, x, z)
            .unwrap_or_else(|| self.min_y())
    }

    /// Persisted sky light when it was kept; otherwise full light above the surface and none below.
    pub fn sky_light_at(&self, x: u32, y: i32, z: u32) -> u8 {
        if !self.has_sky_light {
            return 0;
        }
        if let Some(light) = self
            .section_at(y)
            .and_then(|s| s.sky_light(x, y.rem_euclid(SECTION_HEIGHT) as u32, z))
        {
            return light;
        }
        if y >= self.surface_height(x, z) {
            15
        } else {
            0
        }
    }

    pub fn block_light_at(&self, x: u32, y: i32, z: u32) -> u8 {
        self.section_at(y)
            .and_then(|s| s.block_light(x, y.rem_euclid(SECTION_HEIGHT) as u32, z))
            .unwrap_or(0)
    }

    pub fn pending_ticks(&self) -> impl Iterator<Item = &ScheduledTick> {
        self.block_ticks.iter().chain(self.fluid_ticks.iter())
    }
}

/// Decodes chunk payloads with the [`ChunkSchema`] matching their data version.
pub struct SnapshotDecoder {
    blocks: Arc<BlockStateCache>,
    dimension: DimensionContext,
    schemas: Vec<Box<dyn ChunkSchema>>,
}

struct OpenedChunk<'s, 'r> {
    schema: &'s dyn ChunkSchema,
    data_version: i32,
    level: &'r Compound,
}

impl SnapshotDecoder {
    pub fn new(blocks: Arc<BlockStateCache>, dimension: DimensionContext) -> Self {
        Self {
            blocks,
            dimension,
            schemas: default_schemas(),
        }
    }

    /// Adds a schema that takes precedence over the existing ones for its versions.
    pub fn with_schema(mut self, schema: Box<dyn ChunkSchema>) -> Self {
        self.schemas.insert(0, schema);
        self
    }

    pub fn blocks(&self) -> &Arc<BlockStateCache> {
        &self.blocks
    }

    pub fn dimension(&self) -> &DimensionContext {
        &self.dimension
    }

    pub fn schema_for(&self, data_version: Option<i32>) -> Result<&dyn ChunkSchema, DecodeError> {
        let version = data_version.ok_or(DecodeError::UnsupportedVersion(None))?;
        self.schemas
            .iter()
            .find(|s| s.versions().contains(&version))
            .map(|s| &**s)
            .ok_or(DecodeError::UnsupportedVersion(data_version))
    }

    /// Decodes the chunk at `position`.
    ///
    /// Returns `Ok(None)` when the payload belongs to a different position, or when the chunk has not reached `requested`
    /// and must be generated instead.
    pub fn decode(
        &self,
        position: ChunkPos,
        payload: &[u8],
        requested: GenerationStep,
        light_mode: LightMode,
    ) -> Result<Option<TerrainSnapshot>, DecodeError> {
        let root = read_root(&decompress_payload(payload)?)?;
        let chunk = match self.open(&root, position)? {
            Some(c) => c,
            None => return Ok(None),
        };
        let OpenedChunk {
            schema,
            data_version,
            level,
        } = chunk;

        let status = match level.get_str("Status") {
            Some(name) => GenerationStep::from_status_name(name).unwrap_or_else(|| {
                debug!("Chunk {} has unknown status {:?}", position, name);
                GenerationStep::Empty
            }),
            None => GenerationStep::Empty,
        };
        if status < requested {
            trace!("Chunk {} is only at {:?}, {:?} was requested", position, status, requested);
            return Ok(None);
        }

        let light_on = level
            .get_bool("isLightOn")
            .unwrap_or(status >= GenerationStep::Light);
        let keep_light = light_on && light_mode == LightMode::Fancy;
        let ctx = SectionContext {
            blocks: &self.blocks,
            dimension: &self.dimension,
            keep_light,
        };
        let sections = schema.read_sections(level, &ctx)?;

        let heightmaps = Heightmaps::prime(&sections, &self.dimension);
        match Heightmaps::read(
            level.get_compound("Heightmaps"),
            schema.packing(),
            schema.height_origin(&self.dimension),
            &self.dimension,
        ) {
            Ok(stored) => {
                let mismatched = heightmaps.mismatched_columns(&stored);
                if mismatched > 0 {
                    debug!("Chunk {} stored {} heightmap columns that disagree with its blocks", position, mismatched);
                }
            }
            Err(e) => debug!("Ignoring unreadable heightmaps of chunk {}: {}", position, e),
        }

        let post_processing = self.read_post_processing(schema, level);
        let tick_tags = schema.tick_tags();
        let block_ticks = read_ticks(level, tick_tags.blocks);
        let fluid_ticks = read_ticks(level, tick_tags.fluids);
        let structures = self.read_structures(schema, level, position);

        Ok(Some(TerrainSnapshot {
            position,
            data_version,
            schema: schema.name(),
            status,
            light_on,
            min_section: self.dimension.min_section,
            sections,
            heightmaps,
            post_processing,
            block_ticks,
            fluid_ticks,
            structures,
            has_sky_light: self.dimension.has_sky_light,
            air: self.blocks.air().clone(),
            default_biome: self.dimension.default_biome.clone(),
        }))
    }

    /// Reads only the structure starts and references of the chunk at `position`.
    pub fn decode_structures(&self, position: ChunkPos, payload: &[u8]) -> Result<Option<StructureData>, DecodeError> {
        let root = read_root(&decompress_payload(payload)?)?;
        Ok(self
            .open(&root, position)?
            .map(|chunk| self.read_structures(chunk.schema, chunk.level, position)))
    }

    fn open<'s, 'r>(&'s self, root: &'r Compound, position: ChunkPos) -> Result<Option<OpenedChunk<'s, 'r>>, DecodeError> {
        let data_version = root.get_i32("DataVersion");
        let schema = self.schema_for(data_version)?;
        let level = schema
            .level(root)
            .ok_or_else(|| DecodeError::Malformed(format!("{} chunk without level data", schema.name())))?;

        let (x, z) = match (level.get_i32("xPos"), level.get_i32("zPos")) {
            (Some(x), Some(z)) => (x, z),
            _ => return Err(DecodeError::Malformed("chunk without position".into())),
        };
        if (x, z) != (position.x(), position.z()) {
            error!(
                "Chunk file at {} is in the wrong location; found [{}, {}]. Ignoring it",
                position, x, z
            );
            return Ok(None);
        }

        Ok(Some(OpenedChunk {
            schema,
            // `schema_for` rejects a missing version.
            data_version: data_version.unwrap_or_default(),
            level,
        }))
    }

    fn read_post_processing(&self, schema: &dyn ChunkSchema, level: &Compound) -> Vec<Vec<i16>> {
        let mut queues = vec![Vec::new(); self.dimension.section_count as usize];
        let base_section = schema.height_origin(&self.dimension).div_euclid(SECTION_HEIGHT);
        for (i, list) in level.get_list("PostProcessing").unwrap_or_default().iter().enumerate() {
            let index = match self.dimension.section_index(base_section + i as i32) {
                Some(index) => index,
                None => continue,
            };
            queues[index] = list
                .as_list()
                .unwrap_or_default()
                .iter()
                .filter_map(|t| match t {
                    Tag::Short(packed) => Some(*packed),
                    _ => None,
                })
                .collect();
        }
        queues
    }

    fn read_structures(&self, schema: &dyn ChunkSchema, level: &Compound, position: ChunkPos) -> StructureData {
        let tags = schema.structure_tags();
        let mut structures = match level.get_compound(tags.root) {
            Some(tag) => StructureData::read(tag, tags.starts, tags.references, position),
            None => return StructureData::default(),
        };
        for (id, refs) in structures.references.iter_mut() {
            refs.retain(|&r| {
                let keep = chunk_chessboard_distance(r, position) <= MAX_REFERENCE_DISTANCE;
                if !keep {
                    warn!(
                        "Chunk {} references {} at {}, which is too far away. Dropping the reference",
                        position, id, r
                    );
                }
                keep
            });
        }
        structures.references.retain(|_, refs| !refs.is_empty());
        structures
    }
}

fn read_ticks(level: &Compound, name: &str) -> Vec<ScheduledTick> {
    level
        .get_list(name)
        .unwrap_or_default()
        .iter()
        .filter_map(|t| t.as_compound().and_then(ScheduledTick::read))
        .collect()
}

#[cfg(test)]
pub(crate) mod test_util {
    use super::*;
    use crate::block_state::SimpleBlockRegistry;
    use crate::payload::{compress_payload, Compression};
    use crate::tag::write_root;

    pub const SPANNING_VERSION: i32 = 2230;
    pub const ALIGNED_VERSION: i32 = 2586;
    pub const CONTAINER_VERSION: i32 = 3120;

    pub fn decoder() -> SnapshotDecoder {
        let blocks = BlockStateCache::new(Arc::new(SimpleBlockRegistry::overworld()));
        SnapshotDecoder::new(Arc::new(blocks), DimensionContext::default())
    }

    /// Block indices where each horizontal layer is filled with `layer(local_y)`.
    pub fn layers(layer: impl Fn(u32) -> u16) -> Vec<u16> {
        (0..SECTION_VOLUME as u32).map(|i| layer(i / 256)).collect()
    }

    fn block_palette(palette: &[&str]) -> Vec<Tag> {
        palette
            .iter()
            .map(|name| Tag::Compound(Compound::new().with("Name", *name)))
            .collect()
    }

    pub fn legacy_section(y: i32, palette: &[&str], indices: &[u16], packing: Packing) -> Tag {
        let bits = bits_for_palette(palette.len()).max(4);
        Tag::Compound(
            Compound::new()
                .with("Y", y as i8)
                .with("Palette", block_palette(palette))
                .with("BlockStates", packing.pack(indices, bits)),
        )
    }

    pub fn container_section(y: i32, palette: &[&str], indices: &[u16]) -> Compound {
        let mut states = Compound::new().with("palette", block_palette(palette));
        if palette.len() > 1 {
            let bits = bits_for_palette(palette.len()).max(4);
            states.insert("data", Packing::Aligned.pack(indices, bits));
        }
        Compound::new()
            .with("Y", y as i8)
            .with("block_states", states)
            .with("biomes", Compound::new().with("palette", vec![Tag::from("minecraft:plains")]))
    }

    /// The tags common to every chunk layout.
    pub fn level(position: ChunkPos, status: &str) -> Compound {
        Compound::new()
            .with("xPos", position.x())
            .with("zPos", position.z())
            .with("Status", status)
    }

    pub fn legacy_root(data_version: i32, level: Compound) -> Compound {
        Compound::new()
            .with("DataVersion", data_version)
            .with("Level", level)
    }

    pub fn container_root(level: Compound) -> Compound {
        level.with("DataVersion", CONTAINER_VERSION)
    }

    pub fn to_payload(root: &Compound) -> Vec<u8> {
        compress_payload(Compression::Zlib, &write_root(root)).unwrap()
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
    use super::test_util::*;
    use super::*;
    use crate::coordinates::pack_chunk_pos;

    /// Four layers of stone at the bottom of the dimension, air above.
    fn stone_floor(position: ChunkPos) -> Compound {
        let section = container_section(-4, &["minecraft:stone", "minecraft:air"], &layers(|y| (y >= 4) as u16));
        level(position, "minecraft:full").with("sections", vec![Tag::Compound(section)])
    }

    #[test]
    fn decodes_container_chunk() {
        let decoder = decoder();
        let position = ChunkPos::new(3, -2);
        let payload = to_payload(&container_root(stone_floor(position)));

        let snapshot = decoder
            .decode(position, &payload, GenerationStep::Features, LightMode::Fancy)
            .unwrap()
            .unwrap();
        assert_eq!(snapshot.schema, "ContainerPalette");
        assert_eq!(snapshot.status, GenerationStep::Full);
        assert_eq!(snapshot.sections.len(), 24);
        assert_eq!(snapshot.block_at(5, -64, 5).native().block.path, "stone");
        assert_eq!(snapshot.block_at(5, -61, 5).native().block.path, "stone");
        assert!(snapshot.block_at(5, -60, 5).is_air());
        // Sections that were never saved are air.
        assert!(snapshot.block_at(5, 100, 5).is_air());
        assert_eq!(&**snapshot.biome_at(0, -64, 0), "minecraft:plains");
        assert_eq!(snapshot.post_processing.len(), 24);
        assert!(snapshot.post_processing.iter().all(|q| q.is_empty()));

        // Derived from the blocks.
        assert_eq!(snapshot.surface_height(0, 0), -60);
        assert_eq!(snapshot.heightmaps.get(HeightmapKind::OceanFloor, 15, 15), Some(-60));
    }

    #[test]
    fn decodes_spanning_chunk_with_legacy_biomes() {
        let decoder = decoder();
        let position = ChunkPos::new(0, 0);
        let palette = ["minecraft:air", "minecraft:stone", "minecraft:water"];
        let indices = layers(|y| match y {
            0..=1 => 1,
            2..=4 => 2,
            _ => 0,
        });
        let level = level(position, "full")
            .with("Sections", vec![legacy_section(0, &palette, &indices, Packing::Spanning)])
            .with("Biomes", vec![0i32; 256]);
        let payload = to_payload(&legacy_root(SPANNING_VERSION, level));

        let snapshot = decoder
            .decode(position, &payload, GenerationStep::Surface, LightMode::Fancy)
            .unwrap()
            .unwrap();
        assert_eq!(snapshot.schema, "SpanningPalette");
        assert_eq!(snapshot.block_at(0, 1, 0).native().block.path, "stone");
        assert!(snapshot.block_at(0, 4, 0).is_liquid());
        assert_eq!(&**snapshot.biome_at(8, 3, 8), "minecraft:ocean");
        assert_eq!(snapshot.surface_height(8, 8), 5);
        assert_eq!(snapshot.heightmaps.get(HeightmapKind::OceanFloor, 8, 8), Some(2));
    }

    #[test]
    fn stored_heightmaps_do_not_override_blocks() {
        let decoder = decoder();
        let position = ChunkPos::new(0, 0);
        // 300 above the bottom of the dimension, far above the stone.
        let stored = Packing::Aligned.pack(&[300; 256], 9);
        let level = stone_floor(position).with("Heightmaps", Compound::new().with("WORLD_SURFACE", stored));
        let payload = to_payload(&container_root(level));

        let snapshot = decoder
            .decode(position, &payload, GenerationStep::Empty, LightMode::Fancy)
            .unwrap()
            .unwrap();
        assert_eq!(snapshot.surface_height(0, 0), -60);
        assert_eq!(snapshot.surface_height(3, 3), -60);
        assert_eq!(snapshot.heightmaps.get(HeightmapKind::OceanFloor, 3, 3), Some(-60));
        assert_eq!(snapshot.block_at(0, -61, 0).native().block.path, "stone");
        assert!(snapshot.block_at(0, 235, 0).is_air());

        let stored = Heightmaps::read(
            Some(&Compound::new().with("WORLD_SURFACE", Packing::Aligned.pack(&[300; 256], 9))),
            Packing::Aligned,
            -64,
            decoder.dimension(),
        )
        .unwrap();
        assert_eq!(snapshot.heightmaps.mismatched_columns(&stored), 256);
        assert_eq!(snapshot.heightmaps.mismatched_columns(&snapshot.heightmaps), 0);
    }

    #[test]
    fn unreadable_stored_heightmaps_are_ignored() {
        let decoder = decoder();
        let position = ChunkPos::new(0, 0);
        let level = stone_floor(position).with("Heightmaps", Compound::new().with("WORLD_SURFACE", vec![0i64; 3]));
        let payload = to_payload(&container_root(level));

        let snapshot = decoder
            .decode(position, &payload, GenerationStep::Empty, LightMode::Fancy)
            .unwrap()
            .unwrap();
        assert_eq!(snapshot.surface_height(7, 7), -60);
    }

    #[test]
    fn aligned_schema_rejects_short_block_states() {
        let decoder = decoder();
        let position = ChunkPos::new(0, 0);
        let palette: Vec<String> = (0..17).map(|i| format!("minecraft:block_{}", i)).collect();
        let palette: Vec<&str> = palette.iter().map(String::as_str).collect();
        // 5 bit indices need 342 aligned longs; spanning packing only produces 320.
        let section = legacy_section(0, &palette, &[0; 4096], Packing::Spanning);
        let level = level(position, "full").with("Sections", vec![section]);
        let payload = to_payload(&legacy_root(ALIGNED_VERSION, level));

        assert!(matches!(
            decoder.decode(position, &payload, GenerationStep::Empty, LightMode::Fancy),
            Err(DecodeError::Malformed(_))
        ));
    }

    #[test]
    fn position_mismatch_is_absent() {
        let decoder = decoder();
        let payload = to_payload(&container_root(stone_floor(ChunkPos::new(1, 0))));
        assert!(decoder
            .decode(ChunkPos::new(0, 0), &payload, GenerationStep::Empty, LightMode::Fancy)
            .unwrap()
            .is_none());
        assert!(decoder
            .decode_structures(ChunkPos::new(0, 0), &payload)
            .unwrap()
            .is_none());
    }

    #[test]
    fn incomplete_chunks_are_absent() {
        let decoder = decoder();
        let position = ChunkPos::new(0, 0);
        let payload = to_payload(&container_root(level(position, "minecraft:noise")));

        assert!(decoder
            .decode(position, &payload, GenerationStep::Features, LightMode::Fancy)
            .unwrap()
            .is_none());
        let snapshot = decoder
            .decode(position, &payload, GenerationStep::Noise, LightMode::Fancy)
            .unwrap()
            .unwrap();
        assert_eq!(snapshot.mode(), GenerationMode::BiomeOnlySimulateHeight);

        // No status at all means nothing was generated.
        let payload = to_payload(&container_root(Compound::new().with("xPos", 0).with("zPos", 0)));
        assert!(decoder
            .decode(position, &payload, GenerationStep::Biomes, LightMode::Fancy)
            .unwrap()
            .is_none());
    }

    #[test]
    fn unsupported_versions_are_errors() {
        let decoder = decoder();
        let position = ChunkPos::new(0, 0);

        let old = to_payload(&legacy_root(100, level(position, "full")));
        assert!(matches!(
            decoder.decode(position, &old, GenerationStep::Empty, LightMode::Fancy),
            Err(DecodeError::UnsupportedVersion(Some(100)))
        ));

        let unversioned = to_payload(&level(position, "full"));
        assert!(matches!(
            decoder.decode(position, &unversioned, GenerationStep::Empty, LightMode::Fancy),
            Err(DecodeError::UnsupportedVersion(None))
        ));

        assert!(matches!(
            decoder.decode(position, &[9, 1, 2], GenerationStep::Empty, LightMode::Fancy),
            Err(DecodeError::Io(_))
        ));
    }

    #[test]
    fn fast_light_discards_persisted_light() {
        let decoder = decoder();
        let position = ChunkPos::new(0, 0);
        let section = container_section(-4, &["minecraft:stone", "minecraft:air"], &layers(|y| (y >= 4) as u16))
            .with("SkyLight", vec![0x77i8; 2048])
            .with("BlockLight", vec![0x11i8; 2048]);
        let level = level(position, "full")
            .with("isLightOn", true)
            .with("sections", vec![Tag::Compound(section)]);
        let payload = to_payload(&container_root(level));

        let fancy = decoder
            .decode(position, &payload, GenerationStep::Empty, LightMode::Fancy)
            .unwrap()
            .unwrap();
        assert!(fancy.light_on);
        assert_eq!(fancy.sky_light_at(0, -50, 0), 7);
        assert_eq!(fancy.block_light_at(0, -50, 0), 1);

        let fast = decoder
            .decode(position, &payload, GenerationStep::Empty, LightMode::Fast)
            .unwrap()
            .unwrap();
        assert_eq!(fast.sky_light_at(0, -50, 0), 15);
        assert_eq!(fast.sky_light_at(0, -62, 0), 0);
        assert_eq!(fast.block_light_at(0, -50, 0), 0);
    }

    #[test]
    fn reads_ticks_and_post_processing() {
        let decoder = decoder();
        let position = ChunkPos::new(1, 1);
        let tick = |id: &str, y: i32| {
            Tag::Compound(
                Compound::new()
                    .with("i", id)
                    .with("x", 17)
                    .with("y", y)
                    .with("z", 18)
                    .with("t", 2)
                    .with("p", 0),
            )
        };
        let mut queues = vec![Tag::List(Vec::new()); 24];
        queues[4] = Tag::List(vec![Tag::Short(0x123)]);
        let level = level(position, "full")
            .with("block_ticks", vec![tick("minecraft:sand", 70)])
            .with("fluid_ticks", vec![tick("minecraft:water", 62), Tag::Compound(Compound::new())])
            .with("PostProcessing", queues);
        let payload = to_payload(&container_root(level));

        let snapshot = decoder
            .decode(position, &payload, GenerationStep::Empty, LightMode::Fancy)
            .unwrap()
            .unwrap();
        let ticks: Vec<_> = snapshot.pending_ticks().map(|t| (t.id.as_str(), t.pos)).collect();
        assert_eq!(
            ticks,
            vec![
                ("minecraft:sand", IVec3::new(17, 70, 18)),
                ("minecraft:water", IVec3::new(17, 62, 18))
            ]
        );
        assert_eq!(snapshot.post_processing[4], vec![0x123]);
        assert!(snapshot.post_processing[3].is_empty());
    }

    #[test]
    fn distant_structure_references_are_dropped() {
        let decoder = decoder();
        let position = ChunkPos::new(10, 10);
        let refs = vec![
            pack_chunk_pos(ChunkPos::new(12, 4)),
            pack_chunk_pos(ChunkPos::new(30, 10)),
        ];
        let structures = Compound::new()
            .with("starts", Compound::new())
            .with(
                "References",
                Compound::new()
                    .with("minecraft:village", refs)
                    .with("minecraft:mineshaft", vec![pack_chunk_pos(ChunkPos::new(-10, 10))]),
            );
        let level = level(position, "full").with("structures", structures);
        let payload = to_payload(&container_root(level));

        let structures = decoder.decode_structures(position, &payload).unwrap().unwrap();
        assert_eq!(structures.references.len(), 1);
        assert_eq!(structures.references["minecraft:village"], vec![ChunkPos::new(12, 4)]);
    }
}
