use super::packing::{bits_for_palette, Packing};
use super::section::{BiomeShape, NibbleArray, PalettedContainer, Section, BIOME_CELLS, SECTION_VOLUME};
use super::DecodeError;
use crate::block_state::{BlockState, BlockStateCache, NativeBlockState};
use crate::dimension::DimensionContext;
use crate::tag::{Compound, Tag};

use log::trace;
use ndshape::ConstShape;
use std::ops::RangeInclusive;
use std::sync::Arc;

/// Palettes of fewer than 16 block states still use 4 bits per index.
const MIN_BLOCK_BITS: u32 = 4;

/// Everything a schema needs to turn persisted sections into [`Section`]s.
pub struct SectionContext<'a> {
    pub blocks: &'a BlockStateCache,
    pub dimension: &'a DimensionContext,
    /// When false, persisted light arrays are skipped.
    pub keep_light: bool,
}

/// Tag names of the structure data in a chunk.
#[derive(Clone, Copy, Debug)]
pub struct StructureTags {
    pub root: &'static str,
    pub starts: &'static str,
    pub references: &'static str,
}

/// Tag names of the scheduled tick lists in a chunk.
#[derive(Clone, Copy, Debug)]
pub struct TickTags {
    pub blocks: &'static str,
    pub fluids: &'static str,
}

/// One revision of the persisted chunk layout.
///
/// The decoder picks a schema by matching the payload's data version against [`ChunkSchema::versions`].
pub trait ChunkSchema: Send + Sync {
    fn name(&self) -> &'static str;

    fn versions(&self) -> RangeInclusive<i32>;

    /// The compound that holds the chunk's data.
    fn level<'a>(&self, root: &'a Compound) -> Option<&'a Compound>;

    /// Layout of packed long arrays (block indices and heightmaps).
    fn packing(&self) -> Packing;

    /// The block Y that stored heightmap values are relative to.
    fn height_origin(&self, dimension: &DimensionContext) -> i32;

    /// Reads every section, placed at its index in the dimension. Missing sections are `None`.
    fn read_sections(&self, level: &Compound, ctx: &SectionContext) -> Result<Vec<Option<Section>>, DecodeError>;

    fn tick_tags(&self) -> TickTags;

    fn structure_tags(&self) -> StructureTags;
}

/// The schemas of every supported format revision.
pub fn default_schemas() -> Vec<Box<dyn ChunkSchema>> {
    vec![
        Box::new(LegacyPaletteSchema::spanning()),
        Box::new(LegacyPaletteSchema::aligned()),
        Box::new(ContainerSchema),
    ]
}

/// Sections stored under `Level`, each with a flat block palette and a long array of indices. Biomes are a single int array
/// for the whole column.
pub struct LegacyPaletteSchema {
    name: &'static str,
    versions: RangeInclusive<i32>,
    packing: Packing,
}

impl LegacyPaletteSchema {
    /// Indices may straddle longs.
    pub fn spanning() -> Self {
        Self {
            name: "SpanningPalette",
            versions: 1451..=2526,
            packing: Packing::Spanning,
        }
    }

    /// Indices are padded to whole longs.
    pub fn aligned() -> Self {
        Self {
            name: "AlignedPalette",
            versions: 2527..=2835,
            packing: Packing::Aligned,
        }
    }

    fn read_section(
        &self,
        section: &Compound,
        biomes: &LegacyBiomes,
        ctx: &SectionContext,
    ) -> Result<Option<Section>, DecodeError> {
        let y = section_y(section)?;
        let palette = match section.get_list("Palette") {
            Some(p) => read_block_palette(p, ctx.blocks)?,
            // Light-only section.
            None => return Ok(None),
        };
        let blocks = match section.get_long_array("BlockStates") {
            Some(words) => {
                let bits = bits_for_palette(palette.len()).max(MIN_BLOCK_BITS);
                let indices = self.packing.unpack(words, bits, SECTION_VOLUME)?;
                PalettedContainer::from_parts(palette, indices)?
            }
            None if palette.len() == 1 => PalettedContainer::from_parts(palette, Vec::new())?,
            None => {
                return Err(DecodeError::Malformed(format!(
                    "section {} has a palette of {} but no block states",
                    y,
                    palette.len()
                )))
            }
        };
        let (block_light, sky_light) = read_light(section, ctx)?;

        Ok(Some(Section {
            y,
            blocks,
            biomes: biomes.section(y, ctx.dimension)?,
            block_light,
            sky_light,
        }))
    }
}

impl ChunkSchema for LegacyPaletteSchema {
    fn name(&self) -> &'static str {
        self.name
    }

    fn versions(&self) -> RangeInclusive<i32> {
        self.versions.clone()
    }

    fn level<'a>(&self, root: &'a Compound) -> Option<&'a Compound> {
        root.get_compound("Level")
    }

    fn packing(&self) -> Packing {
        self.packing
    }

    fn height_origin(&self, _dimension: &DimensionContext) -> i32 {
        0
    }

    fn read_sections(&self, level: &Compound, ctx: &SectionContext) -> Result<Vec<Option<Section>>, DecodeError> {
        let biomes = LegacyBiomes::read(level)?;
        let mut sections = Vec::new();
        for tag in level.get_list("Sections").unwrap_or_default() {
            let section = tag
                .as_compound()
                .ok_or_else(|| DecodeError::Malformed("section is not a compound".into()))?;
            if let Some(s) = self.read_section(section, &biomes, ctx)? {
                sections.push(s);
            }
        }
        Ok(place_sections(sections, ctx.dimension))
    }

    fn tick_tags(&self) -> TickTags {
        TickTags {
            blocks: "TileTicks",
            fluids: "LiquidTicks",
        }
    }

    fn structure_tags(&self) -> StructureTags {
        StructureTags {
            root: "Structures",
            starts: "Starts",
            references: "References",
        }
    }
}

/// Data at the root, sections with separate paletted containers for block states and biomes.
pub struct ContainerSchema;

impl ContainerSchema {
    fn read_section(&self, section: &Compound, ctx: &SectionContext) -> Result<Option<Section>, DecodeError> {
        let y = section_y(section)?;
        let states = match section.get_compound("block_states") {
            Some(s) => s,
            None => return Ok(None),
        };

        let palette = read_block_palette(
            states
                .get_list("palette")
                .ok_or_else(|| DecodeError::Malformed(format!("section {} has no block palette", y)))?,
            ctx.blocks,
        )?;
        let blocks = read_container(palette, states.get_long_array("data"), MIN_BLOCK_BITS, SECTION_VOLUME)?;

        let biomes = match section.get_compound("biomes") {
            Some(biomes) => {
                let palette = biomes
                    .get_list("palette")
                    .ok_or_else(|| DecodeError::Malformed(format!("section {} has no biome palette", y)))?
                    .iter()
                    .map(|t| {
                        t.as_str()
                            .map(Arc::from)
                            .ok_or_else(|| DecodeError::Malformed("biome palette entry is not a string".into()))
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                read_container(palette, biomes.get_long_array("data"), 1, BIOME_CELLS)?
            }
            None => PalettedContainer::Single(ctx.dimension.default_biome.clone()),
        };

        let (block_light, sky_light) = read_light(section, ctx)?;

        Ok(Some(Section {
            y,
            blocks,
            biomes,
            block_light,
            sky_light,
        }))
    }
}

impl ChunkSchema for ContainerSchema {
    fn name(&self) -> &'static str {
        "ContainerPalette"
    }

    fn versions(&self) -> RangeInclusive<i32> {
        2836..=4189
    }

    fn level<'a>(&self, root: &'a Compound) -> Option<&'a Compound> {
        Some(root)
    }

    fn packing(&self) -> Packing {
        Packing::Aligned
    }

    fn height_origin(&self, dimension: &DimensionContext) -> i32 {
        dimension.min_y()
    }

    fn read_sections(&self, level: &Compound, ctx: &SectionContext) -> Result<Vec<Option<Section>>, DecodeError> {
        let mut sections = Vec::new();
        for tag in level.get_list("sections").unwrap_or_default() {
            let section = tag
                .as_compound()
                .ok_or_else(|| DecodeError::Malformed("section is not a compound".into()))?;
            if let Some(s) = self.read_section(section, ctx)? {
                sections.push(s);
            }
        }
        Ok(place_sections(sections, ctx.dimension))
    }

    fn tick_tags(&self) -> TickTags {
        TickTags {
            blocks: "block_ticks",
            fluids: "fluid_ticks",
        }
    }

    fn structure_tags(&self) -> StructureTags {
        StructureTags {
            root: "structures",
            starts: "starts",
            references: "References",
        }
    }
}

/// Biomes stored once per column by legacy formats.
enum LegacyBiomes<'a> {
    Missing,
    /// One id per block column, indexed by `z * 16 + x`.
    Columns(&'a [i32]),
    /// One id per 4x4x4 cell over a 256 block tall column, indexed by `(y * 4 + z) * 4 + x`.
    Cells(&'a [i32]),
}

impl<'a> LegacyBiomes<'a> {
    fn read(level: &'a Compound) -> Result<Self, DecodeError> {
        match level.get_int_array("Biomes") {
            None => Ok(Self::Missing),
            Some(ids) if ids.is_empty() => Ok(Self::Missing),
            Some(ids) if ids.len() == 256 => Ok(Self::Columns(ids)),
            Some(ids) if ids.len() == 1024 => Ok(Self::Cells(ids)),
            Some(ids) => Err(DecodeError::Malformed(format!("biome array of length {}", ids.len()))),
        }
    }

    fn section(&self, section_y: i32, dimension: &DimensionContext) -> Result<PalettedContainer<Arc<str>>, DecodeError> {
        let ids: Vec<i32> = match self {
            Self::Missing => return Ok(PalettedContainer::Single(dimension.default_biome.clone())),
            Self::Columns(ids) => (0..BIOME_CELLS as u32)
                .map(|i| {
                    let [cx, cz, _] = BiomeShape::delinearize(i);
                    ids[(cz * 4 * 16 + cx * 4) as usize]
                })
                .collect(),
            Self::Cells(ids) => (0..BIOME_CELLS as u32)
                .map(|i| {
                    let [cx, cz, cy] = BiomeShape::delinearize(i);
                    let cell_y = (section_y * 4 + cy as i32).clamp(0, 63) as u32;
                    ids[(cell_y * 16 + cz * 4 + cx) as usize]
                })
                .collect(),
        };

        let mut palette: Vec<i32> = Vec::new();
        let indices = ids
            .iter()
            .map(|id| match palette.iter().position(|p| p == id) {
                Some(i) => i as u16,
                None => {
                    palette.push(*id);
                    (palette.len() - 1) as u16
                }
            })
            .collect();
        let palette = palette.into_iter().map(|id| dimension.legacy_biome(id)).collect();
        PalettedContainer::from_parts(palette, indices)
    }
}

fn section_y(section: &Compound) -> Result<i32, DecodeError> {
    section
        .get_i32("Y")
        .ok_or_else(|| DecodeError::Malformed("section without Y".into()))
}

fn read_block_palette(entries: &[Tag], blocks: &BlockStateCache) -> Result<Vec<BlockState>, DecodeError> {
    entries
        .iter()
        .map(|entry| {
            let entry = entry
                .as_compound()
                .ok_or_else(|| DecodeError::Malformed("block palette entry is not a compound".into()))?;
            let name = entry
                .get_str("Name")
                .ok_or_else(|| DecodeError::Malformed("block palette entry without Name".into()))?;
            let mut native = NativeBlockState::parse(name);
            if let Some(properties) = entry.get_compound("Properties") {
                for (key, value) in properties.iter() {
                    if let Some(value) = value.as_str() {
                        native.set(key.to_string(), value.to_string());
                    }
                }
            }
            Ok(blocks.from_native(&native))
        })
        .collect()
}

/// A paletted container whose indices are padded to whole longs.
fn read_container<T>(
    palette: Vec<T>,
    data: Option<&[i64]>,
    min_bits: u32,
    count: usize,
) -> Result<PalettedContainer<T>, DecodeError> {
    if palette.len() == 1 {
        return PalettedContainer::from_parts(palette, Vec::new());
    }
    let data = data.ok_or_else(|| {
        DecodeError::Malformed(format!("palette of {} entries without index data", palette.len()))
    })?;
    let bits = bits_for_palette(palette.len()).max(min_bits);
    let indices = Packing::Aligned.unpack(data, bits, count)?;
    PalettedContainer::from_parts(palette, indices)
}

fn read_light(section: &Compound, ctx: &SectionContext) -> Result<(Option<NibbleArray>, Option<NibbleArray>), DecodeError> {
    if !ctx.keep_light {
        return Ok((None, None));
    }
    let block_light = section
        .get_byte_array("BlockLight")
        .map(NibbleArray::from_signed_bytes)
        .transpose()?;
    let sky_light = if ctx.dimension.has_sky_light {
        section
            .get_byte_array("SkyLight")
            .map(NibbleArray::from_signed_bytes)
            .transpose()?
    } else {
        None
    };
    Ok((block_light, sky_light))
}

fn place_sections(sections: Vec<Section>, dimension: &DimensionContext) -> Vec<Option<Section>> {
    let mut placed: Vec<Option<Section>> = (0..dimension.section_count).map(|_| None).collect();
    for section in sections {
        match dimension.section_index(section.y) {
            Some(i) => placed[i] = Some(section),
            None => trace!("Dropping section {} outside of the dimension", section.y),
        }
    }
    placed
}

// ████████╗███████╗███████╗████████╗
// ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝
//    ██║   █████╗  ███████╗   ██║
//    ██║   ██╔══╝  ╚════██║   ██║
//    ██║   ███████╗███████║   ██║
//    ╚═╝   ╚══════╝╚══════╝   ╚═╝
