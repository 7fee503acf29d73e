use super::packing::{bits_for_palette, Packing};
use super::section::Section;
use super::DecodeError;
use crate::block_state::BlockState;
use crate::dimension::{DimensionContext, SECTION_HEIGHT};
use crate::tag::Compound;

const COLUMNS: usize = 16 * 16;

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum HeightmapKind {
    /// Highest non-air block.
    WorldSurface,
    /// Highest block that is neither air nor liquid.
    OceanFloor,
}

impl HeightmapKind {
    pub const ALL: [Self; 2] = [Self::WorldSurface, Self::OceanFloor];

    pub fn tag_name(self) -> &'static str {
        match self {
            Self::WorldSurface => "WORLD_SURFACE",
            Self::OceanFloor => "OCEAN_FLOOR",
        }
    }

    pub fn is_opaque(self, block: &BlockState) -> bool {
        match self {
            Self::WorldSurface => !block.is_air(),
            Self::OceanFloor => !block.is_air() && !block.is_liquid(),
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

/// Per-column heights, one past the highest opaque block, in absolute block Y.
///
/// Decoded snapshots always derive these from their sections; stored arrays are only read for comparison.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Heightmaps {
    maps: [Option<Box<[i32]>>; 2],
}

impl Heightmaps {
    /// Reads the stored heightmaps. Values are stored relative to `origin`.
    pub fn read(
        tag: Option<&Compound>,
        packing: Packing,
        origin: i32,
        dimension: &DimensionContext,
    ) -> Result<Self, DecodeError> {
        let mut heightmaps = Self::default();
        let tag = match tag {
            Some(t) => t,
            None => return Ok(heightmaps),
        };
        let bits = bits_for_palette(dimension.height() as usize + 1);
        for kind in HeightmapKind::ALL {
            if let Some(words) = tag.get_long_array(kind.tag_name()) {
                let heights = packing
                    .unpack(words, bits, COLUMNS)?
                    .into_iter()
                    .map(|h| h as i32 + origin)
                    .collect();
                heightmaps.maps[kind.index()] = Some(heights);
            }
        }
        Ok(heightmaps)
    }

    /// Derives every heightmap from the block data.
    pub fn prime(sections: &[Option<Section>], dimension: &DimensionContext) -> Self {
        let mut heightmaps = Self::default();
        for kind in HeightmapKind::ALL {
            let heights = (0..COLUMNS)
                .map(|i| column_height(sections, dimension, kind, (i % 16) as u32, (i / 16) as u32))
                .collect();
            heightmaps.maps[kind.index()] = Some(heights);
        }
        heightmaps
    }

    /// Number of columns where `stored` disagrees with these heights. Kinds absent from either side are skipped.
    pub fn mismatched_columns(&self, stored: &Self) -> usize {
        HeightmapKind::ALL
            .into_iter()
            .filter_map(|kind| Some((self.maps[kind.index()].as_ref()?, stored.maps[kind.index()].as_ref()?)))
            .map(|(derived, stored)| derived.iter().zip(stored.iter()).filter(|(d, s)| d != s).count())
            .sum()
    }

    /// `x` and `z` are local to the chunk.
    pub fn get(&self, kind: HeightmapKind, x: u32, z: u32) -> Option<i32> {
        self.maps[kind.index()]
            .as_ref()
            .map(|h| h[(z * 16 + x) as usize])
    }
}

fn column_height(sections: &[Option<Section>], dimension: &DimensionContext, kind: HeightmapKind, x: u32, z: u32) -> i32 {
    for (i, section) in sections.iter().enumerate().rev() {
        let section = match section {
            Some(s) if !s.is_all_air() => s,
            _ => continue,
        };
        for local_y in (0..SECTION_HEIGHT as u32).rev() {
            if kind.is_opaque(section.block(x, local_y, z)) {
                return dimension.min_y() + i as i32 * SECTION_HEIGHT + local_y as i32 + 1;
            }
        }
    }
    dimension.min_y()
}
