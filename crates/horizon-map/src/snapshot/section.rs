use super::DecodeError;
use crate::block_state::BlockState;
use crate::core::static_assertions::const_assert_eq;

use bytemuck::cast_slice;
use ndshape::{ConstPow2Shape3u32, ConstShape};
use std::sync::Arc;

/// Block indices within a 16x16x16 section, with X varying fastest, then Z, then Y.
pub type SectionShape = ConstPow2Shape3u32<4, 4, 4>;
/// Biome cells within a section, 4x4x4 cells of 4x4x4 blocks.
pub type BiomeShape = ConstPow2Shape3u32<2, 2, 2>;

pub const SECTION_VOLUME: usize = SectionShape::SIZE as usize;
pub const BIOME_CELLS: usize = BiomeShape::SIZE as usize;
const LIGHT_BYTES: usize = SECTION_VOLUME / 2;

const_assert_eq!(SectionShape::SIZE, 16 * 16 * 16);
const_assert_eq!(BiomeShape::SIZE, 4 * 4 * 4);

/// Either one value for the whole container or a palette with one index per cell.
#[derive(Clone, Debug, PartialEq)]
pub enum PalettedContainer<T> {
    Single(T),
    Indexed { palette: Vec<T>, indices: Box<[u16]> },
}

impl<T> PalettedContainer<T> {
    /// Validates that every index refers into `palette`.
    pub fn from_parts(mut palette: Vec<T>, indices: Vec<u16>) -> Result<Self, DecodeError> {
        if palette.is_empty() {
            return Err(DecodeError::Malformed("empty palette".into()));
        }
        if palette.len() == 1 {
            return Ok(Self::Single(palette.swap_remove(0)));
        }
        if let Some(&bad) = indices.iter().find(|&&i| i as usize >= palette.len()) {
            return Err(DecodeError::Malformed(format!(
                "palette index {} out of bounds for palette of {}",
                bad,
                palette.len()
            )));
        }
        Ok(Self::Indexed {
            palette,
            indices: indices.into_boxed_slice(),
        })
    }

    pub fn get(&self, i: usize) -> &T {
        match self {
            Self::Single(v) => v,
            Self::Indexed { palette, indices } => &palette[indices[i] as usize],
        }
    }

    pub fn palette(&self) -> &[T] {
        match self {
            Self::Single(v) => std::slice::from_ref(v),
            Self::Indexed { palette, .. } => palette,
        }
    }
}

/// Packed 4-bit light levels for one section.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct NibbleArray(Box<[u8]>);

impl NibbleArray {
    pub fn from_signed_bytes(bytes: &[i8]) -> Result<Self, DecodeError> {
        if bytes.len() != LIGHT_BYTES {
            return Err(DecodeError::Malformed(format!(
                "light array has {} bytes, expected {}",
                bytes.len(),
                LIGHT_BYTES
            )));
        }
        let unsigned: &[u8] = cast_slice(bytes);
        Ok(Self(unsigned.into()))
    }

    pub fn get(&self, i: usize) -> u8 {
        (self.0[i >> 1] >> ((i & 1) * 4)) & 0xF
    }
}

/// A 16-block tall slice of a chunk column.
#[derive(Clone, Debug)]
pub struct Section {
    /// Section Y coordinate (block Y divided by 16).
    pub y: i32,
    pub blocks: PalettedContainer<BlockState>,
    pub biomes: PalettedContainer<Arc<str>>,
    pub block_light: Option<NibbleArray>,
    pub sky_light: Option<NibbleArray>,
}

impl Section {
    /// Coordinates are local to the section, in `0..16`.
    pub fn block_index(x: u32, y: u32, z: u32) -> usize {
        SectionShape::linearize([x, z, y]) as usize
    }

    pub fn block(&self, x: u32, y: u32, z: u32) -> &BlockState {
        self.blocks.get(Self::block_index(x, y, z))
    }

    pub fn biome(&self, x: u32, y: u32, z: u32) -> &Arc<str> {
        self.biomes
            .get(BiomeShape::linearize([x >> 2, z >> 2, y >> 2]) as usize)
    }

    pub fn sky_light(&self, x: u32, y: u32, z: u32) -> Option<u8> {
        self.sky_light
            .as_ref()
            .map(|l| l.get(Self::block_index(x, y, z)))
    }

    pub fn block_light(&self, x: u32, y: u32, z: u32) -> Option<u8> {
        self.block_light
            .as_ref()
            .map(|l| l.get(Self::block_index(x, y, z)))
    }

    pub fn is_all_air(&self) -> bool {
        matches!(&self.blocks, PalettedContainer::Single(b) if b.is_air())
    }

    pub fn discard_light(&mut self) {
        self.block_light = None;
        self.sky_light = None;
    }
}

// ████████╗███████╗███████╗████████╗
// ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝
//    ██║   █████╗  ███████╗   ██║
//    ██║   ██╔══╝  ╚════██║   ██║
//    ██║   ███████╗███████║   ██║
//    ╚═╝   ╚══════╝╚══════╝   ╚═╝
