use crate::block_state::BlockState;
use crate::coordinates::NodeKey;
use crate::core::glam::IVec2;
use crate::core::ilattice::prelude::Extent;
use crate::mode::GenerationMode;
use crate::units::BlockUnits;

/// Summary of the terrain under one node.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct LodDataPoint {
    /// Lowest surface height of any column in the node.
    pub min_height: i32,
    /// Highest surface height of any column in the node.
    pub max_height: i32,
    /// The most common surface material.
    pub material: BlockState,
    /// Packed `block << 4 | sky` light levels at the surface.
    pub light: u8,
}

impl LodDataPoint {
    pub fn new(min_height: i32, max_height: i32, material: BlockState, light: u8) -> Self {
        debug_assert!(min_height <= max_height);
        Self {
            min_height,
            max_height,
            material,
            light,
        }
    }

    pub fn pack_light(block_light: u8, sky_light: u8) -> u8 {
        (block_light.min(15) << 4) | sky_light.min(15)
    }

    pub fn block_light(&self) -> u8 {
        self.light >> 4
    }

    pub fn sky_light(&self) -> u8 {
        self.light & 0xF
    }
}

/// A generated node of the LOD index.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct LodNode {
    pub key: NodeKey,
    pub data: LodDataPoint,
    /// Provenance of `data`.
    pub mode: GenerationMode,
}

impl LodNode {
    pub fn new(key: NodeKey, data: LodDataPoint, mode: GenerationMode) -> Self {
        Self { key, data, mode }
    }

    pub fn extent(&self) -> BlockUnits<Extent<IVec2>> {
        self.key.extent()
    }

    /// True if `self` may be overwritten by `other` under the never-downgrade rule.
    pub fn may_be_replaced_by(&self, other: &LodNode) -> bool {
        other.mode >= self.mode
    }
}
