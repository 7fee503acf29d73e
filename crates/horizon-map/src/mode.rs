use crate::core::bitset::Bitset8;

use serde::{Deserialize, Serialize};

/// Fidelity tier of generated LOD data, ordered from least to most faithful to the real world.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[repr(u8)]
pub enum GenerationMode {
    /// Nothing was generated; the node is a placeholder.
    None = 0,
    /// Only biomes are known, terrain is flat.
    BiomeOnly = 1,
    /// Biomes plus a noise-derived height estimate.
    BiomeOnlySimulateHeight = 2,
    /// Real surface blocks without features.
    Surface = 3,
    /// Surface with trees, ores and other decoration.
    Features = 4,
    /// Everything the host simulation would produce.
    Full = 5,
}

impl Default for GenerationMode {
    fn default() -> Self {
        Self::Features
    }
}

impl GenerationMode {
    pub const ALL: [Self; 6] = [
        Self::None,
        Self::BiomeOnly,
        Self::BiomeOnlySimulateHeight,
        Self::Surface,
        Self::Features,
        Self::Full,
    ];

    pub fn bit(self) -> u8 {
        self as u8
    }

    /// The least chunk completion step that satisfies this mode.
    pub fn required_step(self) -> GenerationStep {
        match self {
            Self::None => GenerationStep::Empty,
            Self::BiomeOnly => GenerationStep::Biomes,
            Self::BiomeOnlySimulateHeight => GenerationStep::Noise,
            Self::Surface => GenerationStep::Surface,
            Self::Features => GenerationStep::Features,
            Self::Full => GenerationStep::Light,
        }
    }
}

/// How far a persisted chunk got through the host's generation pipeline.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub enum GenerationStep {
    Empty,
    StructureStart,
    StructureReference,
    Biomes,
    Noise,
    Surface,
    Carvers,
    Features,
    Light,
    Full,
}

impl GenerationStep {
    /// The fidelity achieved once a chunk has completed this step.
    pub fn mode(self) -> GenerationMode {
        match self {
            Self::Empty | Self::StructureStart | Self::StructureReference => GenerationMode::None,
            Self::Biomes => GenerationMode::BiomeOnly,
            Self::Noise => GenerationMode::BiomeOnlySimulateHeight,
            Self::Surface | Self::Carvers => GenerationMode::Surface,
            Self::Features => GenerationMode::Features,
            Self::Light | Self::Full => GenerationMode::Full,
        }
    }

    /// Parses a status name, tolerating the `minecraft:` prefix and every name used since the first palette format.
    pub fn from_status_name(name: &str) -> Option<Self> {
        let name = name.strip_prefix("minecraft:").unwrap_or(name);
        let step = match name {
            "empty" => Self::Empty,
            "structure_starts" => Self::StructureStart,
            "structure_references" => Self::StructureReference,
            "biomes" => Self::Biomes,
            "noise" | "base" => Self::Noise,
            "surface" => Self::Surface,
            "carvers" | "liquid_carvers" | "carved" | "liquid_carved" => Self::Carvers,
            "features" | "decorated" => Self::Features,
            "initialize_light" | "light" | "lighted" => Self::Light,
            "spawn" | "heightmaps" | "full" | "mobs_spawned" | "finalized" | "fullchunk"
            | "postprocessed" => Self::Full,
            _ => return None,
        };
        Some(step)
    }
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub enum LightMode {
    /// Use persisted light data when it exists.
    Fancy,
    /// Ignore persisted light; approximate sky light from the surface height.
    Fast,
}

impl Default for LightMode {
    fn default() -> Self {
        Self::Fancy
    }
}

/// A subset of [`GenerationMode`]s.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub struct ModeMask(pub Bitset8);

impl ModeMask {
    pub const NONE: Self = Self(Bitset8::EMPTY);
    pub const ALL: Self = Self(Bitset8::new(0b0011_1111));

    pub fn only(mode: GenerationMode) -> Self {
        Self::NONE.with(mode)
    }

    /// All modes of at least `mode` fidelity.
    pub fn at_least(mode: GenerationMode) -> Self {
        GenerationMode::ALL.into_iter().filter(|&m| m >= mode).collect()
    }

    pub fn with(mut self, mode: GenerationMode) -> Self {
        self.0.set_bit(mode.bit());
        self
    }

    pub fn contains(&self, mode: GenerationMode) -> bool {
        self.0.bit_is_set(mode.bit())
    }
}

impl FromIterator<GenerationMode> for ModeMask {
    fn from_iter<I: IntoIterator<Item = GenerationMode>>(iter: I) -> Self {
        iter.into_iter().fold(Self::NONE, Self::with)
    }
}

// ████████╗███████╗███████╗████████╗
// ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝
//    ██║   █████╗  ███████╗   ██║
//    ██║   ██╔══╝  ╚════██║   ██║
//    ██║   ███████╗███████║   ██║
//    ╚═╝   ╚══════╝╚══════╝   ╚═╝
