use crate::config::DimensionConfig;
use crate::core::SmallKeyHashMap;

use std::sync::Arc;

pub const SECTION_HEIGHT: i32 = 16;

/// Vertical layout and biome conventions of the dimension being decoded.
#[derive(Clone, Debug)]
pub struct DimensionContext {
    pub min_section: i32,
    pub section_count: u32,
    pub has_sky_light: bool,
    /// Numeric biome ids used by formats that predate biome palettes.
    pub legacy_biomes: SmallKeyHashMap<i32, Arc<str>>,
    pub default_biome: Arc<str>,
}

impl DimensionContext {
    pub fn new(min_section: i32, section_count: u32, has_sky_light: bool) -> Self {
        Self {
            min_section,
            section_count,
            has_sky_light,
            legacy_biomes: default_legacy_biomes(),
            default_biome: "minecraft:plains".into(),
        }
    }

    pub fn from_config(config: &DimensionConfig) -> Self {
        Self::new(config.min_section, config.section_count, config.has_sky_light)
    }

    pub fn min_y(&self) -> i32 {
        self.min_section * SECTION_HEIGHT
    }

    pub fn height(&self) -> i32 {
        self.section_count as i32 * SECTION_HEIGHT
    }

    /// Exclusive upper bound of block Y coordinates.
    pub fn max_y(&self) -> i32 {
        self.min_y() + self.height()
    }

    /// Index into the section array of the section at section Y `section_y`.
    pub fn section_index(&self, section_y: i32) -> Option<usize> {
        let i = section_y - self.min_section;
        (0..self.section_count as i32).contains(&i).then(|| i as usize)
    }

    pub fn legacy_biome(&self, id: i32) -> Arc<str> {
        self.legacy_biomes
            .get(&id)
            .cloned()
            .unwrap_or_else(|| self.default_biome.clone())
    }
}

impl Default for DimensionContext {
    fn default() -> Self {
        Self::from_config(&DimensionConfig::default())
    }
}

fn default_legacy_biomes() -> SmallKeyHashMap<i32, Arc<str>> {
    [
        (0, "minecraft:ocean"),
        (1, "minecraft:plains"),
        (2, "minecraft:desert"),
        (3, "minecraft:mountains"),
        (4, "minecraft:forest"),
        (5, "minecraft:taiga"),
        (6, "minecraft:swamp"),
        (7, "minecraft:river"),
        (12, "minecraft:snowy_tundra"),
        (16, "minecraft:beach"),
        (21, "minecraft:jungle"),
        (24, "minecraft:deep_ocean"),
        (27, "minecraft:birch_forest"),
        (35, "minecraft:savanna"),
        (37, "minecraft:badlands"),
    ]
    .into_iter()
    .map(|(id, name)| (id, Arc::from(name)))
    .collect()
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

    #[test]
    fn section_indices() {
        let dim = DimensionContext::default();
        assert_eq!(dim.min_y(), -64);
        assert_eq!(dim.max_y(), 320);
        assert_eq!(dim.section_index(-4), Some(0));
        assert_eq!(dim.section_index(19), Some(23));
        assert_eq!(dim.section_index(20), None);
        assert_eq!(dim.section_index(-5), None);
    }

    #[test]
    fn unknown_legacy_biome_defaults() {
        let dim = DimensionContext::new(0, 16, true);
        assert_eq!(&*dim.legacy_biome(2), "minecraft:desert");
        assert_eq!(&*dim.legacy_biome(999), "minecraft:plains");
    }
}
