use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Serialize)]
#[serde(default)]
pub struct IndexConfig {
    /// Number of regions kept on each side of the window center.
    pub window_radius: i32,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self { window_radius: 8 }
    }
}

#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Serialize)]
#[serde(default)]
pub struct DimensionConfig {
    /// Y index of the lowest 16-block section.
    pub min_section: i32,
    pub section_count: u32,
    pub has_sky_light: bool,
    pub sea_level: i32,
    pub seed: u32,
}

impl Default for DimensionConfig {
    fn default() -> Self {
        Self {
            min_section: -4,
            section_count: 24,
            has_sky_light: true,
            sea_level: 63,
            seed: 0,
        }
    }
}
