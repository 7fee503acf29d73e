use crate::core::SmallKeyHashMap;

use itertools::Itertools;
use std::fmt;

pub const DEFAULT_NAMESPACE: &str = "minecraft";

/// A namespaced identifier like `minecraft:stone`.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct ResourceLocation {
    pub namespace: String,
    pub path: String,
}

impl ResourceLocation {
    pub fn new(namespace: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            path: path.into(),
        }
    }

    /// Lenient parse used for persisted names: a missing namespace means `minecraft`, and legacy mixed-case names are
    /// lowered.
    pub fn parse(id: &str) -> Self {
        let id = id.to_ascii_lowercase();
        match id.split_once(':') {
            Some((namespace, path)) => Self::new(namespace, path),
            None => Self::new(DEFAULT_NAMESPACE, id),
        }
    }
}

impl fmt::Display for ResourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.namespace, self.path)
    }
}

/// A block state as the host game represents it: a block identifier with concrete property values.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct NativeBlockState {
    pub block: ResourceLocation,
    /// Kept sorted by property name so equal states compare equal.
    properties: Vec<(String, String)>,
}

impl NativeBlockState {
    pub fn new(block: ResourceLocation) -> Self {
        Self {
            block,
            properties: Vec::new(),
        }
    }

    pub fn parse(id: &str) -> Self {
        Self::new(ResourceLocation::parse(id))
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(name.into(), value.into());
        self
    }

    pub fn set(&mut self, name: String, value: String) {
        match self.properties.binary_search_by(|(n, _)| n.as_str().cmp(&name)) {
            Ok(i) => self.properties[i].1 = value,
            Err(i) => self.properties.insert(i, (name, value)),
        }
    }

    pub fn property(&self, name: &str) -> Option<&str> {
        self.properties
            .binary_search_by(|(n, _)| n.as_str().cmp(name))
            .ok()
            .map(|i| self.properties[i].1.as_str())
    }

    pub fn properties(&self) -> &[(String, String)] {
        &self.properties
    }
}

/// The host's registry of blocks. Implementations must be safe to query from any worker thread.
pub trait BlockRegistry: Send + Sync {
    /// Names of every property declared by `block`, or `None` if the block is unknown.
    fn property_names(&self, block: &ResourceLocation) -> Option<Vec<String>>;

    /// Every state `block` can take, or `None` if the block is unknown.
    fn possible_states(&self, block: &ResourceLocation) -> Option<Vec<NativeBlockState>>;

    fn is_air(&self, state: &NativeBlockState) -> bool;

    fn is_liquid(&self, state: &NativeBlockState) -> bool;
}

#[derive(Clone, Debug, Default)]
struct BlockDefinition {
    properties: Vec<(String, Vec<String>)>,
    air: bool,
    liquid: bool,
}

/// A [`BlockRegistry`] backed by an in-memory table.
#[derive(Clone, Debug, Default)]
pub struct SimpleBlockRegistry {
    blocks: SmallKeyHashMap<ResourceLocation, BlockDefinition>,
}

impl SimpleBlockRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_block(mut self, id: &str, properties: &[(&str, &[&str])]) -> Self {
        self.insert(id, properties, false, false);
        self
    }

    pub fn with_air(mut self, id: &str) -> Self {
        self.insert(id, &[], true, false);
        self
    }

    pub fn with_liquid(mut self, id: &str, properties: &[(&str, &[&str])]) -> Self {
        self.insert(id, properties, false, true);
        self
    }

    fn insert(&mut self, id: &str, properties: &[(&str, &[&str])], air: bool, liquid: bool) {
        let properties = properties
            .iter()
            .map(|(name, values)| (name.to_string(), values.iter().map(|v| v.to_string()).collect()))
            .collect();
        self.blocks.insert(
            ResourceLocation::parse(id),
            BlockDefinition {
                properties,
                air,
                liquid,
            },
        );
    }

    /// A small selection of overworld blocks, enough for headless generation and decoding typical terrain.
    pub fn overworld() -> Self {
        const AXIS: &[&str] = &["x", "y", "z"];
        const BOOL: &[&str] = &["false", "true"];
        const LEVEL: &[&str] = &[
            "0", "1", "2", "3", "4", "5", "6", "7", "8", "9", "10", "11", "12", "13", "14", "15",
        ];

        Self::new()
            .with_air("minecraft:air")
            .with_air("minecraft:cave_air")
            .with_air("minecraft:void_air")
            .with_block("minecraft:stone", &[])
            .with_block("minecraft:deepslate", &[("axis", AXIS)])
            .with_block("minecraft:bedrock", &[])
            .with_block("minecraft:dirt", &[])
            .with_block("minecraft:grass_block", &[("snowy", BOOL)])
            .with_block("minecraft:sand", &[])
            .with_block("minecraft:sandstone", &[])
            .with_block("minecraft:gravel", &[])
            .with_block("minecraft:snow_block", &[])
            .with_block("minecraft:ice", &[])
            .with_block("minecraft:oak_log", &[("axis", AXIS)])
            .with_block(
                "minecraft:oak_leaves",
                &[
                    ("distance", &["1", "2", "3", "4", "5", "6", "7"]),
                    ("persistent", BOOL),
                    ("waterlogged", BOOL),
                ],
            )
            .with_liquid("minecraft:water", &[("level", LEVEL)])
            .with_liquid("minecraft:lava", &[("level", LEVEL)])
    }

    fn definition(&self, state: &NativeBlockState) -> Option<&BlockDefinition> {
        self.blocks.get(&state.block)
    }
}

impl BlockRegistry for SimpleBlockRegistry {
    fn property_names(&self, block: &ResourceLocation) -> Option<Vec<String>> {
        self.blocks
            .get(block)
            .map(|def| def.properties.iter().map(|(name, _)| name.clone()).collect())
    }

    fn possible_states(&self, block: &ResourceLocation) -> Option<Vec<NativeBlockState>> {
        let def = self.blocks.get(block)?;
        if def.properties.is_empty() {
            return Some(vec![NativeBlockState::new(block.clone())]);
        }
        let states = def
            .properties
            .iter()
            .map(|(name, values)| values.iter().map(move |v| (name, v)))
            .multi_cartesian_product()
            .map(|assignment| {
                assignment
                    .into_iter()
                    .fold(NativeBlockState::new(block.clone()), |state, (name, value)| {
                        state.with(name.clone(), value.clone())
                    })
            })
            .collect();
        Some(states)
    }

    fn is_air(&self, state: &NativeBlockState) -> bool {
        self.definition(state).map_or(false, |def| def.air)
    }

    fn is_liquid(&self, state: &NativeBlockState) -> bool {
        self.definition(state).map_or(false, |def| def.liquid)
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

    #[test]
    fn possible_states_enumerate_every_combination() {
        let registry = SimpleBlockRegistry::overworld();
        let leaves = registry
            .possible_states(&ResourceLocation::parse("minecraft:oak_leaves"))
            .unwrap();
        assert_eq!(leaves.len(), 7 * 2 * 2);

        let stone = registry
            .possible_states(&ResourceLocation::parse("stone"))
            .unwrap();
        assert_eq!(stone, vec![NativeBlockState::parse("minecraft:stone")]);

        assert!(registry
            .possible_states(&ResourceLocation::parse("minecraft:nonexistent"))
            .is_none());
    }

    #[test]
    fn native_properties_are_order_independent() {
        let a = NativeBlockState::parse("minecraft:oak_leaves")
            .with("persistent", "true")
            .with("distance", "3");
        let b = NativeBlockState::parse("minecraft:oak_leaves")
            .with("distance", "3")
            .with("persistent", "true");
        assert_eq!(a, b);
        assert_eq!(a.property("distance"), Some("3"));
        assert_eq!(a.property("waterlogged"), None);
    }
}
