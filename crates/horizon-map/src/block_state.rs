mod registry;

pub use registry::*;

use dashmap::DashMap;
use itertools::Itertools;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use thiserror::Error;

/// Serialized form of the air state.
pub const AIR_SERIALIZATION: &str = "AIR";
pub const STATE_SEPARATOR: &str = "_STATE_";
pub const RESOURCE_SEPARATOR: char = ':';
/// Serialized value of a declared property that has no value.
pub const MISSING_PROPERTY_VALUE: &str = "NULL";

#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum ParseError {
    #[error("empty block state string")]
    Empty,
    #[error("missing \"_STATE_\" separator in {0:?}")]
    MissingStateSeparator(String),
    #[error("missing \":\" separator in {0:?}")]
    MissingResourceSeparator(String),
    #[error("unknown block {0}")]
    UnknownBlock(ResourceLocation),
    #[error("no state of {block} has properties {properties}")]
    NoMatchingState {
        block: ResourceLocation,
        properties: String,
    },
}

/// An interned, immutable block state.
///
/// Equality and hashing consider only the serialized form, which is computed once when the state is first interned.
#[derive(Clone)]
pub struct BlockState(Arc<BlockStateInner>);

struct BlockStateInner {
    native: NativeBlockState,
    serialized: Box<str>,
    air: bool,
    liquid: bool,
}

impl BlockState {
    pub fn serialize(&self) -> &str {
        &self.0.serialized
    }

    pub fn native(&self) -> &NativeBlockState {
        &self.0.native
    }

    pub fn identifier(&self) -> &ResourceLocation {
        &self.0.native.block
    }

    pub fn is_air(&self) -> bool {
        self.0.air
    }

    pub fn is_liquid(&self) -> bool {
        self.0.liquid
    }
}

impl PartialEq for BlockState {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0) || self.0.serialized == other.0.serialized
    }
}
impl Eq for BlockState {}

impl Hash for BlockState {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.serialized.hash(state)
    }
}

impl fmt::Debug for BlockState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BlockState({})", self.0.serialized)
    }
}

impl fmt::Display for BlockState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.serialized)
    }
}

/// Interns [`BlockState`]s for one block registry.
///
/// The air state is created with the cache and survives [`BlockStateCache::clear`]. Concurrent interning of the same native
/// state is resolved by the map entry: one candidate wins and every caller receives the winner.
pub struct BlockStateCache {
    registry: Arc<dyn BlockRegistry>,
    cache: DashMap<NativeBlockState, BlockState>,
    air: BlockState,
}

impl BlockStateCache {
    pub fn new(registry: Arc<dyn BlockRegistry>) -> Self {
        let air = BlockState(Arc::new(BlockStateInner {
            native: NativeBlockState::new(ResourceLocation::new(DEFAULT_NAMESPACE, "air")),
            serialized: AIR_SERIALIZATION.into(),
            air: true,
            liquid: false,
        }));
        Self {
            registry,
            cache: DashMap::new(),
            air,
        }
    }

    pub fn registry(&self) -> &dyn BlockRegistry {
        &*self.registry
    }

    pub fn air(&self) -> &BlockState {
        &self.air
    }

    pub fn from_native(&self, native: &NativeBlockState) -> BlockState {
        if self.registry.is_air(native) {
            return self.air.clone();
        }
        if let Some(existing) = self.cache.get(native) {
            return existing.value().clone();
        }

        // Built outside of the map's shard lock; losers of a race discard their candidate.
        let candidate = BlockState(Arc::new(BlockStateInner {
            serialized: format!(
                "{}{}{}",
                native.block,
                STATE_SEPARATOR,
                self.serialize_properties(native)
            )
            .into_boxed_str(),
            air: false,
            liquid: self.registry.is_liquid(native),
            native: native.clone(),
        }));
        let entry = self.cache.entry(native.clone()).or_insert(candidate);
        entry.value().clone()
    }

    /// Parses the output of [`BlockState::serialize`].
    pub fn deserialize(&self, serialized: &str) -> Result<BlockState, ParseError> {
        if serialized.is_empty() {
            return Err(ParseError::Empty);
        }
        if serialized == AIR_SERIALIZATION {
            return Ok(self.air.clone());
        }

        let (resource, properties) = serialized
            .split_once(STATE_SEPARATOR)
            .ok_or_else(|| ParseError::MissingStateSeparator(serialized.to_string()))?;
        let (namespace, path) = resource
            .split_once(RESOURCE_SEPARATOR)
            .ok_or_else(|| ParseError::MissingResourceSeparator(serialized.to_string()))?;
        let block = ResourceLocation::new(namespace, path);

        let states = self
            .registry
            .possible_states(&block)
            .ok_or_else(|| ParseError::UnknownBlock(block.clone()))?;
        let found = states
            .into_iter()
            .find(|state| self.serialize_properties(state) == properties)
            .ok_or_else(|| ParseError::NoMatchingState {
                block,
                properties: properties.to_string(),
            })?;

        Ok(self.from_native(&found))
    }

    /// Number of interned states, not counting air.
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    pub fn clear(&self) {
        self.cache.clear();
    }

    fn serialize_properties(&self, native: &NativeBlockState) -> String {
        let names = self.registry.property_names(&native.block).unwrap_or_else(|| {
            native
                .properties()
                .iter()
                .map(|(name, _)| name.clone())
                .collect()
        });
        names
            .iter()
            .sorted()
            .map(|name| {
                let value = native.property(name).unwrap_or(MISSING_PROPERTY_VALUE);
                format!("{{{}:{}}}", name, value)
            })
            .join("")
    }
}

// ████████╗███████╗███████╗████████╗
// ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝
//    ██║   █████╗  ███████╗   ██║
//    ██║   ██╔══╝  ╚════██║   ██║
//    ██║   ███████╗███████║   ██║
//    ╚═╝   ╚══════╝╚══════╝   ╚═╝
