use crate::block_state::ResourceLocation;
use crate::coordinates::{chunk_chessboard_distance, in_chunk3, unpack_chunk_pos};
use crate::core::glam::IVec3;
use crate::core::SmallKeyHashMap;
use crate::snapshot::SnapshotDecoder;
use crate::storage::ChunkStorage;
use crate::tag::Compound;
use crate::units::{BlockUnits, ChunkPos};

use log::warn;

/// Structures may only be referenced from chunks within this chessboard distance of their start.
pub const MAX_REFERENCE_DISTANCE: i32 = 8;

const INVALID_START_ID: &str = "INVALID";

/// A structure that begins in some chunk.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct StructureStart {
    pub id: String,
    pub chunk: ChunkPos,
    /// Inclusive block bounds as `[min_x, min_y, min_z, max_x, max_y, max_z]`.
    pub bounds: Option<[i32; 6]>,
    pub pieces: usize,
}

impl StructureStart {
    fn read(key: &str, tag: &Compound, owner: ChunkPos) -> Self {
        let id = match tag.get_str("id") {
            Some(INVALID_START_ID) | None => INVALID_START_ID.to_string(),
            Some(_) => normalize_id(key),
        };
        let chunk = match (tag.get_i32("ChunkX"), tag.get_i32("ChunkZ")) {
            (Some(x), Some(z)) => ChunkPos::new(x, z),
            _ => owner,
        };
        let children = tag.get_list("Children").unwrap_or_default();
        let bounds = tag.get_int_array("BB").and_then(read_bounds).or_else(|| {
            children
                .iter()
                .filter_map(|c| c.as_compound()?.get_int_array("BB").and_then(read_bounds))
                .reduce(|a, b| {
                    [
                        a[0].min(b[0]),
                        a[1].min(b[1]),
                        a[2].min(b[2]),
                        a[3].max(b[3]),
                        a[4].max(b[4]),
                        a[5].max(b[5]),
                    ]
                })
        });
        Self {
            id,
            chunk,
            bounds,
            pieces: children.len(),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.id != INVALID_START_ID && self.pieces > 0
    }

    /// Starts without bounds contain everything.
    pub fn contains(&self, p: IVec3) -> bool {
        match self.bounds {
            Some([x0, y0, z0, x1, y1, z1]) => {
                (x0..=x1).contains(&p.x) && (y0..=y1).contains(&p.y) && (z0..=z1).contains(&p.z)
            }
            None => true,
        }
    }
}

fn read_bounds(bb: &[i32]) -> Option<[i32; 6]> {
    bb.try_into().ok()
}

fn normalize_id(id: &str) -> String {
    ResourceLocation::parse(id).to_string()
}

/// Structure starts and references persisted with a chunk. Keys are normalized structure ids.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StructureData {
    pub starts: SmallKeyHashMap<String, StructureStart>,
    pub references: SmallKeyHashMap<String, Vec<ChunkPos>>,
}

impl StructureData {
    pub fn read(tag: &Compound, starts_name: &str, references_name: &str, owner: ChunkPos) -> Self {
        let mut data = Self::default();
        if let Some(starts) = tag.get_compound(starts_name) {
            for (key, start) in starts.iter() {
                if let Some(start) = start.as_compound() {
                    data.starts
                        .insert(normalize_id(key), StructureStart::read(key, start, owner));
                }
            }
        }
        if let Some(references) = tag.get_compound(references_name) {
            for (key, _) in references.iter() {
                if let Some(packed) = references.get_long_array(key) {
                    data.references
                        .insert(normalize_id(key), packed.iter().map(|&p| unpack_chunk_pos(p)).collect());
                }
            }
        }
        data
    }

    pub fn is_empty(&self) -> bool {
        self.starts.is_empty() && self.references.is_empty()
    }

    /// The valid start of structure `id`, if it begins in this chunk.
    pub fn valid_start(&self, id: &str) -> Option<&StructureStart> {
        self.starts.get(id).filter(|s| s.is_valid())
    }
}

/// Answers structure queries straight from persisted chunks, without a running world.
///
/// Nothing is cached; every query decodes the chunks it needs. Chunks that are absent or fail to decode contribute nothing.
pub struct StructureLookup<'a> {
    decoder: &'a SnapshotDecoder,
    storage: &'a dyn ChunkStorage,
}

impl<'a> StructureLookup<'a> {
    pub fn new(decoder: &'a SnapshotDecoder, storage: &'a dyn ChunkStorage) -> Self {
        Self { decoder, storage }
    }

    fn structures(&self, chunk: ChunkPos) -> Option<StructureData> {
        let payload = match self.storage.read_chunk(chunk) {
            Ok(p) => p?,
            Err(e) => {
                warn!("Failed to read structures of chunk {}: {}", chunk, e);
                return None;
            }
        };
        match self.decoder.decode_structures(chunk, &payload) {
            Ok(data) => data,
            Err(e) => {
                warn!("Failed to decode structures of chunk {}: {}", chunk, e);
                None
            }
        }
    }

    /// Every structure reference persisted with `chunk`.
    pub fn references_at(&self, chunk: ChunkPos) -> SmallKeyHashMap<String, Vec<ChunkPos>> {
        self.structures(chunk)
            .map(|s| s.references)
            .unwrap_or_default()
    }

    /// True if a valid structure referenced by the chunk containing `p` covers `p`.
    pub fn has_any_structure_at(&self, p: BlockUnits<IVec3>) -> bool {
        let chunk = in_chunk3(p);
        let references = self.references_at(chunk);
        references.iter().any(|(id, refs)| {
            refs.iter().any(|&start_chunk| {
                self.start_in(chunk, start_chunk, id)
                    .map_or(false, |s| s.contains(p.0))
            })
        })
    }

    /// Valid starts of every structure referenced by `chunk` whose id satisfies `predicate`.
    pub fn starts_for_structure(&self, chunk: ChunkPos, predicate: impl Fn(&str) -> bool) -> Vec<StructureStart> {
        let mut found = Vec::new();
        for (id, refs) in self.references_at(chunk) {
            if !predicate(&id) {
                continue;
            }
            for start_chunk in refs {
                if let Some(start) = self.start_in(chunk, start_chunk, &id) {
                    found.push(start);
                }
            }
        }
        found
    }

    fn start_in(&self, from: ChunkPos, start_chunk: ChunkPos, id: &str) -> Option<StructureStart> {
        if chunk_chessboard_distance(from, start_chunk) > MAX_REFERENCE_DISTANCE {
            return None;
        }
        self.structures(start_chunk)?.valid_start(id).cloned()
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
    use crate::coordinates::pack_chunk_pos;
    use crate::snapshot::test_util::*;
    use crate::storage::MemoryChunkStore;
    use crate::tag::Tag;

    fn start(id: &str, chunk: ChunkPos, bb: [i32; 6]) -> Compound {
        Compound::new()
            .with("id", id)
            .with("ChunkX", chunk.x())
            .with("ChunkZ", chunk.z())
            .with(
                "Children",
                vec![Tag::Compound(Compound::new().with("BB", bb.to_vec()))],
            )
    }

    fn store_chunk(store: &MemoryChunkStore, chunk: ChunkPos, structures: Compound) {
        let level = level(chunk, "full").with("structures", structures);
        store.insert(chunk, to_payload(&container_root(level)));
    }

    fn world() -> MemoryChunkStore {
        let store = MemoryChunkStore::new();
        let village = ChunkPos::new(2, 2);
        let here = ChunkPos::new(3, 2);

        store_chunk(
            &store,
            village,
            Compound::new()
                .with(
                    "starts",
                    Compound::new()
                        .with("minecraft:village", start("minecraft:village", village, [32, 60, 32, 70, 80, 40]))
                        .with("minecraft:mineshaft", Compound::new().with("id", "INVALID")),
                )
                .with("References", Compound::new()),
        );
        store_chunk(
            &store,
            here,
            Compound::new().with("starts", Compound::new()).with(
                "References",
                Compound::new()
                    .with("minecraft:village", vec![pack_chunk_pos(village)])
                    .with("minecraft:mineshaft", vec![pack_chunk_pos(village)])
                    // Never saved.
                    .with("minecraft:stronghold", vec![pack_chunk_pos(ChunkPos::new(4, 4))]),
            ),
        );
        store
    }

    #[test]
    fn starts_are_resolved_through_references() {
        let decoder = decoder();
        let store = world();
        let lookup = StructureLookup::new(&decoder, &store);

        let here = ChunkPos::new(3, 2);
        assert_eq!(lookup.references_at(here).len(), 3);

        let starts = lookup.starts_for_structure(here, |_| true);
        assert_eq!(starts.len(), 1);
        assert_eq!(starts[0].id, "minecraft:village");
        assert_eq!(starts[0].bounds, Some([32, 60, 32, 70, 80, 40]));

        assert!(lookup
            .starts_for_structure(here, |id| id == "minecraft:mineshaft")
            .is_empty());
    }

    #[test]
    fn structure_presence_uses_bounds() {
        let decoder = decoder();
        let store = world();
        let lookup = StructureLookup::new(&decoder, &store);

        assert!(lookup.has_any_structure_at(BlockUnits(IVec3::new(50, 70, 36))));
        assert!(!lookup.has_any_structure_at(BlockUnits(IVec3::new(50, 90, 36))));
        // The start chunk itself references nothing.
        assert!(!lookup.has_any_structure_at(BlockUnits(IVec3::new(33, 70, 33))));
    }

    #[test]
    fn absent_chunks_are_empty() {
        let decoder = decoder();
        let store = MemoryChunkStore::new();
        store.insert(ChunkPos::new(0, 0), vec![3, 0xFF]);
        let lookup = StructureLookup::new(&decoder, &store);

        assert!(lookup.references_at(ChunkPos::new(9, 9)).is_empty());
        // Corrupt payloads are logged and treated as absent.
        assert!(lookup.starts_for_structure(ChunkPos::new(0, 0), |_| true).is_empty());
    }

    #[test]
    fn legacy_ids_are_normalized() {
        let tag = Compound::new()
            .with("Starts", Compound::new().with("Village", start("Village", ChunkPos::new(0, 0), [0; 6])))
            .with("References", Compound::new().with("Village", vec![0i64]));
        let data = StructureData::read(&tag, "Starts", "References", ChunkPos::new(0, 0));
        assert!(data.valid_start("minecraft:village").is_some());
        assert_eq!(data.references["minecraft:village"], vec![ChunkPos::new(0, 0)]);
    }
}
