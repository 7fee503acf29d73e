use super::{ChunkStorage, StorageError};
use crate::coordinates::region_of_chunk;
use crate::units::ChunkPos;

use log::trace;
use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

const SECTOR_BYTES: u64 = 4096;
const CHUNKS_PER_REGION_SIDE: i32 = 32;
/// Set on the scheme byte when the payload lives in a separate `c.<x>.<z>.mcc` file.
const EXTERNAL_FLAG: u8 = 0x80;

/// Read-only access to a directory of `r.<x>.<z>.mca` region files.
///
/// Each region file starts with a 4 KiB table of 1024 big-endian entries; an entry holds the chunk's sector offset in its
/// upper 3 bytes and its sector count in the lowest byte. A chunk blob is a 4-byte length followed by the payload (scheme
/// byte and compressed data).
pub struct RegionDirStore {
    dir: PathBuf,
}

impl RegionDirStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn region_path(&self, chunk: ChunkPos) -> PathBuf {
        let region = region_of_chunk(chunk);
        self.dir.join(format!("r.{}.{}.mca", region.x, region.y))
    }

    fn external_path(&self, chunk: ChunkPos) -> PathBuf {
        self.dir
            .join(format!("c.{}.{}.mcc", chunk.x(), chunk.z()))
    }
}

impl ChunkStorage for RegionDirStore {
    fn read_chunk(&self, chunk: ChunkPos) -> Result<Option<Vec<u8>>, StorageError> {
        let mut file = match File::open(self.region_path(chunk)) {
            Ok(f) => f,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let local_x = chunk.x().rem_euclid(CHUNKS_PER_REGION_SIDE);
        let local_z = chunk.z().rem_euclid(CHUNKS_PER_REGION_SIDE);
        let entry_index = (local_x + local_z * CHUNKS_PER_REGION_SIDE) as u64;

        let mut entry = [0; 4];
        file.seek(SeekFrom::Start(entry_index * 4))?;
        if let Err(e) = file.read_exact(&mut entry) {
            return if e.kind() == io::ErrorKind::UnexpectedEof {
                // Truncated header; treat as never saved.
                Ok(None)
            } else {
                Err(e.into())
            };
        }
        let entry = u32::from_be_bytes(entry);
        let sector_offset = (entry >> 8) as u64;
        let sector_count = (entry & 0xFF) as u64;
        if sector_offset == 0 || sector_count == 0 {
            return Ok(None);
        }
        if sector_offset < 2 {
            return Err(StorageError::Corrupt(format!(
                "chunk {} points into the region header",
                chunk
            )));
        }

        file.seek(SeekFrom::Start(sector_offset * SECTOR_BYTES))?;
        let mut length = [0; 4];
        file.read_exact(&mut length)?;
        let length = u32::from_be_bytes(length) as u64;
        if length == 0 || length + 4 > sector_count * SECTOR_BYTES {
            return Err(StorageError::Corrupt(format!(
                "chunk {} has length {} but only {} sectors",
                chunk, length, sector_count
            )));
        }

        let mut payload = vec![0; length as usize];
        file.read_exact(&mut payload)?;

        if payload[0] & EXTERNAL_FLAG != 0 {
            trace!("Reading oversized chunk {} from its external file", chunk);
            let mut external = vec![payload[0] & !EXTERNAL_FLAG];
            File::open(self.external_path(chunk))?.read_to_end(&mut external)?;
            return Ok(Some(external));
        }

        Ok(Some(payload))
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

    use std::io::Write;

    fn temp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("horizon-region-{}-{}", name, std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    /// Writes a region file with a single chunk in sector 2.
    fn write_region(dir: &Path, region: (i32, i32), local: (i32, i32), payload: &[u8]) {
        let mut bytes = vec![0u8; 2 * SECTOR_BYTES as usize];
        let entry_index = (local.0 + local.1 * 32) as usize;
        let sectors = ((payload.len() + 4) as u64 + SECTOR_BYTES - 1) / SECTOR_BYTES;
        let entry = (2u32 << 8) | sectors as u32;
        bytes[entry_index * 4..entry_index * 4 + 4].copy_from_slice(&entry.to_be_bytes());
        bytes.extend_from_slice(&(payload.len() as u32).to_be_bytes());
        bytes.extend_from_slice(payload);
        bytes.resize(((2 + sectors) * SECTOR_BYTES) as usize, 0);

        let mut file = File::create(dir.join(format!("r.{}.{}.mca", region.0, region.1))).unwrap();
        file.write_all(&bytes).unwrap();
    }

    #[test]
    fn reads_chunk_from_region_file() {
        let dir = temp_dir("read");
        write_region(&dir, (-1, 0), (31, 2), &[2, 9, 8, 7]);
        let store = RegionDirStore::new(&dir);

        assert_eq!(store.read_chunk(ChunkPos::new(-1, 2)).unwrap(), Some(vec![2, 9, 8, 7]));
        // Same region, never saved.
        assert_eq!(store.read_chunk(ChunkPos::new(-2, 2)).unwrap(), None);
        // Missing region file.
        assert_eq!(store.read_chunk(ChunkPos::new(100, 100)).unwrap(), None);

        std::fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn reads_external_chunk() {
        let dir = temp_dir("external");
        write_region(&dir, (0, 0), (3, 4), &[EXTERNAL_FLAG | 2]);
        File::create(dir.join("c.3.4.mcc"))
            .unwrap()
            .write_all(&[5, 6, 7])
            .unwrap();
        let store = RegionDirStore::new(&dir);

        assert_eq!(store.read_chunk(ChunkPos::new(3, 4)).unwrap(), Some(vec![2, 5, 6, 7]));

        std::fs::remove_dir_all(dir).unwrap();
    }
}
