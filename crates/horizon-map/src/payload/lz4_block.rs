//! The block framing the host's lz4 streams use: a sequence of independently compressed blocks, each behind a 21 byte
//! header, ended by an empty block.
//!
//! ```text
//! "LZ4Block" | token: u8 | compressed_len: i32 | original_len: i32 | checksum: i32 | data
//! ```
//!
//! The high nibble of the token is the method (raw or lz4); the low nibble sizes the block as `1 << (10 + level)`. The
//! checksum is a seeded XXH32 of the original bytes, masked to 28 bits. Integers are little endian.

use std::io;

const MAGIC: &[u8; 8] = b"LZ4Block";
const HEADER_LEN: usize = MAGIC.len() + 1 + 3 * 4;
const METHOD_RAW: u8 = 0x10;
const METHOD_LZ4: u8 = 0x20;
const CHECKSUM_SEED: u32 = 0x9747_b28c;
const CHECKSUM_MASK: u32 = 0x0fff_ffff;
const MIN_BLOCK_LEVEL: u32 = 10;
const BLOCK_SIZE: usize = 1 << 16;

fn invalid(msg: String) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, msg)
}

fn read_i32(bytes: &[u8]) -> i32 {
    i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
}

fn checksum(bytes: &[u8]) -> u32 {
    xxh32(bytes, CHECKSUM_SEED) & CHECKSUM_MASK
}

/// Decodes blocks until the empty end block.
pub fn decompress(mut input: &[u8]) -> io::Result<Vec<u8>> {
    let mut out = Vec::with_capacity(input.len() * 4);
    loop {
        if input.len() < HEADER_LEN {
            return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "lz4 stream ended before its end block"));
        }
        let (header, rest) = input.split_at(HEADER_LEN);
        if &header[..MAGIC.len()] != MAGIC {
            return Err(invalid("missing LZ4Block magic".to_string()));
        }
        let token = header[MAGIC.len()];
        let method = token & 0xf0;
        let max_len = 1usize << (MIN_BLOCK_LEVEL + (token & 0x0f) as u32);
        let compressed_len = read_i32(&header[9..]);
        let original_len = read_i32(&header[13..]);
        let expected_checksum = read_i32(&header[17..]) as u32;

        if original_len < 0 || compressed_len < 0 || original_len as usize > max_len {
            return Err(invalid(format!(
                "bad lz4 block lengths {} -> {}",
                compressed_len, original_len
            )));
        }
        let (compressed_len, original_len) = (compressed_len as usize, original_len as usize);
        if original_len == 0 && compressed_len == 0 {
            return Ok(out);
        }
        if rest.len() < compressed_len {
            return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "truncated lz4 block"));
        }
        let (data, rest) = rest.split_at(compressed_len);

        let start = out.len();
        match method {
            METHOD_RAW => {
                if compressed_len != original_len {
                    return Err(invalid(format!(
                        "raw lz4 block of {} bytes claims {} bytes",
                        compressed_len, original_len
                    )));
                }
                out.extend_from_slice(data);
            }
            METHOD_LZ4 => {
                let block = lz4_flex::block::decompress(data, original_len).map_err(|e| invalid(e.to_string()))?;
                if block.len() != original_len {
                    return Err(invalid(format!(
                        "lz4 block decoded to {} bytes, expected {}",
                        block.len(),
                        original_len
                    )));
                }
                out.extend_from_slice(&block);
            }
            other => return Err(invalid(format!("unknown lz4 block method {:#x}", other))),
        }
        if checksum(&out[start..]) != expected_checksum {
            return Err(invalid("lz4 block checksum mismatch".to_string()));
        }
        input = rest;
    }
}

pub fn compress(bytes: &[u8], out: &mut Vec<u8>) {
    let level = BLOCK_SIZE.trailing_zeros() - MIN_BLOCK_LEVEL;
    for block in bytes.chunks(BLOCK_SIZE) {
        let compressed = lz4_flex::block::compress(block);
        let (method, data) = if compressed.len() < block.len() {
            (METHOD_LZ4, compressed.as_slice())
        } else {
            (METHOD_RAW, block)
        };
        write_header(out, method | level as u8, data.len(), block.len(), checksum(block));
        out.extend_from_slice(data);
    }
    write_header(out, METHOD_RAW | level as u8, 0, 0, 0);
}

fn write_header(out: &mut Vec<u8>, token: u8, compressed_len: usize, original_len: usize, checksum: u32) {
    out.extend_from_slice(MAGIC);
    out.push(token);
    out.extend_from_slice(&(compressed_len as i32).to_le_bytes());
    out.extend_from_slice(&(original_len as i32).to_le_bytes());
    out.extend_from_slice(&checksum.to_le_bytes());
}

const PRIME_1: u32 = 2_654_435_761;
const PRIME_2: u32 = 2_246_822_519;
const PRIME_3: u32 = 3_266_489_917;
const PRIME_4: u32 = 668_265_263;
const PRIME_5: u32 = 374_761_393;

fn read_u32(bytes: &[u8]) -> u32 {
    u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
}

fn round(acc: u32, lane: u32) -> u32 {
    acc.wrapping_add(lane.wrapping_mul(PRIME_2))
        .rotate_left(13)
        .wrapping_mul(PRIME_1)
}

fn xxh32(bytes: &[u8], seed: u32) -> u32 {
    let mut stripes = bytes.chunks_exact(16);
    let mut h = if bytes.len() >= 16 {
        let mut v = [
            seed.wrapping_add(PRIME_1).wrapping_add(PRIME_2),
            seed.wrapping_add(PRIME_2),
            seed,
            seed.wrapping_sub(PRIME_1),
        ];
        for stripe in &mut stripes {
            for (i, acc) in v.iter_mut().enumerate() {
                *acc = round(*acc, read_u32(&stripe[4 * i..]));
            }
        }
        v[0].rotate_left(1)
            .wrapping_add(v[1].rotate_left(7))
            .wrapping_add(v[2].rotate_left(12))
            .wrapping_add(v[3].rotate_left(18))
    } else {
        seed.wrapping_add(PRIME_5)
    };
    h = h.wrapping_add(bytes.len() as u32);

    let tail = stripes.remainder();
    let mut words = tail.chunks_exact(4);
    for word in &mut words {
        h = h
            .wrapping_add(read_u32(word).wrapping_mul(PRIME_3))
            .rotate_left(17)
            .wrapping_mul(PRIME_4);
    }
    for &byte in words.remainder() {
        h = h
            .wrapping_add((byte as u32).wrapping_mul(PRIME_5))
            .rotate_left(11)
            .wrapping_mul(PRIME_1);
    }

    h ^= h >> 15;
    h = h.wrapping_mul(PRIME_2);
    h ^= h >> 13;
    h = h.wrapping_mul(PRIME_3);
    h ^ (h >> 16)
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
    fn xxh32_reference_values() {
        assert_eq!(xxh32(b"", 0), 0x02cc_5d05);
        assert_eq!(xxh32(b"abc", 0), 0x32d1_53ff);
    }

    #[test]
    fn multi_block_stream() {
        let bytes: Vec<u8> = (0..150_000u32).map(|i| (i % 7) as u8).collect();
        let mut stream = Vec::new();
        compress(&bytes, &mut stream);
        assert_eq!(&stream[..8], MAGIC);
        // 64 KiB blocks.
        assert_eq!(stream[8], METHOD_LZ4 | 6);
        assert_eq!(decompress(&stream).unwrap(), bytes);
    }

    #[test]
    fn incompressible_blocks_are_stored_raw() {
        let bytes = [7u8, 1, 200];
        let mut stream = Vec::new();
        compress(&bytes, &mut stream);
        assert_eq!(stream[8] & 0xf0, METHOD_RAW);
        assert_eq!(&stream[HEADER_LEN..HEADER_LEN + 3], &bytes);
        assert_eq!(decompress(&stream).unwrap(), bytes);
    }

    #[test]
    fn hand_framed_raw_block() {
        let mut stream = Vec::new();
        write_header(&mut stream, METHOD_RAW, 5, 5, checksum(b"hello"));
        stream.extend_from_slice(b"hello");
        write_header(&mut stream, METHOD_RAW, 0, 0, 0);
        assert_eq!(decompress(&stream).unwrap(), b"hello");
    }

    #[test]
    fn damaged_streams_are_errors() {
        let mut stream = Vec::new();
        compress(b"some chunk bytes", &mut stream);

        let mut corrupt = stream.clone();
        corrupt[HEADER_LEN] ^= 0xff;
        assert_eq!(decompress(&corrupt).unwrap_err().kind(), io::ErrorKind::InvalidData);

        let missing_end = &stream[..stream.len() - HEADER_LEN];
        assert_eq!(decompress(missing_end).unwrap_err().kind(), io::ErrorKind::UnexpectedEof);

        let mut bad_magic = stream;
        bad_magic[0] = b'X';
        assert_eq!(decompress(&bad_magic).unwrap_err().kind(), io::ErrorKind::InvalidData);
    }
}
