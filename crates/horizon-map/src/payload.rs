mod lz4_block;

use std::io::{self, Read, Write};

/// Compression scheme byte that prefixes every persisted chunk payload.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[repr(u8)]
pub enum Compression {
    Gzip = 1,
    Zlib = 2,
    Uncompressed = 3,
    Lz4 = 4,
}

impl Compression {
    pub fn from_scheme(scheme: u8) -> Option<Self> {
        Some(match scheme {
            1 => Self::Gzip,
            2 => Self::Zlib,
            3 => Self::Uncompressed,
            4 => Self::Lz4,
            _ => return None,
        })
    }
}

/// Returns the uncompressed tag bytes of `payload`.
pub fn decompress_payload(payload: &[u8]) -> io::Result<Vec<u8>> {
    let (&scheme, body) = payload
        .split_first()
        .ok_or_else(|| io::Error::new(io::ErrorKind::UnexpectedEof, "empty chunk payload"))?;
    let scheme = Compression::from_scheme(scheme).ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::InvalidData,
            format!("unknown compression scheme {}", scheme),
        )
    })?;

    let mut out = Vec::with_capacity(body.len() * 4);
    match scheme {
        Compression::Gzip => {
            flate2::read::GzDecoder::new(body).read_to_end(&mut out)?;
        }
        Compression::Zlib => {
            flate2::read::ZlibDecoder::new(body).read_to_end(&mut out)?;
        }
        Compression::Uncompressed => out.extend_from_slice(body),
        Compression::Lz4 => out = lz4_block::decompress(body)?,
    }
    Ok(out)
}

/// Prefixes `bytes` with the `scheme` byte and compresses them.
pub fn compress_payload(scheme: Compression, bytes: &[u8]) -> io::Result<Vec<u8>> {
    let out = vec![scheme as u8];
    match scheme {
        Compression::Gzip => {
            let mut encoder = flate2::write::GzEncoder::new(out, flate2::Compression::default());
            encoder.write_all(bytes)?;
            encoder.finish()
        }
        Compression::Zlib => {
            let mut encoder = flate2::write::ZlibEncoder::new(out, flate2::Compression::default());
            encoder.write_all(bytes)?;
            encoder.finish()
        }
        Compression::Uncompressed => {
            let mut out = out;
            out.extend_from_slice(bytes);
            Ok(out)
        }
        Compression::Lz4 => {
            let mut out = out;
            lz4_block::compress(bytes, &mut out);
            Ok(out)
        }
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
    fn every_scheme_restores_the_input() {
        let bytes: Vec<u8> = (0..10_000u32).map(|i| (i % 251) as u8).collect();
        for scheme in [
            Compression::Gzip,
            Compression::Zlib,
            Compression::Uncompressed,
            Compression::Lz4,
        ] {
            let payload = compress_payload(scheme, &bytes).unwrap();
            assert_eq!(payload[0], scheme as u8);
            assert_eq!(decompress_payload(&payload).unwrap(), bytes);
        }
    }

    #[test]
    fn bad_payloads_are_errors() {
        assert!(decompress_payload(&[]).is_err());
        assert!(decompress_payload(&[9, 1, 2, 3]).is_err());
        assert!(decompress_payload(&[2, 1, 2, 3]).is_err());
        // Lz4 frames are not the host's block framing.
        assert!(decompress_payload(&[4, 0x04, 0x22, 0x4d, 0x18]).is_err());
    }
}
