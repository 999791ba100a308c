//! On-disk raster format for a single eroded tile: a small single-channel
//! float format rather than a full image codec, since a tile is nothing
//! more than a width, a height, and a row-major grid of heights. Magic plus
//! version plus edge length plus a little-endian `f32` payload, and nothing
//! else.

use crate::compositor::RawHeightmap;
use std::io::{self, Read, Write};

const MAGIC: &[u8; 4] = b"FLVT";
const VERSION: u8 = 1;

/// Write `map` to `w` in the on-disk tile format.
pub fn write_raster<W: Write>(w: &mut W, map: &RawHeightmap) -> io::Result<()> {
    w.write_all(MAGIC)?;
    w.write_all(&[VERSION])?;
    w.write_all(&map.size.to_le_bytes())?;
    for value in map.as_slice() {
        w.write_all(&value.to_le_bytes())?;
    }
    Ok(())
}

/// Parse a raster previously written by [`write_raster`]. Any structural
/// problem (bad magic, truncated payload, size mismatch) is reported as an
/// `io::Error`, which the cache layer treats as a miss rather than a hard
/// failure.
pub fn read_raster<R: Read>(r: &mut R) -> io::Result<RawHeightmap> {
    let mut magic = [0u8; 4];
    r.read_exact(&mut magic)?;
    if &magic != MAGIC {
        return Err(io::Error::new(io::ErrorKind::InvalidData, "bad tile magic"));
    }

    let mut version = [0u8; 1];
    r.read_exact(&mut version)?;
    if version[0] != VERSION {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("unsupported tile format version {}", version[0]),
        ));
    }

    let mut size_bytes = [0u8; 4];
    r.read_exact(&mut size_bytes)?;
    let size = u32::from_le_bytes(size_bytes);

    let mut data = Vec::with_capacity((size * size) as usize);
    let mut value_bytes = [0u8; 4];
    for _ in 0..(size as u64 * size as u64) {
        r.read_exact(&mut value_bytes)?;
        data.push(f32::from_le_bytes(value_bytes));
    }

    let mut map = RawHeightmap::filled(size, 0.0);
    for y in 0..size {
        for x in 0..size {
            map.set(x, y, data[(y * size + x) as usize]);
        }
    }
    Ok(map)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roundtrip_exact() {
        let mut map = RawHeightmap::filled(4, 0.0);
        for y in 0..4 {
            for x in 0..4 {
                map.set(x, y, (x as f32) * 0.37 - (y as f32) * 1.5);
            }
        }
        let mut buf = Vec::new();
        write_raster(&mut buf, &map).unwrap();
        let parsed = read_raster(&mut buf.as_slice()).unwrap();
        assert_eq!(parsed, map);
    }

    #[test]
    fn test_bad_magic_is_rejected() {
        let bytes = [0u8; 16];
        assert!(read_raster(&mut &bytes[..]).is_err());
    }

    #[test]
    fn test_truncated_payload_is_rejected() {
        let map = RawHeightmap::filled(4, 1.0);
        let mut buf = Vec::new();
        write_raster(&mut buf, &map).unwrap();
        buf.truncate(buf.len() - 4);
        assert!(read_raster(&mut buf.as_slice()).is_err());
    }
}
