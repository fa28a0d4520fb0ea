//! Binary container format
//!
//! Fast, uncompressed layout for the histogram store. All integers and
//! floats are little-endian.
//!
//! # Format layout
//!
//! ```text
//! Offset       Size          Field
//! ------       ----          -----
//! 0            4             "HCUB" magic bytes
//! 4            4             format version (u32, currently 1)
//! 8            8             num_features (u64)
//! 16           4             layer count (u32)
//! 20           ...           layer records
//! ```
//!
//! Each layer record is a meta record immediately followed by its row
//! block:
//!
//! ```text
//! 4            name length (u32)
//! name length  UTF-8 layer name
//! 4            low_bin (i32)
//! 4            up_bin (i32)
//! 4            scale (f32)
//! 4            offset (f32)
//! 1            timestamp flag (u8, 0 or 1)
//! [4           timestamp length (u32), only if flag = 1]
//! [ts length   ISO-8601 timestamp string, only if flag = 1]
//! rows         num_features * bin_count u32 counts, feature-major
//! ```
//!
//! A new layer is appended at the end of the last row block; the header
//! layer count is only bumped after the record is fully on disk, so a
//! truncated append is invisible to readers. Bytes past the last committed
//! record are ignored.

use chrono::{DateTime, Utc};
use histocube_core::{Error, LayerMeta, Result};
use std::io::{Read, Write};

/// Magic bytes identifying a histocube container
pub const MAGIC: [u8; 4] = *b"HCUB";

/// Container format version
pub const VERSION: u32 = 1;

/// Total header size in bytes
pub const HEADER_LEN: u64 = 20;

/// Byte offset of the layer count within the header
pub const LAYER_COUNT_OFFSET: u64 = 16;

/// Bytes per histogram count
pub const COUNT_SIZE: u64 = 4;

/// Maximum accepted layer name length in bytes
const MAX_NAME_LEN: u32 = 4096;

/// Maximum accepted timestamp string length in bytes
const MAX_TIMESTAMP_LEN: u32 = 64;

fn read_exact_array<const N: usize>(reader: &mut impl Read) -> Result<[u8; N]> {
    let mut buf = [0u8; N];
    reader.read_exact(&mut buf)?;
    Ok(buf)
}

fn read_u8(reader: &mut impl Read) -> Result<u8> {
    Ok(read_exact_array::<1>(reader)?[0])
}

fn read_u32(reader: &mut impl Read) -> Result<u32> {
    Ok(u32::from_le_bytes(read_exact_array(reader)?))
}

fn read_i32(reader: &mut impl Read) -> Result<i32> {
    Ok(i32::from_le_bytes(read_exact_array(reader)?))
}

fn read_f32(reader: &mut impl Read) -> Result<f32> {
    Ok(f32::from_le_bytes(read_exact_array(reader)?))
}

fn read_u64(reader: &mut impl Read) -> Result<u64> {
    Ok(u64::from_le_bytes(read_exact_array(reader)?))
}

/// Write the container header.
pub fn write_header(
    writer: &mut impl Write,
    num_features: u64,
    layer_count: u32,
) -> Result<()> {
    writer.write_all(&MAGIC)?;
    writer.write_all(&VERSION.to_le_bytes())?;
    writer.write_all(&num_features.to_le_bytes())?;
    writer.write_all(&layer_count.to_le_bytes())?;
    Ok(())
}

/// Read and validate the container header.
///
/// Returns `(num_features, layer_count)`.
///
/// # Errors
///
/// Returns [`Error::Format`] on a bad magic tag, an unsupported version or
/// a zero feature count.
pub fn read_header(reader: &mut impl Read) -> Result<(u64, u32)> {
    let magic: [u8; 4] = read_exact_array(reader).map_err(|e| match e {
        Error::Io(io) if io.kind() == std::io::ErrorKind::UnexpectedEof => {
            Error::Format("file too short for header".into())
        }
        other => other,
    })?;
    if magic != MAGIC {
        return Err(Error::Format("not a histocube file".into()));
    }
    let version = read_u32(reader)?;
    if version != VERSION {
        return Err(Error::Format(format!(
            "unsupported format version: {version}"
        )));
    }
    let num_features = read_u64(reader)?;
    if num_features == 0 {
        return Err(Error::Format("header declares zero features".into()));
    }
    let layer_count = read_u32(reader)?;
    Ok((num_features, layer_count))
}

/// Write one layer meta record.
pub fn write_meta(writer: &mut impl Write, meta: &LayerMeta) -> Result<()> {
    let name = meta.name().as_bytes();
    writer.write_all(&(name.len() as u32).to_le_bytes())?;
    writer.write_all(name)?;
    writer.write_all(&meta.low_bin().to_le_bytes())?;
    writer.write_all(&meta.up_bin().to_le_bytes())?;
    writer.write_all(&meta.scale().to_le_bytes())?;
    writer.write_all(&meta.offset().to_le_bytes())?;
    match meta.timestamp() {
        Some(ts) => {
            writer.write_all(&[1])?;
            let text = ts.to_rfc3339();
            writer.write_all(&(text.len() as u32).to_le_bytes())?;
            writer.write_all(text.as_bytes())?;
        }
        None => writer.write_all(&[0])?,
    }
    Ok(())
}

/// Read one layer meta record.
///
/// # Errors
///
/// Returns [`Error::Format`] on truncated records, oversized fields,
/// non-UTF-8 names or a meta that fails [`LayerMeta`] validation.
pub fn read_meta(reader: &mut impl Read) -> Result<LayerMeta> {
    let name_len = read_u32(reader)?;
    if name_len == 0 || name_len > MAX_NAME_LEN {
        return Err(Error::Format(format!(
            "implausible layer name length: {name_len}"
        )));
    }
    let mut name_bytes = vec![0u8; name_len as usize];
    reader.read_exact(&mut name_bytes)?;
    let name = String::from_utf8(name_bytes)
        .map_err(|e| Error::Format(format!("layer name is not UTF-8: {e}")))?;

    let low_bin = read_i32(reader)?;
    let up_bin = read_i32(reader)?;
    let scale = read_f32(reader)?;
    let offset = read_f32(reader)?;

    let timestamp = match read_u8(reader)? {
        0 => None,
        1 => {
            let ts_len = read_u32(reader)?;
            if ts_len == 0 || ts_len > MAX_TIMESTAMP_LEN {
                return Err(Error::Format(format!(
                    "implausible timestamp length: {ts_len}"
                )));
            }
            let mut ts_bytes = vec![0u8; ts_len as usize];
            reader.read_exact(&mut ts_bytes)?;
            let text = std::str::from_utf8(&ts_bytes)
                .map_err(|e| Error::Format(format!("timestamp is not UTF-8: {e}")))?;
            let parsed = DateTime::parse_from_rfc3339(text)
                .map_err(|e| Error::Format(format!("bad timestamp '{text}': {e}")))?;
            Some(parsed.with_timezone(&Utc))
        }
        other => {
            return Err(Error::Format(format!("bad timestamp flag: {other}")));
        }
    };

    LayerMeta::from_parts(name, low_bin, up_bin, scale, offset, timestamp)
        .map_err(|e| Error::Format(format!("invalid layer directory entry: {e}")))
}

/// Encoded size of a meta record in bytes.
pub fn meta_len(meta: &LayerMeta) -> u64 {
    let name_len = meta.name().len() as u64;
    let ts_len = match meta.timestamp() {
        Some(ts) => 4 + ts.to_rfc3339().len() as u64,
        None => 0,
    };
    4 + name_len + 4 + 4 + 4 + 4 + 1 + ts_len
}

/// Size of a layer's row block in bytes.
pub fn block_len(num_features: u64, bin_count: usize) -> u64 {
    num_features * bin_count as u64 * COUNT_SIZE
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use histocube_core::LayerDef;
    use std::io::Cursor;

    #[test]
    fn test_header_roundtrip() {
        let mut buf = Vec::new();
        write_header(&mut buf, 1234, 7).unwrap();
        assert_eq!(buf.len() as u64, HEADER_LEN);
        assert!(buf.starts_with(b"HCUB"));
        let (n, count) = read_header(&mut Cursor::new(&buf)).unwrap();
        assert_eq!(n, 1234);
        assert_eq!(count, 7);
    }

    #[test]
    fn test_header_bad_magic() {
        let data = b"notahistocubefilepadding";
        let err = read_header(&mut Cursor::new(&data[..])).unwrap_err();
        assert!(err.to_string().contains("not a histocube"));
    }

    #[test]
    fn test_header_truncated() {
        let data = b"HC";
        assert!(read_header(&mut Cursor::new(&data[..])).is_err());
    }

    #[test]
    fn test_header_bad_version() {
        let mut buf = Vec::new();
        write_header(&mut buf, 10, 0).unwrap();
        buf[4] = 99;
        let err = read_header(&mut Cursor::new(&buf)).unwrap_err();
        assert!(err.to_string().contains("version"));
    }

    #[test]
    fn test_header_zero_features() {
        let mut buf = Vec::new();
        write_header(&mut buf, 0, 0).unwrap();
        assert!(read_header(&mut Cursor::new(&buf)).is_err());
    }

    #[test]
    fn test_meta_roundtrip_no_timestamp() {
        let meta = LayerDef::new("ndvi", -100, 100)
            .with_quantization(0.01, 0.0)
            .validate()
            .unwrap();
        let mut buf = Vec::new();
        write_meta(&mut buf, &meta).unwrap();
        assert_eq!(buf.len() as u64, meta_len(&meta));
        let restored = read_meta(&mut Cursor::new(&buf)).unwrap();
        assert_eq!(restored, meta);
    }

    #[test]
    fn test_meta_roundtrip_with_timestamp() {
        let ts = Utc.with_ymd_and_hms(2024, 6, 1, 12, 30, 0).unwrap();
        let meta = LayerDef::new("backscatter", 0, 255)
            .with_timestamp(ts)
            .validate()
            .unwrap();
        let mut buf = Vec::new();
        write_meta(&mut buf, &meta).unwrap();
        assert_eq!(buf.len() as u64, meta_len(&meta));
        let restored = read_meta(&mut Cursor::new(&buf)).unwrap();
        assert_eq!(restored.timestamp(), Some(ts));
        assert_eq!(restored, meta);
    }

    #[test]
    fn test_meta_truncated() {
        let meta = LayerDef::new("t", 0, 4).validate().unwrap();
        let mut buf = Vec::new();
        write_meta(&mut buf, &meta).unwrap();
        buf.truncate(buf.len() - 3);
        assert!(read_meta(&mut Cursor::new(&buf)).is_err());
    }

    #[test]
    fn test_meta_rejects_huge_name() {
        let mut buf = Vec::new();
        buf.extend_from_slice(&u32::MAX.to_le_bytes());
        let err = read_meta(&mut Cursor::new(&buf)).unwrap_err();
        assert!(err.to_string().contains("name length"));
    }

    #[test]
    fn test_meta_rejects_bad_domain() {
        // low_bin >= up_bin must not survive decoding
        let mut buf = Vec::new();
        buf.extend_from_slice(&1u32.to_le_bytes());
        buf.push(b'x');
        buf.extend_from_slice(&5i32.to_le_bytes());
        buf.extend_from_slice(&3i32.to_le_bytes());
        buf.extend_from_slice(&1.0f32.to_le_bytes());
        buf.extend_from_slice(&0.0f32.to_le_bytes());
        buf.push(0);
        assert!(read_meta(&mut Cursor::new(&buf)).is_err());
    }

    #[test]
    fn test_block_len() {
        assert_eq!(block_len(3, 5), 60);
    }
}
