//! Attribute message parsing (message type 0x000C).
//!
//! Versions 1 (fields padded to 8 bytes), 2, and 3 (adds a name encoding
//! byte) are supported; these are the forms current writers emit.

#[cfg(not(feature = "std"))]
extern crate alloc;

#[cfg(not(feature = "std"))]
use alloc::{string::String, vec::Vec};

use crate::dataspace::Dataspace;
use crate::datatype::Datatype;
use crate::error::FormatError;
use crate::reader::{usize_from, Reader};

/// A parsed attribute: name, type, shape, and the raw value bytes.
///
/// Variable-length values still hold their global heap references here;
/// resolution is a separate pass with heap access.
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeMessage {
    /// Attribute name.
    pub name: String,
    /// Value element type.
    pub datatype: Datatype,
    /// Value shape.
    pub dataspace: Dataspace,
    /// Raw value bytes, `num_elements x datatype.size` long.
    pub raw_data: Vec<u8>,
}

fn pad8(n: u64) -> u64 {
    n.div_ceil(8) * 8
}

impl AttributeMessage {
    /// Parse an attribute message at the reader's position.
    ///
    /// `message_size` bounds the raw value capture at the message end.
    pub fn parse(r: &mut Reader, message_size: u64) -> Result<AttributeMessage, FormatError> {
        let start = r.position();
        let end = start + message_size;
        let version = r.read_u8()?;
        let (header_len, padded) = match version {
            1 => (8u64, true),
            2 => (8, false),
            3 => (9, false),
            v => {
                return Err(FormatError::UnsupportedVersion {
                    component: "attribute",
                    version: v,
                })
            }
        };
        r.skip(1)?; // reserved (v1) or flags (v2/v3)
        let name_size = r.read_u16()? as u64;
        let datatype_size = r.read_u16()? as u64;
        let dataspace_size = r.read_u16()? as u64;
        if version == 3 {
            r.skip(1)?; // name character set encoding
        }

        let field = |n: u64| if padded { pad8(n) } else { n };

        let name = r.read_string(usize_from(name_size)?)?;
        r.seek(start + header_len + field(name_size))?;

        let datatype = Datatype::parse(r)?;
        r.seek(start + header_len + field(name_size) + field(datatype_size))?;

        let dataspace = Dataspace::parse(r)?;
        r.seek(start + header_len + field(name_size) + field(datatype_size) + field(dataspace_size))?;

        let expected = dataspace
            .num_elements()?
            .checked_mul(datatype.size as u64)
            .ok_or(FormatError::IntegerOverflow(datatype.size as u64))?;
        let available = end.saturating_sub(r.position());
        let raw_data = r.read_vec(usize_from(expected.min(available))?)?;

        Ok(AttributeMessage {
            name,
            datatype,
            dataspace,
            raw_data,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datatype::DatatypeKind;

    fn build_i32_dt() -> Vec<u8> {
        let mut buf = vec![0x10, 0x08, 0, 0];
        buf.extend_from_slice(&4u32.to_le_bytes());
        buf.extend_from_slice(&0u16.to_le_bytes());
        buf.extend_from_slice(&32u16.to_le_bytes());
        buf
    }

    fn build_scalar_ds() -> Vec<u8> {
        vec![1, 0, 0, 0, 0, 0, 0, 0]
    }

    fn build_1d_ds(len: u64) -> Vec<u8> {
        let mut buf = vec![1u8, 1, 0, 0, 0, 0, 0, 0];
        buf.extend_from_slice(&len.to_le_bytes());
        buf
    }

    fn pad_to(buf: &mut Vec<u8>, len: usize) {
        buf.resize(len, 0);
    }

    fn build_v1(name: &[u8], dt: &[u8], ds: &[u8], raw: &[u8]) -> Vec<u8> {
        let mut buf = vec![1u8, 0];
        buf.extend_from_slice(&(name.len() as u16).to_le_bytes());
        buf.extend_from_slice(&(dt.len() as u16).to_le_bytes());
        buf.extend_from_slice(&(ds.len() as u16).to_le_bytes());
        buf.extend_from_slice(name);
        pad_to(&mut buf, 8 + pad8(name.len() as u64) as usize);
        let dt_start = buf.len();
        buf.extend_from_slice(dt);
        pad_to(&mut buf, dt_start + pad8(dt.len() as u64) as usize);
        let ds_start = buf.len();
        buf.extend_from_slice(ds);
        pad_to(&mut buf, ds_start + pad8(ds.len() as u64) as usize);
        buf.extend_from_slice(raw);
        buf
    }

    fn build_v2(name: &[u8], dt: &[u8], ds: &[u8], raw: &[u8]) -> Vec<u8> {
        let mut buf = vec![2u8, 0];
        buf.extend_from_slice(&(name.len() as u16).to_le_bytes());
        buf.extend_from_slice(&(dt.len() as u16).to_le_bytes());
        buf.extend_from_slice(&(ds.len() as u16).to_le_bytes());
        buf.extend_from_slice(name);
        buf.extend_from_slice(dt);
        buf.extend_from_slice(ds);
        buf.extend_from_slice(raw);
        buf
    }

    fn parse(data: Vec<u8>) -> Result<AttributeMessage, FormatError> {
        let size = data.len() as u64;
        let mut r = Reader::from_bytes(data);
        AttributeMessage::parse(&mut r, size)
    }

    #[test]
    fn v1_scalar_i32() {
        let data = build_v1(
            b"answer\0",
            &build_i32_dt(),
            &build_scalar_ds(),
            &42i32.to_le_bytes(),
        );
        let attr = parse(data).unwrap();
        assert_eq!(attr.name, "answer");
        assert_eq!(attr.datatype.kind, DatatypeKind::Int32);
        assert!(attr.dataspace.dimensions.is_empty());
        assert_eq!(attr.raw_data, 42i32.to_le_bytes());
    }

    #[test]
    fn v2_array_i32() {
        let mut raw = Vec::new();
        for v in [10i32, 20, 30] {
            raw.extend_from_slice(&v.to_le_bytes());
        }
        let data = build_v2(b"vals\0", &build_i32_dt(), &build_1d_ds(3), &raw);
        let attr = parse(data).unwrap();
        assert_eq!(attr.name, "vals");
        assert_eq!(attr.dataspace.dimensions, vec![3]);
        assert_eq!(attr.raw_data, raw);
    }

    #[test]
    fn v3_with_encoding_byte() {
        let mut buf = vec![3u8, 0];
        let name = b"note\0";
        let dt = build_i32_dt();
        let ds = build_scalar_ds();
        buf.extend_from_slice(&(name.len() as u16).to_le_bytes());
        buf.extend_from_slice(&(dt.len() as u16).to_le_bytes());
        buf.extend_from_slice(&(ds.len() as u16).to_le_bytes());
        buf.push(1); // UTF-8 name
        buf.extend_from_slice(name);
        buf.extend_from_slice(&dt);
        buf.extend_from_slice(&ds);
        buf.extend_from_slice(&7i32.to_le_bytes());
        let attr = parse(buf).unwrap();
        assert_eq!(attr.name, "note");
        assert_eq!(attr.raw_data, 7i32.to_le_bytes());
    }

    #[test]
    fn raw_data_clamped_to_message() {
        // Declared element count larger than the remaining message bytes.
        let data = build_v2(b"x\0", &build_i32_dt(), &build_1d_ds(4), &[1, 2, 3, 4]);
        let attr = parse(data).unwrap();
        assert_eq!(attr.raw_data, vec![1, 2, 3, 4]);
    }

    #[test]
    fn unsupported_version() {
        let data = vec![4u8, 0, 0, 0, 0, 0, 0, 0, 0, 0];
        assert_eq!(
            parse(data).unwrap_err(),
            FormatError::UnsupportedVersion {
                component: "attribute",
                version: 4
            }
        );
    }

    #[test]
    fn truncated() {
        assert!(matches!(
            parse(vec![1, 0, 4]).unwrap_err(),
            FormatError::Truncated { .. }
        ));
    }
}
