//! Datatype message parsing (message type 0x0003).
//!
//! The decoder recognizes the classes a read-only consumer needs: fixed
//! point, floating point, fixed strings, opaque blobs, compound (exposed as
//! raw bytes), enumerations, and variable-length data. Enumeration base
//! types parse recursively; an enumeration of `{FALSE, TRUE} = {0, 1}` over
//! a signed byte is recognized as boolean.

#[cfg(not(feature = "std"))]
extern crate alloc;

#[cfg(not(feature = "std"))]
use alloc::{boxed::Box, string::String, vec::Vec};

use byteorder::{ByteOrder, LittleEndian};

use crate::error::FormatError;
use crate::reader::Reader;

/// Concrete element interpretation of a [`Datatype`].
#[derive(Debug, Clone, PartialEq)]
pub enum DatatypeKind {
    Int8,
    Int16,
    Int32,
    Int64,
    Uint8,
    Uint16,
    Uint32,
    Uint64,
    Float16,
    Float32,
    Float64,
    /// Fixed-length string.
    String {
        /// True for UTF-8, false for ASCII.
        utf8: bool,
    },
    /// Uninterpreted bytes.
    Opaque,
    /// Compound element; members are exposed as raw bytes only.
    Compound,
    /// Enumeration over an integer base type.
    Enumeration {
        /// The base integer type.
        base: Box<Datatype>,
        /// Member names, in declaration order.
        names: Vec<String>,
        /// Member values, widened to i64.
        values: Vec<i64>,
        /// True for the two-member `{FALSE, TRUE} = {0, 1}` int8 form.
        boolean: bool,
    },
    /// Variable-length data; elements are global heap references.
    VariableLength {
        /// True when the payload is a string.
        string: bool,
        /// True for UTF-8, false for ASCII.
        utf8: bool,
        /// The base type of sequence elements.
        base: Box<Datatype>,
    },
}

/// A parsed datatype message.
#[derive(Debug, Clone, PartialEq)]
pub struct Datatype {
    /// Wire size of one element in bytes.
    pub size: u32,
    /// True when multi-byte fields are little-endian.
    pub little_endian: bool,
    /// Element interpretation.
    pub kind: DatatypeKind,
}

impl Datatype {
    /// Parse a datatype message at the reader's position.
    ///
    /// Nested base types (enumeration, variable length) consume exactly
    /// their own description, so recursive parses stay in sync.
    pub fn parse(r: &mut Reader) -> Result<Datatype, FormatError> {
        let format = r.read_u8()?;
        let class = format & 0x0F;
        let version = format >> 4;
        if version != 1 && version != 2 {
            return Err(FormatError::UnsupportedVersion {
                component: "datatype",
                version,
            });
        }
        let flag_bytes = r.read_vec(3)?;
        let flags = (flag_bytes[0] as u32)
            | ((flag_bytes[1] as u32) << 8)
            | ((flag_bytes[2] as u32) << 16);
        let size = r.read_u32()?;

        match class {
            0 => Self::parse_fixed_point(r, size, flags),
            1 => Self::parse_floating_point(r, class, size, flags),
            3 => Self::parse_string(size, flags),
            5 => Self::parse_opaque(r, size, flags),
            6 => Ok(Datatype {
                size,
                little_endian: true,
                kind: DatatypeKind::Compound,
            }),
            8 => Self::parse_enumeration(r, class, size, flags),
            9 => Self::parse_variable_length(r, class, size, flags),
            _ => Err(FormatError::UnsupportedDatatype { class, size, flags }),
        }
    }

    fn parse_fixed_point(r: &mut Reader, size: u32, flags: u32) -> Result<Datatype, FormatError> {
        let _bit_offset = r.read_u16()?;
        let _bit_precision = r.read_u16()?;
        let little_endian = flags & 0x01 == 0;
        let signed = flags & 0x08 != 0;
        let kind = match (size, signed) {
            (1, true) => DatatypeKind::Int8,
            (2, true) => DatatypeKind::Int16,
            (4, true) => DatatypeKind::Int32,
            (8, true) => DatatypeKind::Int64,
            (1, false) => DatatypeKind::Uint8,
            (2, false) => DatatypeKind::Uint16,
            (4, false) => DatatypeKind::Uint32,
            (8, false) => DatatypeKind::Uint64,
            _ => {
                return Err(FormatError::UnsupportedDatatype {
                    class: 0,
                    size,
                    flags,
                })
            }
        };
        Ok(Datatype {
            size,
            little_endian,
            kind,
        })
    }

    fn parse_floating_point(
        r: &mut Reader,
        class: u8,
        size: u32,
        flags: u32,
    ) -> Result<Datatype, FormatError> {
        // bit offset/precision, exponent/mantissa layout, exponent bias.
        // Only the IEEE little-endian layouts are supported, identified by
        // their exact flag patterns.
        r.skip(12)?;
        let kind = match (size, flags) {
            (2, 0x0F20) => DatatypeKind::Float16,
            (4, 0x1F20) => DatatypeKind::Float32,
            (8, 0x3F20) => DatatypeKind::Float64,
            _ => return Err(FormatError::UnsupportedDatatype { class, size, flags }),
        };
        Ok(Datatype {
            size,
            little_endian: true,
            kind,
        })
    }

    fn parse_string(size: u32, flags: u32) -> Result<Datatype, FormatError> {
        let utf8 = parse_charset(((flags >> 8) & 0x0F) as u8)?;
        Ok(Datatype {
            size,
            little_endian: true,
            kind: DatatypeKind::String { utf8 },
        })
    }

    fn parse_opaque(r: &mut Reader, size: u32, flags: u32) -> Result<Datatype, FormatError> {
        // ASCII tag, padded to a multiple of 8 bytes.
        let tag_len = (flags & 0xFF) as u64;
        r.skip(tag_len.div_ceil(8) * 8)?;
        Ok(Datatype {
            size,
            little_endian: true,
            kind: DatatypeKind::Opaque,
        })
    }

    fn parse_enumeration(
        r: &mut Reader,
        class: u8,
        size: u32,
        flags: u32,
    ) -> Result<Datatype, FormatError> {
        let base = Datatype::parse(r)?;
        let count = (flags & 0xFFFF) as usize;

        let mut names = Vec::with_capacity(count);
        for _ in 0..count {
            let start = r.position();
            let name = r.read_cstring()?;
            let consumed = r.position() - start;
            // Names are padded to 8-byte multiples.
            r.skip((8 - consumed % 8) % 8)?;
            names.push(name);
        }

        let mut values = Vec::with_capacity(count);
        for _ in 0..count {
            let raw = r.read_vec(base.size as usize)?;
            values.push(base.decode_int(&raw).ok_or(FormatError::UnsupportedDatatype {
                class,
                size,
                flags,
            })?);
        }

        let boolean = base.kind == DatatypeKind::Int8
            && names.len() == 2
            && names[0] == "FALSE"
            && names[1] == "TRUE"
            && values == [0, 1];

        Ok(Datatype {
            size,
            little_endian: base.little_endian,
            kind: DatatypeKind::Enumeration {
                base: Box::new(base),
                names,
                values,
                boolean,
            },
        })
    }

    fn parse_variable_length(
        r: &mut Reader,
        class: u8,
        size: u32,
        flags: u32,
    ) -> Result<Datatype, FormatError> {
        let string = flags & 0x0F == 1;
        let utf8 = parse_charset(((flags >> 8) & 0x0F) as u8)?;
        let base = Datatype::parse(r)?;
        if matches!(base.kind, DatatypeKind::VariableLength { .. }) {
            // Nested variable-length types are not supported.
            return Err(FormatError::UnsupportedDatatype { class, size, flags });
        }
        Ok(Datatype {
            size,
            little_endian: true,
            kind: DatatypeKind::VariableLength {
                string,
                utf8,
                base: Box::new(base),
            },
        })
    }

    /// Decode one integer element of this type, widened to i64.
    ///
    /// Returns `None` when the type is not an integer or the slice is not
    /// exactly one element wide.
    pub fn decode_int(&self, raw: &[u8]) -> Option<i64> {
        if raw.len() != self.size as usize {
            return None;
        }
        let mut buf = [0u8; 8];
        if self.little_endian {
            buf[..raw.len()].copy_from_slice(raw);
        } else {
            for (i, &b) in raw.iter().rev().enumerate() {
                buf[i] = b;
            }
        }
        match self.kind {
            DatatypeKind::Int8 => Some(buf[0] as i8 as i64),
            DatatypeKind::Int16 => Some(LittleEndian::read_i16(&buf[..2]) as i64),
            DatatypeKind::Int32 => Some(LittleEndian::read_i32(&buf[..4]) as i64),
            DatatypeKind::Int64 => Some(LittleEndian::read_i64(&buf)),
            DatatypeKind::Uint8 => Some(buf[0] as i64),
            DatatypeKind::Uint16 => Some(LittleEndian::read_u16(&buf[..2]) as i64),
            DatatypeKind::Uint32 => Some(LittleEndian::read_u32(&buf[..4]) as i64),
            DatatypeKind::Uint64 => Some(LittleEndian::read_u64(&buf) as i64),
            _ => None,
        }
    }

    /// True when elements are global heap references.
    pub fn is_variable_length(&self) -> bool {
        matches!(self.kind, DatatypeKind::VariableLength { .. })
    }
}

fn parse_charset(code: u8) -> Result<bool, FormatError> {
    match code {
        0 => Ok(false),
        1 => Ok(true),
        c => Err(FormatError::UnsupportedCharacterSet(c)),
    }
}
