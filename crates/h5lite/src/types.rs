//! User-facing type classification, attribute values, and the typed
//! conversions from raw little-endian element buffers.

use std::fmt;

use h5lite_format::datatype::{Datatype, DatatypeKind};
use h5lite_format::error::FormatError;
use h5lite_format::reader::f16_bits_to_f64;

use crate::error::Error;

/// Simplified element type of a dataset or attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DType {
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    F16,
    F32,
    F64,
    /// Fixed-length string.
    Str,
    /// Boolean, stored as the `{FALSE, TRUE}` int8 enumeration.
    Bool,
    /// Enumeration other than boolean.
    Enum,
    /// Compound element, exposed as raw bytes.
    Compound,
    /// Opaque bytes.
    Opaque,
    /// Variable-length string.
    VlenStr,
    /// Variable-length sequence.
    Vlen,
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DType::I8 => "int8",
            DType::I16 => "int16",
            DType::I32 => "int32",
            DType::I64 => "int64",
            DType::U8 => "uint8",
            DType::U16 => "uint16",
            DType::U32 => "uint32",
            DType::U64 => "uint64",
            DType::F16 => "float16",
            DType::F32 => "float32",
            DType::F64 => "float64",
            DType::Str => "string",
            DType::Bool => "boolean",
            DType::Enum => "enum",
            DType::Compound => "compound",
            DType::Opaque => "opaque",
            DType::VlenStr => "vlen-string",
            DType::Vlen => "vlen",
        };
        f.write_str(name)
    }
}

/// Map a parsed datatype to its user-facing classification.
pub fn classify(dt: &Datatype) -> DType {
    match &dt.kind {
        DatatypeKind::Int8 => DType::I8,
        DatatypeKind::Int16 => DType::I16,
        DatatypeKind::Int32 => DType::I32,
        DatatypeKind::Int64 => DType::I64,
        DatatypeKind::Uint8 => DType::U8,
        DatatypeKind::Uint16 => DType::U16,
        DatatypeKind::Uint32 => DType::U32,
        DatatypeKind::Uint64 => DType::U64,
        DatatypeKind::Float16 => DType::F16,
        DatatypeKind::Float32 => DType::F32,
        DatatypeKind::Float64 => DType::F64,
        DatatypeKind::String { .. } => DType::Str,
        DatatypeKind::Opaque => DType::Opaque,
        DatatypeKind::Compound => DType::Compound,
        DatatypeKind::Enumeration { boolean, .. } => {
            if *boolean {
                DType::Bool
            } else {
                DType::Enum
            }
        }
        DatatypeKind::VariableLength { string, .. } => {
            if *string {
                DType::VlenStr
            } else {
                DType::Vlen
            }
        }
    }
}

pub(crate) fn dtype_name(dt: &Datatype) -> &'static str {
    match &dt.kind {
        DatatypeKind::Int8 => "int8",
        DatatypeKind::Int16 => "int16",
        DatatypeKind::Int32 => "int32",
        DatatypeKind::Int64 => "int64",
        DatatypeKind::Uint8 => "uint8",
        DatatypeKind::Uint16 => "uint16",
        DatatypeKind::Uint32 => "uint32",
        DatatypeKind::Uint64 => "uint64",
        DatatypeKind::Float16 => "float16",
        DatatypeKind::Float32 => "float32",
        DatatypeKind::Float64 => "float64",
        DatatypeKind::String { .. } => "string",
        DatatypeKind::Opaque => "opaque",
        DatatypeKind::Compound => "compound",
        DatatypeKind::Enumeration { .. } => "enum",
        DatatypeKind::VariableLength { .. } => "vlen",
    }
}

/// A decoded attribute value.
#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue {
    Int(i64),
    Uint(u64),
    Float(f64),
    Bool(bool),
    Str(String),
    Bytes(Vec<u8>),
    IntArray(Vec<i64>),
    UintArray(Vec<u64>),
    FloatArray(Vec<f64>),
    BoolArray(Vec<bool>),
    StrArray(Vec<String>),
    BytesArray(Vec<Vec<u8>>),
}

fn element_count(raw: &[u8], elem_size: usize) -> Result<usize, Error> {
    if elem_size == 0 || raw.len() % elem_size != 0 {
        return Err(Error::Format(FormatError::DataSizeMismatch {
            expected: elem_size as u64,
            actual: raw.len() as u64,
        }));
    }
    Ok(raw.len() / elem_size)
}

fn le_element(raw: &[u8], index: usize, size: usize, little_endian: bool) -> [u8; 8] {
    let mut buf = [0u8; 8];
    let src = &raw[index * size..(index + 1) * size];
    if little_endian {
        buf[..size].copy_from_slice(src);
    } else {
        for (i, &b) in src.iter().rev().enumerate() {
            buf[i] = b;
        }
    }
    buf
}

fn signed_kind(kind: &DatatypeKind) -> Option<bool> {
    match kind {
        DatatypeKind::Int8 | DatatypeKind::Int16 | DatatypeKind::Int32 | DatatypeKind::Int64 => {
            Some(true)
        }
        DatatypeKind::Uint8
        | DatatypeKind::Uint16
        | DatatypeKind::Uint32
        | DatatypeKind::Uint64 => Some(false),
        _ => None,
    }
}

fn integer_base(dt: &Datatype) -> Option<&Datatype> {
    match &dt.kind {
        DatatypeKind::Enumeration { base, .. } => signed_kind(&base.kind).map(|_| base.as_ref()),
        _ => signed_kind(&dt.kind).map(|_| dt),
    }
}

/// Decode integer-family elements (including enumerations) to i64.
pub(crate) fn ints_from(raw: &[u8], dt: &Datatype) -> Result<Vec<i64>, Error> {
    let base = integer_base(dt).ok_or(Error::TypeMismatch {
        expected: "integer",
        actual: dtype_name(dt),
    })?;
    let size = base.size as usize;
    let count = element_count(raw, size)?;
    let mut out = Vec::with_capacity(count);
    for i in 0..count {
        let value = base
            .decode_int(&raw[i * size..(i + 1) * size])
            .ok_or(Error::TypeMismatch {
                expected: "integer",
                actual: dtype_name(dt),
            })?;
        out.push(value);
    }
    Ok(out)
}

/// Decode unsigned-integer elements to u64.
pub(crate) fn uints_from(raw: &[u8], dt: &Datatype) -> Result<Vec<u64>, Error> {
    match signed_kind(&dt.kind) {
        Some(false) => {}
        _ => {
            return Err(Error::TypeMismatch {
                expected: "unsigned integer",
                actual: dtype_name(dt),
            })
        }
    }
    let size = dt.size as usize;
    let count = element_count(raw, size)?;
    let mut out = Vec::with_capacity(count);
    for i in 0..count {
        let buf = le_element(raw, i, size, dt.little_endian);
        out.push(u64::from_le_bytes(buf));
    }
    Ok(out)
}

/// Decode numeric elements (integer or floating) to f64.
pub(crate) fn floats_from(raw: &[u8], dt: &Datatype) -> Result<Vec<f64>, Error> {
    match &dt.kind {
        DatatypeKind::Float16 | DatatypeKind::Float32 | DatatypeKind::Float64 => {
            let size = dt.size as usize;
            let count = element_count(raw, size)?;
            let mut out = Vec::with_capacity(count);
            for i in 0..count {
                let buf = le_element(raw, i, size, dt.little_endian);
                let v = match dt.kind {
                    DatatypeKind::Float16 => {
                        f16_bits_to_f64(u16::from_le_bytes([buf[0], buf[1]]))
                    }
                    DatatypeKind::Float32 => {
                        f32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]) as f64
                    }
                    _ => f64::from_le_bytes(buf),
                };
                out.push(v);
            }
            Ok(out)
        }
        DatatypeKind::Uint64 => Ok(uints_from(raw, dt)?.into_iter().map(|v| v as f64).collect()),
        _ => Ok(ints_from(raw, dt)?.into_iter().map(|v| v as f64).collect()),
    }
}

/// Decode boolean-enumeration elements.
pub(crate) fn bools_from(raw: &[u8], dt: &Datatype) -> Result<Vec<bool>, Error> {
    match &dt.kind {
        DatatypeKind::Enumeration { boolean: true, .. } => {
            Ok(ints_from(raw, dt)?.into_iter().map(|v| v != 0).collect())
        }
        _ => Err(Error::TypeMismatch {
            expected: "boolean",
            actual: dtype_name(dt),
        }),
    }
}

/// Decode fixed-length string elements, stripping trailing NUL padding.
pub(crate) fn fixed_strings_from(raw: &[u8], dt: &Datatype) -> Result<Vec<String>, Error> {
    match &dt.kind {
        DatatypeKind::String { .. } => {
            let size = dt.size as usize;
            let count = element_count(raw, size)?;
            let mut out = Vec::with_capacity(count);
            for i in 0..count {
                let mut bytes = raw[i * size..(i + 1) * size].to_vec();
                while bytes.last() == Some(&0) {
                    bytes.pop();
                }
                out.push(String::from_utf8_lossy(&bytes).into_owned());
            }
            Ok(out)
        }
        _ => Err(Error::TypeMismatch {
            expected: "string",
            actual: dtype_name(dt),
        }),
    }
}
