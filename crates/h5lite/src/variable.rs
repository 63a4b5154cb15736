//! Materialized dataset values.

use h5lite_format::datatype::{Datatype, DatatypeKind};

use crate::error::Error;
use crate::types::{
    bools_from, classify, dtype_name, fixed_strings_from, floats_from, ints_from, uints_from,
    DType,
};

/// A dataset's materialized value: shape, element type, and the flat
/// element buffer in natural row-major order.
#[derive(Debug, Clone)]
pub struct Variable {
    pub(crate) datatype: Datatype,
    pub(crate) shape: Vec<u64>,
    pub(crate) data: Vec<u8>,
    /// Variable-length string payloads, resolved through the global heap
    /// at materialization time.
    pub(crate) vlen_strings: Option<Vec<String>>,
    /// Variable-length sequence payloads, resolved the same way.
    pub(crate) vlen_bytes: Option<Vec<Vec<u8>>>,
}

impl Variable {
    /// Simplified element type.
    pub fn dtype(&self) -> DType {
        classify(&self.datatype)
    }

    /// The full parsed datatype.
    pub fn datatype(&self) -> &Datatype {
        &self.datatype
    }

    /// Dimension sizes; empty for a scalar.
    pub fn shape(&self) -> &[u64] {
        &self.shape
    }

    /// True when elements are stored little-endian.
    pub fn little_endian(&self) -> bool {
        self.datatype.little_endian
    }

    /// The flat element buffer. For variable-length types these are the
    /// raw heap references; use [`Variable::as_strings`] for the resolved
    /// payloads.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Number of elements.
    pub fn num_elements(&self) -> u64 {
        self.shape.iter().product()
    }

    /// Decode the elements as f64 (numeric types only).
    pub fn as_f64(&self) -> Result<Vec<f64>, Error> {
        floats_from(&self.data, &self.datatype)
    }

    /// Decode the elements as i64 (integer and enumeration types).
    pub fn as_i64(&self) -> Result<Vec<i64>, Error> {
        ints_from(&self.data, &self.datatype)
    }

    /// Decode the elements as u64 (unsigned integer types).
    pub fn as_u64(&self) -> Result<Vec<u64>, Error> {
        uints_from(&self.data, &self.datatype)
    }

    /// Decode the elements as booleans (the `{FALSE, TRUE}` enumeration).
    pub fn as_bools(&self) -> Result<Vec<bool>, Error> {
        bools_from(&self.data, &self.datatype)
    }

    /// Decode the elements as strings: fixed-length strings directly,
    /// variable-length strings from their resolved heap payloads.
    pub fn as_strings(&self) -> Result<Vec<String>, Error> {
        if let Some(strings) = &self.vlen_strings {
            return Ok(strings.clone());
        }
        fixed_strings_from(&self.data, &self.datatype)
    }

    /// Resolved variable-length sequence payloads, when the element type
    /// is a non-string variable-length type.
    pub fn as_byte_sequences(&self) -> Result<Vec<Vec<u8>>, Error> {
        match (&self.vlen_bytes, &self.datatype.kind) {
            (Some(seqs), _) => Ok(seqs.clone()),
            (None, DatatypeKind::VariableLength { .. }) => Ok(Vec::new()),
            _ => Err(Error::TypeMismatch {
                expected: "vlen",
                actual: dtype_name(&self.datatype),
            }),
        }
    }
}
