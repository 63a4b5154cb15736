//! Data Layout message parsing (message type 0x0008).
//!
//! Versions 1 and 2 share the legacy wire form; version 3 moves the class
//! byte forward and gives contiguous layouts an explicit byte size.

#[cfg(not(feature = "std"))]
extern crate alloc;

#[cfg(not(feature = "std"))]
use alloc::vec::Vec;

use crate::error::FormatError;
use crate::reader::{usize_from, Reader};

/// Where and how a dataset's bytes are stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataLayout {
    /// Inline in the object header.
    Compact {
        /// The raw element bytes.
        data: Vec<u8>,
    },
    /// One span in the file.
    Contiguous {
        /// Start address, [`crate::reader::UNDEFINED_ADDRESS`] when the
        /// data was never allocated.
        address: u64,
        /// Byte size; absent in the legacy message versions, where the
        /// size follows from the dataspace and element size.
        size: Option<u64>,
    },
    /// Tiled into chunks indexed by a v1 B-tree.
    Chunked {
        /// Chunk dimension sizes; the final axis is the element size in
        /// bytes and is stripped during reassembly.
        chunk_shape: Vec<u32>,
        /// Address of the B-tree root,
        /// [`crate::reader::UNDEFINED_ADDRESS`] when no chunk was written.
        btree_address: u64,
    },
}

impl DataLayout {
    /// Parse a data layout message at the reader's position.
    pub fn parse(r: &mut Reader) -> Result<DataLayout, FormatError> {
        let version = r.read_u8()?;
        match version {
            1 | 2 => Self::parse_legacy(r),
            3 => Self::parse_v3(r),
            v => Err(FormatError::UnsupportedVersion {
                component: "data layout",
                version: v,
            }),
        }
    }

    fn parse_legacy(r: &mut Reader) -> Result<DataLayout, FormatError> {
        let dimensionality = r.read_u8()? as usize;
        let class = r.read_u8()?;
        r.skip(5)?; // reserved
        match class {
            0 => {
                let mut dims = Vec::with_capacity(dimensionality);
                for _ in 0..dimensionality {
                    dims.push(r.read_u32()?);
                }
                let size = r.read_u32()? as usize;
                let data = r.read_vec(size)?;
                Ok(DataLayout::Compact { data })
            }
            1 => {
                let address = r.read_offset()?;
                for _ in 0..dimensionality {
                    r.read_u32()?;
                }
                Ok(DataLayout::Contiguous {
                    address,
                    size: None,
                })
            }
            2 => {
                let btree_address = r.read_offset()?;
                let mut chunk_shape = Vec::with_capacity(dimensionality);
                for _ in 0..dimensionality {
                    chunk_shape.push(r.read_u32()?);
                }
                Ok(DataLayout::Chunked {
                    chunk_shape,
                    btree_address,
                })
            }
            c => Err(FormatError::UnsupportedLayoutClass(c)),
        }
    }

    fn parse_v3(r: &mut Reader) -> Result<DataLayout, FormatError> {
        let class = r.read_u8()?;
        match class {
            0 => {
                let size = r.read_u16()? as usize;
                let data = r.read_vec(size)?;
                Ok(DataLayout::Compact { data })
            }
            1 => {
                let address = r.read_offset()?;
                let size = r.read_length()?;
                Ok(DataLayout::Contiguous {
                    address,
                    size: Some(size),
                })
            }
            2 => {
                let dimensionality = usize_from(r.read_u8()? as u64)?;
                let btree_address = r.read_offset()?;
                let mut chunk_shape = Vec::with_capacity(dimensionality);
                for _ in 0..dimensionality {
                    chunk_shape.push(r.read_u32()?);
                }
                Ok(DataLayout::Chunked {
                    chunk_shape,
                    btree_address,
                })
            }
            c => Err(FormatError::UnsupportedLayoutClass(c)),
        }
    }
}
