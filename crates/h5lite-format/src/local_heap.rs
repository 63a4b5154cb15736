//! Local heap parsing: the name storage for v1 groups.

#[cfg(not(feature = "std"))]
extern crate alloc;

#[cfg(not(feature = "std"))]
use alloc::string::String;

use crate::error::FormatError;
use crate::reader::Reader;

/// A parsed local heap header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalHeap {
    /// Size of the data segment in bytes.
    pub data_segment_size: u64,
    /// Offset of the free list head within the data segment.
    pub free_list_head: u64,
    /// File address of the data segment.
    pub data_address: u64,
}

impl LocalHeap {
    /// Parse a `HEAP` header at `address`, restoring the reader position.
    pub fn parse(r: &mut Reader, address: u64) -> Result<LocalHeap, FormatError> {
        let saved = r.position();
        r.seek(address)?;
        r.expect_magic(b"HEAP")?;
        let version = r.read_u8()?;
        if version != 0 {
            return Err(FormatError::UnsupportedVersion {
                component: "local heap",
                version,
            });
        }
        r.skip(3)?; // reserved
        let data_segment_size = r.read_length()?;
        let free_list_head = r.read_length()?;
        let data_address = r.read_offset()?;
        r.seek(saved)?;
        Ok(LocalHeap {
            data_segment_size,
            free_list_head,
            data_address,
        })
    }

    /// Read the NUL-terminated name at `offset` into the data segment,
    /// restoring the reader position.
    pub fn read_string(&self, r: &mut Reader, offset: u64) -> Result<String, FormatError> {
        let pos = self
            .data_address
            .checked_add(offset)
            .ok_or(FormatError::IntegerOverflow(offset))?;
        let saved = r.position();
        r.seek(pos)?;
        let name = r.read_cstring()?;
        r.seek(saved)?;
        Ok(name)
    }
}
