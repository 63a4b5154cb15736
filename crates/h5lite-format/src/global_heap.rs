//! Global heap collections: storage for variable-length data.

#[cfg(not(feature = "std"))]
extern crate alloc;

#[cfg(not(feature = "std"))]
use alloc::{collections::BTreeMap, vec::Vec};

#[cfg(feature = "std")]
use std::collections::BTreeMap;

use byteorder::{ByteOrder, LittleEndian};

use crate::error::FormatError;
use crate::reader::{usize_from, Reader, UNDEFINED_ADDRESS};

/// Reference to one object in a global heap collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GlobalHeapId {
    /// Absolute file address of the collection.
    pub collection_address: u64,
    /// Object index within the collection (1-based; 0 marks free space).
    pub index: u32,
}

impl GlobalHeapId {
    /// True for the null reference forms used by empty variable-length
    /// elements.
    pub fn is_null(&self) -> bool {
        self.collection_address == 0 || self.collection_address == UNDEFINED_ADDRESS
    }
}

/// A variable-length element: payload length plus heap reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VlenRef {
    /// Payload length in bytes (strings) or elements (sequences).
    pub length: u32,
    /// Where the payload lives.
    pub heap_id: GlobalHeapId,
}

/// Parse the wire form of variable-length elements from raw dataset or
/// attribute bytes: `length(u32) + collection_address + object_index(u32)`
/// per element.
pub fn parse_vlen_refs(
    raw: &[u8],
    count: usize,
    offset_size: u8,
) -> Result<Vec<VlenRef>, FormatError> {
    let os = offset_size as usize;
    let elem = 4 + os + 4;
    let needed = count
        .checked_mul(elem)
        .ok_or(FormatError::IntegerOverflow(count as u64))?;
    if raw.len() < needed {
        return Err(FormatError::Truncated {
            expected: needed as u64,
            available: raw.len() as u64,
        });
    }
    let mut refs = Vec::with_capacity(count);
    let mut pos = 0;
    for _ in 0..count {
        let length = LittleEndian::read_u32(&raw[pos..pos + 4]);
        pos += 4;
        let collection_address = match os {
            4 => {
                let v = LittleEndian::read_u32(&raw[pos..pos + 4]);
                if v == u32::MAX {
                    UNDEFINED_ADDRESS
                } else {
                    v as u64
                }
            }
            _ => LittleEndian::read_u64(&raw[pos..pos + 8]),
        };
        pos += os;
        let index = LittleEndian::read_u32(&raw[pos..pos + 4]);
        pos += 4;
        refs.push(VlenRef {
            length,
            heap_id: GlobalHeapId {
                collection_address,
                index,
            },
        });
    }
    Ok(refs)
}

/// A parsed `GCOL` collection.
#[derive(Debug, Clone)]
pub struct GlobalHeapCollection {
    /// Declared collection size in bytes, header included.
    pub size: u64,
    objects: BTreeMap<u16, Vec<u8>>,
}

impl GlobalHeapCollection {
    /// Parse a collection at `address`, restoring the reader position.
    ///
    /// Objects run until the index-0 free-space marker or the declared
    /// collection end, whichever comes first.
    pub fn parse(r: &mut Reader, address: u64) -> Result<GlobalHeapCollection, FormatError> {
        let saved = r.position();
        r.seek(address)?;
        r.expect_magic(b"GCOL")?;
        let version = r.read_u8()?;
        if version != 1 {
            return Err(FormatError::UnsupportedVersion {
                component: "global heap",
                version,
            });
        }
        r.skip(3)?; // reserved
        let size = r.read_length()?;
        let end = address
            .checked_add(size)
            .ok_or(FormatError::IntegerOverflow(size))?;

        let mut objects = BTreeMap::new();
        while r.position() + 2 <= end {
            let index = r.read_u16()?;
            if index == 0 {
                break;
            }
            r.skip(2)?; // reference count, ignored
            r.skip(4)?; // reserved
            let object_size = r.read_length()?;
            let data = r.read_vec(usize_from(object_size)?)?;
            objects.insert(index, data);
            // Payloads are padded to 8-byte multiples, clamped to the
            // collection end.
            let pad = (8 - object_size % 8) % 8;
            let next = r.position().saturating_add(pad).min(end);
            r.seek(next)?;
        }

        r.seek(saved)?;
        Ok(GlobalHeapCollection { size, objects })
    }

    /// Fetch an object's payload by index.
    pub fn object(&self, index: u16) -> Option<&[u8]> {
        self.objects.get(&index).map(|v| v.as_slice())
    }
}
