//! Symbol Table entries, nodes (SNOD), and the Symbol Table message.

#[cfg(not(feature = "std"))]
extern crate alloc;

#[cfg(not(feature = "std"))]
use alloc::vec::Vec;

use byteorder::{ByteOrder, LittleEndian};

use crate::error::FormatError;
use crate::reader::Reader;

/// Symbol Table message (type 0x0011) found in v1 group object headers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolTableMessage {
    /// Address of the group's v1 B-tree (node type 0).
    pub btree_address: u64,
    /// Address of the group's local heap.
    pub local_heap_address: u64,
}

impl SymbolTableMessage {
    /// Parse a Symbol Table message at the reader's position.
    pub fn parse(r: &mut Reader) -> Result<SymbolTableMessage, FormatError> {
        let btree_address = r.read_offset()?;
        let local_heap_address = r.read_offset()?;
        Ok(SymbolTableMessage {
            btree_address,
            local_heap_address,
        })
    }
}

/// One entry of a symbol table node: a named link to an object header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolTableEntry {
    /// Byte offset of the link name within the group's local heap.
    pub link_name_offset: u64,
    /// Address of the child object's header.
    pub object_header_address: u64,
    /// Cache type; 0 = nothing cached, 1 = group B-tree/heap cached.
    pub cache_type: u32,
    /// Cached group B-tree address (cache type 1).
    pub btree_address: Option<u64>,
    /// Cached local heap address (cache type 1).
    pub heap_address: Option<u64>,
}

impl SymbolTableEntry {
    /// Parse a symbol table entry at the reader's position.
    ///
    /// Cache types other than 0 and 1 fail with
    /// [`FormatError::UnsupportedCacheType`].
    pub fn parse(r: &mut Reader) -> Result<SymbolTableEntry, FormatError> {
        let link_name_offset = r.read_offset()?;
        let object_header_address = r.read_offset()?;
        let cache_type = r.read_u32()?;
        r.skip(4)?; // reserved
        let scratch = r.read_vec(16)?;

        let (btree_address, heap_address) = match cache_type {
            0 => (None, None),
            1 => {
                let os = r.offset_size() as usize;
                let btree = read_scratch_address(&scratch, 0, os);
                let heap = read_scratch_address(&scratch, os, os);
                (Some(btree), Some(heap))
            }
            other => return Err(FormatError::UnsupportedCacheType(other)),
        };

        Ok(SymbolTableEntry {
            link_name_offset,
            object_header_address,
            cache_type,
            btree_address,
            heap_address,
        })
    }
}

fn read_scratch_address(scratch: &[u8], pos: usize, width: usize) -> u64 {
    match width {
        4 => LittleEndian::read_u32(&scratch[pos..pos + 4]) as u64,
        _ => LittleEndian::read_u64(&scratch[pos..pos + 8]),
    }
}

/// A symbol table node: the leaf payload of a group B-tree.
#[derive(Debug, Clone)]
pub struct SymbolTableNode {
    /// The entries held by this node.
    pub entries: Vec<SymbolTableEntry>,
}

impl SymbolTableNode {
    /// Parse an `SNOD` node at `address`, restoring the reader position.
    pub fn parse(r: &mut Reader, address: u64) -> Result<SymbolTableNode, FormatError> {
        let saved = r.position();
        r.seek(address)?;
        r.expect_magic(b"SNOD")?;
        let version = r.read_u8()?;
        if version != 1 {
            return Err(FormatError::UnsupportedVersion {
                component: "symbol table node",
                version,
            });
        }
        r.skip(1)?; // reserved
        let count = r.read_u16()?;
        let mut entries = Vec::with_capacity(count as usize);
        for _ in 0..count {
            entries.push(SymbolTableEntry::parse(r)?);
        }
        r.seek(saved)?;
        Ok(SymbolTableNode { entries })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build_entry(name_off: u64, ohdr: u64, cache_type: u32, scratch: [u8; 16]) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.extend_from_slice(&name_off.to_le_bytes());
        buf.extend_from_slice(&ohdr.to_le_bytes());
        buf.extend_from_slice(&cache_type.to_le_bytes());
        buf.extend_from_slice(&0u32.to_le_bytes());
        buf.extend_from_slice(&scratch);
        buf
    }

    fn build_snod(entries: &[Vec<u8>]) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.extend_from_slice(b"SNOD");
        buf.push(1);
        buf.push(0);
        buf.extend_from_slice(&(entries.len() as u16).to_le_bytes());
        for e in entries {
            buf.extend_from_slice(e);
        }
        buf
    }

    #[test]
    fn parse_message() {
        let mut data = Vec::new();
        data.extend_from_slice(&0x1000u64.to_le_bytes());
        data.extend_from_slice(&0x2000u64.to_le_bytes());
        let mut r = Reader::from_bytes(data);
        let msg = SymbolTableMessage::parse(&mut r).unwrap();
        assert_eq!(msg.btree_address, 0x1000);
        assert_eq!(msg.local_heap_address, 0x2000);
    }

    #[test]
    fn parse_snod_two_entries() {
        let entries = vec![
            build_entry(0, 0x100, 0, [0u8; 16]),
            build_entry(8, 0x200, 0, [0u8; 16]),
        ];
        let data = build_snod(&entries);
        let mut r = Reader::from_bytes(data);
        let snod = SymbolTableNode::parse(&mut r, 0).unwrap();
        assert_eq!(snod.entries.len(), 2);
        assert_eq!(snod.entries[0].link_name_offset, 0);
        assert_eq!(snod.entries[0].object_header_address, 0x100);
        assert_eq!(snod.entries[1].link_name_offset, 8);
        assert_eq!(snod.entries[1].object_header_address, 0x200);
        // Position restored.
        assert_eq!(r.position(), 0);
    }

    #[test]
    fn cache_type_1_scratch_addresses() {
        let mut scratch = [0u8; 16];
        scratch[..8].copy_from_slice(&0xAA00u64.to_le_bytes());
        scratch[8..].copy_from_slice(&0xBB00u64.to_le_bytes());
        let data = build_snod(&[build_entry(0, 0x100, 1, scratch)]);
        let mut r = Reader::from_bytes(data);
        let snod = SymbolTableNode::parse(&mut r, 0).unwrap();
        assert_eq!(snod.entries[0].btree_address, Some(0xAA00));
        assert_eq!(snod.entries[0].heap_address, Some(0xBB00));
    }

    #[test]
    fn unsupported_cache_type() {
        let data = build_snod(&[build_entry(0, 0x100, 2, [0u8; 16])]);
        let mut r = Reader::from_bytes(data);
        let err = SymbolTableNode::parse(&mut r, 0).unwrap_err();
        assert_eq!(err, FormatError::UnsupportedCacheType(2));
    }

    #[test]
    fn bad_snod_magic() {
        let mut data = build_snod(&[]);
        data[0] = b'X';
        let mut r = Reader::from_bytes(data);
        assert_eq!(
            SymbolTableNode::parse(&mut r, 0).unwrap_err(),
            FormatError::BadMagic(b"SNOD")
        );
    }

    #[test]
    fn bad_snod_version() {
        let mut data = build_snod(&[]);
        data[4] = 2;
        let mut r = Reader::from_bytes(data);
        assert_eq!(
            SymbolTableNode::parse(&mut r, 0).unwrap_err(),
            FormatError::UnsupportedVersion {
                component: "symbol table node",
                version: 2
            }
        );
    }
}
