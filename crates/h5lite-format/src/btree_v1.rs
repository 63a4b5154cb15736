//! Version 1 B-tree traversal.
//!
//! Type 0 trees index a group's symbol table nodes; type 1 trees index a
//! chunked dataset's raw chunks. Both walks flatten the tree: the returned
//! list holds every leaf entry reachable from the root, in key order.

#[cfg(not(feature = "std"))]
extern crate alloc;

#[cfg(not(feature = "std"))]
use alloc::vec::Vec;

use crate::error::FormatError;
use crate::reader::Reader;

/// One raw chunk recorded in a type 1 B-tree leaf.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawChunk {
    /// Stored (possibly filtered) size of the chunk in bytes.
    pub size: u32,
    /// Bit i set means filter i of the pipeline was skipped for this chunk.
    pub filter_mask: u32,
    /// Chunk offset in dataset element space, one entry per chunk-shape
    /// axis including the trailing element-size axis (always 0).
    pub offsets: Vec<u64>,
    /// File address of the chunk bytes.
    pub address: u64,
}

/// Collect the addresses of all symbol table nodes (`SNOD`) reachable from
/// the group B-tree rooted at `address`. Restores the reader position.
pub fn collect_symbol_nodes(r: &mut Reader, address: u64) -> Result<Vec<u64>, FormatError> {
    let saved = r.position();
    let mut out = Vec::new();
    walk_group_node(r, address, &mut out)?;
    r.seek(saved)?;
    Ok(out)
}

fn walk_group_node(r: &mut Reader, address: u64, out: &mut Vec<u64>) -> Result<(), FormatError> {
    r.seek(address)?;
    r.expect_magic(b"TREE")?;
    let node_type = r.read_u8()?;
    if node_type != 0 {
        return Err(FormatError::UnsupportedBTreeType(node_type));
    }
    let level = r.read_u8()?;
    let entries = r.read_u16()?;
    r.read_offset()?; // left sibling, unused
    r.read_offset()?; // right sibling, unused

    let mut children = Vec::with_capacity(entries as usize);
    for _ in 0..entries {
        let _key = r.read_length()?;
        children.push(r.read_offset()?);
    }

    if level == 0 {
        out.extend(children);
    } else {
        for child in children {
            walk_group_node(r, child, out)?;
        }
    }
    Ok(())
}

/// Collect every chunk recorded in the type 1 B-tree rooted at `address`.
///
/// `ndims` is the chunk-shape length from the data layout message, i.e. the
/// dataspace rank plus the element-size axis. Restores the reader position.
pub fn collect_chunks(
    r: &mut Reader,
    address: u64,
    ndims: usize,
) -> Result<Vec<RawChunk>, FormatError> {
    let saved = r.position();
    let mut out = Vec::new();
    walk_chunk_node(r, address, ndims, &mut out)?;
    r.seek(saved)?;
    Ok(out)
}

fn walk_chunk_node(
    r: &mut Reader,
    address: u64,
    ndims: usize,
    out: &mut Vec<RawChunk>,
) -> Result<(), FormatError> {
    r.seek(address)?;
    r.expect_magic(b"TREE")?;
    let node_type = r.read_u8()?;
    if node_type != 1 {
        return Err(FormatError::UnsupportedBTreeType(node_type));
    }
    let level = r.read_u8()?;
    let entries = r.read_u16()?;
    r.read_offset()?;
    r.read_offset()?;

    if level == 0 {
        for _ in 0..entries {
            let size = r.read_u32()?;
            let filter_mask = r.read_u32()?;
            let mut offsets = Vec::with_capacity(ndims);
            for _ in 0..ndims {
                offsets.push(r.read_u64()?);
            }
            let chunk_address = r.read_offset()?;
            out.push(RawChunk {
                size,
                filter_mask,
                offsets,
                address: chunk_address,
            });
        }
    } else {
        let mut children = Vec::with_capacity(entries as usize);
        for _ in 0..entries {
            r.skip(8 + 8 * ndims as u64)?; // key: size + mask + offsets
            children.push(r.read_offset()?);
        }
        for child in children {
            walk_chunk_node(r, child, ndims, out)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn undef() -> [u8; 8] {
        u64::MAX.to_le_bytes()
    }

    fn build_group_node(level: u8, keys: &[u64], children: &[u64]) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.extend_from_slice(b"TREE");
        buf.push(0);
        buf.push(level);
        buf.extend_from_slice(&(children.len() as u16).to_le_bytes());
        buf.extend_from_slice(&undef());
        buf.extend_from_slice(&undef());
        for (key, child) in keys.iter().zip(children) {
            buf.extend_from_slice(&key.to_le_bytes());
            buf.extend_from_slice(&child.to_le_bytes());
        }
        buf
    }

    fn build_chunk_node(level: u8, chunks: &[RawChunk]) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.extend_from_slice(b"TREE");
        buf.push(1);
        buf.push(level);
        buf.extend_from_slice(&(chunks.len() as u16).to_le_bytes());
        buf.extend_from_slice(&undef());
        buf.extend_from_slice(&undef());
        for c in chunks {
            buf.extend_from_slice(&c.size.to_le_bytes());
            buf.extend_from_slice(&c.filter_mask.to_le_bytes());
            for off in &c.offsets {
                buf.extend_from_slice(&off.to_le_bytes());
            }
            buf.extend_from_slice(&c.address.to_le_bytes());
        }
        buf
    }

    #[test]
    fn group_leaf() {
        let node = build_group_node(0, &[0, 8], &[0x100, 0x200]);
        let mut file = vec![0u8; 512];
        file[..node.len()].copy_from_slice(&node);
        let mut r = Reader::from_bytes(file);
        r.seek(77).unwrap();
        let snods = collect_symbol_nodes(&mut r, 0).unwrap();
        assert_eq!(snods, vec![0x100, 0x200]);
        assert_eq!(r.position(), 77);
    }

    #[test]
    fn group_two_levels() {
        let leaf1 = build_group_node(0, &[0], &[0xA00]);
        let leaf2 = build_group_node(0, &[8], &[0xB00]);
        let root = build_group_node(1, &[0, 8], &[0x100, 0x200]);
        let mut file = vec![0u8; 1024];
        file[0x100..0x100 + leaf1.len()].copy_from_slice(&leaf1);
        file[0x200..0x200 + leaf2.len()].copy_from_slice(&leaf2);
        file[0x300..0x300 + root.len()].copy_from_slice(&root);
        let mut r = Reader::from_bytes(file);
        let snods = collect_symbol_nodes(&mut r, 0x300).unwrap();
        assert_eq!(snods, vec![0xA00, 0xB00]);
    }

    #[test]
    fn group_rejects_chunk_node() {
        let node = build_chunk_node(0, &[]);
        let mut file = vec![0u8; 256];
        file[..node.len()].copy_from_slice(&node);
        let mut r = Reader::from_bytes(file);
        assert_eq!(
            collect_symbol_nodes(&mut r, 0).unwrap_err(),
            FormatError::UnsupportedBTreeType(1)
        );
    }

    #[test]
    fn chunk_leaf() {
        let chunks = vec![
            RawChunk {
                size: 80,
                filter_mask: 0,
                offsets: vec![0, 0],
                address: 0x1000,
            },
            RawChunk {
                size: 64,
                filter_mask: 1,
                offsets: vec![10, 0],
                address: 0x2000,
            },
        ];
        let node = build_chunk_node(0, &chunks);
        let mut file = vec![0u8; 512];
        file[..node.len()].copy_from_slice(&node);
        let mut r = Reader::from_bytes(file);
        let got = collect_chunks(&mut r, 0, 2).unwrap();
        assert_eq!(got, chunks);
    }

    #[test]
    fn chunk_two_levels() {
        let c1 = RawChunk {
            size: 16,
            filter_mask: 0,
            offsets: vec![0, 0, 0],
            address: 0x500,
        };
        let c2 = RawChunk {
            size: 16,
            filter_mask: 0,
            offsets: vec![2, 0, 0],
            address: 0x600,
        };
        let leaf1 = build_chunk_node(0, core::slice::from_ref(&c1));
        let leaf2 = build_chunk_node(0, core::slice::from_ref(&c2));
        // Internal node entries carry a key of the same width plus the
        // child address.
        let mut root = Vec::new();
        root.extend_from_slice(b"TREE");
        root.push(1);
        root.push(1);
        root.extend_from_slice(&2u16.to_le_bytes());
        root.extend_from_slice(&undef());
        root.extend_from_slice(&undef());
        for child in [0x100u64, 0x200] {
            root.extend_from_slice(&0u32.to_le_bytes());
            root.extend_from_slice(&0u32.to_le_bytes());
            root.extend_from_slice(&[0u8; 24]); // 3 offsets
            root.extend_from_slice(&child.to_le_bytes());
        }
        let mut file = vec![0u8; 1024];
        file[0x100..0x100 + leaf1.len()].copy_from_slice(&leaf1);
        file[0x200..0x200 + leaf2.len()].copy_from_slice(&leaf2);
        file[0x300..0x300 + root.len()].copy_from_slice(&root);
        let mut r = Reader::from_bytes(file);
        let got = collect_chunks(&mut r, 0x300, 3).unwrap();
        assert_eq!(got, vec![c1, c2]);
    }

    #[test]
    fn chunk_rejects_group_node() {
        let node = build_group_node(0, &[], &[]);
        let mut file = vec![0u8; 256];
        file[..node.len()].copy_from_slice(&node);
        let mut r = Reader::from_bytes(file);
        assert_eq!(
            collect_chunks(&mut r, 0, 2).unwrap_err(),
            FormatError::UnsupportedBTreeType(0)
        );
    }

    #[test]
    fn bad_magic() {
        let mut file = vec![0u8; 64];
        file[..4].copy_from_slice(b"XXXX");
        let mut r = Reader::from_bytes(file);
        assert_eq!(
            collect_symbol_nodes(&mut r, 0).unwrap_err(),
            FormatError::BadMagic(b"TREE")
        );
    }
}
