//! HDF5 superblock parsing for versions 0, 1, 2, and 3.

use crate::error::FormatError;
use crate::reader::Reader;
use crate::symbol_table::SymbolTableEntry;

/// The 8-byte HDF5 file signature, required at offset 0.
pub const HDF5_SIGNATURE: [u8; 8] = [0x89, b'H', b'D', b'F', b'\r', b'\n', 0x1A, b'\n'];

/// Where the root group is anchored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RootLocation {
    /// v0/v1: the root symbol table entry embedded in the superblock.
    Entry(SymbolTableEntry),
    /// v2/v3: the address of the root object header.
    HeaderAddress(u64),
}

/// Parsed HDF5 superblock (all supported versions).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Superblock {
    /// Superblock version (0-3).
    pub version: u8,
    /// Size of offsets in bytes (4 or 8).
    pub offset_size: u8,
    /// Size of lengths in bytes (4 or 8).
    pub length_size: u8,
    /// End-of-file address.
    pub eof_address: u64,
    /// Root group anchor.
    pub root: RootLocation,
    /// Group leaf node K (v0/v1 only).
    pub group_leaf_node_k: Option<u16>,
    /// Group internal node K (v0/v1 only).
    pub group_internal_node_k: Option<u16>,
    /// Indexed storage internal node K (v1 only).
    pub indexed_storage_internal_node_k: Option<u16>,
    /// Free space address (v0/v1 only).
    pub free_space_address: Option<u64>,
    /// Driver info block address (v0/v1 only).
    pub driver_info_address: Option<u64>,
    /// Superblock extension address (v2/v3 only).
    pub superblock_extension_address: Option<u64>,
}

impl Superblock {
    /// Parse the superblock at the reader's current position (normally 0).
    ///
    /// Verifies the signature, initializes the reader's offset/length
    /// widths, and requires the base address to be zero.
    pub fn parse(r: &mut Reader) -> Result<Superblock, FormatError> {
        r.expect_magic(&HDF5_SIGNATURE)?;
        let version = r.read_u8()?;
        match version {
            0 | 1 => Self::parse_v0_v1(r, version),
            2 | 3 => Self::parse_v2_v3(r, version),
            v => Err(FormatError::UnsupportedVersion {
                component: "superblock",
                version: v,
            }),
        }
    }

    fn parse_v0_v1(r: &mut Reader, version: u8) -> Result<Superblock, FormatError> {
        r.skip(1)?; // free space storage version
        r.skip(1)?; // root group symbol table version
        r.skip(1)?; // reserved
        r.skip(1)?; // shared header message version
        let offset_size = r.read_u8()?;
        let length_size = r.read_u8()?;
        r.initialize(offset_size, length_size)?;
        r.skip(1)?; // reserved
        let group_leaf_node_k = r.read_u16()?;
        let group_internal_node_k = r.read_u16()?;
        let indexed_storage_internal_node_k = if version == 1 {
            let k = r.read_u16()?;
            r.skip(2)?; // reserved
            Some(k)
        } else {
            None
        };
        r.skip(4)?; // file consistency flags

        let base_address = r.read_offset()?;
        let free_space_address = r.read_offset()?;
        let eof_address = r.read_offset()?;
        let driver_info_address = r.read_offset()?;
        if base_address != 0 {
            return Err(FormatError::NonZeroBaseAddress(base_address));
        }

        let root_entry = SymbolTableEntry::parse(r)?;

        Ok(Superblock {
            version,
            offset_size,
            length_size,
            eof_address,
            root: RootLocation::Entry(root_entry),
            group_leaf_node_k: Some(group_leaf_node_k),
            group_internal_node_k: Some(group_internal_node_k),
            indexed_storage_internal_node_k,
            free_space_address: Some(free_space_address),
            driver_info_address: Some(driver_info_address),
            superblock_extension_address: None,
        })
    }

    fn parse_v2_v3(r: &mut Reader, version: u8) -> Result<Superblock, FormatError> {
        let start = r.position() - 9;
        let offset_size = r.read_u8()?;
        let length_size = r.read_u8()?;
        r.initialize(offset_size, length_size)?;
        r.skip(1)?; // file consistency flags

        let base_address = r.read_offset()?;
        let superblock_extension_address = r.read_offset()?;
        let eof_address = r.read_offset()?;
        let root_header_address = r.read_offset()?;
        if base_address != 0 {
            return Err(FormatError::NonZeroBaseAddress(base_address));
        }

        let checksum_pos = r.position();
        let _stored_checksum = r.read_u32()?;
        #[cfg(feature = "checksum")]
        {
            let saved = r.position();
            r.seek(start)?;
            let covered = r.read_vec((checksum_pos - start) as usize)?;
            r.seek(saved)?;
            let computed = crc32c::crc32c(&covered);
            if computed != _stored_checksum {
                return Err(FormatError::ChecksumMismatch {
                    expected: _stored_checksum,
                    computed,
                });
            }
        }
        #[cfg(not(feature = "checksum"))]
        {
            let _ = (start, checksum_pos);
        }

        Ok(Superblock {
            version,
            offset_size,
            length_size,
            eof_address,
            root: RootLocation::HeaderAddress(root_header_address),
            group_leaf_node_k: None,
            group_internal_node_k: None,
            indexed_storage_internal_node_k: None,
            free_space_address: None,
            driver_info_address: None,
            superblock_extension_address: Some(superblock_extension_address),
        })
    }
}
