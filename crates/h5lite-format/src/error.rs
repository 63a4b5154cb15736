//! Error types for HDF5 format parsing.

#[cfg(not(feature = "std"))]
extern crate alloc;

#[cfg(not(feature = "std"))]
use alloc::string::String;

#[cfg(feature = "std")]
use std::string::String;

use core::fmt;

/// Errors that can occur while decoding HDF5 binary structures.
///
/// Every variant is fatal to the decode that produced it; nothing is retried.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormatError {
    /// A read ran past the end of the file or stream.
    Truncated {
        /// Byte position the read needed to reach.
        expected: u64,
        /// Number of bytes actually available.
        available: u64,
    },
    /// A magic signature did not match the expected bytes.
    BadMagic(&'static [u8]),
    /// A structure carries a version this decoder does not understand.
    UnsupportedVersion {
        /// Which structure the version belongs to.
        component: &'static str,
        /// The version found in the file.
        version: u8,
    },
    /// Data layout class outside compact/contiguous/chunked.
    UnsupportedLayoutClass(u8),
    /// A filter pipeline names a filter this decoder cannot apply.
    UnsupportedFilter {
        /// Filter identification value.
        id: u16,
        /// Filter name from the pipeline message, if any.
        name: String,
    },
    /// A datatype class/size/flag combination outside the supported set.
    UnsupportedDatatype {
        /// Datatype class (low nibble of the format byte).
        class: u8,
        /// Element size in bytes.
        size: u32,
        /// The 24-bit class bit field.
        flags: u32,
    },
    /// An object header message type outside the dispatch table.
    UnsupportedMessageType(u16),
    /// A character set code other than ASCII (0) or UTF-8 (1).
    UnsupportedCharacterSet(u8),
    /// A symbol table entry cache type other than 0 or 1.
    UnsupportedCacheType(u32),
    /// A v1 B-tree node type other than group (0) or raw chunk (1).
    UnsupportedBTreeType(u8),
    /// The superblock base address is not zero.
    NonZeroBaseAddress(u64),
    /// A 64-bit field does not fit the host's address arithmetic.
    IntegerOverflow(u64),
    /// Compressed chunk data is truncated or self-inconsistent.
    CorruptedCompressedData(&'static str),
    /// Dataspace uses permutation indices or a max size unequal to the
    /// current size.
    PermutedOrUnequalMaxSize,
    /// Offset width other than 4 or 8 bytes.
    InvalidOffsetSize(u8),
    /// Length width other than 4 or 8 bytes.
    InvalidLengthSize(u8),
    /// A v2 dataspace type byte outside scalar/simple/null.
    InvalidDataspaceType(u8),
    /// A link message carries an unknown link type code.
    InvalidLinkType(u8),
    /// Stored data size disagrees with shape x element size.
    DataSizeMismatch {
        /// Size implied by the dataspace and datatype.
        expected: u64,
        /// Size actually present.
        actual: u64,
    },
    /// Chunk shape dimensionality does not match the dataspace.
    ChunkRankMismatch {
        /// Dataspace rank.
        dataspace: usize,
        /// Chunk shape length (including the element-size axis).
        chunk: usize,
    },
    /// A global heap ID points at an object the collection does not hold.
    GlobalHeapObjectNotFound {
        /// Absolute address of the collection.
        collection_address: u64,
        /// Object index within the collection.
        index: u32,
    },
    /// A CRC32C checksum stored in the file does not match the data.
    ChecksumMismatch {
        /// The checksum stored in the file.
        expected: u32,
        /// The checksum we computed.
        computed: u32,
    },
    /// The external byte source failed to service a read.
    SourceError(String),
}

impl fmt::Display for FormatError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FormatError::Truncated {
                expected,
                available,
            } => {
                write!(f, "truncated: need byte {expected}, have {available}")
            }
            FormatError::BadMagic(expected) => {
                write!(
                    f,
                    "bad magic: expected {:?}",
                    core::str::from_utf8(expected).unwrap_or("<binary>")
                )
            }
            FormatError::UnsupportedVersion { component, version } => {
                write!(f, "unsupported {component} version: {version}")
            }
            FormatError::UnsupportedLayoutClass(c) => {
                write!(f, "unsupported data layout class: {c}")
            }
            FormatError::UnsupportedFilter { id, name } => {
                write!(f, "unsupported filter id {id} ({name})")
            }
            FormatError::UnsupportedDatatype { class, size, flags } => {
                write!(
                    f,
                    "unsupported datatype: class {class}, size {size}, flags {flags:#08x}"
                )
            }
            FormatError::UnsupportedMessageType(t) => {
                write!(f, "unsupported object header message type {t:#06x}")
            }
            FormatError::UnsupportedCharacterSet(c) => {
                write!(f, "unsupported character set: {c}")
            }
            FormatError::UnsupportedCacheType(c) => {
                write!(f, "unsupported symbol table cache type: {c}")
            }
            FormatError::UnsupportedBTreeType(t) => {
                write!(f, "unsupported B-tree node type: {t}")
            }
            FormatError::NonZeroBaseAddress(a) => {
                write!(f, "superblock base address is {a:#x}, expected 0")
            }
            FormatError::IntegerOverflow(v) => {
                write!(f, "64-bit field {v:#x} exceeds addressable range")
            }
            FormatError::CorruptedCompressedData(detail) => {
                write!(f, "corrupted compressed data: {detail}")
            }
            FormatError::PermutedOrUnequalMaxSize => {
                write!(f, "dataspace uses permutation indices or max size != current size")
            }
            FormatError::InvalidOffsetSize(s) => {
                write!(f, "invalid offset size: {s} (must be 4 or 8)")
            }
            FormatError::InvalidLengthSize(s) => {
                write!(f, "invalid length size: {s} (must be 4 or 8)")
            }
            FormatError::InvalidDataspaceType(t) => {
                write!(f, "invalid dataspace type: {t}")
            }
            FormatError::InvalidLinkType(t) => {
                write!(f, "invalid link type: {t}")
            }
            FormatError::DataSizeMismatch { expected, actual } => {
                write!(
                    f,
                    "data size mismatch: expected {expected} bytes, got {actual} bytes"
                )
            }
            FormatError::ChunkRankMismatch { dataspace, chunk } => {
                write!(
                    f,
                    "chunk shape has {chunk} dims for a rank-{dataspace} dataspace"
                )
            }
            FormatError::GlobalHeapObjectNotFound {
                collection_address,
                index,
            } => {
                write!(
                    f,
                    "global heap object {index} not found in collection at {collection_address:#x}"
                )
            }
            FormatError::ChecksumMismatch { expected, computed } => {
                write!(
                    f,
                    "checksum mismatch: expected {expected:#010x}, computed {computed:#010x}"
                )
            }
            FormatError::SourceError(ref detail) => {
                write!(f, "byte source error: {detail}")
            }
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for FormatError {}
