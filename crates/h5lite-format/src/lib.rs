//! Low-level parsing of the HDF5 binary file format.
//!
//! This crate decodes the on-disk structures of HDF5 (superblock, object
//! headers, B-trees, heaps, datatypes, layouts, and the chunk filter
//! pipeline) through a dual-mode positioned [`reader::Reader`]. It
//! supports `no_std` environments with the `alloc` crate; the windowed
//! reader sources and the DEFLATE filter require `std`.
//!
//! The companion `h5lite` crate builds the user-facing `File`/`Group`/
//! `Variable` API on top of these parsers.

#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(not(feature = "std"))]
extern crate alloc;

pub mod attribute;
pub mod btree_v1;
pub mod chunked_read;
pub mod data_layout;
pub mod dataspace;
pub mod datatype;
pub mod error;
pub mod filter_pipeline;
pub mod filters;
pub mod global_heap;
pub mod link;
pub mod local_heap;
pub mod message_type;
pub mod object_header;
pub mod reader;
pub mod superblock;
pub mod symbol_table;
