//! Read-only access to HDF5 files: groups, attributes, and dataset
//! values.
//!
//! The decoder reconstructs the logical tree of groups and datasets from
//! either an in-memory byte slab or a seekable source, exposes each
//! dataset's shape, element type, and attributes, and materializes
//! payloads (chunked and filter-compressed included) into flat row-major
//! buffers.
//!
//! ```no_run
//! use h5lite::File;
//!
//! let bytes = std::fs::read("data.h5").unwrap();
//! let file = File::from_bytes(bytes).unwrap().expect("not an HDF5 file");
//! let root = file.root();
//! if let Some(ds) = root.group("sensors/temperature").unwrap() {
//!     let var = ds.value().unwrap().unwrap();
//!     println!("{:?} {:?}", var.shape(), var.as_f64().unwrap());
//! }
//! ```

pub mod error;
pub mod file;
pub mod group;
pub mod types;
pub mod variable;

pub use error::Error;
pub use file::{File, IoSource};
pub use group::Group;
pub use types::{classify, AttrValue, DType};
pub use variable::Variable;

// Low-level format structures for advanced users.
pub use h5lite_format as format;
