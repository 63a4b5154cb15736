//! Filter Pipeline message parsing (message type 0x000B).

#[cfg(not(feature = "std"))]
extern crate alloc;

#[cfg(not(feature = "std"))]
use alloc::{string::String, vec::Vec};

use crate::error::FormatError;
use crate::reader::Reader;

/// Description of a single filter in a pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterDescription {
    /// Filter identification value.
    pub id: u16,
    /// Filter name, when one is recorded.
    pub name: Option<String>,
    /// Filter flags (bit 0 = optional).
    pub flags: u16,
    /// Client data values passed to the filter.
    pub client_data: Vec<u32>,
}

/// An ordered filter pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterPipeline {
    /// Filters in compression order; decoding applies them in ascending
    /// index order per chunk.
    pub filters: Vec<FilterDescription>,
}

impl FilterPipeline {
    /// Parse a filter pipeline message at the reader's position.
    ///
    /// Only the version 1 wire form is implemented; the version 2 compact
    /// header is rejected as unsupported.
    pub fn parse(r: &mut Reader) -> Result<FilterPipeline, FormatError> {
        let version = r.read_u8()?;
        if version != 1 {
            return Err(FormatError::UnsupportedVersion {
                component: "filter pipeline",
                version,
            });
        }
        let count = r.read_u8()? as usize;
        r.skip(2)?; // reserved
        r.skip(4)?; // reserved

        let mut filters = Vec::with_capacity(count);
        for _ in 0..count {
            let id = r.read_u16()?;
            let name_length = r.read_u16()? as u64;
            let flags = r.read_u16()?;
            let client_data_count = r.read_u16()? as usize;

            let name = if name_length > 0 {
                let name = r.read_string(name_length as usize)?;
                // Names are padded to 8-byte multiples.
                r.skip((8 - name_length % 8) % 8)?;
                if name.is_empty() {
                    None
                } else {
                    Some(name)
                }
            } else {
                None
            };

            let mut client_data = Vec::with_capacity(client_data_count);
            for _ in 0..client_data_count {
                client_data.push(r.read_u32()?);
            }
            // An odd count of client data words is padded to 8 bytes.
            if client_data_count % 2 == 1 {
                r.skip(4)?;
            }

            filters.push(FilterDescription {
                id,
                name,
                flags,
                client_data,
            });
        }

        Ok(FilterPipeline { filters })
    }
}
