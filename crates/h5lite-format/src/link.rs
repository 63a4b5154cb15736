//! Link message parsing (message type 0x0006).

#[cfg(not(feature = "std"))]
extern crate alloc;

#[cfg(not(feature = "std"))]
use alloc::{string::String, vec::Vec};

use crate::error::FormatError;
use crate::reader::{usize_from, Reader};

/// Where a link points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkTarget {
    /// Hard link: the child's object header address.
    Hard {
        /// Address of the child object header.
        object_header_address: u64,
    },
    /// Soft link: a path within the file. Parsed, not traversed.
    Soft {
        /// The stored link path.
        path: String,
    },
    /// External link: raw target bytes. Parsed, not traversed.
    External {
        /// The stored external link value.
        value: Vec<u8>,
    },
}

/// A parsed Link message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkMessage {
    /// Link name.
    pub name: String,
    /// Link target.
    pub target: LinkTarget,
}

impl LinkMessage {
    /// Parse a v1 Link message at the reader's position.
    pub fn parse(r: &mut Reader) -> Result<LinkMessage, FormatError> {
        let version = r.read_u8()?;
        if version != 1 {
            return Err(FormatError::UnsupportedVersion {
                component: "link message",
                version,
            });
        }
        let flags = r.read_u8()?;
        let link_type = if flags & 0x08 != 0 { r.read_u8()? } else { 0 };
        if flags & 0x04 != 0 {
            r.skip(8)?; // creation order
        }
        if flags & 0x10 != 0 {
            r.skip(1)?; // link name character set
        }
        let name_len_width = 1u8 << (flags & 0x03);
        let name_len = r.read_uint(name_len_width)?;
        let name = r.read_string(usize_from(name_len)?)?;

        let target = match link_type {
            0 => LinkTarget::Hard {
                object_header_address: r.read_offset()?,
            },
            1 => {
                let len = r.read_u16()? as usize;
                LinkTarget::Soft {
                    path: r.read_string(len)?,
                }
            }
            64 => {
                let len = r.read_u16()? as usize;
                LinkTarget::External {
                    value: r.read_vec(len)?,
                }
            }
            other => return Err(FormatError::InvalidLinkType(other)),
        };

        Ok(LinkMessage { name, target })
    }
}
