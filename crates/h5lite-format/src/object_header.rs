//! Object header parsing and the message dispatcher (v1 and v2).
//!
//! The walk parses each recognized message in place, restores the cursor
//! to `message start + declared size` afterwards so a short parse cannot
//! desynchronize the stream, and queues continuation regions until none
//! remain. A NIL message ends the current chunk. Message types outside the
//! dispatch table are rejected.

#[cfg(not(feature = "std"))]
extern crate alloc;

#[cfg(not(feature = "std"))]
use alloc::{collections::VecDeque, string::String, vec::Vec};

#[cfg(feature = "std")]
use std::collections::VecDeque;

use crate::attribute::AttributeMessage;
use crate::data_layout::DataLayout;
use crate::dataspace::Dataspace;
use crate::datatype::Datatype;
use crate::error::FormatError;
use crate::filter_pipeline::FilterPipeline;
use crate::link::LinkMessage;
use crate::message_type::MessageType;
use crate::reader::{usize_from, Reader};
use crate::symbol_table::SymbolTableMessage;

/// An object's decoded header messages.
#[derive(Debug, Clone, Default)]
pub struct DataObjectHeader {
    /// Header version (1 or 2).
    pub version: u8,
    /// Dataspace message, when the object is a dataset or attribute host.
    pub dataspace: Option<Dataspace>,
    /// Datatype message.
    pub datatype: Option<Datatype>,
    /// Data layout message.
    pub data_layout: Option<DataLayout>,
    /// Filter pipeline message.
    pub filter_pipeline: Option<FilterPipeline>,
    /// Attribute messages, in file order.
    pub attributes: Vec<AttributeMessage>,
    /// Link messages, in file order.
    pub links: Vec<LinkMessage>,
    /// Symbol table message (v1-style groups).
    pub symbol_table: Option<SymbolTableMessage>,
    /// Raw Link Info message bytes.
    pub link_info: Option<Vec<u8>>,
    /// Raw Group Info message bytes.
    pub group_info: Option<Vec<u8>>,
    /// Raw Attribute Info message bytes.
    pub attribute_info: Option<Vec<u8>>,
    /// Raw fill value message bytes (old or new form).
    pub fill_value: Option<Vec<u8>>,
    /// Object comment.
    pub comment: Option<String>,
    /// Modification time, seconds since the epoch (message 0x12).
    pub modification_time: Option<u32>,
    /// Raw old-style modification time bytes (message 0x0E).
    pub modification_time_old: Option<Vec<u8>>,
    /// v2 header access/modification/change/birth times (flag 0x20).
    pub times: Option<[u32; 4]>,
}

impl DataObjectHeader {
    /// Parse the object header at `address`, restoring the reader
    /// position.
    pub fn parse(r: &mut Reader, address: u64) -> Result<DataObjectHeader, FormatError> {
        let saved = r.position();
        r.seek(address)?;
        let is_v2 = r.match_magic(b"OHDR")?;
        let mut header = DataObjectHeader::default();
        if is_v2 {
            header.parse_v2(r, address)?;
        } else {
            header.parse_v1(r, address)?;
        }
        r.seek(saved)?;
        Ok(header)
    }

    fn parse_v1(&mut self, r: &mut Reader, address: u64) -> Result<(), FormatError> {
        r.seek(address)?;
        let version = r.read_u8()?;
        if version != 1 {
            return Err(FormatError::UnsupportedVersion {
                component: "object header",
                version,
            });
        }
        self.version = 1;
        r.skip(1)?; // reserved
        let message_count = r.read_u16()?;
        r.skip(4)?; // reference count, unused by this decoder
        let header_size = r.read_u32()? as u64;
        r.align_to(8)?;

        let mut pending: VecDeque<(u64, u64)> = VecDeque::new();
        pending.push_back((r.position(), header_size));
        let mut remaining = message_count as usize;

        while let Some((start, length)) = pending.pop_front() {
            r.seek(start)?;
            let end = start + length;
            while remaining > 0 && r.position() + 8 <= end {
                let msg_type = r.read_u16()?;
                let size = r.read_u16()? as u64;
                let flags = r.read_u8()?;
                r.skip(3)?; // reserved
                let body = r.position();
                if body + size > end {
                    break;
                }
                remaining -= 1;
                if msg_type == 0x0000 {
                    break; // NIL ends the chunk
                }
                self.dispatch(r, msg_type, size, flags, &mut pending)?;
                r.seek(body + size)?;
                r.align_to(8)?;
            }
        }
        Ok(())
    }

    fn parse_v2(&mut self, r: &mut Reader, address: u64) -> Result<(), FormatError> {
        r.seek(address)?;
        r.expect_magic(b"OHDR")?;
        let version = r.read_u8()?;
        if version != 2 {
            return Err(FormatError::UnsupportedVersion {
                component: "object header",
                version,
            });
        }
        self.version = 2;
        let flags = r.read_u8()?;
        if flags & 0x20 != 0 {
            let access = r.read_u32()?;
            let modification = r.read_u32()?;
            let change = r.read_u32()?;
            let birth = r.read_u32()?;
            self.times = Some([access, modification, change, birth]);
        }
        if flags & 0x10 != 0 {
            r.skip(4)?; // compact/dense attribute phase-change limits
        }
        let size_width = 1u8 << (flags & 0x03);
        let chunk_size = r.read_uint(size_width)?;
        let tracked_order = flags & 0x04 != 0;

        let msg_start = r.position();
        let msg_end = msg_start + chunk_size;
        #[cfg(feature = "checksum")]
        {
            let stored = {
                let saved = r.position();
                r.seek(msg_end)?;
                let v = r.read_u32()?;
                r.seek(saved)?;
                v
            };
            verify_checksum(r, address, msg_end, stored)?;
        }

        let mut pending: VecDeque<(u64, u64)> = VecDeque::new();
        self.walk_v2_messages(r, msg_start, msg_end, tracked_order, &mut pending)?;

        while let Some((offset, length)) = pending.pop_front() {
            r.seek(offset)?;
            r.expect_magic(b"OCHK")?;
            let body_end = offset + length - 4;
            #[cfg(feature = "checksum")]
            {
                let stored = {
                    let saved = r.position();
                    r.seek(body_end)?;
                    let v = r.read_u32()?;
                    r.seek(saved)?;
                    v
                };
                verify_checksum(r, offset, body_end, stored)?;
            }
            self.walk_v2_messages(r, offset + 4, body_end, tracked_order, &mut pending)?;
        }
        Ok(())
    }

    fn walk_v2_messages(
        &mut self,
        r: &mut Reader,
        start: u64,
        end: u64,
        tracked_order: bool,
        pending: &mut VecDeque<(u64, u64)>,
    ) -> Result<(), FormatError> {
        r.seek(start)?;
        let head_len = if tracked_order { 6u64 } else { 4 };
        while r.position() + head_len <= end {
            let msg_type = r.read_u8()? as u16;
            let size = r.read_u16()? as u64;
            let flags = r.read_u8()?;
            if tracked_order {
                r.skip(2)?; // creation order
            }
            let body = r.position();
            if body + size > end {
                break;
            }
            if msg_type == 0x0000 {
                break; // NIL ends the chunk
            }
            self.dispatch(r, msg_type, size, flags, pending)?;
            r.seek(body + size)?;
        }
        Ok(())
    }

    fn dispatch(
        &mut self,
        r: &mut Reader,
        msg_type: u16,
        size: u64,
        flags: u8,
        pending: &mut VecDeque<(u64, u64)>,
    ) -> Result<(), FormatError> {
        let msg_type =
            MessageType::from_u16(msg_type).ok_or(FormatError::UnsupportedMessageType(msg_type))?;
        match msg_type {
            MessageType::Nil => {}
            MessageType::Dataspace => {
                // A 4-byte message with flags 1 is a placeholder left by
                // writers; it carries no shape.
                if !(size == 4 && flags == 1) {
                    self.dataspace = Some(Dataspace::parse(r)?);
                }
            }
            MessageType::LinkInfo => {
                self.link_info = Some(r.read_vec(usize_from(size)?)?);
            }
            MessageType::Datatype => {
                self.datatype = Some(Datatype::parse(r)?);
            }
            MessageType::FillValueOld | MessageType::FillValue => {
                self.fill_value = Some(r.read_vec(usize_from(size)?)?);
            }
            MessageType::Link => {
                self.links.push(LinkMessage::parse(r)?);
            }
            MessageType::DataLayout => {
                self.data_layout = Some(DataLayout::parse(r)?);
            }
            MessageType::GroupInfo => {
                self.group_info = Some(r.read_vec(usize_from(size)?)?);
            }
            MessageType::FilterPipeline => {
                self.filter_pipeline = Some(FilterPipeline::parse(r)?);
            }
            MessageType::Attribute => {
                self.attributes.push(AttributeMessage::parse(r, size)?);
            }
            MessageType::ObjectComment => {
                self.comment = Some(r.read_cstring()?);
            }
            MessageType::ObjectModificationTimeOld => {
                self.modification_time_old = Some(r.read_vec(usize_from(size)?)?);
            }
            MessageType::ObjectHeaderContinuation => {
                let offset = r.read_offset()?;
                let length = r.read_length()?;
                pending.push_back((offset, length));
            }
            MessageType::SymbolTable => {
                self.symbol_table = Some(SymbolTableMessage::parse(r)?);
            }
            MessageType::ObjectModificationTime => {
                let _version = r.read_u8()?;
                r.skip(3)?; // reserved
                self.modification_time = Some(r.read_u32()?);
            }
            MessageType::AttributeInfo => {
                self.attribute_info = Some(r.read_vec(usize_from(size)?)?);
            }
        }
        Ok(())
    }

    /// True when the header describes a dataset (all of datatype,
    /// dataspace, and layout are present).
    pub fn is_dataset(&self) -> bool {
        self.datatype.is_some() && self.dataspace.is_some() && self.data_layout.is_some()
    }
}

#[cfg(feature = "checksum")]
fn verify_checksum(r: &mut Reader, start: u64, end: u64, stored: u32) -> Result<(), FormatError> {
    let saved = r.position();
    r.seek(start)?;
    let covered = r.read_vec(usize_from(end - start)?)?;
    r.seek(saved)?;
    let computed = crc32c::crc32c(&covered);
    if computed != stored {
        return Err(FormatError::ChecksumMismatch {
            expected: stored,
            computed,
        });
    }
    Ok(())
}
