//! File handles: open modes, the decoded-object arena, and the lazy
//! caches shared by all group handles.

use std::cell::{OnceCell, RefCell};
use std::collections::{BTreeMap, HashMap};
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;
use std::rc::Rc;

use h5lite_format::chunked_read::read_chunked_data;
use h5lite_format::data_layout::DataLayout;
use h5lite_format::datatype::DatatypeKind;
use h5lite_format::error::FormatError;
use h5lite_format::global_heap::{parse_vlen_refs, GlobalHeapCollection, GlobalHeapId, VlenRef};
use h5lite_format::link::LinkTarget;
use h5lite_format::local_heap::LocalHeap;
use h5lite_format::object_header::DataObjectHeader;
use h5lite_format::reader::{ByteSource, Reader, UNDEFINED_ADDRESS};
use h5lite_format::superblock::{RootLocation, Superblock, HDF5_SIGNATURE};
use h5lite_format::symbol_table::SymbolTableNode;
use h5lite_format::{btree_v1, attribute::AttributeMessage};

use crate::error::Error;
use crate::group::Group;
use crate::types::{
    bools_from, fixed_strings_from, floats_from, ints_from, uints_from, AttrValue,
};
use crate::variable::Variable;

/// Files larger than this open in windowed mode instead of being read
/// into memory.
const WINDOW_MODE_THRESHOLD: u64 = 256 * 1024 * 1024;

fn to_usize(v: u64) -> Result<usize, Error> {
    usize::try_from(v).map_err(|_| Error::Format(FormatError::IntegerOverflow(v)))
}

/// Adapt any `Read + Seek` value into a [`ByteSource`] for windowed
/// reading.
pub struct IoSource<R> {
    inner: R,
    len: u64,
}

impl<R: Read + Seek> IoSource<R> {
    /// Wrap a seekable reader, measuring its length once.
    pub fn new(mut inner: R) -> Result<IoSource<R>, Error> {
        let len = inner.seek(SeekFrom::End(0))?;
        Ok(IoSource { inner, len })
    }
}

impl<R: Read + Seek> ByteSource for IoSource<R> {
    fn len(&mut self) -> Result<u64, FormatError> {
        Ok(self.len)
    }

    fn read_at(&mut self, pos: u64, buf: &mut [u8]) -> Result<usize, FormatError> {
        self.inner
            .seek(SeekFrom::Start(pos))
            .map_err(|e| FormatError::SourceError(e.to_string()))?;
        self.inner
            .read(buf)
            .map_err(|e| FormatError::SourceError(e.to_string()))
    }
}

/// A decoded object header plus its compute-once caches.
pub(crate) struct ObjectNode {
    pub(crate) header: DataObjectHeader,
    children: OnceCell<Vec<(String, u64)>>,
    attributes: OnceCell<BTreeMap<String, AttrValue>>,
    value: OnceCell<Option<Rc<Variable>>>,
}

pub(crate) struct FileInner {
    reader: RefCell<Reader>,
    superblock: Superblock,
    /// Global heap collections, loaded on first reference.
    heap: RefCell<HashMap<u64, Rc<GlobalHeapCollection>>>,
    /// Arena of decoded objects keyed by header address; terminates
    /// cyclic references and avoids re-parsing.
    objects: RefCell<HashMap<u64, Rc<ObjectNode>>>,
}

/// An open HDF5 file.
///
/// Holds the reader for its whole lifetime; all group handles created
/// from it share the same lazy caches.
pub struct File {
    pub(crate) inner: Rc<FileInner>,
}

impl File {
    /// Open from an in-memory byte slab.
    ///
    /// Returns `Ok(None)` when the bytes are not HDF5 (missing or short
    /// signature); malformed HDF5 is an error.
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Option<File>, Error> {
        Self::from_reader(Reader::from_bytes(bytes))
    }

    /// Open from a seekable byte source in windowed mode.
    pub fn from_source(source: Box<dyn ByteSource>) -> Result<Option<File>, Error> {
        Self::from_reader(Reader::from_source(source)?)
    }

    /// Open a file on disk, choosing windowed mode for very large files.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Option<File>, Error> {
        let len = std::fs::metadata(&path)?.len();
        if len > WINDOW_MODE_THRESHOLD {
            let file = std::fs::File::open(&path)?;
            Self::from_source(Box::new(IoSource::new(file)?))
        } else {
            Self::from_bytes(std::fs::read(&path)?)
        }
    }

    fn from_reader(mut reader: Reader) -> Result<Option<File>, Error> {
        if reader.len() < 8 {
            return Ok(None);
        }
        reader.seek(0)?;
        if !reader.match_magic(&HDF5_SIGNATURE)? {
            return Ok(None);
        }
        let superblock = Superblock::parse(&mut reader)?;
        Ok(Some(File {
            inner: Rc::new(FileInner {
                reader: RefCell::new(reader),
                superblock,
                heap: RefCell::new(HashMap::new()),
                objects: RefCell::new(HashMap::new()),
            }),
        }))
    }

    /// The root group.
    pub fn root(&self) -> Group {
        let address = match &self.inner.superblock.root {
            RootLocation::Entry(entry) => entry.object_header_address,
            RootLocation::HeaderAddress(address) => *address,
        };
        Group::root(self.inner.clone(), address)
    }

    /// The parsed superblock.
    pub fn superblock(&self) -> &Superblock {
        &self.inner.superblock
    }
}

impl std::fmt::Debug for File {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("File")
            .field("size", &self.inner.reader.borrow().len())
            .field("superblock_version", &self.inner.superblock.version)
            .finish()
    }
}

impl FileInner {
    fn offset_size(&self) -> u8 {
        self.superblock.offset_size
    }

    /// Fetch (or decode and cache) the object at `address`.
    pub(crate) fn object(&self, address: u64) -> Result<Rc<ObjectNode>, Error> {
        if let Some(node) = self.objects.borrow().get(&address) {
            return Ok(node.clone());
        }
        let header = {
            let mut r = self.reader.borrow_mut();
            DataObjectHeader::parse(&mut r, address)?
        };
        let node = Rc::new(ObjectNode {
            header,
            children: OnceCell::new(),
            attributes: OnceCell::new(),
            value: OnceCell::new(),
        });
        self.objects.borrow_mut().insert(address, node.clone());
        Ok(node)
    }

    /// The `(name, header address)` pairs of an object's children.
    pub(crate) fn children(&self, node: &ObjectNode) -> Result<Vec<(String, u64)>, Error> {
        if let Some(children) = node.children.get() {
            return Ok(children.clone());
        }
        let computed = self.compute_children(&node.header)?;
        let _ = node.children.set(computed.clone());
        Ok(computed)
    }

    fn compute_children(&self, header: &DataObjectHeader) -> Result<Vec<(String, u64)>, Error> {
        if let Some(st) = &header.symbol_table {
            if st.btree_address == UNDEFINED_ADDRESS || st.local_heap_address == UNDEFINED_ADDRESS
            {
                return Ok(Vec::new());
            }
            let mut r = self.reader.borrow_mut();
            let heap = LocalHeap::parse(&mut r, st.local_heap_address)?;
            let node_addresses = btree_v1::collect_symbol_nodes(&mut r, st.btree_address)?;
            let mut out = Vec::new();
            for address in node_addresses {
                let snod = SymbolTableNode::parse(&mut r, address)?;
                for entry in &snod.entries {
                    let name = heap.read_string(&mut r, entry.link_name_offset)?;
                    out.push((name, entry.object_header_address));
                }
            }
            Ok(out)
        } else {
            Ok(header
                .links
                .iter()
                .filter_map(|link| match &link.target {
                    LinkTarget::Hard {
                        object_header_address,
                    } => Some((link.name.clone(), *object_header_address)),
                    _ => None,
                })
                .collect())
        }
    }

    /// An object's attributes, decoded and heap-resolved.
    pub(crate) fn attributes(
        &self,
        node: &ObjectNode,
    ) -> Result<BTreeMap<String, AttrValue>, Error> {
        if let Some(attrs) = node.attributes.get() {
            return Ok(attrs.clone());
        }
        let mut computed = BTreeMap::new();
        for msg in &node.header.attributes {
            computed.insert(msg.name.clone(), self.decode_attribute(msg)?);
        }
        let _ = node.attributes.set(computed.clone());
        Ok(computed)
    }

    fn decode_attribute(&self, msg: &AttributeMessage) -> Result<AttrValue, Error> {
        let dt = &msg.datatype;
        let raw = &msg.raw_data;
        let count = to_usize(msg.dataspace.num_elements()?)?;
        let scalar = msg.dataspace.dimensions.is_empty() && !msg.dataspace.null;

        let value = match &dt.kind {
            DatatypeKind::VariableLength { string, .. } => {
                let refs = parse_vlen_refs(raw, count, self.offset_size())?;
                if *string {
                    let strings = self.resolve_vlen_strings(&refs)?;
                    if scalar {
                        AttrValue::Str(strings.into_iter().next().unwrap_or_default())
                    } else {
                        AttrValue::StrArray(strings)
                    }
                } else {
                    let seqs = self.resolve_vlen_bytes(&refs)?;
                    if scalar {
                        AttrValue::Bytes(seqs.into_iter().next().unwrap_or_default())
                    } else {
                        AttrValue::BytesArray(seqs)
                    }
                }
            }
            DatatypeKind::Enumeration { boolean: true, .. } => {
                let values = bools_from(raw, dt)?;
                if scalar {
                    AttrValue::Bool(values.first().copied().unwrap_or_default())
                } else {
                    AttrValue::BoolArray(values)
                }
            }
            DatatypeKind::Enumeration { .. } => {
                let values = ints_from(raw, dt)?;
                if scalar {
                    AttrValue::Int(values.first().copied().unwrap_or_default())
                } else {
                    AttrValue::IntArray(values)
                }
            }
            DatatypeKind::String { .. } => {
                let values = fixed_strings_from(raw, dt)?;
                if scalar {
                    AttrValue::Str(values.into_iter().next().unwrap_or_default())
                } else {
                    AttrValue::StrArray(values)
                }
            }
            DatatypeKind::Float16 | DatatypeKind::Float32 | DatatypeKind::Float64 => {
                let values = floats_from(raw, dt)?;
                if scalar {
                    AttrValue::Float(values.first().copied().unwrap_or_default())
                } else {
                    AttrValue::FloatArray(values)
                }
            }
            DatatypeKind::Uint8
            | DatatypeKind::Uint16
            | DatatypeKind::Uint32
            | DatatypeKind::Uint64 => {
                let values = uints_from(raw, dt)?;
                if scalar {
                    AttrValue::Uint(values.first().copied().unwrap_or_default())
                } else {
                    AttrValue::UintArray(values)
                }
            }
            DatatypeKind::Int8
            | DatatypeKind::Int16
            | DatatypeKind::Int32
            | DatatypeKind::Int64 => {
                let values = ints_from(raw, dt)?;
                if scalar {
                    AttrValue::Int(values.first().copied().unwrap_or_default())
                } else {
                    AttrValue::IntArray(values)
                }
            }
            DatatypeKind::Opaque | DatatypeKind::Compound => AttrValue::Bytes(raw.clone()),
        };
        Ok(value)
    }

    /// The object's dataset value, or `None` when the object is a plain
    /// group.
    pub(crate) fn value(&self, node: &ObjectNode) -> Result<Option<Rc<Variable>>, Error> {
        if let Some(value) = node.value.get() {
            return Ok(value.clone());
        }
        let computed = self.compute_value(&node.header)?;
        let _ = node.value.set(computed.clone());
        Ok(computed)
    }

    fn compute_value(&self, header: &DataObjectHeader) -> Result<Option<Rc<Variable>>, Error> {
        let (Some(dt), Some(ds), Some(layout)) =
            (&header.datatype, &header.dataspace, &header.data_layout)
        else {
            return Ok(None);
        };

        let item_size = dt.size as usize;
        let expected = ds
            .num_elements()?
            .checked_mul(dt.size as u64)
            .ok_or(FormatError::IntegerOverflow(dt.size as u64))?;

        let data: Vec<u8> = match layout {
            DataLayout::Compact { data } => {
                if (data.len() as u64) < expected {
                    return Err(Error::Format(FormatError::DataSizeMismatch {
                        expected,
                        actual: data.len() as u64,
                    }));
                }
                data[..to_usize(expected)?].to_vec()
            }
            DataLayout::Contiguous { address, size } => {
                if *address == UNDEFINED_ADDRESS {
                    Vec::new()
                } else {
                    let stored = size.unwrap_or(expected);
                    if stored != expected {
                        return Err(Error::Format(FormatError::DataSizeMismatch {
                            expected,
                            actual: stored,
                        }));
                    }
                    let mut r = self.reader.borrow_mut();
                    let saved = r.position();
                    r.seek(*address)?;
                    let bytes = r.read_vec(to_usize(stored)?)?;
                    r.seek(saved)?;
                    bytes
                }
            }
            DataLayout::Chunked {
                chunk_shape,
                btree_address,
            } => {
                let mut r = self.reader.borrow_mut();
                read_chunked_data(
                    &mut r,
                    *btree_address,
                    chunk_shape,
                    &ds.dimensions,
                    item_size,
                    header.filter_pipeline.as_ref(),
                )?
            }
        };

        let (vlen_strings, vlen_bytes) = match &dt.kind {
            DatatypeKind::VariableLength { string, .. } if !data.is_empty() => {
                let count = to_usize(ds.num_elements()?)?;
                let refs = parse_vlen_refs(&data, count, self.offset_size())?;
                if *string {
                    (Some(self.resolve_vlen_strings(&refs)?), None)
                } else {
                    (None, Some(self.resolve_vlen_bytes(&refs)?))
                }
            }
            _ => (None, None),
        };

        Ok(Some(Rc::new(Variable {
            datatype: dt.clone(),
            shape: ds.dimensions.clone(),
            data,
            vlen_strings,
            vlen_bytes,
        })))
    }

    fn resolve_vlen_bytes(&self, refs: &[VlenRef]) -> Result<Vec<Vec<u8>>, Error> {
        let mut out = Vec::with_capacity(refs.len());
        for vref in refs {
            if vref.heap_id.is_null() || vref.heap_id.index == 0 {
                out.push(Vec::new());
                continue;
            }
            let payload = self.heap_object(&vref.heap_id)?.ok_or(
                FormatError::GlobalHeapObjectNotFound {
                    collection_address: vref.heap_id.collection_address,
                    index: vref.heap_id.index,
                },
            )?;
            let n = (vref.length as usize).min(payload.len());
            out.push(payload[..n].to_vec());
        }
        Ok(out)
    }

    fn resolve_vlen_strings(&self, refs: &[VlenRef]) -> Result<Vec<String>, Error> {
        let mut out = Vec::with_capacity(refs.len());
        for mut bytes in self.resolve_vlen_bytes(refs)? {
            while bytes.last() == Some(&0) {
                bytes.pop();
            }
            out.push(String::from_utf8_lossy(&bytes).into_owned());
        }
        Ok(out)
    }

    /// Fetch a global heap object, loading and caching its collection on
    /// first reference.
    fn heap_object(&self, id: &GlobalHeapId) -> Result<Option<Vec<u8>>, Error> {
        let cached = self.heap.borrow().get(&id.collection_address).cloned();
        let collection = match cached {
            Some(c) => c,
            None => {
                let parsed = {
                    let mut r = self.reader.borrow_mut();
                    GlobalHeapCollection::parse(&mut r, id.collection_address)?
                };
                let rc = Rc::new(parsed);
                self.heap
                    .borrow_mut()
                    .insert(id.collection_address, rc.clone());
                rc
            }
        };
        let index = match u16::try_from(id.index) {
            Ok(i) => i,
            Err(_) => return Ok(None),
        };
        Ok(collection.object(index).map(|b| b.to_vec()))
    }
}
