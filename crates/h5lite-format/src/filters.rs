//! Per-chunk filter application: DEFLATE and LZF.
//!
//! DEFLATE (filter 1) delegates to the external zlib inflater. LZF
//! (filter 32000) is decoded natively in two passes: a size-computing dry
//! run for exact output allocation, then the copy pass. Other filter ids
//! fail with [`FormatError::UnsupportedFilter`].

#[cfg(not(feature = "std"))]
extern crate alloc;

#[cfg(not(feature = "std"))]
use alloc::{string::String, string::ToString, vec::Vec};

use crate::error::FormatError;
use crate::filter_pipeline::FilterPipeline;

/// DEFLATE (zlib) filter id.
pub const FILTER_DEFLATE: u16 = 1;
/// LZF filter id (registered third-party id).
pub const FILTER_LZF: u16 = 32000;

/// Run a chunk through the pipeline's filters in ascending index order.
///
/// A set bit `i` in `filter_mask` means filter `i` was not applied to this
/// chunk and is skipped.
pub fn apply_pipeline(
    pipeline: &FilterPipeline,
    filter_mask: u32,
    chunk: Vec<u8>,
) -> Result<Vec<u8>, FormatError> {
    let mut data = chunk;
    for (i, filter) in pipeline.filters.iter().enumerate() {
        if (filter_mask >> i) & 1 == 1 {
            continue;
        }
        data = match filter.id {
            FILTER_DEFLATE => inflate(&data)?,
            FILTER_LZF => lzf_decompress(&data)?,
            id => {
                return Err(FormatError::UnsupportedFilter {
                    id,
                    name: filter.name.clone().unwrap_or_else(String::new),
                })
            }
        };
    }
    Ok(data)
}

/// Inflate a zlib stream via the external inflater.
#[cfg(feature = "deflate")]
pub fn inflate(data: &[u8]) -> Result<Vec<u8>, FormatError> {
    use std::io::Read;
    let mut out = Vec::new();
    flate2::read::ZlibDecoder::new(data)
        .read_to_end(&mut out)
        .map_err(|_| FormatError::CorruptedCompressedData("deflate stream"))?;
    Ok(out)
}

#[cfg(not(feature = "deflate"))]
pub fn inflate(_data: &[u8]) -> Result<Vec<u8>, FormatError> {
    Err(FormatError::UnsupportedFilter {
        id: FILTER_DEFLATE,
        name: "deflate".to_string(),
    })
}

/// Walk an LZF stream, returning the decoded length without copying.
fn lzf_decoded_len(input: &[u8]) -> Result<usize, FormatError> {
    let mut i = 0;
    let mut out_len = 0usize;
    while i < input.len() {
        let control = input[i] as usize;
        i += 1;
        if control < 32 {
            let run = control + 1;
            if i + run > input.len() {
                return Err(FormatError::CorruptedCompressedData("lzf literal run truncated"));
            }
            i += run;
            out_len += run;
        } else {
            let mut length = control >> 5;
            if length == 7 {
                if i >= input.len() {
                    return Err(FormatError::CorruptedCompressedData("lzf length byte missing"));
                }
                length += input[i] as usize;
                i += 1;
            }
            length += 2;
            if i >= input.len() {
                return Err(FormatError::CorruptedCompressedData("lzf offset byte missing"));
            }
            let offset = ((control & 0x1F) << 8 | input[i] as usize) + 1;
            i += 1;
            if offset > out_len {
                return Err(FormatError::CorruptedCompressedData(
                    "lzf back-reference before start of output",
                ));
            }
            out_len += length;
        }
    }
    Ok(out_len)
}

/// Decompress an LZF stream.
///
/// Back-reference copies proceed byte by byte so that overlapping
/// references expand runs, as the format requires.
pub fn lzf_decompress(input: &[u8]) -> Result<Vec<u8>, FormatError> {
    let out_len = lzf_decoded_len(input)?;
    let mut out = Vec::with_capacity(out_len);
    let mut i = 0;
    while i < input.len() {
        let control = input[i] as usize;
        i += 1;
        if control < 32 {
            let run = control + 1;
            out.extend_from_slice(&input[i..i + run]);
            i += run;
        } else {
            let mut length = control >> 5;
            if length == 7 {
                length += input[i] as usize;
                i += 1;
            }
            length += 2;
            let offset = ((control & 0x1F) << 8 | input[i] as usize) + 1;
            i += 1;
            let mut src = out.len() - offset;
            for _ in 0..length {
                let b = out[src];
                out.push(b);
                src += 1;
            }
        }
    }
    Ok(out)
}
