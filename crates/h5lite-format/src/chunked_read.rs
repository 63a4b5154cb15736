//! Chunked dataset reassembly: gather raw chunks and scatter their
//! elements into a dense row-major buffer.

#[cfg(not(feature = "std"))]
extern crate alloc;

#[cfg(not(feature = "std"))]
use alloc::{vec, vec::Vec};

use crate::btree_v1::collect_chunks;
use crate::error::FormatError;
use crate::filter_pipeline::FilterPipeline;
use crate::filters::apply_pipeline;
use crate::reader::{usize_from, Reader, UNDEFINED_ADDRESS};

/// Read a chunked dataset into a dense row-major byte buffer.
///
/// `chunk_shape` comes straight from the layout message and carries the
/// trailing element-size axis; `data_shape` is the dataspace. Chunks may
/// overhang the dataset extent; out-of-bounds positions are skipped and
/// unwritten positions stay zero. Restores the reader position.
pub fn read_chunked_data(
    r: &mut Reader,
    btree_address: u64,
    chunk_shape: &[u32],
    data_shape: &[u64],
    item_size: usize,
    pipeline: Option<&FilterPipeline>,
) -> Result<Vec<u8>, FormatError> {
    if chunk_shape.len() != data_shape.len() + 1 {
        return Err(FormatError::ChunkRankMismatch {
            dataspace: data_shape.len(),
            chunk: chunk_shape.len(),
        });
    }
    let rank = data_shape.len();
    let chunk_dims: Vec<usize> = chunk_shape[..rank].iter().map(|&d| d as usize).collect();
    let mut data_dims: Vec<usize> = Vec::with_capacity(rank);
    for &d in data_shape {
        data_dims.push(usize_from(d)?);
    }

    let mut total_elements: usize = 1;
    for &d in &data_dims {
        total_elements = total_elements
            .checked_mul(d)
            .ok_or(FormatError::IntegerOverflow(d as u64))?;
    }
    let total_bytes = total_elements
        .checked_mul(item_size)
        .ok_or(FormatError::IntegerOverflow(total_elements as u64))?;
    let mut output = vec![0u8; total_bytes];

    if btree_address == UNDEFINED_ADDRESS {
        return Ok(output);
    }

    // Row-major strides, in elements.
    let mut data_strides = vec![1usize; rank];
    for i in (0..rank.saturating_sub(1)).rev() {
        data_strides[i] = data_strides[i + 1] * data_dims[i + 1];
    }
    let mut chunk_strides = vec![1usize; rank];
    for i in (0..rank.saturating_sub(1)).rev() {
        chunk_strides[i] = chunk_strides[i + 1] * chunk_dims[i + 1];
    }

    let saved = r.position();
    let chunks = collect_chunks(r, btree_address, chunk_shape.len())?;
    for chunk in &chunks {
        r.seek(chunk.address)?;
        let stored = r.read_vec(chunk.size as usize)?;
        let bytes = match pipeline {
            Some(p) => apply_pipeline(p, chunk.filter_mask, stored)?,
            None => stored,
        };

        if rank == 0 {
            let n = bytes.len().min(output.len());
            output[..n].copy_from_slice(&bytes[..n]);
            continue;
        }

        let mut chunk_offsets = Vec::with_capacity(rank);
        for &o in chunk.offsets.iter().take(rank) {
            chunk_offsets.push(usize_from(o)?);
        }
        scatter_chunk(
            &bytes,
            &mut output,
            &chunk_offsets,
            &chunk_dims,
            &data_dims,
            &data_strides,
            &chunk_strides,
            item_size,
        );
    }
    r.seek(saved)?;

    Ok(output)
}

/// Copy one chunk's elements to their dataset positions.
///
/// Iterates the chunk in row-major order; any position whose coordinate
/// exceeds the dataset extent on some axis is skipped.
#[allow(clippy::too_many_arguments)]
fn scatter_chunk(
    chunk_data: &[u8],
    output: &mut [u8],
    chunk_offsets: &[usize],
    chunk_dims: &[usize],
    data_dims: &[usize],
    data_strides: &[usize],
    chunk_strides: &[usize],
    item_size: usize,
) {
    let rank = chunk_dims.len();
    let chunk_total: usize = chunk_dims.iter().product();
    for chunk_index in 0..chunk_total {
        let mut remaining = chunk_index;
        let mut data_flat = 0usize;
        let mut in_bounds = true;
        for axis in 0..rank {
            let coord = remaining / chunk_strides[axis];
            remaining %= chunk_strides[axis];
            let data_coord = chunk_offsets[axis] + coord;
            if data_coord >= data_dims[axis] {
                in_bounds = false;
                break;
            }
            data_flat += data_coord * data_strides[axis];
        }
        if !in_bounds {
            continue;
        }
        let src = chunk_index * item_size;
        let dst = data_flat * item_size;
        if src + item_size <= chunk_data.len() && dst + item_size <= output.len() {
            output[dst..dst + item_size].copy_from_slice(&chunk_data[src..src + item_size]);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::btree_v1::RawChunk;

    fn build_chunk_btree(chunks: &[RawChunk]) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.extend_from_slice(b"TREE");
        buf.push(1);
        buf.push(0);
        buf.extend_from_slice(&(chunks.len() as u16).to_le_bytes());
        buf.extend_from_slice(&u64::MAX.to_le_bytes());
        buf.extend_from_slice(&u64::MAX.to_le_bytes());
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

    /// Reference reassembly: walk every dataset position in row-major
    /// order and pull its element from the owning chunk.
    fn oracle_assemble(
        chunks: &[(Vec<u64>, Vec<u8>)], // (offset, chunk bytes)
        chunk_dims: &[usize],
        data_dims: &[usize],
        item_size: usize,
    ) -> Vec<u8> {
        let total: usize = data_dims.iter().product();
        let mut out = vec![0u8; total * item_size];
        let rank = data_dims.len();
        for flat in 0..total {
            // Decompose the flat index into coordinates.
            let mut coords = vec![0usize; rank];
            let mut rem = flat;
            for axis in (0..rank).rev() {
                coords[axis] = rem % data_dims[axis];
                rem /= data_dims[axis];
            }
            // Find the chunk containing these coordinates.
            for (offset, bytes) in chunks {
                let inside = coords
                    .iter()
                    .zip(offset.iter())
                    .zip(chunk_dims.iter())
                    .all(|((&c, &o), &d)| c >= o as usize && c < o as usize + d);
                if !inside {
                    continue;
                }
                let mut chunk_flat = 0usize;
                let mut stride = 1usize;
                for axis in (0..rank).rev() {
                    chunk_flat += (coords[axis] - offset[axis] as usize) * stride;
                    stride *= chunk_dims[axis];
                }
                out[flat * item_size..(flat + 1) * item_size]
                    .copy_from_slice(&bytes[chunk_flat * item_size..(chunk_flat + 1) * item_size]);
                break;
            }
        }
        out
    }

    /// Lay out chunk payloads and a leaf B-tree in one file image.
    fn build_file(
        payloads: &[(Vec<u64>, Vec<u8>)],
        filter_mask: u32,
    ) -> (Vec<u8>, u64) {
        let mut file = vec![0u8; 0x100];
        let mut chunks = Vec::new();
        for (offsets, bytes) in payloads {
            let address = file.len() as u64;
            file.extend_from_slice(bytes);
            let mut key_offsets = offsets.clone();
            key_offsets.push(0); // element-size axis
            chunks.push(RawChunk {
                size: bytes.len() as u32,
                filter_mask,
                offsets: key_offsets,
                address,
            });
        }
        let btree_address = file.len() as u64;
        file.extend_from_slice(&build_chunk_btree(&chunks));
        (file, btree_address)
    }

    #[test]
    fn one_dimensional_two_chunks() {
        let values: Vec<f64> = (0..20).map(|i| i as f64).collect();
        let chunk_bytes = |range: core::ops::Range<usize>| -> Vec<u8> {
            values[range].iter().flat_map(|v| v.to_le_bytes()).collect()
        };
        let payloads = vec![
            (vec![0u64], chunk_bytes(0..10)),
            (vec![10u64], chunk_bytes(10..20)),
        ];
        let (file, btree) = build_file(&payloads, 0);
        let mut r = Reader::from_bytes(file);
        let out = read_chunked_data(&mut r, btree, &[10, 8], &[20], 8, None).unwrap();
        assert_eq!(out.len(), 160);
        for (i, v) in values.iter().enumerate() {
            let got = f64::from_le_bytes(out[i * 8..(i + 1) * 8].try_into().unwrap());
            assert_eq!(got, *v);
        }
    }

    #[test]
    fn boundary_chunk_clipped() {
        // 5 elements, chunk size 2: the last chunk holds one valid element
        // and one out-of-bounds slot that must not leak into the output.
        let payloads = vec![
            (vec![0u64], vec![1i32, 2].iter().flat_map(|v| v.to_le_bytes()).collect()),
            (vec![2u64], vec![3i32, 4].iter().flat_map(|v| v.to_le_bytes()).collect()),
            (
                vec![4u64],
                vec![5i32, -999].iter().flat_map(|v| v.to_le_bytes()).collect(),
            ),
        ];
        let (file, btree) = build_file(&payloads, 0);
        let mut r = Reader::from_bytes(file);
        let out = read_chunked_data(&mut r, btree, &[2, 4], &[5], 4, None).unwrap();
        assert_eq!(out.len(), 20);
        let got: Vec<i32> = out
            .chunks(4)
            .map(|c| i32::from_le_bytes(c.try_into().unwrap()))
            .collect();
        assert_eq!(got, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn two_dimensional_matches_oracle() {
        // 5x7 dataset tiled by 2x3 chunks: boundary chunks overhang on
        // both axes.
        let data_dims = [5usize, 7];
        let chunk_dims = [2usize, 3];
        let item = 2usize; // u16 elements
        let mut payloads = Vec::new();
        let mut counter = 0u16;
        for row in (0..data_dims[0]).step_by(chunk_dims[0]) {
            for col in (0..data_dims[1]).step_by(chunk_dims[1]) {
                let mut bytes = Vec::new();
                for _ in 0..chunk_dims[0] * chunk_dims[1] {
                    bytes.extend_from_slice(&counter.to_le_bytes());
                    counter += 1;
                }
                payloads.push((vec![row as u64, col as u64], bytes));
            }
        }
        let (file, btree) = build_file(&payloads, 0);
        let mut r = Reader::from_bytes(file);
        let out =
            read_chunked_data(&mut r, btree, &[2, 3, 2], &[5, 7], item, None).unwrap();
        let expected = oracle_assemble(&payloads, &chunk_dims, &data_dims, item);
        assert_eq!(out, expected);
    }

    #[test]
    #[cfg(feature = "deflate")]
    fn deflate_filtered_chunks() {
        use std::io::Write;
        let compress = |data: &[u8]| -> Vec<u8> {
            let mut enc =
                flate2::write::ZlibEncoder::new(Vec::new(), flate2::Compression::new(6));
            enc.write_all(data).unwrap();
            enc.finish().unwrap()
        };
        let values: Vec<u8> = (0..32).collect();
        let payloads = vec![
            (vec![0u64], compress(&values[..16])),
            (vec![16u64], compress(&values[16..])),
        ];
        let (file, btree) = build_file(&payloads, 0);
        let mut r = Reader::from_bytes(file);
        let pipeline = FilterPipeline {
            filters: vec![crate::filter_pipeline::FilterDescription {
                id: crate::filters::FILTER_DEFLATE,
                name: None,
                flags: 0,
                client_data: vec![6],
            }],
        };
        let out =
            read_chunked_data(&mut r, btree, &[16, 1], &[32], 1, Some(&pipeline)).unwrap();
        assert_eq!(out, values);
    }

    #[test]
    fn filter_mask_skips_stage() {
        // Chunk stored unfiltered, mask bit 0 set: bytes pass through.
        let values: Vec<u8> = (0..16).collect();
        let payloads = vec![(vec![0u64], values.clone())];
        let (file, btree) = build_file(&payloads, 0b1);
        let mut r = Reader::from_bytes(file);
        let pipeline = FilterPipeline {
            filters: vec![crate::filter_pipeline::FilterDescription {
                id: crate::filters::FILTER_DEFLATE,
                name: None,
                flags: 0,
                client_data: vec![6],
            }],
        };
        let out =
            read_chunked_data(&mut r, btree, &[16, 1], &[16], 1, Some(&pipeline)).unwrap();
        assert_eq!(out, values);
    }

    #[test]
    fn undefined_btree_yields_zeroes() {
        let mut r = Reader::from_bytes(vec![0u8; 16]);
        let out = read_chunked_data(&mut r, UNDEFINED_ADDRESS, &[4, 4], &[8], 4, None).unwrap();
        assert_eq!(out, vec![0u8; 32]);
    }

    #[test]
    fn rank_mismatch_rejected() {
        let mut r = Reader::from_bytes(vec![0u8; 16]);
        let err = read_chunked_data(&mut r, 0, &[4, 4], &[8, 8], 4, None).unwrap_err();
        assert_eq!(
            err,
            FormatError::ChunkRankMismatch {
                dataspace: 2,
                chunk: 2
            }
        );
    }

    #[test]
    fn reader_position_restored() {
        let payloads = vec![(vec![0u64], vec![9u8, 8, 7, 6])];
        let (file, btree) = build_file(&payloads, 0);
        let mut r = Reader::from_bytes(file);
        r.seek(3).unwrap();
        read_chunked_data(&mut r, btree, &[4, 1], &[4], 1, None).unwrap();
        assert_eq!(r.position(), 3);
    }
}
