//! Dataspace message parsing (message type 0x0001).

#[cfg(not(feature = "std"))]
extern crate alloc;

#[cfg(not(feature = "std"))]
use alloc::vec::Vec;

use crate::error::FormatError;
use crate::reader::{Reader, UNDEFINED_ADDRESS};

/// The logical shape of a dataset or attribute.
///
/// A scalar has an empty dimension list; a null dataspace has no elements
/// at all.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dataspace {
    /// Current dimension sizes, outermost first. Empty for scalars.
    pub dimensions: Vec<u64>,
    /// True for a v2 null dataspace.
    pub null: bool,
}

impl Dataspace {
    /// Parse a dataspace message at the reader's position.
    ///
    /// Version 1 accepts max sizes only when equal to the current sizes and
    /// rejects permutation indices. Version 2 additionally accepts
    /// unlimited max sizes.
    pub fn parse(r: &mut Reader) -> Result<Dataspace, FormatError> {
        let version = r.read_u8()?;
        match version {
            1 => Self::parse_v1(r),
            2 => Self::parse_v2(r),
            v => Err(FormatError::UnsupportedVersion {
                component: "dataspace",
                version: v,
            }),
        }
    }

    fn parse_v1(r: &mut Reader) -> Result<Dataspace, FormatError> {
        let rank = r.read_u8()?;
        let flags = r.read_u8()?;
        r.skip(1)?; // reserved
        r.skip(4)?; // reserved
        if flags & 0x02 != 0 {
            return Err(FormatError::PermutedOrUnequalMaxSize);
        }
        let dimensions = Self::read_dims(r, rank)?;
        if flags & 0x01 != 0 {
            for &dim in &dimensions {
                let max = r.read_length()?;
                if max != dim {
                    return Err(FormatError::PermutedOrUnequalMaxSize);
                }
            }
        }
        Ok(Dataspace {
            dimensions,
            null: false,
        })
    }

    fn parse_v2(r: &mut Reader) -> Result<Dataspace, FormatError> {
        let rank = r.read_u8()?;
        let flags = r.read_u8()?;
        let space_type = r.read_u8()?;
        let null = match space_type {
            0 | 1 => false,
            2 => true,
            t => return Err(FormatError::InvalidDataspaceType(t)),
        };
        let dimensions = Self::read_dims(r, rank)?;
        if flags & 0x01 != 0 {
            for &dim in &dimensions {
                let max = r.read_length()?;
                if max != dim && max != UNDEFINED_ADDRESS {
                    return Err(FormatError::PermutedOrUnequalMaxSize);
                }
            }
        }
        Ok(Dataspace { dimensions, null })
    }

    fn read_dims(r: &mut Reader, rank: u8) -> Result<Vec<u64>, FormatError> {
        let mut dims = Vec::with_capacity(rank as usize);
        for _ in 0..rank {
            dims.push(r.read_length()?);
        }
        Ok(dims)
    }

    /// Number of elements. A scalar counts as 1, a null dataspace as 0.
    pub fn num_elements(&self) -> Result<u64, FormatError> {
        if self.null {
            return Ok(0);
        }
        let mut n: u64 = 1;
        for &d in &self.dimensions {
            n = n.checked_mul(d).ok_or(FormatError::IntegerOverflow(d))?;
        }
        Ok(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build_v1(rank: u8, flags: u8, dims: &[u64], max_dims: &[u64]) -> Vec<u8> {
        let mut buf = vec![1u8, rank, flags, 0, 0, 0, 0, 0];
        for d in dims {
            buf.extend_from_slice(&d.to_le_bytes());
        }
        for d in max_dims {
            buf.extend_from_slice(&d.to_le_bytes());
        }
        buf
    }

    fn build_v2(rank: u8, flags: u8, space_type: u8, dims: &[u64], max_dims: &[u64]) -> Vec<u8> {
        let mut buf = vec![2u8, rank, flags, space_type];
        for d in dims {
            buf.extend_from_slice(&d.to_le_bytes());
        }
        for d in max_dims {
            buf.extend_from_slice(&d.to_le_bytes());
        }
        buf
    }

    fn parse(data: Vec<u8>) -> Result<Dataspace, FormatError> {
        let mut r = Reader::from_bytes(data);
        Dataspace::parse(&mut r)
    }

    #[test]
    fn scalar_v1() {
        let ds = parse(build_v1(0, 0, &[], &[])).unwrap();
        assert!(ds.dimensions.is_empty());
        assert!(!ds.null);
        assert_eq!(ds.num_elements().unwrap(), 1);
    }

    #[test]
    fn simple_2d_v1() {
        let ds = parse(build_v1(2, 0, &[3, 4], &[])).unwrap();
        assert_eq!(ds.dimensions, vec![3, 4]);
        assert_eq!(ds.num_elements().unwrap(), 12);
    }

    #[test]
    fn v1_max_equal_accepted() {
        let ds = parse(build_v1(1, 0x01, &[5], &[5])).unwrap();
        assert_eq!(ds.dimensions, vec![5]);
    }

    #[test]
    fn v1_max_unequal_rejected() {
        assert_eq!(
            parse(build_v1(1, 0x01, &[5], &[10])).unwrap_err(),
            FormatError::PermutedOrUnequalMaxSize
        );
    }

    #[test]
    fn v1_unlimited_max_rejected() {
        assert_eq!(
            parse(build_v1(1, 0x01, &[5], &[u64::MAX])).unwrap_err(),
            FormatError::PermutedOrUnequalMaxSize
        );
    }

    #[test]
    fn v1_permutation_rejected() {
        assert_eq!(
            parse(build_v1(2, 0x02, &[2, 2], &[])).unwrap_err(),
            FormatError::PermutedOrUnequalMaxSize
        );
    }

    #[test]
    fn v2_scalar_and_simple() {
        let ds = parse(build_v2(0, 0, 0, &[], &[])).unwrap();
        assert_eq!(ds.num_elements().unwrap(), 1);
        let ds = parse(build_v2(1, 0, 1, &[7], &[])).unwrap();
        assert_eq!(ds.dimensions, vec![7]);
    }

    #[test]
    fn v2_null() {
        let ds = parse(build_v2(0, 0, 2, &[], &[])).unwrap();
        assert!(ds.null);
        assert_eq!(ds.num_elements().unwrap(), 0);
    }

    #[test]
    fn v2_unlimited_max_accepted() {
        let ds = parse(build_v2(1, 0x01, 1, &[5], &[u64::MAX])).unwrap();
        assert_eq!(ds.dimensions, vec![5]);
    }

    #[test]
    fn v2_unequal_max_rejected() {
        assert_eq!(
            parse(build_v2(1, 0x01, 1, &[5], &[6])).unwrap_err(),
            FormatError::PermutedOrUnequalMaxSize
        );
    }

    #[test]
    fn v2_bad_type() {
        assert_eq!(
            parse(build_v2(0, 0, 5, &[], &[])).unwrap_err(),
            FormatError::InvalidDataspaceType(5)
        );
    }

    #[test]
    fn unsupported_version() {
        assert_eq!(
            parse(vec![3, 0, 0, 0, 0, 0, 0, 0]).unwrap_err(),
            FormatError::UnsupportedVersion {
                component: "dataspace",
                version: 3
            }
        );
    }
}
