//! # Offset Buffers
//!
//! Array offsets and string offsets are `n + 1` unsigned integers of a
//! declared [`OffsetType`]. Entry `i` is where element `i` starts and entry
//! `i + 1` is where it ends, in elements (array offsets) or bytes (string
//! offsets). The last entry is the total size of the referenced data.

use std::ops::Range;

use tmv_core::OffsetType;

use crate::error::ReadError;
use crate::reader::read_le;

/// Read entry `index` of an offset buffer.
pub fn read_offset(data: &[u8], offset_type: OffsetType, index: usize) -> Result<u64, ReadError> {
    let at = index
        .checked_mul(offset_type.byte_size())
        .ok_or(ReadError::OutOfBounds {
            offset: usize::MAX,
            size: offset_type.byte_size(),
            available: data.len(),
        })?;
    let v = match offset_type {
        OffsetType::Uint8 => read_le::<u8>(data, at)? as u64,
        OffsetType::Uint16 => read_le::<u16>(data, at)? as u64,
        OffsetType::Uint32 => read_le::<u32>(data, at)? as u64,
        OffsetType::Uint64 => read_le::<u64>(data, at)?,
    };
    Ok(v)
}

/// Read `count + 1` entries: the offsets of `count` elements plus the end.
pub fn read_offsets(
    data: &[u8],
    offset_type: OffsetType,
    count: usize,
) -> Result<Vec<u64>, ReadError> {
    (0..=count)
        .map(|i| read_offset(data, offset_type, i))
        .collect()
}

/// Index of the first entry that is smaller than its predecessor.
pub fn first_decrease(offsets: &[u64]) -> Option<usize> {
    offsets
        .windows(2)
        .position(|w| w[1] < w[0])
        .map(|i| i + 1)
}

/// The `(start, end)` range of element `index`.
pub fn element_range(
    data: &[u8],
    offset_type: OffsetType,
    index: usize,
) -> Result<Range<usize>, ReadError> {
    let start = read_offset(data, offset_type, index)?;
    let end = read_offset(data, offset_type, index + 1)?;
    if end < start {
        return Err(ReadError::DecreasingOffsets { index, start, end });
    }
    Ok(to_usize(start)?..to_usize(end)?)
}

pub(crate) fn to_usize(value: u64) -> Result<usize, ReadError> {
    usize::try_from(value).map_err(|_| ReadError::OffsetTooLarge { value })
}
