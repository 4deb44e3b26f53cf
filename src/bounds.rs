use crate::{Result, StreamError};
use std::ops::Range;

/// Validate that `offset..offset + len` lies within a buffer of length
/// `size`, returning the range on success.
///
/// Every bulk operation in this crate calls this before touching any state,
/// so a rejected range never has side effects.
#[inline]
pub fn check_range(size: usize, offset: usize, len: usize) -> Result<Range<usize>> {
    match offset.checked_add(len) {
        Some(end) if end <= size => Ok(offset..end),
        _ => Err(StreamError::OutOfBounds { offset, len, size }),
    }
}
