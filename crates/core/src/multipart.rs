//! Multipart part size recovery.
//!
//! The part size is not stored in the ETag, only the part count. To replay the
//! store's chunking locally the size is derived from the object length and the
//! part count, rounded up to a whole number of mebibytes.

use crate::MEGABYTE;
use crate::error::{Error, Result};

/// Compute the part size a multipart object of `byte_size` bytes was split
/// with, given the `part_count` from its ETag.
///
/// Only meaningful for true multipart objects: `part_count <= 1` is rejected.
pub fn part_size(byte_size: u64, part_count: u64) -> Result<u64> {
    if part_count <= 1 {
        return Err(Error::InvalidPartCount(part_count));
    }

    let block = part_count
        .checked_mul(MEGABYTE)
        .ok_or(Error::InvalidPartCount(part_count))?;
    let mut quotient = byte_size / block;
    if byte_size % block > 0 {
        quotient += 1;
    }
    // An empty object still replays with a non-zero part size.
    Ok(quotient.max(1) * MEGABYTE)
}
