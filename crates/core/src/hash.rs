//! Local reconstruction of object-store content hashes.
//!
//! Single-part objects carry the MD5 of their content. Multipart objects carry
//! the MD5 of the concatenated raw MD5 digests of each part, in part order.

use crate::error::{Error, Result};
use std::fmt;
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

/// An MD5 digest represented as 16 bytes.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContentDigest([u8; 16]);

impl ContentDigest {
    /// Get the raw bytes.
    pub fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }

    /// Compute the MD5 of data.
    pub fn compute(data: &[u8]) -> Self {
        Self(md5::compute(data).0)
    }

    /// Encode as lowercase hex string.
    pub fn to_hex(&self) -> String {
        self.0.iter().map(|b| format!("{b:02x}")).collect()
    }
}

impl From<md5::Digest> for ContentDigest {
    fn from(digest: md5::Digest) -> Self {
        Self(digest.0)
    }
}

impl fmt::Debug for ContentDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentDigest({})", self.to_hex())
    }
}

impl fmt::Display for ContentDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

/// Hash a whole file the way a single-part upload is tagged.
pub fn single_part_hash(path: &Path) -> Result<String> {
    let file = File::open(path)?;
    single_part_hash_reader(file)
}

/// Hash a file the way a multipart upload with `part_size` parts is tagged.
pub fn multi_part_hash(path: &Path, part_size: u64) -> Result<String> {
    let file = File::open(path)?;
    multi_part_hash_reader(file, part_size)
}

/// Single-part hash over any reader.
pub fn single_part_hash_reader<R: Read>(mut reader: R) -> Result<String> {
    let mut context = md5::Context::new();
    io::copy(&mut reader, &mut context)?;
    Ok(ContentDigest::from(context.compute()).to_hex())
}

/// Multipart hash over any reader.
///
/// Parts are cut at exact `part_size` boundaries regardless of how many bytes
/// each underlying read returns; only the final part may be shorter.
pub fn multi_part_hash_reader<R: Read>(mut reader: R, part_size: u64) -> Result<String> {
    if part_size == 0 {
        return Err(Error::InvalidPartSize);
    }

    let mut part_digests = Vec::with_capacity(16 * 128);
    loop {
        let mut context = md5::Context::new();
        let copied = io::copy(&mut (&mut reader).take(part_size), &mut context)?;
        if copied == 0 {
            break;
        }
        part_digests.extend_from_slice(&context.compute().0);
    }

    Ok(ContentDigest::compute(&part_digests).to_hex())
}
