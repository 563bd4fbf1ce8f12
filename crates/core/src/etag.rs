//! ETag parsing.
//!
//! Object stores publish an ETag for every object. For objects written in a
//! single request it is the hex MD5 of the content. For multipart uploads it
//! is the hex MD5 of the concatenated part digests followed by `-<parts>`.
//! The raw header value is usually wrapped in double quotes.

use crate::error::{Error, Result};
use std::fmt;
use std::str::FromStr;

/// Strip surrounding quotes and whitespace from a raw ETag value.
pub fn normalize(raw: &str) -> &str {
    raw.trim_matches(|c: char| c == '"' || c.is_whitespace())
}

/// An ETag split into its digest and part count.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParsedTag {
    /// Hex digest portion of the tag.
    pub hash: String,
    /// Number of parts the object was stored in (1 for single-part objects).
    pub part_count: u64,
}

impl ParsedTag {
    /// Parse a raw ETag value.
    ///
    /// The value is split on every `-`. Segment 0 is the digest and segment 1
    /// the part count; any further segments are ignored.
    pub fn parse(raw: &str) -> Result<Self> {
        let tag = normalize(raw);
        if tag.is_empty() {
            return Err(Error::EmptyTag);
        }

        let mut segments = tag.split('-');
        let hash = segments.next().unwrap_or_default();
        match segments.next() {
            Some(field) => {
                let part_count = field
                    .parse::<u64>()
                    .map_err(|source| Error::MalformedPartCount {
                        field: field.to_string(),
                        source,
                    })?;
                Ok(Self {
                    hash: hash.to_string(),
                    part_count,
                })
            }
            None => Ok(Self {
                hash: tag.to_string(),
                part_count: 1,
            }),
        }
    }

    /// Whether the object was stored as a multipart upload.
    pub fn is_multipart(&self) -> bool {
        self.part_count > 1
    }
}

impl FromStr for ParsedTag {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for ParsedTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.part_count > 1 {
            write!(f, "{}-{}", self.hash, self.part_count)
        } else {
            write!(f, "{}", self.hash)
        }
    }
}
