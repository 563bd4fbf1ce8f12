use std::path::{Path, PathBuf};

/// Generate deterministic test data using a seeded pseudo-random generator
/// Same seed produces same output (reproducible tests)
#[allow(dead_code)]
pub fn seeded_bytes(seed: u64, len: usize) -> Vec<u8> {
    let mut data = vec![0u8; len];
    let mut state = seed;

    // Simple LCG (Linear Congruential Generator)
    for chunk in data.chunks_mut(8) {
        state = state.wrapping_mul(6364136223846793005).wrapping_add(1);
        let bytes = state.to_le_bytes();
        for (i, byte) in chunk.iter_mut().enumerate() {
            *byte = bytes[i % 8];
        }
    }

    data
}

/// Write `data` to `name` inside `dir` and return the path.
#[allow(dead_code)]
pub fn write_file(dir: &Path, name: &str, data: &[u8]) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, data).unwrap();
    path
}

/// Quoted multipart ETag for `data` uploaded in `part_size` byte parts.
#[allow(dead_code)]
pub fn multipart_etag(data: &[u8], part_size: usize) -> String {
    let mut digests = Vec::new();
    let mut parts = 0;
    for part in data.chunks(part_size) {
        digests.extend_from_slice(&md5::compute(part).0);
        parts += 1;
    }
    format!("\"{:x}-{parts}\"", md5::compute(&digests))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seeded_bytes_deterministic() {
        assert_eq!(seeded_bytes(42, 1000), seeded_bytes(42, 1000));
        assert_ne!(seeded_bytes(42, 1000), seeded_bytes(43, 1000));
    }

    #[test]
    fn test_multipart_etag_counts_parts() {
        let etag = multipart_etag(&[0u8; 10], 4);
        assert!(etag.ends_with("-3\""), "{etag}");
    }
}
