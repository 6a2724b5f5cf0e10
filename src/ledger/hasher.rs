//! Content hashing for local artifacts

use crate::types::ContentHash;
use std::path::Path;

/// BLAKE3 digest of raw bytes, hex-encoded
pub fn content_hash(bytes: &[u8]) -> ContentHash {
    hex::encode(blake3::hash(bytes).as_bytes())
}

/// Digest of the file at `path`, or `None` if the file does not exist.
pub fn file_content_hash(path: &Path) -> std::io::Result<Option<ContentHash>> {
    match std::fs::read(path) {
        Ok(bytes) => Ok(Some(content_hash(&bytes))),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
    }
}
