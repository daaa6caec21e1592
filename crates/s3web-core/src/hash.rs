//! Content hashing shared by the change detector and the storage backends.
//!
//! S3 reports the ETag of a single-part upload as the hex MD5 of the body, so
//! the local content hash uses the same digest and the two compare directly.

/// Incremental MD5 hasher for streaming file contents.
pub struct Md5Hasher {
    context: md5::Context,
}

impl Md5Hasher {
    pub fn new() -> Self {
        Self {
            context: md5::Context::new(),
        }
    }

    pub fn update(&mut self, data: &[u8]) {
        self.context.consume(data);
    }

    /// Finish hashing and return the lowercase hex digest.
    pub fn finish(self) -> String {
        hex::encode(self.context.compute().0)
    }
}

impl Default for Md5Hasher {
    fn default() -> Self {
        Self::new()
    }
}

/// Hex MD5 of a complete buffer.
pub fn md5_hex(data: &[u8]) -> String {
    hex::encode(md5::compute(data).0)
}

/// Normalize an ETag as returned by a storage provider: strip surrounding
/// quotes and a weak-validator prefix, then lowercase.
pub fn normalize_etag(etag: &str) -> String {
    let trimmed = etag.trim();
    let trimmed = trimmed.strip_prefix("W/").unwrap_or(trimmed);
    trimmed.trim_matches('"').to_lowercase()
}
