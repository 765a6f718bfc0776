//! Gzip compression for static responses.

use std::io::{self, Write};

use flate2::write::GzEncoder;
use flate2::Compression;

/// Bodies below this size are served uncompressed; the gzip header overhead
/// outweighs the savings.
pub const MIN_COMPRESS_BYTES: usize = 512;

/// Whether a body of this content type and size is worth compressing.
///
/// Already-compressed formats (images, archives, fonts) are excluded.
pub fn should_compress(content_type: &str, len: usize) -> bool {
    if len < MIN_COMPRESS_BYTES {
        return false;
    }
    content_type.starts_with("text/")
        || content_type.starts_with("application/json")
        || content_type.starts_with("application/javascript")
        || content_type.starts_with("application/xml")
        || content_type.starts_with("image/svg")
        || content_type.starts_with("application/wasm")
}

/// Gzip-encode a body.
pub fn gzip(data: &[u8]) -> io::Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data)?;
    encoder.finish()
}
