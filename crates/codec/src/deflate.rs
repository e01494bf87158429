//! Raw DEFLATE (no zlib or gzip framing)

use crate::error::{Error, Result};
use flate2::write::{DeflateDecoder, DeflateEncoder};
use flate2::Compression;
use std::io::Write;

/// Compress `input` with raw DEFLATE
pub fn compress(input: &[u8]) -> Result<Vec<u8>> {
    let mut encoder = DeflateEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(input).map_err(|e| Error::Deflate(e.to_string()))?;
    encoder.finish().map_err(|e| Error::Deflate(e.to_string()))
}

/// Decompress a raw-DEFLATE buffer
pub fn decompress(input: &[u8]) -> Result<Vec<u8>> {
    let mut decoder = DeflateDecoder::new(Vec::new());
    decoder.write_all(input).map_err(|e| Error::Deflate(e.to_string()))?;
    decoder.finish().map_err(|e| Error::Deflate(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_arbitrary_bytes() {
        let data = b"the quick brown fox jumps over the lazy dog, repeated, repeated, repeated";
        let compressed = compress(data).unwrap();
        assert_eq!(decompress(&compressed).unwrap(), data);
    }

    #[test]
    fn rejects_garbage_input() {
        assert!(decompress(b"not deflate data at all, hopefully").is_err());
    }
}
