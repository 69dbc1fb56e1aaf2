//! Compression Module
//!
//! Pluggable codec for large cache values. The default is gzip via flate2.

use std::io::{Read, Write};

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;

use crate::error::{Error, Result};

/// Byte-level codec used by `BoundedCache`.
pub trait Compressor: Send + Sync + std::fmt::Debug {
    fn compress(&self, data: &[u8]) -> Result<Vec<u8>>;
    fn decompress(&self, data: &[u8]) -> Result<Vec<u8>>;
}

// == Gzip ==
#[derive(Debug, Clone, Copy)]
pub struct GzipCompressor {
    level: Compression,
}

impl GzipCompressor {
    pub fn new(level: u32) -> Self {
        Self {
            level: Compression::new(level.min(9)),
        }
    }
}

impl Default for GzipCompressor {
    fn default() -> Self {
        Self {
            level: Compression::default(),
        }
    }
}

impl Compressor for GzipCompressor {
    fn compress(&self, data: &[u8]) -> Result<Vec<u8>> {
        let mut encoder = GzEncoder::new(Vec::new(), self.level);
        encoder
            .write_all(data)
            .map_err(|e| Error::Compression(format!("gzip compression failed: {}", e)))?;
        encoder
            .finish()
            .map_err(|e| Error::Compression(format!("gzip compression failed: {}", e)))
    }

    fn decompress(&self, data: &[u8]) -> Result<Vec<u8>> {
        let mut decoder = GzDecoder::new(data);
        let mut out = Vec::new();
        decoder
            .read_to_end(&mut out)
            .map_err(|e| Error::Compression(format!("gzip decompression failed: {}", e)))?;
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gzip_shrinks_repetitive_data() {
        let codec = GzipCompressor::default();
        let data = "abc".repeat(1_000).into_bytes();

        let packed = codec.compress(&data).unwrap();
        assert!(packed.len() < data.len());
        assert_eq!(codec.decompress(&packed).unwrap(), data);
    }

    #[test]
    fn test_gzip_rejects_garbage() {
        let codec = GzipCompressor::new(6);
        let result = codec.decompress(b"definitely not gzip");
        assert!(matches!(result, Err(Error::Compression(_))));
    }
}
