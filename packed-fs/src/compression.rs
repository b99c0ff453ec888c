// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Pluggable compression of entry content. */

use std::{
    fmt::Debug,
    io::{Read, Write},
};

/// Upper bound on buffer preallocation driven by advertised sizes.
///
/// Sizes come from untrusted blobs. Larger outputs still decompress, the
/// buffer just grows as needed.
const MAX_PREALLOCATION: usize = 16 * 1024 * 1024;

/// A codec applied to the content of entries flagged as compressed.
///
/// The blob does not record which codec was used. Producers and consumers
/// must agree on it out of band.
pub trait Compression: Debug + Send + Sync {
    /// Compress raw entry content.
    fn compress(&self, data: &[u8]) -> std::io::Result<Vec<u8>>;

    /// Decompress stored entry content.
    ///
    /// `size` is the advertised uncompressed length. Implementations stop
    /// producing output shortly past it, so an untrusted blob cannot force
    /// unbounded allocations. Callers verify the exact length.
    fn decompress(&self, data: &[u8], size: usize) -> std::io::Result<Vec<u8>>;
}

/// zlib compression via flate2.
#[derive(Clone, Copy, Debug)]
pub struct ZlibCompression {
    level: flate2::Compression,
}

impl Default for ZlibCompression {
    fn default() -> Self {
        Self {
            level: flate2::Compression::default(),
        }
    }
}

impl ZlibCompression {
    /// Construct an instance compressing at the given level (0-9).
    pub fn new(level: u32) -> Self {
        Self {
            level: flate2::Compression::new(level),
        }
    }
}

impl Compression for ZlibCompression {
    fn compress(&self, data: &[u8]) -> std::io::Result<Vec<u8>> {
        let mut encoder = flate2::write::ZlibEncoder::new(Vec::new(), self.level);
        encoder.write_all(data)?;
        encoder.finish()
    }

    fn decompress(&self, data: &[u8], size: usize) -> std::io::Result<Vec<u8>> {
        let decoder = flate2::read::ZlibDecoder::new(data);
        let mut res = Vec::with_capacity(size.min(MAX_PREALLOCATION));
        decoder.take((size as u64).saturating_add(1)).read_to_end(&mut res)?;

        Ok(res)
    }
}

/// Stores content as is.
///
/// Useful when the blob is compressed as a whole by some other layer.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoCompression;

impl Compression for NoCompression {
    fn compress(&self, data: &[u8]) -> std::io::Result<Vec<u8>> {
        Ok(data.to_vec())
    }

    fn decompress(&self, data: &[u8], _size: usize) -> std::io::Result<Vec<u8>> {
        Ok(data.to_vec())
    }
}

/// zstandard compression.
#[cfg(feature = "zstd")]
#[derive(Clone, Copy, Debug)]
pub struct ZstdCompression {
    level: i32,
}

#[cfg(feature = "zstd")]
impl Default for ZstdCompression {
    fn default() -> Self {
        Self {
            level: zstd::DEFAULT_COMPRESSION_LEVEL,
        }
    }
}

#[cfg(feature = "zstd")]
impl ZstdCompression {
    pub fn new(level: i32) -> Self {
        Self { level }
    }
}

#[cfg(feature = "zstd")]
impl Compression for ZstdCompression {
    fn compress(&self, data: &[u8]) -> std::io::Result<Vec<u8>> {
        zstd::bulk::compress(data, self.level)
    }

    fn decompress(&self, data: &[u8], size: usize) -> std::io::Result<Vec<u8>> {
        let decoder = zstd::stream::read::Decoder::new(data)?;
        let mut res = Vec::with_capacity(size.min(MAX_PREALLOCATION));
        decoder.take((size as u64).saturating_add(1)).read_to_end(&mut res)?;

        Ok(res)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zlib_round_trip() -> std::io::Result<()> {
        let codec = ZlibCompression::default();
        let data = b"hello world hello world hello world".repeat(32);

        let compressed = codec.compress(&data)?;
        assert!(compressed.len() < data.len());
        assert_eq!(codec.decompress(&compressed, data.len())?, data);

        Ok(())
    }

    #[test]
    fn test_zlib_output_bounded_by_size() -> std::io::Result<()> {
        let codec = ZlibCompression::default();
        let compressed = codec.compress(&vec![0u8; 4 * 1024 * 1024])?;

        let res = codec.decompress(&compressed, 1)?;
        assert_eq!(res.len(), 2);

        Ok(())
    }

    #[test]
    fn test_zlib_malformed() {
        let codec = ZlibCompression::new(9);
        assert!(codec.decompress(b"definitely not zlib", 10).is_err());
    }

    #[test]
    fn test_no_compression() -> std::io::Result<()> {
        let codec = NoCompression;
        assert_eq!(codec.compress(b"foo")?, b"foo");
        assert_eq!(codec.decompress(b"foo", 3)?, b"foo");

        Ok(())
    }

    #[cfg(feature = "zstd")]
    #[test]
    fn test_zstd_round_trip() -> std::io::Result<()> {
        let codec = ZstdCompression::default();
        let data = b"abcdefgh".repeat(100);

        let compressed = codec.compress(&data)?;
        assert_eq!(codec.decompress(&compressed, data.len())?, data);
        assert_eq!(codec.decompress(&compressed, 10)?.len(), 11);

        Ok(())
    }
}
