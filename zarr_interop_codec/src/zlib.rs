use std::io::{Cursor, Read};

use flate2::bufread::{ZlibDecoder, ZlibEncoder};
use serde::{Deserialize, Serialize};

use crate::CodecError;

/// A `zlib` compression level. An integer from 0 to 9.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Eq, PartialEq)]
pub struct ZlibCompressionLevel(u32);

impl Default for ZlibCompressionLevel {
    fn default() -> Self {
        Self(6)
    }
}

impl TryFrom<u32> for ZlibCompressionLevel {
    type Error = u32;

    fn try_from(level: u32) -> Result<Self, Self::Error> {
        if level <= 9 {
            Ok(Self(level))
        } else {
            Err(level)
        }
    }
}

impl ZlibCompressionLevel {
    /// The compression level as a [`u32`].
    #[must_use]
    pub const fn as_u32(&self) -> u32 {
        self.0
    }
}

/// A `zlib` codec implementation.
///
/// The same deflate stream as [`GzipCodec`](crate::GzipCodec) but wrapped in
/// the two-byte zlib header and Adler-32 trailer rather than the gzip framing.
#[derive(Clone, Debug, Default)]
pub struct ZlibCodec {
    compression_level: ZlibCompressionLevel,
}

impl ZlibCodec {
    /// Create a new `zlib` codec.
    #[must_use]
    pub fn new(level: ZlibCompressionLevel) -> Self {
        Self {
            compression_level: level,
        }
    }

    /// The compression level.
    #[must_use]
    pub const fn compression_level(&self) -> ZlibCompressionLevel {
        self.compression_level
    }

    /// Encode `decoded_value` as a zlib stream.
    ///
    /// # Errors
    /// Returns a [`CodecError`] if compression fails.
    pub fn encode(&self, decoded_value: &[u8]) -> Result<Vec<u8>, CodecError> {
        let mut encoder = ZlibEncoder::new(
            Cursor::new(decoded_value),
            flate2::Compression::new(self.compression_level.as_u32()),
        );
        let mut out: Vec<u8> = Vec::new();
        encoder.read_to_end(&mut out)?;
        Ok(out)
    }

    /// Decode a zlib stream `encoded_value`.
    ///
    /// # Errors
    /// Returns a [`CodecError`] if `encoded_value` is not valid zlib data.
    pub fn decode(&self, encoded_value: &[u8]) -> Result<Vec<u8>, CodecError> {
        let mut decoder = ZlibDecoder::new(Cursor::new(encoded_value));
        let mut out: Vec<u8> = Vec::new();
        decoder.read_to_end(&mut out)?;
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip() {
        let data: Vec<u8> = (0..512u32).map(|i| (i % 7) as u8).collect();
        let codec = ZlibCodec::default();
        let encoded = codec.encode(&data).unwrap();
        assert_ne!(encoded, data);
        assert_eq!(codec.decode(&encoded).unwrap(), data);
    }
}
