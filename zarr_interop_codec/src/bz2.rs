use std::io::{Cursor, Read};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::CodecError;

/// A `bzip2` compression level. An integer from 1 to 9.
///
/// Also the bzip2 "block size" in units of 100 kB, which is how the n5 format
/// records it.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Eq, PartialEq)]
pub struct Bzip2CompressionLevel(u32);

/// An invalid bzip2 compression level.
#[derive(Debug, Error)]
#[error("invalid bzip2 compression level {0}, must be 1-9")]
pub struct Bzip2CompressionLevelError(u32);

impl Default for Bzip2CompressionLevel {
    fn default() -> Self {
        Self(9)
    }
}

impl TryFrom<u32> for Bzip2CompressionLevel {
    type Error = Bzip2CompressionLevelError;

    fn try_from(level: u32) -> Result<Self, Self::Error> {
        if (1..=9).contains(&level) {
            Ok(Self(level))
        } else {
            Err(Bzip2CompressionLevelError(level))
        }
    }
}

impl Bzip2CompressionLevel {
    /// The compression level as a [`u32`].
    #[must_use]
    pub const fn as_u32(&self) -> u32 {
        self.0
    }
}

/// A `bzip2` codec implementation.
#[derive(Clone, Debug, Default)]
pub struct Bzip2Codec {
    compression_level: Bzip2CompressionLevel,
}

impl Bzip2Codec {
    /// Create a new `bzip2` codec.
    ///
    /// # Errors
    /// Returns [`Bzip2CompressionLevelError`] if `compression_level` is not valid.
    pub fn new(compression_level: u32) -> Result<Self, Bzip2CompressionLevelError> {
        let compression_level: Bzip2CompressionLevel = compression_level.try_into()?;
        Ok(Self { compression_level })
    }

    /// The compression level.
    #[must_use]
    pub const fn compression_level(&self) -> Bzip2CompressionLevel {
        self.compression_level
    }

    /// Encode `decoded_value` as a bzip2 stream.
    ///
    /// # Errors
    /// Returns a [`CodecError`] if compression fails.
    pub fn encode(&self, decoded_value: &[u8]) -> Result<Vec<u8>, CodecError> {
        let mut encoder = bzip2::read::BzEncoder::new(
            Cursor::new(decoded_value),
            bzip2::Compression::new(self.compression_level.as_u32()),
        );
        let mut out: Vec<u8> = Vec::new();
        encoder.read_to_end(&mut out)?;
        Ok(out)
    }

    /// Decode a bzip2 stream `encoded_value`.
    ///
    /// # Errors
    /// Returns a [`CodecError`] if `encoded_value` is not valid bzip2 data.
    pub fn decode(&self, encoded_value: &[u8]) -> Result<Vec<u8>, CodecError> {
        let mut decoder = bzip2::read::BzDecoder::new(Cursor::new(encoded_value));
        let mut out: Vec<u8> = Vec::new();
        decoder.read_to_end(&mut out)?;
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_validation() {
        assert!(Bzip2Codec::new(0).is_err());
        assert!(Bzip2Codec::new(1).is_ok());
        assert!(Bzip2Codec::new(9).is_ok());
        assert!(Bzip2Codec::new(10).is_err());
    }

    #[test]
    fn round_trip() {
        let data: Vec<u8> = b"chunky".repeat(100);
        let codec = Bzip2Codec::default();
        let encoded = codec.encode(&data).unwrap();
        // bzip2 magic
        assert_eq!(&encoded[..2], b"BZ");
        assert_eq!(codec.decode(&encoded).unwrap(), data);
    }
}
