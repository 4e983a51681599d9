use std::io::{Cursor, Read};

use flate2::bufread::{GzDecoder, GzEncoder};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::CodecError;

/// A `gzip` compression level. An integer from 0 to 9.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Eq, PartialEq)]
pub struct GzipCompressionLevel(u32);

/// An invalid gzip compression level.
#[derive(Debug, Error)]
#[error("invalid gzip compression level {0}, must be 0-9")]
pub struct GzipCompressionLevelError(u32);

impl Default for GzipCompressionLevel {
    fn default() -> Self {
        Self(6)
    }
}

impl TryFrom<u32> for GzipCompressionLevel {
    type Error = GzipCompressionLevelError;

    fn try_from(level: u32) -> Result<Self, Self::Error> {
        if level <= 9 {
            Ok(Self(level))
        } else {
            Err(GzipCompressionLevelError(level))
        }
    }
}

impl GzipCompressionLevel {
    /// The compression level as a [`u32`].
    #[must_use]
    pub const fn as_u32(&self) -> u32 {
        self.0
    }
}

/// A `gzip` codec implementation.
#[derive(Clone, Debug, Default)]
pub struct GzipCodec {
    compression_level: GzipCompressionLevel,
}

impl GzipCodec {
    /// Create a new `gzip` codec.
    ///
    /// # Errors
    /// Returns [`GzipCompressionLevelError`] if `compression_level` is not valid.
    pub fn new(compression_level: u32) -> Result<Self, GzipCompressionLevelError> {
        let compression_level: GzipCompressionLevel = compression_level.try_into()?;
        Ok(Self { compression_level })
    }

    /// The compression level.
    #[must_use]
    pub const fn compression_level(&self) -> GzipCompressionLevel {
        self.compression_level
    }

    /// Encode `decoded_value` as a gzip member.
    ///
    /// # Errors
    /// Returns a [`CodecError`] if compression fails.
    pub fn encode(&self, decoded_value: &[u8]) -> Result<Vec<u8>, CodecError> {
        let mut encoder = GzEncoder::new(
            Cursor::new(decoded_value),
            flate2::Compression::new(self.compression_level.as_u32()),
        );
        let mut out: Vec<u8> = Vec::new();
        encoder.read_to_end(&mut out)?;
        Ok(out)
    }

    /// Decode a gzip member `encoded_value`.
    ///
    /// # Errors
    /// Returns a [`CodecError`] if `encoded_value` is not valid gzip data.
    pub fn decode(&self, encoded_value: &[u8]) -> Result<Vec<u8>, CodecError> {
        let mut decoder = GzDecoder::new(Cursor::new(encoded_value));
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
        assert!(GzipCodec::new(0).is_ok());
        assert!(GzipCodec::new(9).is_ok());
        assert!(GzipCodec::new(10).is_err());
    }

    #[test]
    fn round_trip() {
        let data: Vec<u8> = (0..512u32).map(|i| (i / 2) as u8).collect();
        let codec = GzipCodec::new(1).unwrap();
        let encoded = codec.encode(&data).unwrap();
        // gzip magic
        assert_eq!(&encoded[..2], &[0x1f, 0x8b]);
        assert_eq!(codec.decode(&encoded).unwrap(), data);
    }
}
