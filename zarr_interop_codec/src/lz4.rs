use crate::CodecError;

/// An `lz4` codec implementation.
///
/// Uses the lz4 block format with the uncompressed size prepended as a
/// little-endian `u32`, so a buffer is decodable without out-of-band length
/// information.
#[derive(Clone, Copy, Debug, Default)]
pub struct Lz4Codec;

impl Lz4Codec {
    /// Create a new `lz4` codec.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Encode `decoded_value` as a size-prepended lz4 block.
    ///
    /// # Errors
    /// Infallible; the signature matches the other codecs.
    pub fn encode(&self, decoded_value: &[u8]) -> Result<Vec<u8>, CodecError> {
        Ok(lz4_flex::block::compress_prepend_size(decoded_value))
    }

    /// Decode a size-prepended lz4 block `encoded_value`.
    ///
    /// # Errors
    /// Returns a [`CodecError`] if `encoded_value` is not a valid lz4 block.
    pub fn decode(&self, encoded_value: &[u8]) -> Result<Vec<u8>, CodecError> {
        lz4_flex::block::decompress_size_prepended(encoded_value)
            .map_err(|err| CodecError::Other(err.to_string()))
    }
}
