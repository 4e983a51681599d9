use crate::CodecError;

/// The `raw` identity codec.
///
/// Always available, whatever the enabled feature set; the fallback for
/// uncompressed fixtures.
#[derive(Debug, Clone, Copy, Default)]
pub struct RawCodec;

impl RawCodec {
    /// Create a new `raw` codec.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Encode `decoded_value` (identity).
    ///
    /// # Errors
    /// Infallible; the signature matches the other codecs.
    pub fn encode(&self, decoded_value: &[u8]) -> Result<Vec<u8>, CodecError> {
        Ok(decoded_value.to_vec())
    }

    /// Decode `encoded_value` (identity).
    ///
    /// # Errors
    /// Infallible; the signature matches the other codecs.
    pub fn decode(&self, encoded_value: &[u8]) -> Result<Vec<u8>, CodecError> {
        Ok(encoded_value.to_vec())
    }
}
