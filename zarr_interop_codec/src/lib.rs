//! Byte compression codecs for the `zarr_interop` crates.
//!
//! A codec is a stateless, deterministic pair of pure functions over raw byte
//! buffers with the round-trip law `decode(encode(b)) == b`. The supported set
//! is closed and identified by name:
//!
//! | id | codec | feature |
//! |---|---|---|
//! | `raw` | identity (always available) | - |
//! | `gzip` | gzip ([`flate2`]) | `gzip` |
//! | `zlib` | zlib ([`flate2`]) | `zlib` |
//! | `bzip2` | bzip2 ([`bzip2`]) | `bz2` |
//! | `lz4` | lz4 block with prepended size ([`lz4_flex`]) | `lz4` |
//! | `blosc` | blosc container ([`blosc_src`]) | `blosc` |
//!
//! Codecs are safe to call concurrently with disjoint inputs; they hold no
//! shared mutable state.

#[cfg(feature = "blosc")]
mod blosc;
#[cfg(feature = "bz2")]
mod bz2;
#[cfg(feature = "gzip")]
mod gzip;
#[cfg(feature = "lz4")]
mod lz4;
mod raw;
#[cfg(feature = "zlib")]
mod zlib;

use thiserror::Error;

#[cfg(feature = "blosc")]
pub use blosc::{
    BloscCodec, BloscCompressionLevel, BloscCompressor, BloscError, BloscShuffleMode,
};
#[cfg(feature = "bz2")]
pub use bz2::{Bzip2Codec, Bzip2CompressionLevel, Bzip2CompressionLevelError};
#[cfg(feature = "gzip")]
pub use gzip::{GzipCodec, GzipCompressionLevel, GzipCompressionLevelError};
#[cfg(feature = "lz4")]
pub use lz4::Lz4Codec;
pub use raw::RawCodec;
#[cfg(feature = "zlib")]
pub use zlib::{ZlibCodec, ZlibCompressionLevel};

/// A codec error.
#[derive(Debug, Error)]
pub enum CodecError {
    /// An IO error from an underlying compression library.
    #[error(transparent)]
    IOError(#[from] std::io::Error),
    /// A blosc error.
    #[cfg(feature = "blosc")]
    #[error(transparent)]
    BloscError(#[from] BloscError),
    /// Any other error.
    #[error("{0}")]
    Other(String),
}

/// An unknown codec identifier, or one whose feature is disabled.
#[derive(Debug, Clone, Error)]
#[error("unsupported codec {0}")]
pub struct UnsupportedCodecError(String);

impl UnsupportedCodecError {
    /// Create a new unsupported codec error for `id`.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The offending codec identifier.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.0
    }
}

/// A compression codec from the closed supported set.
///
/// Identified by name, constructed with [`Codec::from_id`] (default
/// configuration) or from a configured per-codec struct.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub enum Codec {
    /// The `raw` identity codec.
    Raw(RawCodec),
    /// The `gzip` codec.
    #[cfg(feature = "gzip")]
    Gzip(GzipCodec),
    /// The `zlib` codec.
    #[cfg(feature = "zlib")]
    Zlib(ZlibCodec),
    /// The `bzip2` codec.
    #[cfg(feature = "bz2")]
    Bzip2(Bzip2Codec),
    /// The `lz4` codec.
    #[cfg(feature = "lz4")]
    Lz4(Lz4Codec),
    /// The `blosc` codec.
    #[cfg(feature = "blosc")]
    Blosc(BloscCodec),
}

impl Codec {
    /// The identifiers of all codecs enabled in this build.
    ///
    /// `raw` is always first.
    #[must_use]
    pub const fn supported_ids() -> &'static [&'static str] {
        &[
            "raw",
            #[cfg(feature = "gzip")]
            "gzip",
            #[cfg(feature = "zlib")]
            "zlib",
            #[cfg(feature = "bz2")]
            "bzip2",
            #[cfg(feature = "lz4")]
            "lz4",
            #[cfg(feature = "blosc")]
            "blosc",
        ]
    }

    /// Create a default-configured codec from its identifier.
    ///
    /// # Errors
    /// Returns [`UnsupportedCodecError`] if `id` is not in the supported set.
    pub fn from_id(id: &str) -> Result<Self, UnsupportedCodecError> {
        match id {
            "raw" => Ok(Self::Raw(RawCodec)),
            #[cfg(feature = "gzip")]
            "gzip" => Ok(Self::Gzip(GzipCodec::default())),
            #[cfg(feature = "zlib")]
            "zlib" => Ok(Self::Zlib(ZlibCodec::default())),
            #[cfg(feature = "bz2")]
            "bzip2" => Ok(Self::Bzip2(Bzip2Codec::default())),
            #[cfg(feature = "lz4")]
            "lz4" => Ok(Self::Lz4(Lz4Codec::default())),
            #[cfg(feature = "blosc")]
            "blosc" => Ok(Self::Blosc(BloscCodec::default())),
            _ => Err(UnsupportedCodecError::new(id)),
        }
    }

    /// The codec identifier.
    #[must_use]
    pub const fn id(&self) -> &'static str {
        match self {
            Self::Raw(_) => "raw",
            #[cfg(feature = "gzip")]
            Self::Gzip(_) => "gzip",
            #[cfg(feature = "zlib")]
            Self::Zlib(_) => "zlib",
            #[cfg(feature = "bz2")]
            Self::Bzip2(_) => "bzip2",
            #[cfg(feature = "lz4")]
            Self::Lz4(_) => "lz4",
            #[cfg(feature = "blosc")]
            Self::Blosc(_) => "blosc",
        }
    }

    /// Encode `decoded_value`.
    ///
    /// # Errors
    /// Returns a [`CodecError`] if the underlying compression library fails.
    pub fn encode(&self, decoded_value: &[u8]) -> Result<Vec<u8>, CodecError> {
        match self {
            Self::Raw(codec) => codec.encode(decoded_value),
            #[cfg(feature = "gzip")]
            Self::Gzip(codec) => codec.encode(decoded_value),
            #[cfg(feature = "zlib")]
            Self::Zlib(codec) => codec.encode(decoded_value),
            #[cfg(feature = "bz2")]
            Self::Bzip2(codec) => codec.encode(decoded_value),
            #[cfg(feature = "lz4")]
            Self::Lz4(codec) => codec.encode(decoded_value),
            #[cfg(feature = "blosc")]
            Self::Blosc(codec) => codec.encode(decoded_value),
        }
    }

    /// Decode `encoded_value`.
    ///
    /// # Errors
    /// Returns a [`CodecError`] if `encoded_value` is not valid for this codec.
    pub fn decode(&self, encoded_value: &[u8]) -> Result<Vec<u8>, CodecError> {
        match self {
            Self::Raw(codec) => codec.decode(encoded_value),
            #[cfg(feature = "gzip")]
            Self::Gzip(codec) => codec.decode(encoded_value),
            #[cfg(feature = "zlib")]
            Self::Zlib(codec) => codec.decode(encoded_value),
            #[cfg(feature = "bz2")]
            Self::Bzip2(codec) => codec.decode(encoded_value),
            #[cfg(feature = "lz4")]
            Self::Lz4(codec) => codec.decode(encoded_value),
            #[cfg(feature = "blosc")]
            Self::Blosc(codec) => codec.decode(encoded_value),
        }
    }

    /// Set the element size hint in bytes.
    ///
    /// Only meaningful for codecs which shuffle by element (blosc); a no-op
    /// for the others.
    #[must_use]
    pub fn with_element_size(self, element_size: usize) -> Self {
        match self {
            #[cfg(feature = "blosc")]
            Self::Blosc(codec) => Self::Blosc(codec.with_typesize(element_size)),
            codec => codec,
        }
    }
}

impl Default for Codec {
    /// The `raw` codec.
    fn default() -> Self {
        Self::Raw(RawCodec)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_id() {
        assert!(Codec::from_id("raw").is_ok());
        assert!(Codec::from_id("zstd-and-then-some").is_err());
        let err = Codec::from_id("xz").unwrap_err();
        assert_eq!(err.id(), "xz");
    }

    #[test]
    fn supported_ids_resolve() {
        for id in Codec::supported_ids() {
            let codec = Codec::from_id(id).unwrap();
            assert_eq!(&codec.id(), id);
        }
    }

    #[test]
    fn round_trip_all() {
        let data: Vec<u8> = (0..2000u32).map(|i| (i % 251) as u8).collect();
        for id in Codec::supported_ids() {
            let codec = Codec::from_id(id).unwrap().with_element_size(1);
            let encoded = codec.encode(&data).unwrap();
            let decoded = codec.decode(&encoded).unwrap();
            assert_eq!(decoded, data, "round trip failed for {id}");
        }
    }

    #[test]
    fn round_trip_empty() {
        for id in Codec::supported_ids() {
            let codec = Codec::from_id(id).unwrap().with_element_size(1);
            let encoded = codec.encode(&[]).unwrap();
            let decoded = codec.decode(&encoded).unwrap();
            assert!(decoded.is_empty(), "empty round trip failed for {id}");
        }
    }
}
