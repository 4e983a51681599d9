//! The `blosc` codec.
//!
//! Produces buffers in the [blosc](https://www.blosc.org/) container format,
//! as written by the numcodecs `Blosc` compressor.

use std::ffi::CStr;
use std::os::raw::{c_char, c_int, c_void};

use blosc_src::{
    blosc_cbuffer_validate, blosc_compress_ctx, blosc_decompress_ctx, BLOSC_MAX_OVERHEAD,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::CodecError;

/// A blosc error.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct BloscError(String);

impl From<&str> for BloscError {
    fn from(err: &str) -> Self {
        Self(err.to_string())
    }
}

impl From<String> for BloscError {
    fn from(err: String) -> Self {
        Self(err)
    }
}

/// A blosc internal compressor.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Eq, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum BloscCompressor {
    /// BloscLZ (the blosc default).
    BloscLZ,
    /// LZ4.
    #[default]
    LZ4,
    /// LZ4HC.
    LZ4HC,
    /// Snappy.
    Snappy,
    /// Zlib.
    Zlib,
    /// Zstd.
    Zstd,
}

impl BloscCompressor {
    const fn as_cstr(self) -> &'static CStr {
        match self {
            Self::BloscLZ => c"blosclz",
            Self::LZ4 => c"lz4",
            Self::LZ4HC => c"lz4hc",
            Self::Snappy => c"snappy",
            Self::Zlib => c"zlib",
            Self::Zstd => c"zstd",
        }
    }

    /// The compressor name as used in blosc metadata (`cname`).
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::BloscLZ => "blosclz",
            Self::LZ4 => "lz4",
            Self::LZ4HC => "lz4hc",
            Self::Snappy => "snappy",
            Self::Zlib => "zlib",
            Self::Zstd => "zstd",
        }
    }
}

impl TryFrom<&str> for BloscCompressor {
    type Error = BloscError;

    fn try_from(cname: &str) -> Result<Self, Self::Error> {
        match cname {
            "blosclz" => Ok(Self::BloscLZ),
            "lz4" => Ok(Self::LZ4),
            "lz4hc" => Ok(Self::LZ4HC),
            "snappy" => Ok(Self::Snappy),
            "zlib" => Ok(Self::Zlib),
            "zstd" => Ok(Self::Zstd),
            _ => Err(BloscError(format!("unknown blosc compressor {cname}"))),
        }
    }
}

/// A blosc shuffle mode.
///
/// Serialized as the integer the numcodecs blosc configuration uses.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Eq, PartialEq, Default)]
#[serde(into = "u8", try_from = "u8")]
pub enum BloscShuffleMode {
    /// No shuffling.
    NoShuffle = 0, // blosc_src::BLOSC_NOSHUFFLE
    /// Byte-wise shuffling.
    #[default]
    Shuffle = 1, // blosc_src::BLOSC_SHUFFLE
    /// Bit-wise shuffling.
    BitShuffle = 2, // blosc_src::BLOSC_BITSHUFFLE
}

impl From<BloscShuffleMode> for u8 {
    fn from(mode: BloscShuffleMode) -> Self {
        mode as Self
    }
}

impl TryFrom<u8> for BloscShuffleMode {
    type Error = BloscError;

    fn try_from(mode: u8) -> Result<Self, Self::Error> {
        match mode {
            0 => Ok(Self::NoShuffle),
            1 => Ok(Self::Shuffle),
            2 => Ok(Self::BitShuffle),
            _ => Err(BloscError(format!("invalid blosc shuffle mode {mode}"))),
        }
    }
}

impl BloscShuffleMode {
    const fn as_c_int(self) -> c_int {
        self as c_int
    }
}

/// A blosc compression level. An integer from 0 to 9.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Eq, PartialEq)]
pub struct BloscCompressionLevel(u8);

impl Default for BloscCompressionLevel {
    fn default() -> Self {
        Self(5)
    }
}

impl TryFrom<u8> for BloscCompressionLevel {
    type Error = BloscError;

    fn try_from(clevel: u8) -> Result<Self, Self::Error> {
        if clevel <= 9 {
            Ok(Self(clevel))
        } else {
            Err(BloscError(format!("invalid blosc clevel {clevel}")))
        }
    }
}

impl BloscCompressionLevel {
    /// The compression level as a [`u8`].
    #[must_use]
    pub const fn as_u8(&self) -> u8 {
        self.0
    }
}

/// A `blosc` codec implementation.
///
/// The defaults (`lz4`, level 5, byte shuffle) match the numcodecs `Blosc`
/// compressor configured with `cname="lz4"`.
#[derive(Clone, Debug)]
pub struct BloscCodec {
    cname: BloscCompressor,
    clevel: BloscCompressionLevel,
    shuffle: BloscShuffleMode,
    typesize: usize,
    blocksize: usize,
}

impl Default for BloscCodec {
    fn default() -> Self {
        Self {
            cname: BloscCompressor::default(),
            clevel: BloscCompressionLevel::default(),
            shuffle: BloscShuffleMode::default(),
            typesize: 1,
            blocksize: 0,
        }
    }
}

impl BloscCodec {
    /// Create a new `blosc` codec.
    ///
    /// The block size is chosen automatically if `blocksize` is [`None`].
    #[must_use]
    pub fn new(
        cname: BloscCompressor,
        clevel: BloscCompressionLevel,
        shuffle: BloscShuffleMode,
        typesize: usize,
        blocksize: Option<usize>,
    ) -> Self {
        Self {
            cname,
            clevel,
            shuffle,
            typesize,
            blocksize: blocksize.unwrap_or(0),
        }
    }

    /// Set the element size used for shuffling.
    #[must_use]
    pub const fn with_typesize(mut self, typesize: usize) -> Self {
        self.typesize = typesize;
        self
    }

    /// The internal compressor.
    #[must_use]
    pub const fn cname(&self) -> BloscCompressor {
        self.cname
    }

    /// The compression level.
    #[must_use]
    pub const fn clevel(&self) -> BloscCompressionLevel {
        self.clevel
    }

    /// The shuffle mode.
    #[must_use]
    pub const fn shuffle(&self) -> BloscShuffleMode {
        self.shuffle
    }

    /// The element size used for shuffling.
    #[must_use]
    pub const fn typesize(&self) -> usize {
        self.typesize
    }

    /// The block size (0 means automatic).
    #[must_use]
    pub const fn blocksize(&self) -> usize {
        self.blocksize
    }

    /// Encode `decoded_value` into a blosc container.
    ///
    /// # Errors
    /// Returns a [`CodecError`] if the blosc library reports a failure.
    pub fn encode(&self, decoded_value: &[u8]) -> Result<Vec<u8>, CodecError> {
        // Shuffling requires a typesize which divides the buffer; blosc itself
        // falls back to no shuffling otherwise.
        let typesize = self.typesize.max(1);

        let destsize = decoded_value.len() + BLOSC_MAX_OVERHEAD as usize;
        let mut dest: Vec<u8> = Vec::with_capacity(destsize);
        let written = unsafe {
            blosc_compress_ctx(
                c_int::from(self.clevel.as_u8()),
                self.shuffle.as_c_int(),
                typesize,
                decoded_value.len(),
                decoded_value.as_ptr().cast::<c_void>(),
                dest.as_mut_ptr().cast::<c_void>(),
                destsize,
                self.cname.as_cstr().as_ptr().cast::<c_char>(),
                self.blocksize,
                1,
            )
        };
        if written > 0 {
            // SAFETY: blosc_compress_ctx wrote exactly `written` bytes
            unsafe { dest.set_len(written as usize) };
            dest.shrink_to_fit();
            Ok(dest)
        } else {
            Err(BloscError(format!(
                "blosc_compress_ctx(clevel: {}, cname: {}) failed with {written}",
                self.clevel.as_u8(),
                self.cname.as_str(),
            ))
            .into())
        }
    }

    /// Decode a blosc container `encoded_value`.
    ///
    /// # Errors
    /// Returns a [`CodecError`] if `encoded_value` is not a valid blosc buffer.
    pub fn decode(&self, encoded_value: &[u8]) -> Result<Vec<u8>, CodecError> {
        // There is limited validation of blosc encoded data in the library
        // itself, so validate the header before decompressing.
        let mut nbytes: usize = 0;
        let valid = unsafe {
            blosc_cbuffer_validate(
                encoded_value.as_ptr().cast::<c_void>(),
                encoded_value.len(),
                std::ptr::addr_of_mut!(nbytes),
            )
        } == 0;
        if !valid {
            return Err(BloscError("blosc header validation failed".to_string()).into());
        }

        let mut dest: Vec<u8> = Vec::with_capacity(nbytes);
        let read = unsafe {
            blosc_decompress_ctx(
                encoded_value.as_ptr().cast::<c_void>(),
                dest.as_mut_ptr().cast::<c_void>(),
                nbytes,
                1,
            )
        };
        if read >= 0 {
            // SAFETY: blosc_decompress_ctx wrote exactly `read` bytes
            unsafe { dest.set_len(read as usize) };
            Ok(dest)
        } else {
            Err(BloscError(format!("blosc_decompress_ctx failed with {read}")).into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip() {
        let data: Vec<u8> = (0..4000u32).map(|i| (i % 97) as u8).collect();
        let codec = BloscCodec::default();
        let encoded = codec.encode(&data).unwrap();
        assert!(encoded.len() < data.len());
        assert_eq!(codec.decode(&encoded).unwrap(), data);
    }

    #[test]
    fn round_trip_shuffled_u16() {
        let data: Vec<u8> = (0..2000u32).flat_map(|i| (i as u16).to_le_bytes()).collect();
        let codec = BloscCodec::new(
            BloscCompressor::LZ4,
            BloscCompressionLevel::default(),
            BloscShuffleMode::Shuffle,
            2,
            None,
        );
        let encoded = codec.encode(&data).unwrap();
        assert_eq!(codec.decode(&encoded).unwrap(), data);
    }

    #[test]
    fn decode_garbage() {
        let codec = BloscCodec::default();
        assert!(codec.decode(&[1, 2, 3]).is_err());
    }

    #[test]
    fn shuffle_mode_as_int() {
        assert_eq!(
            serde_json::to_value(BloscShuffleMode::Shuffle).unwrap(),
            serde_json::json!(1)
        );
    }

    #[test]
    fn cname_strings() {
        assert_eq!(
            serde_json::to_value(BloscCompressor::LZ4).unwrap(),
            serde_json::json!("lz4")
        );
        assert_eq!(BloscCompressor::try_from("zstd").unwrap(), BloscCompressor::Zstd);
        assert!(BloscCompressor::try_from("lzma").is_err());
    }
}
