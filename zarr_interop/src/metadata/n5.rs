//! N5 metadata.
//!
//! An n5 hierarchy root carries a version document and each dataset an
//! `attributes.json`:
//! ```json
//! {
//!     "dimensions": [3, 512, 512],
//!     "blockSize": [1, 100, 100],
//!     "dataType": "uint8",
//!     "compression": {"type": "gzip", "level": -1}
//! }
//! ```
//! n5 lists dimensions in column-major order, so `dimensions` and
//! `blockSize` are reversed with respect to the row-major shape, and chunk
//! payloads are big-endian with a per-chunk binary header.

use std::mem::size_of;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use zarr_interop_codec::{Codec, CodecError, UnsupportedCodecError};

use crate::array::{DataType, UnsupportedDataTypeError};
use crate::{ArrayShape, ChunkShape};

/// The n5 specification version written to the root `attributes.json`.
pub const N5_VERSION: &str = "2.5.0";

/// The n5 root version document.
#[derive(Serialize, Deserialize, Clone, PartialEq, Eq, Debug)]
pub struct N5VersionMetadata {
    /// The n5 specification version.
    pub n5: String,
}

impl Default for N5VersionMetadata {
    fn default() -> Self {
        Self {
            n5: N5_VERSION.to_string(),
        }
    }
}

/// N5 dataset metadata, the per-dataset `attributes.json` document.
#[derive(Serialize, Deserialize, Clone, PartialEq, Debug, derive_more::Display)]
#[display("{}", serde_json::to_string(self).unwrap_or_default())]
#[serde(rename_all = "camelCase")]
pub struct N5ArrayMetadata {
    /// Array shape, reversed with respect to the row-major shape.
    pub dimensions: Vec<u64>,
    /// Chunk shape, reversed with respect to the row-major chunk shape.
    pub block_size: Vec<u64>,
    /// Data type as a string, e.g. `uint8`.
    pub data_type: String,
    /// Chunk compression configuration.
    pub compression: N5CompressionMetadata,
}

impl N5ArrayMetadata {
    /// Create n5 dataset metadata from a row-major shape and chunk shape.
    #[must_use]
    pub fn new(
        shape: &[u64],
        chunks: &ChunkShape,
        data_type: DataType,
        compression: N5CompressionMetadata,
    ) -> Self {
        Self {
            dimensions: shape.iter().rev().copied().collect(),
            block_size: chunks.iter().rev().map(|c| c.get()).collect(),
            data_type: data_type.n5_name().to_string(),
            compression,
        }
    }

    /// The row-major array shape.
    #[must_use]
    pub fn shape(&self) -> ArrayShape {
        self.dimensions.iter().rev().copied().collect()
    }

    /// The row-major chunk shape.
    #[must_use]
    pub fn chunks(&self) -> ArrayShape {
        self.block_size.iter().rev().copied().collect()
    }

    /// The data type of the dataset.
    ///
    /// # Errors
    /// Returns [`UnsupportedDataTypeError`] if the `dataType` string is not in
    /// the supported set.
    pub fn data_type(&self) -> Result<DataType, UnsupportedDataTypeError> {
        DataType::from_n5_name(&self.data_type)
    }
}

/// N5 chunk compression configuration.
///
/// Field names and defaults follow the n5-java writer; `xz` is parsed but
/// has no corresponding codec in this crate.
#[derive(Serialize, Deserialize, Clone, PartialEq, Debug)]
#[serde(rename_all = "lowercase", tag = "type")]
pub enum N5CompressionMetadata {
    /// Uncompressed.
    Raw,
    /// gzip.
    Gzip {
        /// Default -1, meaning "implementation default".
        #[serde(default = "default_gzip_level")]
        level: i32,
    },
    /// bzip2.
    Bzip2 {
        /// The bzip2 block size in units of 100 kB. Must be in 1..=9.
        #[serde(rename = "blockSize", default = "default_bzip2_block_size")]
        block_size: u32,
    },
    /// lz4.
    Lz4 {
        /// The lz4 streaming block size. Default 65536.
        #[serde(rename = "blockSize", default = "default_lz4_block_size")]
        block_size: u32,
    },
    /// xz.
    Xz {
        /// The xz preset. Default 6.
        #[serde(default = "default_xz_preset")]
        preset: u32,
    },
    /// blosc (the n5-blosc extension).
    Blosc {
        /// The blosc internal compressor name.
        cname: String,
        /// The shuffle mode as an integer.
        shuffle: u8,
        /// The compression level.
        clevel: u8,
        /// The block size (0 means automatic).
        blocksize: usize,
    },
}

const fn default_gzip_level() -> i32 {
    -1
}

const fn default_bzip2_block_size() -> u32 {
    9
}

const fn default_lz4_block_size() -> u32 {
    65536
}

const fn default_xz_preset() -> u32 {
    6
}

/// An error converting between a [`Codec`] and n5 compression metadata.
#[derive(Debug, Error)]
pub enum N5CompressionError {
    /// The codec or compression type is not in the supported set.
    #[error(transparent)]
    UnsupportedCodec(#[from] UnsupportedCodecError),
    /// The configured compression parameters are invalid.
    #[error(transparent)]
    CodecError(#[from] CodecError),
}

/// Convert a [`Codec`] to its n5 `compression` document.
///
/// # Errors
/// Returns an [`N5CompressionError`] if the codec has no n5 representation in
/// this build.
pub fn codec_to_compression(codec: &Codec) -> Result<N5CompressionMetadata, N5CompressionError> {
    match codec {
        Codec::Raw(_) => Ok(N5CompressionMetadata::Raw),
        #[cfg(feature = "gzip")]
        Codec::Gzip(codec) => Ok(N5CompressionMetadata::Gzip {
            level: i32::try_from(codec.compression_level().as_u32()).unwrap(),
        }),
        #[cfg(feature = "bz2")]
        Codec::Bzip2(codec) => Ok(N5CompressionMetadata::Bzip2 {
            block_size: codec.compression_level().as_u32(),
        }),
        #[cfg(feature = "lz4")]
        Codec::Lz4(_) => Ok(N5CompressionMetadata::Lz4 {
            block_size: default_lz4_block_size(),
        }),
        #[cfg(feature = "blosc")]
        Codec::Blosc(codec) => Ok(N5CompressionMetadata::Blosc {
            cname: codec.cname().as_str().to_string(),
            shuffle: codec.shuffle().into(),
            clevel: codec.clevel().as_u8(),
            blocksize: codec.blocksize(),
        }),
        codec => Err(UnsupportedCodecError::new(codec.id()).into()),
    }
}

/// Convert an n5 `compression` document to a [`Codec`].
///
/// # Errors
/// Returns an [`N5CompressionError`] if the compression type is unknown in
/// this build or its parameters are invalid.
pub fn compression_to_codec(
    compression: &N5CompressionMetadata,
) -> Result<Codec, N5CompressionError> {
    match compression {
        N5CompressionMetadata::Raw => Ok(Codec::Raw(zarr_interop_codec::RawCodec)),
        #[cfg(feature = "gzip")]
        N5CompressionMetadata::Gzip { level } => {
            // -1 is "implementation default"
            let level = if *level < 0 {
                6
            } else {
                u32::try_from(*level).unwrap()
            };
            Ok(Codec::Gzip(
                zarr_interop_codec::GzipCodec::new(level)
                    .map_err(|err| CodecError::Other(err.to_string()))?,
            ))
        }
        #[cfg(feature = "bz2")]
        N5CompressionMetadata::Bzip2 { block_size } => Ok(Codec::Bzip2(
            zarr_interop_codec::Bzip2Codec::new(*block_size)
                .map_err(|err| CodecError::Other(err.to_string()))?,
        )),
        #[cfg(feature = "lz4")]
        N5CompressionMetadata::Lz4 { .. } => Ok(Codec::Lz4(zarr_interop_codec::Lz4Codec::new())),
        #[cfg(feature = "blosc")]
        N5CompressionMetadata::Blosc {
            cname,
            shuffle,
            clevel,
            blocksize,
        } => {
            let cname = zarr_interop_codec::BloscCompressor::try_from(cname.as_str())
                .map_err(CodecError::BloscError)?;
            let clevel = (*clevel).try_into().map_err(CodecError::BloscError)?;
            let shuffle = (*shuffle).try_into().map_err(CodecError::BloscError)?;
            Ok(Codec::Blosc(zarr_interop_codec::BloscCodec::new(
                cname,
                clevel,
                shuffle,
                1,
                Some(*blocksize),
            )))
        }
        compression => {
            let id = serde_json::to_value(compression)
                .ok()
                .and_then(|value| {
                    value
                        .get("type")
                        .and_then(|t| t.as_str().map(ToString::to_string))
                })
                .unwrap_or_else(|| "unknown".to_string());
            Err(UnsupportedCodecError::new(id).into())
        }
    }
}

/// The header written in front of every n5 chunk payload.
///
/// Layout: mode (u16 big-endian), number of dimensions (u16 big-endian), then
/// the chunk extent along each dimension (u32 big-endian each) in n5
/// (column-major) dimension order. Only mode 0 (default) blocks are
/// supported.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct N5ChunkHeader {
    /// Chunk extents in n5 dimension order (reversed row-major).
    pub shape: Vec<u32>,
}

/// An invalid n5 chunk header.
#[derive(Debug, Clone, Error)]
#[error("invalid n5 chunk header: {0}")]
pub struct InvalidN5ChunkHeaderError(String);

impl InvalidN5ChunkHeaderError {
    /// Create a new invalid chunk header error.
    #[must_use]
    pub fn new(error: impl Into<String>) -> Self {
        Self(error.into())
    }
}

impl N5ChunkHeader {
    const MODE_DEFAULT: u16 = 0;

    /// Create a header for a chunk with row-major `extent`.
    ///
    /// # Panics
    /// Panics if any extent exceeds [`u32::MAX`], far beyond any practical
    /// chunk shape.
    #[must_use]
    pub fn new(extent: &[u64]) -> Self {
        Self {
            shape: extent
                .iter()
                .rev()
                .map(|&e| u32::try_from(e).unwrap())
                .collect(),
        }
    }

    /// The row-major chunk extent described by this header.
    #[must_use]
    pub fn extent(&self) -> ArrayShape {
        self.shape.iter().rev().map(|&e| u64::from(e)).collect()
    }

    /// Serialize the header.
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.num_bytes());
        bytes.extend_from_slice(&Self::MODE_DEFAULT.to_be_bytes());
        bytes.extend_from_slice(&u16::try_from(self.shape.len()).unwrap().to_be_bytes());
        for extent in &self.shape {
            bytes.extend_from_slice(&extent.to_be_bytes());
        }
        bytes
    }

    /// Deserialize a header from the front of a chunk payload.
    ///
    /// # Errors
    /// Returns [`InvalidN5ChunkHeaderError`] if the payload is truncated or
    /// the mode is not 0 (varlength and object blocks are unsupported).
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, InvalidN5ChunkHeaderError> {
        let field = |offset: usize| -> Result<[u8; 2], InvalidN5ChunkHeaderError> {
            bytes
                .get(offset..offset + 2)
                .and_then(|b| b.try_into().ok())
                .ok_or_else(|| InvalidN5ChunkHeaderError("truncated header".to_string()))
        };
        let mode = u16::from_be_bytes(field(0)?);
        if mode != Self::MODE_DEFAULT {
            return Err(InvalidN5ChunkHeaderError(format!(
                "unsupported chunk mode {mode}"
            )));
        }
        let ndim = usize::from(u16::from_be_bytes(field(2)?));
        let mut shape = Vec::with_capacity(ndim);
        for d in 0..ndim {
            let offset = 4 + d * 4;
            let extent = bytes
                .get(offset..offset + 4)
                .and_then(|b| b.try_into().ok())
                .map(u32::from_be_bytes)
                .ok_or_else(|| InvalidN5ChunkHeaderError("truncated header".to_string()))?;
            shape.push(extent);
        }
        Ok(Self { shape })
    }

    /// The serialized size of this header in bytes.
    #[must_use]
    pub fn num_bytes(&self) -> usize {
        size_of::<u16>() // mode
            + size_of::<u16>() // ndim
            + self.shape.len() * size_of::<u32>() // shape
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn array_metadata_document() {
        let chunks: ChunkShape = [1, 100, 100]
            .iter()
            .map(|&c| std::num::NonZeroU64::new(c).unwrap())
            .collect();
        let metadata = N5ArrayMetadata::new(
            &[3, 512, 512],
            &chunks,
            DataType::UInt8,
            N5CompressionMetadata::Gzip { level: -1 },
        );
        let json = serde_json::to_value(&metadata).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "dimensions": [512, 512, 3],
                "blockSize": [100, 100, 1],
                "dataType": "uint8",
                "compression": {"type": "gzip", "level": -1}
            })
        );
        assert_eq!(metadata.shape(), vec![3, 512, 512]);
        assert_eq!(metadata.chunks(), vec![1, 100, 100]);
    }

    #[test]
    fn compression_defaults() {
        let compression: N5CompressionMetadata =
            serde_json::from_value(serde_json::json!({"type": "bzip2"})).unwrap();
        assert_eq!(
            compression,
            N5CompressionMetadata::Bzip2 { block_size: 9 }
        );
        let compression: N5CompressionMetadata =
            serde_json::from_value(serde_json::json!({"type": "lz4"})).unwrap();
        assert_eq!(
            compression,
            N5CompressionMetadata::Lz4 { block_size: 65536 }
        );
    }

    #[test]
    fn xz_parses_but_has_no_codec() {
        let compression: N5CompressionMetadata =
            serde_json::from_value(serde_json::json!({"type": "xz", "preset": 6})).unwrap();
        assert!(matches!(
            compression_to_codec(&compression),
            Err(N5CompressionError::UnsupportedCodec(_))
        ));
    }

    #[test]
    fn codec_compression_round_trip() {
        for id in Codec::supported_ids() {
            let codec = Codec::from_id(id).unwrap();
            match codec_to_compression(&codec) {
                Ok(compression) => {
                    assert_eq!(compression_to_codec(&compression).unwrap().id(), *id);
                }
                // zlib has no n5 compression type
                Err(N5CompressionError::UnsupportedCodec(err)) => assert_eq!(err.id(), "zlib"),
                Err(err) => panic!("unexpected error for {id}: {err}"),
            }
        }
    }

    #[test]
    fn chunk_header_bytes() {
        let header = N5ChunkHeader::new(&[1, 100, 100]);
        let bytes = header.to_bytes();
        assert_eq!(
            bytes,
            vec![
                0, 0, // mode
                0, 3, // ndim
                0, 0, 0, 100, // extent 0
                0, 0, 0, 100, // extent 1
                0, 0, 0, 1, // extent 2
            ]
        );
        let parsed = N5ChunkHeader::from_bytes(&bytes).unwrap();
        assert_eq!(parsed, header);
        assert_eq!(parsed.extent(), vec![1, 100, 100]);
        assert_eq!(parsed.num_bytes(), bytes.len());
    }

    #[test]
    fn chunk_header_invalid() {
        assert!(N5ChunkHeader::from_bytes(&[0]).is_err());
        // varlength mode
        assert!(N5ChunkHeader::from_bytes(&[0, 1, 0, 1, 0, 0, 0, 4]).is_err());
    }
}
