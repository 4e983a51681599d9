//! Zarr V2 metadata.
//!
//! An example `.zarray` document, matching what the zarr-python fixture
//! generators produce:
//! ```json
//! {
//!     "zarr_format": 2,
//!     "shape": [512, 512, 3],
//!     "chunks": [100, 100, 1],
//!     "dtype": "|u1",
//!     "compressor": {"id": "blosc", "cname": "lz4", "clevel": 5, "shuffle": 1, "blocksize": 0},
//!     "fill_value": 0,
//!     "order": "C",
//!     "filters": null,
//!     "dimension_separator": "."
//! }
//! ```

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use zarr_interop_codec::{Codec, CodecError, UnsupportedCodecError};

use crate::array::{DataType, UnsupportedDataTypeError};
use crate::chunk_key_encoding::ChunkKeySeparator;
use crate::{ArrayShape, ChunkShape};

/// Zarr V2 generic metadata with an `id` and flattened configuration.
///
/// For example:
/// ```json
/// {
///     "id": "blosc",
///     "cname": "lz4",
///     "clevel": 5,
///     "shuffle": 1
/// }
/// ```
#[derive(Serialize, Deserialize, Clone, PartialEq, Debug)]
pub struct MetadataV2 {
    id: String,
    #[serde(flatten)]
    configuration: serde_json::Map<String, serde_json::Value>,
}

impl MetadataV2 {
    /// Create metadata from an `id` and a serializable configuration.
    ///
    /// # Errors
    /// Returns a [`serde_json`] error if `configuration` does not serialize to
    /// a JSON object.
    pub fn new_with_configuration<TConfiguration: Serialize>(
        id: impl Into<String>,
        configuration: &TConfiguration,
    ) -> Result<Self, serde_json::Error> {
        let serde_json::Value::Object(configuration) = serde_json::to_value(configuration)? else {
            return Err(serde::ser::Error::custom(
                "configuration must serialize to a JSON object",
            ));
        };
        Ok(Self {
            id: id.into(),
            configuration,
        })
    }

    /// Return the value of the `id` field.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Return the configuration, which includes all fields excluding the `id`.
    #[must_use]
    pub const fn configuration(&self) -> &serde_json::Map<String, serde_json::Value> {
        &self.configuration
    }

    /// Try and convert the configuration to a specific deserializable configuration.
    ///
    /// # Errors
    /// Returns a [`serde_json`] error if the configuration cannot be converted.
    pub fn to_typed_configuration<TConfiguration: DeserializeOwned>(
        &self,
    ) -> Result<TConfiguration, serde_json::Error> {
        serde_json::from_value(serde_json::Value::Object(self.configuration.clone()))
    }
}

/// Either `C` or `F`, defining the layout of bytes within each chunk.
#[derive(Serialize, Deserialize, Clone, Copy, Eq, PartialEq, Debug)]
pub enum ArrayMetadataV2Order {
    /// Row-major order. The last dimension varies fastest.
    C,
    /// Column-major order. The first dimension varies fastest.
    F,
}

/// Zarr V2 array metadata, the `.zarray` document.
#[derive(Serialize, Deserialize, Clone, PartialEq, Debug, derive_more::Display)]
#[display("{}", serde_json::to_string(self).unwrap_or_default())]
pub struct ArrayMetadataV2 {
    /// The version of the storage specification. Must be `2`.
    pub zarr_format: monostate::MustBe!(2u64),
    /// The length of each dimension of the array.
    pub shape: ArrayShape,
    /// The length of each dimension of a chunk.
    pub chunks: ArrayShape,
    /// The data type of the array, e.g. `|u1` or `<u2`.
    pub dtype: String,
    /// The primary compression codec, or null if no compressor is used.
    pub compressor: Option<MetadataV2>,
    /// The default value for uninitialized portions of the array.
    pub fill_value: serde_json::Value,
    /// The layout of bytes within each chunk.
    pub order: ArrayMetadataV2Order,
    /// Additional codec configurations, or null if no filters are applied.
    pub filters: Option<Vec<MetadataV2>>,
    /// The separator placed between the dimensions of a chunk key.
    #[serde(default = "chunk_key_separator_default_zarr_v2")]
    pub dimension_separator: ChunkKeySeparator,
}

const fn chunk_key_separator_default_zarr_v2() -> ChunkKeySeparator {
    ChunkKeySeparator::Dot
}

impl ArrayMetadataV2 {
    /// Create Zarr V2 array metadata with C order, fill value 0, and no filters.
    #[must_use]
    pub fn new(
        shape: ArrayShape,
        chunks: &ChunkShape,
        data_type: DataType,
        compressor: Option<MetadataV2>,
        dimension_separator: ChunkKeySeparator,
    ) -> Self {
        Self {
            zarr_format: monostate::MustBe!(2u64),
            shape,
            chunks: chunks.iter().map(|c| c.get()).collect(),
            dtype: data_type.v2_name().to_string(),
            compressor,
            fill_value: serde_json::Value::from(0),
            order: ArrayMetadataV2Order::C,
            filters: None,
            dimension_separator,
        }
    }

    /// The data type of the array.
    ///
    /// # Errors
    /// Returns [`UnsupportedDataTypeError`] if the `dtype` string is not in
    /// the supported set.
    pub fn data_type(&self) -> Result<DataType, UnsupportedDataTypeError> {
        DataType::from_v2_name(&self.dtype)
    }
}

/// Zarr V2 group metadata, the `.zgroup` document.
#[derive(Serialize, Deserialize, Clone, PartialEq, Eq, Debug, Default)]
pub struct GroupMetadataV2 {
    /// The version of the storage specification. Must be `2`.
    pub zarr_format: monostate::MustBe!(2u64),
}

#[cfg(any(feature = "gzip", feature = "zlib", feature = "bz2"))]
#[derive(Serialize, Deserialize)]
struct LevelConfiguration {
    level: u32,
}

#[cfg(feature = "lz4")]
#[derive(Serialize, Deserialize)]
struct Lz4Configuration {
    acceleration: u32,
}

#[cfg(feature = "blosc")]
#[derive(Serialize, Deserialize)]
struct BloscConfiguration {
    cname: zarr_interop_codec::BloscCompressor,
    clevel: u8,
    shuffle: zarr_interop_codec::BloscShuffleMode,
    blocksize: usize,
}

/// An error converting between a [`Codec`] and a zarr-v2 `compressor` document.
#[derive(Debug, thiserror::Error)]
pub enum CompressorMetadataError {
    /// The codec or compressor id is not in the supported set.
    #[error(transparent)]
    UnsupportedCodec(#[from] UnsupportedCodecError),
    /// The compressor configuration is invalid.
    #[error("invalid {id} compressor configuration: {error}")]
    InvalidConfiguration {
        /// The compressor id.
        id: String,
        /// The underlying serialization error.
        error: String,
    },
    /// The configured compression level is invalid.
    #[error(transparent)]
    CodecError(#[from] CodecError),
}

impl CompressorMetadataError {
    fn invalid_configuration(id: &str, error: &serde_json::Error) -> Self {
        Self::InvalidConfiguration {
            id: id.to_string(),
            error: error.to_string(),
        }
    }
}

/// Convert a [`Codec`] to its zarr-v2 `compressor` document.
///
/// The identifiers and configuration fields are those of the numcodecs
/// compressor classes ([`None`] for the raw codec, `bz2` for bzip2).
///
/// # Errors
/// Returns a [`CompressorMetadataError`] if the codec has no zarr-v2
/// compressor representation in this build.
pub fn codec_to_compressor(codec: &Codec) -> Result<Option<MetadataV2>, CompressorMetadataError> {
    let invalid = |error| CompressorMetadataError::invalid_configuration(codec.id(), &error);
    match codec {
        Codec::Raw(_) => Ok(None),
        #[cfg(feature = "gzip")]
        Codec::Gzip(codec) => MetadataV2::new_with_configuration(
            "gzip",
            &LevelConfiguration {
                level: codec.compression_level().as_u32(),
            },
        )
        .map(Some)
        .map_err(invalid),
        #[cfg(feature = "zlib")]
        Codec::Zlib(codec) => MetadataV2::new_with_configuration(
            "zlib",
            &LevelConfiguration {
                level: codec.compression_level().as_u32(),
            },
        )
        .map(Some)
        .map_err(invalid),
        #[cfg(feature = "bz2")]
        Codec::Bzip2(codec) => MetadataV2::new_with_configuration(
            "bz2",
            &LevelConfiguration {
                level: codec.compression_level().as_u32(),
            },
        )
        .map(Some)
        .map_err(invalid),
        #[cfg(feature = "lz4")]
        Codec::Lz4(_) => {
            MetadataV2::new_with_configuration("lz4", &Lz4Configuration { acceleration: 1 })
                .map(Some)
                .map_err(invalid)
        }
        #[cfg(feature = "blosc")]
        Codec::Blosc(codec) => MetadataV2::new_with_configuration(
            "blosc",
            &BloscConfiguration {
                cname: codec.cname(),
                clevel: codec.clevel().as_u8(),
                shuffle: codec.shuffle(),
                blocksize: codec.blocksize(),
            },
        )
        .map(Some)
        .map_err(invalid),
        codec => Err(UnsupportedCodecError::new(codec.id()).into()),
    }
}

/// Convert a zarr-v2 `compressor` document to a [`Codec`].
///
/// [`None`] (a JSON null compressor) is the raw codec.
///
/// # Errors
/// Returns a [`CompressorMetadataError`] if the compressor id is unknown or
/// its configuration is invalid.
pub fn compressor_to_codec(
    compressor: Option<&MetadataV2>,
) -> Result<Codec, CompressorMetadataError> {
    let Some(compressor) = compressor else {
        return Ok(Codec::Raw(zarr_interop_codec::RawCodec));
    };
    let invalid_configuration = |error: serde_json::Error| {
        CompressorMetadataError::invalid_configuration(compressor.id(), &error)
    };
    match compressor.id() {
        #[cfg(feature = "gzip")]
        "gzip" => {
            let configuration: LevelConfiguration = compressor
                .to_typed_configuration()
                .map_err(invalid_configuration)?;
            Ok(Codec::Gzip(
                zarr_interop_codec::GzipCodec::new(configuration.level)
                    .map_err(|err| CodecError::Other(err.to_string()))?,
            ))
        }
        #[cfg(feature = "zlib")]
        "zlib" => {
            let configuration: LevelConfiguration = compressor
                .to_typed_configuration()
                .map_err(invalid_configuration)?;
            let level = configuration
                .level
                .try_into()
                .map_err(|level| CodecError::Other(format!("invalid zlib level {level}")))?;
            Ok(Codec::Zlib(zarr_interop_codec::ZlibCodec::new(level)))
        }
        #[cfg(feature = "bz2")]
        "bz2" => {
            let configuration: LevelConfiguration = compressor
                .to_typed_configuration()
                .map_err(invalid_configuration)?;
            Ok(Codec::Bzip2(
                zarr_interop_codec::Bzip2Codec::new(configuration.level)
                    .map_err(|err| CodecError::Other(err.to_string()))?,
            ))
        }
        #[cfg(feature = "lz4")]
        "lz4" => Ok(Codec::Lz4(zarr_interop_codec::Lz4Codec::new())),
        #[cfg(feature = "blosc")]
        "blosc" => {
            let configuration: BloscConfiguration = compressor
                .to_typed_configuration()
                .map_err(invalid_configuration)?;
            let clevel = configuration
                .clevel
                .try_into()
                .map_err(CodecError::BloscError)?;
            Ok(Codec::Blosc(zarr_interop_codec::BloscCodec::new(
                configuration.cname,
                clevel,
                configuration.shuffle,
                1,
                Some(configuration.blocksize),
            )))
        }
        id => Err(UnsupportedCodecError::new(id).into()),
    }
}
