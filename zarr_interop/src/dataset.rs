//! Datasets: chunked arrays persisted in a store.
//!
//! A dataset is one complete chunked-array resource under a store prefix: a
//! metadata document describing shape, chunk shape, data type and codec, plus
//! one payload entry per chunk. Datasets are created once, chunks added
//! incrementally, and deleted only as a whole prefix.

use std::num::NonZeroU64;
use std::sync::Arc;

use thiserror::Error;
use zarr_interop_codec::{Codec, CodecError, UnsupportedCodecError};
use zarr_interop_storage::{
    Bytes, ReadableWritableStorageTraits, StorageError, StoreKey, StorePrefix, StorePrefixError,
};

use crate::array::{Array, DataType, UnsupportedDataTypeError};
use crate::chunk_grid::{IncompatibleDimensionalityError, RegularChunkGrid};
use crate::chunk_key_encoding::{ChunkKeyEncoding, ChunkKeySeparator};
use crate::metadata::n5::{
    compression_to_codec, codec_to_compression, InvalidN5ChunkHeaderError, N5ArrayMetadata,
    N5ChunkHeader, N5CompressionError,
};
use crate::metadata::v2::{
    codec_to_compressor, compressor_to_codec, ArrayMetadataV2, ArrayMetadataV2Order,
    CompressorMetadataError,
};
use crate::metadata::InvalidMetadataError;
use crate::pipeline::{
    convert_endianness, crop_chunk, extract_chunk, inject_chunk, pad_chunk, Endianness,
};
use crate::{ArrayIndices, ArrayShape, ChunkShape};

/// The on-disk layout of a dataset.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Layout {
    /// A zarr-v2 dataset: `.zarray` metadata, little-endian chunks stored at
    /// the full nominal chunk shape (edge chunks padded with the fill value).
    ZarrV2 {
        /// The chunk key separator: `.` for flat stores, `/` for nested.
        separator: ChunkKeySeparator,
    },
    /// An n5 dataset: `attributes.json` metadata, big-endian chunks stored at
    /// their true extent behind a binary chunk header, reversed slash-joined
    /// chunk keys.
    N5,
}

impl Layout {
    /// The zarr-v2 layout with flat (`.`-separated) chunk keys.
    #[must_use]
    pub const fn zarr_v2_flat() -> Self {
        Self::ZarrV2 {
            separator: ChunkKeySeparator::Dot,
        }
    }

    /// The zarr-v2 layout with nested (`/`-separated) chunk keys.
    #[must_use]
    pub const fn zarr_v2_nested() -> Self {
        Self::ZarrV2 {
            separator: ChunkKeySeparator::Slash,
        }
    }

    /// The n5 layout.
    #[must_use]
    pub const fn n5() -> Self {
        Self::N5
    }

    /// The name of the metadata document of a dataset with this layout.
    #[must_use]
    pub const fn metadata_document(&self) -> &'static str {
        match self {
            Self::ZarrV2 { .. } => ".zarray",
            Self::N5 => "attributes.json",
        }
    }

    const fn chunk_key_encoding(&self) -> ChunkKeyEncoding {
        match self {
            Self::ZarrV2 { separator } => ChunkKeyEncoding::V2(*separator),
            Self::N5 => ChunkKeyEncoding::N5,
        }
    }

    const fn endianness(&self) -> Endianness {
        match self {
            Self::ZarrV2 { .. } => Endianness::Little,
            Self::N5 => Endianness::Big,
        }
    }

    /// Whether edge chunks are stored padded to the full nominal chunk shape.
    const fn pads_edge_chunks(&self) -> bool {
        match self {
            Self::ZarrV2 { .. } => true,
            Self::N5 => false,
        }
    }
}

/// How reading a chunk with no stored payload behaves.
///
/// Some chunked-array formats define missing chunks as implicitly
/// fill-value-filled; the fixture engine makes the choice explicit.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Default)]
pub enum MissingChunkBehavior {
    /// Fail with [`MissingChunkError`].
    #[default]
    Error,
    /// Return a fill-value-filled chunk.
    FillValue,
}

/// The dataset prefix is already occupied and overwrite was not requested.
#[derive(Debug, Clone, Error)]
#[error("dataset already exists at {0}")]
pub struct DatasetExistsError(StorePrefix);

/// A chunk within the grid has no stored payload.
#[derive(Debug, Clone, Error)]
#[error("missing chunk {chunk_indices:?}")]
pub struct MissingChunkError {
    /// The grid indices of the missing chunk.
    pub chunk_indices: ArrayIndices,
}

/// A dataset error.
#[derive(Debug, Error)]
pub enum DatasetError {
    /// A storage error.
    #[error(transparent)]
    StorageError(#[from] StorageError),
    /// The dataset prefix is occupied.
    #[error(transparent)]
    DatasetExists(#[from] DatasetExistsError),
    /// A read of an ungenerated chunk.
    #[error(transparent)]
    MissingChunk(#[from] MissingChunkError),
    /// A codec failed on a chunk, with the codec and coordinate for diagnosis.
    #[error("codec {codec_id} failed on chunk {chunk_indices:?}: {source}")]
    Codec {
        /// The codec identifier.
        codec_id: String,
        /// The grid indices of the offending chunk.
        chunk_indices: ArrayIndices,
        /// The underlying codec error.
        source: CodecError,
    },
    /// An unknown codec identifier.
    #[error(transparent)]
    UnsupportedCodec(#[from] UnsupportedCodecError),
    /// Shape and chunk shape rank disagreement.
    #[error(transparent)]
    IncompatibleDimensionality(#[from] IncompatibleDimensionalityError),
    /// A chunk shape with a zero-length dimension.
    #[error("chunk shape {0:?} has a zero-length dimension")]
    InvalidChunkShape(ArrayShape),
    /// Chunk indices outside the chunk grid.
    #[error("chunk indices {chunk_indices:?} are out of bounds of grid {grid_shape:?}")]
    InvalidChunkGridIndices {
        /// The offending indices.
        chunk_indices: ArrayIndices,
        /// The grid shape.
        grid_shape: ArrayShape,
    },
    /// A chunk buffer length inconsistent with the chunk extent.
    #[error("invalid chunk buffer length {got}, expected {expected}")]
    InvalidChunkBufferLength {
        /// The actual length.
        got: usize,
        /// The expected length.
        expected: usize,
    },
    /// An array incompatible with the dataset.
    #[error("array shape {got:?} does not match dataset shape {expected:?}")]
    IncompatibleArray {
        /// The array shape.
        got: ArrayShape,
        /// The dataset shape.
        expected: ArrayShape,
    },
    /// Invalid or unparseable metadata.
    #[error(transparent)]
    InvalidMetadata(#[from] InvalidMetadataError),
    /// A missing metadata document.
    #[error("no metadata document under {0}")]
    MissingMetadata(StorePrefix),
    /// An invalid n5 chunk header.
    #[error(transparent)]
    InvalidN5ChunkHeader(#[from] InvalidN5ChunkHeaderError),
    /// An unsupported data type name in metadata.
    #[error(transparent)]
    UnsupportedDataType(#[from] UnsupportedDataTypeError),
    /// An invalid store prefix.
    #[error(transparent)]
    StorePrefixError(#[from] StorePrefixError),
    /// An invalid store key.
    #[error(transparent)]
    StoreKeyError(#[from] zarr_interop_storage::StoreKeyError),
    /// Invalid codec metadata.
    #[error("{0}")]
    InvalidCodecMetadata(String),
}

impl From<CompressorMetadataError> for DatasetError {
    fn from(err: CompressorMetadataError) -> Self {
        match err {
            CompressorMetadataError::UnsupportedCodec(err) => Self::UnsupportedCodec(err),
            err => Self::InvalidCodecMetadata(err.to_string()),
        }
    }
}

impl From<N5CompressionError> for DatasetError {
    fn from(err: N5CompressionError) -> Self {
        match err {
            N5CompressionError::UnsupportedCodec(err) => Self::UnsupportedCodec(err),
            err => Self::InvalidCodecMetadata(err.to_string()),
        }
    }
}

/// A builder for a new [`Dataset`].
#[derive(Debug, Clone)]
pub struct DatasetBuilder {
    shape: ArrayShape,
    chunk_shape: ArrayShape,
    data_type: DataType,
    codec: Codec,
    layout: Layout,
    missing_chunk: MissingChunkBehavior,
    overwrite: bool,
}

impl DatasetBuilder {
    /// Create a new dataset builder.
    #[must_use]
    pub fn new(
        shape: ArrayShape,
        chunk_shape: ArrayShape,
        data_type: DataType,
        codec: Codec,
    ) -> Self {
        Self {
            shape,
            chunk_shape,
            data_type,
            codec,
            layout: Layout::zarr_v2_flat(),
            missing_chunk: MissingChunkBehavior::default(),
            overwrite: false,
        }
    }

    /// Set the layout. Default: zarr-v2 flat.
    #[must_use]
    pub const fn layout(mut self, layout: Layout) -> Self {
        self.layout = layout;
        self
    }

    /// Set the missing chunk behavior. Default: error.
    #[must_use]
    pub const fn missing_chunk_behavior(mut self, behavior: MissingChunkBehavior) -> Self {
        self.missing_chunk = behavior;
        self
    }

    /// Erase an existing dataset at the target prefix rather than failing.
    #[must_use]
    pub const fn overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    /// Create the dataset, writing its metadata document.
    ///
    /// The resource is fully established (prefix plus metadata) before this
    /// returns, so chunk writes never race the metadata.
    ///
    /// # Errors
    /// Returns a [`DatasetError`] if the chunk shape is invalid, the prefix
    /// is occupied (without overwrite), or storage fails.
    pub fn build<TStorage: ?Sized + ReadableWritableStorageTraits>(
        self,
        storage: Arc<TStorage>,
        path: &str,
    ) -> Result<Dataset<TStorage>, DatasetError> {
        let prefix = path_to_prefix(path)?;
        let chunk_shape: ChunkShape = self
            .chunk_shape
            .iter()
            .map(|&c| NonZeroU64::new(c))
            .collect::<Option<_>>()
            .ok_or_else(|| DatasetError::InvalidChunkShape(self.chunk_shape.clone()))?;
        let grid = RegularChunkGrid::new(self.shape, chunk_shape)?;

        let metadata_key = prefix.join_key(self.layout.metadata_document())?;
        if storage.get(&metadata_key)?.is_some() {
            if self.overwrite {
                storage.erase_prefix(&prefix)?;
            } else {
                return Err(DatasetExistsError(prefix).into());
            }
        }

        let dataset = Dataset {
            storage,
            prefix,
            layout: self.layout,
            grid,
            data_type: self.data_type,
            codec: self.codec.with_element_size(self.data_type.size()),
            missing_chunk: self.missing_chunk,
        };
        dataset.write_metadata()?;
        Ok(dataset)
    }
}

/// A chunked array resource in a store.
///
/// Holds an explicit handle to its store; any number of datasets can be
/// written through the same or different stores in one process.
#[derive(Debug)]
pub struct Dataset<TStorage: ?Sized> {
    storage: Arc<TStorage>,
    prefix: StorePrefix,
    layout: Layout,
    grid: RegularChunkGrid,
    data_type: DataType,
    codec: Codec,
    missing_chunk: MissingChunkBehavior,
}

fn path_to_prefix(path: &str) -> Result<StorePrefix, StorePrefixError> {
    let path = path.trim_matches('/');
    if path.is_empty() {
        Ok(StorePrefix::root())
    } else {
        StorePrefix::new(format!("{path}/"))
    }
}

impl<TStorage: ?Sized + ReadableWritableStorageTraits> Dataset<TStorage> {
    /// Open an existing dataset at `path`, sniffing its layout from the
    /// metadata documents present.
    ///
    /// The zarr-v2 chunk key separator is taken from the `dimension_separator`
    /// metadata field.
    ///
    /// # Errors
    /// Returns a [`DatasetError`] if no metadata document exists under `path`
    /// or it cannot be parsed.
    pub fn open(storage: Arc<TStorage>, path: &str) -> Result<Self, DatasetError> {
        let prefix = path_to_prefix(path)?;

        let v2_key = prefix.join_key(Layout::zarr_v2_flat().metadata_document())?;
        if let Some(bytes) = storage.get(&v2_key)? {
            return Self::open_v2(storage, prefix, &v2_key, &bytes);
        }

        let n5_key = prefix.join_key(Layout::n5().metadata_document())?;
        if let Some(bytes) = storage.get(&n5_key)? {
            return Self::open_n5(storage, prefix, &n5_key, &bytes);
        }

        Err(DatasetError::MissingMetadata(prefix))
    }

    fn open_v2(
        storage: Arc<TStorage>,
        prefix: StorePrefix,
        key: &StoreKey,
        bytes: &[u8],
    ) -> Result<Self, DatasetError> {
        let metadata: ArrayMetadataV2 = serde_json::from_slice(bytes)
            .map_err(|err| InvalidMetadataError::new(key.as_str(), err.to_string()))?;
        if metadata.order != ArrayMetadataV2Order::C {
            return Err(InvalidMetadataError::new(
                key.as_str(),
                "F order arrays are not supported".to_string(),
            )
            .into());
        }
        if metadata.filters.as_ref().is_some_and(|f| !f.is_empty()) {
            return Err(InvalidMetadataError::new(
                key.as_str(),
                "filters are not supported".to_string(),
            )
            .into());
        }
        let data_type = metadata.data_type()?;
        let codec =
            compressor_to_codec(metadata.compressor.as_ref())?.with_element_size(data_type.size());
        let chunk_shape: ChunkShape = metadata
            .chunks
            .iter()
            .map(|&c| NonZeroU64::new(c))
            .collect::<Option<_>>()
            .ok_or_else(|| DatasetError::InvalidChunkShape(metadata.chunks.clone()))?;
        let grid = RegularChunkGrid::new(metadata.shape.clone(), chunk_shape)?;
        Ok(Self {
            storage,
            prefix,
            layout: Layout::ZarrV2 {
                separator: metadata.dimension_separator,
            },
            grid,
            data_type,
            codec,
            missing_chunk: MissingChunkBehavior::default(),
        })
    }

    fn open_n5(
        storage: Arc<TStorage>,
        prefix: StorePrefix,
        key: &StoreKey,
        bytes: &[u8],
    ) -> Result<Self, DatasetError> {
        let metadata: N5ArrayMetadata = serde_json::from_slice(bytes)
            .map_err(|err| InvalidMetadataError::new(key.as_str(), err.to_string()))?;
        let data_type = metadata.data_type()?;
        let codec = compression_to_codec(&metadata.compression)?
            .with_element_size(data_type.size());
        let chunk_shape: ChunkShape = metadata
            .chunks()
            .iter()
            .map(|&c| NonZeroU64::new(c))
            .collect::<Option<_>>()
            .ok_or_else(|| DatasetError::InvalidChunkShape(metadata.chunks()))?;
        let grid = RegularChunkGrid::new(metadata.shape(), chunk_shape)?;
        Ok(Self {
            storage,
            prefix,
            layout: Layout::N5,
            grid,
            data_type,
            codec,
            missing_chunk: MissingChunkBehavior::default(),
        })
    }

    /// Set the missing chunk behavior of this handle.
    #[must_use]
    pub const fn with_missing_chunk_behavior(mut self, behavior: MissingChunkBehavior) -> Self {
        self.missing_chunk = behavior;
        self
    }

    /// The store prefix of the dataset.
    #[must_use]
    pub const fn prefix(&self) -> &StorePrefix {
        &self.prefix
    }

    /// The layout of the dataset.
    #[must_use]
    pub const fn layout(&self) -> Layout {
        self.layout
    }

    /// The chunk grid of the dataset.
    #[must_use]
    pub const fn grid(&self) -> &RegularChunkGrid {
        &self.grid
    }

    /// The array shape of the dataset.
    #[must_use]
    pub fn shape(&self) -> &ArrayShape {
        self.grid.array_shape()
    }

    /// The element type of the dataset.
    #[must_use]
    pub const fn data_type(&self) -> DataType {
        self.data_type
    }

    /// The codec of the dataset.
    #[must_use]
    pub const fn codec(&self) -> &Codec {
        &self.codec
    }

    /// The store key of the chunk at `chunk_indices`.
    #[must_use]
    pub fn chunk_key(&self, chunk_indices: &[u64]) -> StoreKey {
        let encoded = self.layout.chunk_key_encoding().encode(chunk_indices);
        unsafe {
            StoreKey::new_unchecked(format!("{}{}", self.prefix.as_str(), encoded.as_str()))
        }
    }

    /// (Re)write the metadata document of the dataset.
    ///
    /// # Errors
    /// Returns a [`DatasetError`] if the codec has no representation in the
    /// layout or storage fails.
    pub fn write_metadata(&self) -> Result<(), DatasetError> {
        let key = self.prefix.join_key(self.layout.metadata_document())?;
        let json = match self.layout {
            Layout::ZarrV2 { separator } => {
                let metadata = ArrayMetadataV2::new(
                    self.grid.array_shape().clone(),
                    &self.grid.chunk_shape().to_vec(),
                    self.data_type,
                    codec_to_compressor(&self.codec)?,
                    separator,
                );
                serde_json::to_vec_pretty(&metadata)
                    .map_err(|err| InvalidMetadataError::new(key.as_str(), err.to_string()))?
            }
            Layout::N5 => {
                let metadata = N5ArrayMetadata::new(
                    self.grid.array_shape(),
                    &self.grid.chunk_shape().to_vec(),
                    self.data_type,
                    codec_to_compression(&self.codec)?,
                );
                serde_json::to_vec_pretty(&metadata)
                    .map_err(|err| InvalidMetadataError::new(key.as_str(), err.to_string()))?
            }
        };
        log::trace!("writing metadata {}", key.as_str());
        self.storage.set(&key, Bytes::from(json))?;
        Ok(())
    }

    fn codec_error(&self, chunk_indices: &[u64], source: CodecError) -> DatasetError {
        DatasetError::Codec {
            codec_id: self.codec.id().to_string(),
            chunk_indices: chunk_indices.to_vec(),
            source,
        }
    }

    fn chunk_extent_checked(&self, chunk_indices: &[u64]) -> Result<ArrayShape, DatasetError> {
        self.grid.chunk_extent(chunk_indices).ok_or_else(|| {
            DatasetError::InvalidChunkGridIndices {
                chunk_indices: chunk_indices.to_vec(),
                grid_shape: self.grid.grid_shape().clone(),
            }
        })
    }

    /// Encode and persist one chunk.
    ///
    /// `chunk_bytes` is the native-endian contiguous buffer of the chunk at
    /// its true extent (truncated for edge chunks). Writes to distinct
    /// coordinates are independent; rewriting a coordinate replaces its
    /// payload without touching any other chunk.
    ///
    /// # Errors
    /// Returns a [`DatasetError`] if the indices are out of bounds, the
    /// buffer length is inconsistent, the codec fails, or storage fails.
    pub fn put_chunk(&self, chunk_indices: &[u64], chunk_bytes: &[u8]) -> Result<(), DatasetError> {
        let extent = self.chunk_extent_checked(chunk_indices)?;
        let element_size = self.data_type.size();
        let num_elements: u64 = extent.iter().product();
        let expected = usize::try_from(num_elements).unwrap() * element_size;
        if chunk_bytes.len() != expected {
            return Err(DatasetError::InvalidChunkBufferLength {
                got: chunk_bytes.len(),
                expected,
            });
        }

        let mut bytes = if self.layout.pads_edge_chunks() {
            pad_chunk(
                chunk_bytes,
                &self.grid.chunk_shape_u64(),
                &extent,
                element_size,
                0,
            )
        } else {
            chunk_bytes.to_vec()
        };
        convert_endianness(&mut bytes, element_size, self.layout.endianness());

        let encoded = self
            .codec
            .encode(&bytes)
            .map_err(|err| self.codec_error(chunk_indices, err))?;

        let payload = match self.layout {
            Layout::ZarrV2 { .. } => encoded,
            Layout::N5 => {
                let header = N5ChunkHeader::new(&extent);
                let mut payload = header.to_bytes();
                payload.extend_from_slice(&encoded);
                payload
            }
        };

        let key = self.chunk_key(chunk_indices);
        log::trace!("writing chunk {}", key.as_str());
        self.storage.set(&key, Bytes::from(payload))?;
        Ok(())
    }

    /// Fetch and decode one chunk.
    ///
    /// Returns the native-endian contiguous buffer of the chunk at its true
    /// extent. A chunk with no stored payload fails with
    /// [`MissingChunkError`] unless the dataset is configured with
    /// [`MissingChunkBehavior::FillValue`].
    ///
    /// # Errors
    /// Returns a [`DatasetError`] if the indices are out of bounds, the chunk
    /// is missing, the payload is inconsistent, the codec fails, or storage
    /// fails.
    pub fn get_chunk(&self, chunk_indices: &[u64]) -> Result<Vec<u8>, DatasetError> {
        let extent = self.chunk_extent_checked(chunk_indices)?;
        let element_size = self.data_type.size();
        let num_elements: u64 = extent.iter().product();
        let expected = usize::try_from(num_elements).unwrap() * element_size;

        let key = self.chunk_key(chunk_indices);
        let Some(payload) = self.storage.get(&key)? else {
            return match self.missing_chunk {
                MissingChunkBehavior::Error => Err(MissingChunkError {
                    chunk_indices: chunk_indices.to_vec(),
                }
                .into()),
                MissingChunkBehavior::FillValue => Ok(vec![0; expected]),
            };
        };

        let encoded = match self.layout {
            Layout::ZarrV2 { .. } => payload.as_ref(),
            Layout::N5 => {
                let header = N5ChunkHeader::from_bytes(&payload)?;
                if header.extent() != extent {
                    return Err(InvalidN5ChunkHeaderError::new(format!(
                        "header extent {:?} does not match chunk extent {extent:?}",
                        header.extent()
                    ))
                    .into());
                }
                &payload[header.num_bytes()..]
            }
        };

        let mut bytes = self
            .codec
            .decode(encoded)
            .map_err(|err| self.codec_error(chunk_indices, err))?;
        convert_endianness(&mut bytes, element_size, self.layout.endianness());

        let bytes = if self.layout.pads_edge_chunks() {
            let chunk_shape = self.grid.chunk_shape_u64();
            let full: u64 = chunk_shape.iter().product();
            let full = usize::try_from(full).unwrap() * element_size;
            if bytes.len() != full {
                return Err(DatasetError::InvalidChunkBufferLength {
                    got: bytes.len(),
                    expected: full,
                });
            }
            crop_chunk(&bytes, &chunk_shape, &extent, element_size)
        } else {
            if bytes.len() != expected {
                return Err(DatasetError::InvalidChunkBufferLength {
                    got: bytes.len(),
                    expected,
                });
            }
            bytes
        };
        Ok(bytes)
    }

    /// Write every chunk of `array` through the codec pipeline.
    ///
    /// # Errors
    /// Returns a [`DatasetError`] if `array` does not match the dataset shape
    /// and data type, or any chunk write fails.
    pub fn write_array(&self, array: &Array) -> Result<(), DatasetError> {
        if array.shape() != self.grid.array_shape() || array.data_type() != self.data_type {
            return Err(DatasetError::IncompatibleArray {
                got: array.shape().clone(),
                expected: self.grid.array_shape().clone(),
            });
        }
        for chunk in self.grid.chunks() {
            let chunk_bytes = extract_chunk(
                array.bytes(),
                array.shape(),
                self.data_type.size(),
                &chunk.origin,
                &chunk.extent,
            );
            self.put_chunk(&chunk.indices, &chunk_bytes)?;
        }
        Ok(())
    }

    /// Read the whole dataset back into an [`Array`].
    ///
    /// # Errors
    /// Returns a [`DatasetError`] if any chunk read fails.
    pub fn read_array(&self) -> Result<Array, DatasetError> {
        let shape = self.grid.array_shape().clone();
        let mut bytes = Array::zeros(shape.clone(), self.data_type).into_bytes();
        for chunk in self.grid.chunks() {
            let chunk_bytes = self.get_chunk(&chunk.indices)?;
            inject_chunk(
                &chunk_bytes,
                &mut bytes,
                &shape,
                self.data_type.size(),
                &chunk.origin,
                &chunk.extent,
            );
        }
        Ok(Array::new(shape, self.data_type, bytes)
            .expect("chunk reads preserve the buffer length"))
    }

    /// Erase the dataset: its metadata and every chunk under its prefix.
    ///
    /// # Errors
    /// Returns a [`DatasetError`] if storage fails.
    pub fn erase(&self) -> Result<(), DatasetError> {
        self.storage.erase_prefix(&self.prefix)?;
        Ok(())
    }
}
