//! Fixture generation: one dataset per codec over a source array.
//!
//! A fixture tree is a store namespace holding one dataset per configured
//! codec, all written from the same source array, so any reader of the layout
//! can be checked for byte-level agreement codec by codec.

use std::sync::Arc;

use rayon::iter::{IntoParallelIterator, ParallelIterator};
use thiserror::Error;
use zarr_interop_codec::{Codec, UnsupportedCodecError};
use zarr_interop_storage::{Bytes, ReadableWritableStorageTraits, StorePrefix};

use crate::array::Array;
use crate::dataset::{Dataset, DatasetBuilder, DatasetError, Layout, MissingChunkBehavior};
use crate::metadata::n5::N5VersionMetadata;
use crate::metadata::v2::GroupMetadataV2;
use crate::pipeline::extract_chunk;
use crate::ArrayShape;

/// The configuration of one fixture tree.
#[derive(Debug, Clone)]
pub struct FixtureConfig {
    /// The layout of every dataset in the tree.
    pub layout: Layout,
    /// The chunk shape of every dataset in the tree.
    pub chunk_shape: ArrayShape,
    /// The codec identifiers to generate, one dataset each.
    pub codecs: Vec<String>,
    /// Erase existing datasets rather than failing.
    pub overwrite: bool,
    /// Encode and write chunks in parallel.
    ///
    /// Chunks are independent once the grid is enumerated: each maps to a
    /// distinct store key, and the metadata document is written when the
    /// dataset is created, before any chunk.
    pub parallel: bool,
}

impl FixtureConfig {
    /// Create a fixture configuration for `layout` with the default codec
    /// list of the layout and sequential writes.
    ///
    /// The default codec lists mirror the reference fixture matrix: zarr-v2
    /// trees carry `raw`/`gzip`/`zlib`/`blosc`, n5 trees carry
    /// `raw`/`gzip`/`bzip2`/`lz4`. Identifiers of codecs disabled at build
    /// time are kept in the list and fail loudly at generation time.
    #[must_use]
    pub fn new(layout: Layout, chunk_shape: ArrayShape) -> Self {
        let codecs = match layout {
            Layout::ZarrV2 { .. } => ["raw", "gzip", "zlib", "blosc"],
            Layout::N5 => ["raw", "gzip", "bzip2", "lz4"],
        };
        Self {
            layout,
            chunk_shape,
            codecs: codecs.iter().map(ToString::to_string).collect(),
            overwrite: false,
            parallel: false,
        }
    }
}

/// A fixture generation error.
#[derive(Debug, Error)]
pub enum FixtureError {
    /// A codec identifier is not in the supported set. Nothing is written.
    #[error(transparent)]
    UnsupportedCodec(#[from] UnsupportedCodecError),
    /// A dataset failed to generate; its partial contents were erased.
    #[error("dataset {path}: {source}")]
    Dataset {
        /// The dataset path within the tree.
        path: String,
        /// The underlying error.
        source: DatasetError,
    },
    /// A storage error writing the tree root documents.
    #[error(transparent)]
    StorageError(#[from] zarr_interop_storage::StorageError),
}

/// The dataset path for a codec within a fixture tree.
///
/// Datasets are named after their codec; blosc datasets are nested one level
/// deeper under the internal compressor name (`blosc/lz4`), following the
/// reference fixture naming.
#[must_use]
pub fn dataset_path(codec: &Codec) -> String {
    match codec {
        #[cfg(feature = "blosc")]
        Codec::Blosc(codec) => format!("blosc/{}", codec.cname().as_str()),
        codec => codec.id().to_string(),
    }
}

/// Write a fixture tree: one dataset per configured codec, every chunk of
/// `array` through each.
///
/// The root document of the layout (`.zgroup` or the n5 version attributes)
/// is written first, then each dataset in the configured order. A failed
/// dataset is erased before the error propagates, so no partial dataset is
/// left looking complete. All codec identifiers are resolved up front;
/// an unknown identifier fails before anything is written.
///
/// # Errors
/// Returns a [`FixtureError`] on the first failing dataset.
pub fn write_fixture<TStorage: ?Sized + ReadableWritableStorageTraits>(
    storage: &Arc<TStorage>,
    array: &Array,
    config: &FixtureConfig,
) -> Result<(), FixtureError> {
    let codecs = config
        .codecs
        .iter()
        .map(|id| Codec::from_id(id))
        .collect::<Result<Vec<_>, _>>()?;

    write_root_document(storage, config.layout)?;

    for codec in codecs {
        let path = dataset_path(&codec);
        log::debug!("writing dataset {path}");
        write_dataset(storage, array, config, codec, &path).map_err(|source| {
            FixtureError::Dataset {
                path: path.clone(),
                source,
            }
        })?;
    }
    Ok(())
}

fn write_root_document<TStorage: ?Sized + ReadableWritableStorageTraits>(
    storage: &Arc<TStorage>,
    layout: Layout,
) -> Result<(), FixtureError> {
    let (name, json) = match layout {
        Layout::ZarrV2 { .. } => (
            ".zgroup",
            serde_json::to_vec_pretty(&GroupMetadataV2::default()),
        ),
        Layout::N5 => (
            "attributes.json",
            serde_json::to_vec_pretty(&N5VersionMetadata::default()),
        ),
    };
    let json = json.expect("root documents are valid JSON");
    let key = StorePrefix::root()
        .join_key(name)
        .expect("root document names are valid keys");
    storage.set(&key, Bytes::from(json))?;
    Ok(())
}

fn write_dataset<TStorage: ?Sized + ReadableWritableStorageTraits>(
    storage: &Arc<TStorage>,
    array: &Array,
    config: &FixtureConfig,
    codec: Codec,
    path: &str,
) -> Result<(), DatasetError> {
    let dataset = DatasetBuilder::new(
        array.shape().clone(),
        config.chunk_shape.clone(),
        array.data_type(),
        codec,
    )
    .layout(config.layout)
    .overwrite(config.overwrite)
    .missing_chunk_behavior(MissingChunkBehavior::Error)
    .build(storage.clone(), path)?;

    let result = if config.parallel {
        write_chunks_parallel(&dataset, array)
    } else {
        dataset.write_array(array)
    };
    if let Err(err) = result {
        // do not leave a partially written dataset behind its metadata
        dataset.erase()?;
        return Err(err);
    }
    Ok(())
}

fn write_chunks_parallel<TStorage: ?Sized + ReadableWritableStorageTraits>(
    dataset: &Dataset<TStorage>,
    array: &Array,
) -> Result<(), DatasetError> {
    let chunks: Vec<_> = dataset.grid().chunks().collect();
    chunks.into_par_iter().try_for_each(|chunk| {
        let chunk_bytes = extract_chunk(
            array.bytes(),
            array.shape(),
            array.data_type().size(),
            &chunk.origin,
            &chunk.extent,
        );
        dataset.put_chunk(&chunk.indices, &chunk_bytes)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::array::DataType;
    use zarr_interop_storage::{
        ListableStorageTraits, MemoryStore, ReadableStorageTraits, StoreKey,
    };

    fn test_array() -> Array {
        let bytes: Vec<u8> = (0..5 * 6).map(|i| (i * 3 % 256) as u8).collect();
        Array::new(vec![5, 6], DataType::UInt8, bytes).unwrap()
    }

    #[test]
    fn unknown_codec_writes_nothing() {
        let storage = Arc::new(MemoryStore::new());
        let mut config = FixtureConfig::new(Layout::zarr_v2_flat(), vec![2, 2]);
        config.codecs = vec!["raw".to_string(), "xz".to_string()];
        let err = write_fixture(&storage, &test_array(), &config).unwrap_err();
        assert!(matches!(err, FixtureError::UnsupportedCodec(_)));
        assert!(storage.list().unwrap().is_empty());
    }

    #[test]
    fn fixture_tree_layout() {
        let storage = Arc::new(MemoryStore::new());
        let config = FixtureConfig::new(Layout::zarr_v2_flat(), vec![2, 2]);
        write_fixture(&storage, &test_array(), &config).unwrap();
        let keys = storage.list().unwrap();
        assert!(keys.contains(&StoreKey::new(".zgroup").unwrap()));
        assert!(keys.contains(&StoreKey::new("raw/.zarray").unwrap()));
        assert!(keys.contains(&StoreKey::new("raw/0.0").unwrap()));
        assert!(keys.contains(&StoreKey::new("blosc/lz4/.zarray").unwrap()));
        // 5x6 array in 2x2 chunks: 3x3 grid
        let raw_chunks = keys
            .iter()
            .filter(|k| k.as_str().starts_with("raw/") && !k.as_str().ends_with(".zarray"))
            .count();
        assert_eq!(raw_chunks, 9);
    }

    #[test]
    fn parallel_matches_sequential() {
        let array = test_array();
        let sequential = Arc::new(MemoryStore::new());
        let parallel = Arc::new(MemoryStore::new());
        let mut config = FixtureConfig::new(Layout::n5(), vec![2, 2]);
        write_fixture(&sequential, &array, &config).unwrap();
        config.parallel = true;
        write_fixture(&parallel, &array, &config).unwrap();

        let keys = sequential.list().unwrap();
        assert_eq!(keys, parallel.list().unwrap());
        for key in keys {
            assert_eq!(
                sequential.get(&key).unwrap(),
                parallel.get(&key).unwrap(),
                "payload mismatch at {key}"
            );
        }
    }
}
