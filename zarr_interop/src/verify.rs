//! Fixture verification: read a dataset back and check it against the
//! expected array.

use std::sync::Arc;

use thiserror::Error;
use zarr_interop_storage::ReadableWritableStorageTraits;

use crate::array::{Array, DataType};
use crate::dataset::{Dataset, DatasetError};
use crate::ArrayShape;

/// A verification failure.
#[derive(Debug, Error)]
pub enum VerifyError {
    /// The dataset could not be read.
    #[error(transparent)]
    Dataset(#[from] DatasetError),
    /// The dataset shape differs from the expected shape.
    #[error("shape mismatch: expected {expected:?}, found {actual:?}")]
    ShapeMismatch {
        /// The expected shape.
        expected: ArrayShape,
        /// The shape read back.
        actual: ArrayShape,
    },
    /// The dataset data type differs from the expected data type.
    #[error("data type mismatch: expected {expected:?}, found {actual:?}")]
    DataTypeMismatch {
        /// The expected data type.
        expected: DataType,
        /// The data type read back.
        actual: DataType,
    },
    /// The decoded values differ from the expected values.
    #[error(
        "value mismatch: {mismatches} of {num_elements} elements differ, first at element {first_index:?}"
    )]
    ValueMismatch {
        /// The number of differing elements.
        mismatches: u64,
        /// The total number of elements.
        num_elements: u64,
        /// The ND index of the first differing element.
        first_index: ArrayShape,
    },
}

/// Open the dataset at `path` and verify it against `expected`.
///
/// The dataset is read back in full through the codec pipeline; shapes, data
/// types, and every element must agree bit for bit.
///
/// # Errors
/// Returns a [`VerifyError`] describing the first failure.
pub fn verify_dataset<TStorage: ?Sized + ReadableWritableStorageTraits>(
    storage: Arc<TStorage>,
    path: &str,
    expected: &Array,
) -> Result<(), VerifyError> {
    let dataset = Dataset::open(storage, path)?;
    verify_against(&dataset, expected)
}

/// Verify an open dataset against `expected`.
///
/// # Errors
/// Returns a [`VerifyError`] describing the first failure.
pub fn verify_against<TStorage: ?Sized + ReadableWritableStorageTraits>(
    dataset: &Dataset<TStorage>,
    expected: &Array,
) -> Result<(), VerifyError> {
    if dataset.shape() != expected.shape() {
        return Err(VerifyError::ShapeMismatch {
            expected: expected.shape().clone(),
            actual: dataset.shape().clone(),
        });
    }
    if dataset.data_type() != expected.data_type() {
        return Err(VerifyError::DataTypeMismatch {
            expected: expected.data_type(),
            actual: dataset.data_type(),
        });
    }

    let actual = dataset.read_array()?;
    let element_size = expected.data_type().size();
    let mut mismatches = 0u64;
    let mut first_offset = None;
    for (offset, (a, b)) in std::iter::zip(
        actual.bytes().chunks_exact(element_size),
        expected.bytes().chunks_exact(element_size),
    )
    .enumerate()
    {
        if a != b {
            mismatches += 1;
            if first_offset.is_none() {
                first_offset = Some(offset);
            }
        }
    }

    if let Some(first_offset) = first_offset {
        Err(VerifyError::ValueMismatch {
            mismatches,
            num_elements: expected.num_elements(),
            first_index: unravel_index(u64::try_from(first_offset).unwrap(), expected.shape()),
        })
    } else {
        Ok(())
    }
}

/// Convert a linearised element index to ND indices in a row-major array.
fn unravel_index(mut index: u64, shape: &[u64]) -> ArrayShape {
    let mut indices = vec![0; shape.len()];
    for (d, &size) in shape.iter().enumerate().rev() {
        if size > 0 {
            indices[d] = index % size;
            index /= size;
        }
    }
    indices
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::DatasetBuilder;
    use crate::dataset::Layout;
    use zarr_interop_codec::Codec;
    use zarr_interop_storage::MemoryStore;

    fn build_dataset(
        storage: &Arc<MemoryStore>,
        array: &Array,
        path: &str,
    ) -> Dataset<MemoryStore> {
        let dataset = DatasetBuilder::new(
            array.shape().clone(),
            vec![2, 2],
            array.data_type(),
            Codec::from_id("raw").unwrap(),
        )
        .layout(Layout::zarr_v2_flat())
        .build(storage.clone(), path)
        .unwrap();
        dataset.write_array(array).unwrap();
        dataset
    }

    #[test]
    fn matching_dataset_verifies() {
        let storage = Arc::new(MemoryStore::new());
        let array = Array::new(vec![3, 3], DataType::UInt8, (0..9).collect()).unwrap();
        build_dataset(&storage, &array, "raw");
        verify_dataset(storage, "raw", &array).unwrap();
    }

    #[test]
    fn shape_mismatch() {
        let storage = Arc::new(MemoryStore::new());
        let array = Array::new(vec![3, 3], DataType::UInt8, (0..9).collect()).unwrap();
        build_dataset(&storage, &array, "raw");
        let expected = Array::zeros(vec![3, 4], DataType::UInt8);
        assert!(matches!(
            verify_dataset(storage, "raw", &expected),
            Err(VerifyError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn value_mismatch_reports_first_index() {
        let storage = Arc::new(MemoryStore::new());
        let array = Array::new(vec![3, 3], DataType::UInt8, (0..9).collect()).unwrap();
        build_dataset(&storage, &array, "raw");

        let mut bytes = array.bytes().to_vec();
        bytes[4] ^= 0xff;
        bytes[7] ^= 0xff;
        let expected = Array::new(vec![3, 3], DataType::UInt8, bytes).unwrap();
        match verify_dataset(storage, "raw", &expected) {
            Err(VerifyError::ValueMismatch {
                mismatches,
                num_elements,
                first_index,
            }) => {
                assert_eq!(mismatches, 2);
                assert_eq!(num_elements, 9);
                assert_eq!(first_index, vec![1, 1]);
            }
            other => panic!("expected a value mismatch, got {other:?}"),
        }
    }

    #[test]
    fn unravel() {
        assert_eq!(unravel_index(0, &[3, 4]), vec![0, 0]);
        assert_eq!(unravel_index(5, &[3, 4]), vec![1, 1]);
        assert_eq!(unravel_index(11, &[3, 4]), vec![2, 3]);
    }
}
