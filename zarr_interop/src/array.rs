//! The dense array data model.

use thiserror::Error;

use crate::ArrayShape;

/// A fixed-width scalar element type.
///
/// The closed set of element types representable in both the zarr-v2 and n5
/// metadata conventions.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
#[allow(missing_docs)]
pub enum DataType {
    Int8,
    Int16,
    Int32,
    Int64,
    UInt8,
    UInt16,
    UInt32,
    UInt64,
    Float32,
    Float64,
}

/// An unsupported data type name.
#[derive(Debug, Clone, Error)]
#[error("unsupported data type {0}")]
pub struct UnsupportedDataTypeError(String);

impl UnsupportedDataTypeError {
    /// Create a new unsupported data type error for `name`.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }
}

impl DataType {
    /// The size of one element in bytes.
    #[must_use]
    pub const fn size(&self) -> usize {
        match self {
            Self::Int8 | Self::UInt8 => 1,
            Self::Int16 | Self::UInt16 => 2,
            Self::Int32 | Self::UInt32 | Self::Float32 => 4,
            Self::Int64 | Self::UInt64 | Self::Float64 => 8,
        }
    }

    /// The little-endian zarr-v2 `dtype` string (e.g. `|u1`, `<u2`).
    ///
    /// One-byte types carry the `|` (not applicable) byte-order prefix.
    #[must_use]
    pub const fn v2_name(&self) -> &'static str {
        match self {
            Self::Int8 => "|i1",
            Self::Int16 => "<i2",
            Self::Int32 => "<i4",
            Self::Int64 => "<i8",
            Self::UInt8 => "|u1",
            Self::UInt16 => "<u2",
            Self::UInt32 => "<u4",
            Self::UInt64 => "<u8",
            Self::Float32 => "<f4",
            Self::Float64 => "<f8",
        }
    }

    /// Parse a zarr-v2 `dtype` string.
    ///
    /// Big-endian (`>`-prefixed) and structured data types are rejected: the
    /// fixture layouts are written little-endian.
    ///
    /// # Errors
    /// Returns [`UnsupportedDataTypeError`] if `dtype` is not in the supported set.
    pub fn from_v2_name(dtype: &str) -> Result<Self, UnsupportedDataTypeError> {
        match dtype {
            "|i1" => Ok(Self::Int8),
            "<i2" => Ok(Self::Int16),
            "<i4" => Ok(Self::Int32),
            "<i8" => Ok(Self::Int64),
            "|u1" => Ok(Self::UInt8),
            "<u2" => Ok(Self::UInt16),
            "<u4" => Ok(Self::UInt32),
            "<u8" => Ok(Self::UInt64),
            "<f4" => Ok(Self::Float32),
            "<f8" => Ok(Self::Float64),
            _ => Err(UnsupportedDataTypeError::new(dtype)),
        }
    }

    /// The n5 `dataType` string (e.g. `uint8`).
    #[must_use]
    pub const fn n5_name(&self) -> &'static str {
        match self {
            Self::Int8 => "int8",
            Self::Int16 => "int16",
            Self::Int32 => "int32",
            Self::Int64 => "int64",
            Self::UInt8 => "uint8",
            Self::UInt16 => "uint16",
            Self::UInt32 => "uint32",
            Self::UInt64 => "uint64",
            Self::Float32 => "float32",
            Self::Float64 => "float64",
        }
    }

    /// Parse an n5 `dataType` string.
    ///
    /// # Errors
    /// Returns [`UnsupportedDataTypeError`] if `data_type` is not in the supported set.
    pub fn from_n5_name(data_type: &str) -> Result<Self, UnsupportedDataTypeError> {
        match data_type {
            "int8" => Ok(Self::Int8),
            "int16" => Ok(Self::Int16),
            "int32" => Ok(Self::Int32),
            "int64" => Ok(Self::Int64),
            "uint8" => Ok(Self::UInt8),
            "uint16" => Ok(Self::UInt16),
            "uint32" => Ok(Self::UInt32),
            "uint64" => Ok(Self::UInt64),
            "float32" => Ok(Self::Float32),
            "float64" => Ok(Self::Float64),
            _ => Err(UnsupportedDataTypeError::new(data_type)),
        }
    }
}

/// An invalid array buffer length.
#[derive(Debug, Clone, Error)]
#[error("array buffer length {got} does not match shape {shape:?} of {data_type:?} (expected {expected})")]
pub struct InvalidBufferLengthError {
    shape: ArrayShape,
    data_type: DataType,
    got: usize,
    expected: usize,
}

/// A dense row-major array of fixed-width scalar elements.
///
/// The buffer is held in native byte order; the pipeline converts to the byte
/// order of the target layout when chunks are encoded.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Array {
    shape: ArrayShape,
    data_type: DataType,
    bytes: Vec<u8>,
}

impl Array {
    /// Create an array from its parts.
    ///
    /// # Errors
    /// Returns [`InvalidBufferLengthError`] unless
    /// `bytes.len() == product(shape) * data_type.size()`.
    pub fn new(
        shape: ArrayShape,
        data_type: DataType,
        bytes: Vec<u8>,
    ) -> Result<Self, InvalidBufferLengthError> {
        let num_elements: u64 = shape.iter().product();
        let expected = usize::try_from(num_elements).unwrap() * data_type.size();
        if bytes.len() == expected {
            Ok(Self {
                shape,
                data_type,
                bytes,
            })
        } else {
            Err(InvalidBufferLengthError {
                shape,
                data_type,
                got: bytes.len(),
                expected,
            })
        }
    }

    /// Create a zero-filled array.
    #[must_use]
    pub fn zeros(shape: ArrayShape, data_type: DataType) -> Self {
        let num_elements: u64 = shape.iter().product();
        let bytes = vec![0; usize::try_from(num_elements).unwrap() * data_type.size()];
        Self {
            shape,
            data_type,
            bytes,
        }
    }

    /// The array shape.
    #[must_use]
    pub fn shape(&self) -> &ArrayShape {
        &self.shape
    }

    /// The element type.
    #[must_use]
    pub const fn data_type(&self) -> DataType {
        self.data_type
    }

    /// The number of elements.
    #[must_use]
    pub fn num_elements(&self) -> u64 {
        self.shape.iter().product()
    }

    /// The native-endian row-major element buffer.
    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Consume the array, returning the element buffer.
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buffer_length_invariant() {
        assert!(Array::new(vec![2, 3], DataType::UInt8, vec![0; 6]).is_ok());
        assert!(Array::new(vec![2, 3], DataType::UInt16, vec![0; 12]).is_ok());
        assert!(Array::new(vec![2, 3], DataType::UInt16, vec![0; 6]).is_err());
        // zero-size dimension
        assert!(Array::new(vec![2, 0], DataType::UInt8, vec![]).is_ok());
    }

    #[test]
    fn dtype_names_round_trip() {
        for data_type in [
            DataType::Int8,
            DataType::Int16,
            DataType::Int32,
            DataType::Int64,
            DataType::UInt8,
            DataType::UInt16,
            DataType::UInt32,
            DataType::UInt64,
            DataType::Float32,
            DataType::Float64,
        ] {
            assert_eq!(
                DataType::from_v2_name(data_type.v2_name()).unwrap(),
                data_type
            );
            assert_eq!(
                DataType::from_n5_name(data_type.n5_name()).unwrap(),
                data_type
            );
        }
    }

    #[test]
    fn big_endian_v2_rejected() {
        assert!(DataType::from_v2_name(">u2").is_err());
    }
}
