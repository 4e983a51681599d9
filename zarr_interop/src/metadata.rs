//! Metadata documents for the supported layouts.
//!
//! Each layout persists the shape, chunk shape, data type, and codec of a
//! dataset in a small JSON document next to the chunk payloads:
//! `.zarray` for zarr-v2, `attributes.json` for n5.

pub mod n5;
pub mod v2;

use thiserror::Error;

/// Invalid or unparseable metadata.
#[derive(Debug, Clone, Error)]
#[error("invalid metadata in {key}: {error}")]
pub struct InvalidMetadataError {
    key: String,
    error: String,
}

impl InvalidMetadataError {
    /// Create a new invalid metadata error for the document at `key`.
    #[must_use]
    pub fn new(key: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            error: error.into(),
        }
    }
}
