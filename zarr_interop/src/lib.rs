//! Interoperability fixture generation for chunked, compressed N-dimensional
//! array storage formats (zarr-v2 and n5 style layouts).
//!
//! Independent implementations of these formats are checked for byte-level
//! agreement by writing a known array through every supported compression
//! codec and reading the resulting directory trees back. This crate provides
//! the encoding engine:
//!
//! - [`chunk_grid::RegularChunkGrid`] partitions a dense [`array::Array`]
//!   into fixed-size chunks, with truncated extents at the array boundary.
//! - [`zarr_interop_codec::Codec`] compresses chunk payloads.
//! - [`dataset::Dataset`] persists chunk payloads and metadata documents
//!   under a deterministic key scheme in any
//!   [`zarr_interop_storage`] store.
//! - [`fixture`] writes one dataset per codec; [`verify`] reads fixture
//!   trees back and checks them against the expected array.
//!
//! ## Example
//! ```
//! # use std::sync::Arc;
//! use zarr_interop::array::{Array, DataType};
//! use zarr_interop::dataset::{DatasetBuilder, Layout};
//! use zarr_interop_codec::Codec;
//! use zarr_interop_storage::MemoryStore;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let store = Arc::new(MemoryStore::new());
//! let array = Array::zeros(vec![5, 5], DataType::UInt8);
//!
//! let dataset = DatasetBuilder::new(vec![5, 5], vec![2, 2], DataType::UInt8, Codec::from_id("gzip")?)
//!     .layout(Layout::zarr_v2_flat())
//!     .build(store, "example")?;
//! dataset.write_array(&array)?;
//! assert_eq!(dataset.read_array()?, array);
//! # Ok(())
//! # }
//! ```

pub mod array;
pub mod chunk_grid;
pub mod chunk_key_encoding;
pub mod dataset;
pub mod fixture;
pub mod metadata;
pub mod pipeline;
pub mod verify;

pub use zarr_interop_codec as codec;
pub use zarr_interop_storage as storage;

/// The shape of an array; the length of each dimension.
pub type ArrayShape = Vec<u64>;

/// The shape of a chunk; the length of each dimension, all positive.
pub type ChunkShape = Vec<std::num::NonZeroU64>;

/// An ND index to an element in an array or a chunk in a chunk grid.
pub type ArrayIndices = Vec<u64>;
