//! The deterministic reference array.
//!
//! Fixture generation and verification must agree on the source data without
//! shipping it, so the reference is a pure function: an image-like 512x512
//! RGB gradient with distinct values along every axis. Decoding a real image
//! into an [`Array`] is a concern of external collaborators.

use zarr_interop::array::{Array, DataType};

/// The shape of the reference array: height, width, channels.
pub const REFERENCE_SHAPE: [u64; 3] = [512, 512, 3];

/// The chunk shape used for every generated dataset.
///
/// Chosen so that the chunk grid has overhanging edge chunks along the first
/// two dimensions.
pub const REFERENCE_CHUNK_SHAPE: [u64; 3] = [100, 100, 1];

/// Generate the reference array.
///
/// The value at `(y, x, c)` is `(x + 3*y + 101*c) mod 256`, so neighbouring
/// elements differ along every axis and each channel is distinct.
#[must_use]
pub fn reference_array() -> Array {
    let [height, width, channels] = REFERENCE_SHAPE;
    let mut bytes = Vec::with_capacity(usize::try_from(height * width * channels).unwrap());
    for y in 0..height {
        for x in 0..width {
            for c in 0..channels {
                bytes.push(((x + 3 * y + 101 * c) % 256) as u8);
            }
        }
    }
    Array::new(REFERENCE_SHAPE.to_vec(), DataType::UInt8, bytes)
        .expect("the reference buffer matches its shape")
}
