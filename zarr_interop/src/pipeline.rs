//! Gather/scatter between dense arrays and contiguous chunk buffers.
//!
//! The write path extracts a chunk's (possibly strided) sub-block from the
//! full array buffer into a contiguous buffer; the read path scatters it
//! back. Extraction strides across the source array using the *array* shape,
//! not the nominal chunk shape, so edge chunks come out at their true
//! truncated extent.
//!
//! Copies move whole runs along the innermost dimension, which are contiguous
//! in both the row-major source and the row-major destination.

/// The byte order of encoded chunk payloads.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Endianness {
    /// Least significant byte first. The zarr-v2 fixture convention.
    Little,
    /// Most significant byte first. The n5 convention.
    Big,
}

impl Endianness {
    /// The native endianness of the target.
    #[must_use]
    pub const fn native() -> Self {
        if cfg!(target_endian = "big") {
            Self::Big
        } else {
            Self::Little
        }
    }
}

/// Convert `bytes` of `element_size`-wide elements between native byte order
/// and `endianness`, in place.
///
/// The conversion is an involution, so the same call converts in either
/// direction. A no-op for single-byte elements.
pub fn convert_endianness(bytes: &mut [u8], element_size: usize, endianness: Endianness) {
    debug_assert_eq!(bytes.len() % element_size.max(1), 0);
    if element_size > 1 && endianness != Endianness::native() {
        for element in bytes.chunks_exact_mut(element_size) {
            element.reverse();
        }
    }
}

/// Offsets (in elements) of each innermost-dimension run of the sub-block at
/// `origin`/`extent` within a row-major array of shape `array_shape`.
///
/// Produces one offset per run, in row-major order. The innermost run length
/// is `extent.last()`.
fn run_offsets<'a>(
    array_shape: &[u64],
    origin: &[u64],
    extent: &'a [u64],
) -> impl Iterator<Item = usize> + 'a {
    // element strides of the source array, innermost stride 1
    let mut strides = vec![1u64; array_shape.len()];
    for d in (1..array_shape.len()).rev() {
        strides[d - 1] = strides[d] * array_shape[d];
    }

    let num_runs: u64 = extent.iter().rev().skip(1).product();
    let outer = extent.len().saturating_sub(1);
    let mut counters = vec![0u64; outer];
    let base: u64 = std::iter::zip(origin, &strides).map(|(o, s)| o * s).sum();

    (0..num_runs).map(move |_| {
        let offset = base
            + std::iter::zip(&counters, &strides)
                .map(|(c, s)| c * s)
                .sum::<u64>();
        // advance the outer-dimension odometer, last of them fastest
        for d in (0..outer).rev() {
            counters[d] += 1;
            if counters[d] < extent[d] {
                break;
            }
            counters[d] = 0;
        }
        usize::try_from(offset).unwrap()
    })
}

/// Gather the sub-block at `origin`/`extent` from a row-major array buffer
/// into a contiguous buffer.
///
/// # Panics
/// Panics if the sub-block extends beyond `array_shape` or the buffer length
/// does not match `array_shape`; callers validate bounds against the chunk
/// grid.
#[must_use]
pub fn extract_chunk(
    array_bytes: &[u8],
    array_shape: &[u64],
    element_size: usize,
    origin: &[u64],
    extent: &[u64],
) -> Vec<u8> {
    assert_eq!(array_shape.len(), origin.len());
    assert_eq!(array_shape.len(), extent.len());
    let num_elements: u64 = extent.iter().product();
    let mut chunk_bytes = Vec::with_capacity(usize::try_from(num_elements).unwrap() * element_size);

    if num_elements == 0 {
        return chunk_bytes;
    }
    if array_shape.is_empty() {
        // zero-dimensional array: a single element
        chunk_bytes.extend_from_slice(&array_bytes[..element_size]);
        return chunk_bytes;
    }

    let run_len = usize::try_from(*extent.last().unwrap()).unwrap() * element_size;
    for offset in run_offsets(array_shape, origin, extent) {
        let start = offset * element_size;
        chunk_bytes.extend_from_slice(&array_bytes[start..start + run_len]);
    }
    chunk_bytes
}

/// Scatter a contiguous chunk buffer back into the sub-block at
/// `origin`/`extent` of a row-major array buffer.
///
/// The inverse of [`extract_chunk`].
///
/// # Panics
/// Panics if the sub-block extends beyond `array_shape` or the buffer lengths
/// are inconsistent; callers validate bounds against the chunk grid.
pub fn inject_chunk(
    chunk_bytes: &[u8],
    array_bytes: &mut [u8],
    array_shape: &[u64],
    element_size: usize,
    origin: &[u64],
    extent: &[u64],
) {
    assert_eq!(array_shape.len(), origin.len());
    assert_eq!(array_shape.len(), extent.len());
    let num_elements: u64 = extent.iter().product();
    assert_eq!(
        chunk_bytes.len(),
        usize::try_from(num_elements).unwrap() * element_size
    );

    if num_elements == 0 {
        return;
    }
    if array_shape.is_empty() {
        array_bytes[..element_size].copy_from_slice(chunk_bytes);
        return;
    }

    let run_len = usize::try_from(*extent.last().unwrap()).unwrap() * element_size;
    for (run, offset) in run_offsets(array_shape, origin, extent).enumerate() {
        let start = offset * element_size;
        array_bytes[start..start + run_len]
            .copy_from_slice(&chunk_bytes[run * run_len..(run + 1) * run_len]);
    }
}

/// Pad a contiguous `extent`-shaped chunk buffer to the full nominal
/// `chunk_shape`, filling the overhang with `fill_byte`.
///
/// Used by layouts which store edge chunks at full size (zarr-v2). A no-op
/// copy when `extent == chunk_shape`.
#[must_use]
pub fn pad_chunk(
    chunk_bytes: &[u8],
    chunk_shape: &[u64],
    extent: &[u64],
    element_size: usize,
    fill_byte: u8,
) -> Vec<u8> {
    let num_elements: u64 = chunk_shape.iter().product();
    let mut padded = vec![fill_byte; usize::try_from(num_elements).unwrap() * element_size];
    let origin = vec![0; chunk_shape.len()];
    inject_chunk(
        chunk_bytes,
        &mut padded,
        chunk_shape,
        element_size,
        &origin,
        extent,
    );
    padded
}

/// Crop a full-size `chunk_shape` buffer down to its true `extent`.
///
/// The inverse of [`pad_chunk`].
#[must_use]
pub fn crop_chunk(
    padded_bytes: &[u8],
    chunk_shape: &[u64],
    extent: &[u64],
    element_size: usize,
) -> Vec<u8> {
    let origin = vec![0; chunk_shape.len()];
    extract_chunk(padded_bytes, chunk_shape, element_size, &origin, extent)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_interior_chunk() {
        // 4x5 array, elements numbered 0..20
        let array: Vec<u8> = (0..20).collect();
        let chunk = extract_chunk(&array, &[4, 5], 1, &[1, 2], &[2, 2]);
        assert_eq!(chunk, vec![7, 8, 12, 13]);
    }

    #[test]
    fn extract_edge_chunk() {
        let array: Vec<u8> = (0..20).collect();
        // chunk grid 2x2 of shape [2, 3]: the corner chunk is truncated to [2, 2]
        let chunk = extract_chunk(&array, &[4, 5], 1, &[2, 3], &[2, 2]);
        assert_eq!(chunk, vec![13, 14, 18, 19]);
    }

    #[test]
    fn extract_multi_byte_elements() {
        let array: Vec<u8> = (0..12).collect(); // 2x3 of u16
        let chunk = extract_chunk(&array, &[2, 3], 2, &[0, 1], &[2, 2]);
        assert_eq!(chunk, vec![2, 3, 4, 5, 8, 9, 10, 11]);
    }

    #[test]
    fn inject_is_inverse_of_extract() {
        let array: Vec<u8> = (0..24).collect();
        let shape = [2, 3, 4];
        let chunk = extract_chunk(&array, &shape, 1, &[1, 1, 2], &[1, 2, 2]);
        let mut restored = vec![0u8; 24];
        inject_chunk(&chunk, &mut restored, &shape, 1, &[1, 1, 2], &[1, 2, 2]);
        // only the sub-block is written
        for (i, &value) in restored.iter().enumerate() {
            if value != 0 {
                assert_eq!(value, array[i]);
            }
        }
        assert_eq!(chunk.len(), 4);
    }

    #[test]
    fn zero_extent() {
        let array: Vec<u8> = (0..4).collect();
        assert!(extract_chunk(&array, &[2, 2], 1, &[0, 0], &[0, 2]).is_empty());
    }

    #[test]
    fn zero_dimensional() {
        let array = vec![42u8, 43];
        let chunk = extract_chunk(&array, &[], 2, &[], &[]);
        assert_eq!(chunk, vec![42, 43]);
    }

    #[test]
    fn pad_and_crop() {
        // [2, 1] edge chunk padded into a [2, 2] nominal chunk
        let chunk = vec![1u8, 2];
        let padded = pad_chunk(&chunk, &[2, 2], &[2, 1], 1, 0);
        assert_eq!(padded, vec![1, 0, 2, 0]);
        assert_eq!(crop_chunk(&padded, &[2, 2], &[2, 1], 1), chunk);
    }

    #[test]
    fn endianness_round_trip() {
        let mut bytes = vec![1u8, 2, 3, 4];
        convert_endianness(&mut bytes, 2, Endianness::Big);
        if cfg!(target_endian = "little") {
            assert_eq!(bytes, vec![2, 1, 4, 3]);
        }
        convert_endianness(&mut bytes, 2, Endianness::Big);
        assert_eq!(bytes, vec![1, 2, 3, 4]);
        // single-byte elements are untouched
        convert_endianness(&mut bytes, 1, Endianness::Big);
        assert_eq!(bytes, vec![1, 2, 3, 4]);
    }
}
