//! The regular chunk grid.

use std::num::NonZeroU64;

use thiserror::Error;

use crate::{ArrayIndices, ArrayShape, ChunkShape};

/// An incompatible dimensionality error.
#[derive(Copy, Clone, Debug, Error)]
#[error("incompatible dimensionality {0}, expected {1}")]
pub struct IncompatibleDimensionalityError(usize, usize);

impl IncompatibleDimensionalityError {
    /// Create a new incompatible dimensionality error.
    #[must_use]
    pub const fn new(got: usize, expected: usize) -> Self {
        Self(got, expected)
    }
}

/// A regular chunk grid: fixed chunk shape, truncated at the array boundary.
///
/// The grid shape along dimension `d` is
/// `ceil(array_shape[d] / chunk_shape[d])`; an array with any zero-size
/// dimension has an empty grid.
#[derive(Debug, Clone)]
pub struct RegularChunkGrid {
    array_shape: ArrayShape,
    grid_shape: ArrayShape,
    chunk_shape: ChunkShape,
}

/// One cell of a chunk grid: its grid indices, element origin, and true
/// (possibly truncated) extent.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct GridChunk {
    /// The chunk indices in chunk-grid units.
    pub indices: ArrayIndices,
    /// The element indices of the first element of the chunk.
    pub origin: ArrayIndices,
    /// The per-dimension length of the chunk, truncated at the array boundary.
    pub extent: ArrayShape,
}

impl RegularChunkGrid {
    /// Create a new regular chunk grid.
    ///
    /// # Errors
    /// Returns an [`IncompatibleDimensionalityError`] if the dimensionality of
    /// `chunk_shape` does not match the dimensionality of `array_shape`.
    pub fn new(
        array_shape: ArrayShape,
        chunk_shape: ChunkShape,
    ) -> Result<Self, IncompatibleDimensionalityError> {
        if array_shape.len() != chunk_shape.len() {
            return Err(IncompatibleDimensionalityError::new(
                chunk_shape.len(),
                array_shape.len(),
            ));
        }

        let grid_shape = std::iter::zip(&array_shape, &chunk_shape)
            .map(|(a, s)| a.div_ceil(s.get()))
            .collect();
        Ok(Self {
            array_shape,
            grid_shape,
            chunk_shape,
        })
    }

    /// The dimensionality of the grid.
    #[must_use]
    pub fn dimensionality(&self) -> usize {
        self.chunk_shape.len()
    }

    /// The array shape.
    #[must_use]
    pub fn array_shape(&self) -> &ArrayShape {
        &self.array_shape
    }

    /// The grid shape (the number of chunks along each dimension).
    #[must_use]
    pub fn grid_shape(&self) -> &ArrayShape {
        &self.grid_shape
    }

    /// The chunk shape.
    #[must_use]
    pub fn chunk_shape(&self) -> &[NonZeroU64] {
        self.chunk_shape.as_slice()
    }

    /// The chunk shape as an [`ArrayShape`].
    #[must_use]
    pub fn chunk_shape_u64(&self) -> ArrayShape {
        self.chunk_shape.iter().map(|s| s.get()).collect()
    }

    /// The total number of chunks in the grid.
    #[must_use]
    pub fn num_chunks(&self) -> u64 {
        self.grid_shape.iter().product()
    }

    /// Returns true if `chunk_indices` lie within the grid.
    #[must_use]
    pub fn chunk_indices_in_bounds(&self, chunk_indices: &[u64]) -> bool {
        chunk_indices.len() == self.dimensionality()
            && std::iter::zip(chunk_indices, &self.grid_shape).all(|(i, g)| i < g)
    }

    /// The element indices of the first element of the chunk at `chunk_indices`.
    ///
    /// Returns [`None`] if `chunk_indices` are out of bounds.
    #[must_use]
    pub fn chunk_origin(&self, chunk_indices: &[u64]) -> Option<ArrayIndices> {
        self.chunk_indices_in_bounds(chunk_indices).then(|| {
            std::iter::zip(chunk_indices, &self.chunk_shape)
                .map(|(i, s)| i * s.get())
                .collect()
        })
    }

    /// The true extent of the chunk at `chunk_indices`.
    ///
    /// Edge chunks are truncated at the array boundary, never rounded up.
    /// Returns [`None`] if `chunk_indices` are out of bounds.
    #[must_use]
    pub fn chunk_extent(&self, chunk_indices: &[u64]) -> Option<ArrayShape> {
        self.chunk_indices_in_bounds(chunk_indices).then(|| {
            itertools::izip!(chunk_indices, &self.chunk_shape, &self.array_shape)
                .map(|(i, s, a)| std::cmp::min(s.get(), a - i * s.get()))
                .collect()
        })
    }

    /// Iterate over every chunk of the grid in row-major order (the last
    /// dimension varies fastest).
    ///
    /// Produces exactly [`num_chunks`](Self::num_chunks) entries with unique
    /// indices. The ordering is fixed: stores encode chunk indices into path
    /// components in this traversal order.
    #[must_use]
    pub fn chunks(&self) -> ChunksIterator<'_> {
        ChunksIterator::new(self)
    }
}

/// An iterator over the chunks of a [`RegularChunkGrid`] in row-major order.
pub struct ChunksIterator<'a> {
    grid: &'a RegularChunkGrid,
    next_indices: Option<ArrayIndices>,
}

impl<'a> ChunksIterator<'a> {
    fn new(grid: &'a RegularChunkGrid) -> Self {
        let next_indices = grid
            .grid_shape
            .iter()
            .all(|&g| g > 0)
            .then(|| vec![0; grid.dimensionality()]);
        Self { grid, next_indices }
    }
}

impl Iterator for ChunksIterator<'_> {
    type Item = GridChunk;

    fn next(&mut self) -> Option<Self::Item> {
        let indices = self.next_indices.take()?;
        let origin = self
            .grid
            .chunk_origin(&indices)
            .expect("iterator indices are in bounds");
        let extent = self
            .grid
            .chunk_extent(&indices)
            .expect("iterator indices are in bounds");

        // advance the last dimension fastest
        let mut next = indices.clone();
        for d in (0..next.len()).rev() {
            next[d] += 1;
            if next[d] < self.grid.grid_shape[d] {
                self.next_indices = Some(next);
                break;
            }
            next[d] = 0;
        }

        Some(GridChunk {
            indices,
            origin,
            extent,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk_shape(shape: &[u64]) -> ChunkShape {
        shape
            .iter()
            .map(|&s| NonZeroU64::new(s).unwrap())
            .collect()
    }

    #[test]
    fn dimensionality_mismatch() {
        assert!(RegularChunkGrid::new(vec![10, 10], chunk_shape(&[5])).is_err());
    }

    #[test]
    fn grid_shape_rounds_up() {
        let grid = RegularChunkGrid::new(vec![5, 4], chunk_shape(&[2, 2])).unwrap();
        assert_eq!(grid.grid_shape(), &vec![3, 2]);
        assert_eq!(grid.num_chunks(), 6);
    }

    #[test]
    fn edge_chunk_extents() {
        let grid = RegularChunkGrid::new(vec![5], chunk_shape(&[2])).unwrap();
        let extents: Vec<_> = grid.chunks().map(|chunk| chunk.extent).collect();
        assert_eq!(extents, vec![vec![2], vec![2], vec![1]]);
    }

    #[test]
    fn row_major_order() {
        let grid = RegularChunkGrid::new(vec![4, 6], chunk_shape(&[2, 2])).unwrap();
        let indices: Vec<_> = grid.chunks().map(|chunk| chunk.indices).collect();
        assert_eq!(
            indices,
            vec![
                vec![0, 0],
                vec![0, 1],
                vec![0, 2],
                vec![1, 0],
                vec![1, 1],
                vec![1, 2]
            ]
        );
    }

    #[test]
    fn coverage_no_overlap_no_gap() {
        let grid = RegularChunkGrid::new(vec![5, 3, 7], chunk_shape(&[2, 3, 4])).unwrap();
        assert_eq!(grid.num_chunks(), 3 * 1 * 2);
        let mut covered = 0;
        let mut seen = std::collections::HashSet::new();
        for chunk in grid.chunks() {
            assert!(grid.chunk_indices_in_bounds(&chunk.indices));
            assert!(seen.insert(chunk.indices.clone()));
            covered += chunk.extent.iter().product::<u64>();
        }
        assert_eq!(seen.len() as u64, grid.num_chunks());
        assert_eq!(covered, 5 * 3 * 7);
    }

    #[test]
    fn zero_size_dimension_empty_grid() {
        let grid = RegularChunkGrid::new(vec![0, 5], chunk_shape(&[2, 2])).unwrap();
        assert_eq!(grid.num_chunks(), 0);
        assert_eq!(grid.chunks().count(), 0);
    }

    #[test]
    fn out_of_bounds_indices() {
        let grid = RegularChunkGrid::new(vec![5], chunk_shape(&[2])).unwrap();
        assert!(grid.chunk_extent(&[3]).is_none());
        assert!(grid.chunk_extent(&[0, 0]).is_none());
        assert_eq!(grid.chunk_extent(&[2]), Some(vec![1]));
    }
}
