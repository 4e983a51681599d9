//! Chunk key encodings.
//!
//! A chunk key encoding maps chunk grid indices to the store key of the chunk
//! payload. The encodings here are the conventions of the supported layouts;
//! their output is part of the on-disk format and must not change.

use itertools::Itertools;
use serde::{Deserialize, Serialize};
use zarr_interop_storage::StoreKey;

/// The separator placed between the dimensions of a chunk key.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Eq, PartialEq)]
pub enum ChunkKeySeparator {
    /// The `.` character.
    #[serde(rename = ".")]
    Dot,
    /// The `/` character.
    #[serde(rename = "/")]
    Slash,
}

impl From<ChunkKeySeparator> for char {
    fn from(separator: ChunkKeySeparator) -> Self {
        match separator {
            ChunkKeySeparator::Dot => '.',
            ChunkKeySeparator::Slash => '/',
        }
    }
}

/// A chunk key encoding.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum ChunkKeyEncoding {
    /// The zarr-v2 encoding: grid indices joined by the separator.
    ///
    /// A `.` separator yields flat single-file keys (`1.2.3`); a `/`
    /// separator yields nested directory keys (`1/2/3`). A zero-dimension
    /// index encodes as `0`.
    V2(ChunkKeySeparator),
    /// The n5 encoding: grid indices reversed, joined by `/`.
    ///
    /// n5 lists dimensions in column-major order, so the fastest-varying
    /// dimension comes first in the key path.
    N5,
}

impl ChunkKeyEncoding {
    /// Encode chunk grid indices into a store key.
    #[must_use]
    pub fn encode(&self, chunk_grid_indices: &[u64]) -> StoreKey {
        let key = if chunk_grid_indices.is_empty() {
            '0'.to_string()
        } else {
            // Avoid a heap allocation of the chunk key separator
            let mut separator_str: [u8; 4] = [0; 4];
            let separator_char: char = match self {
                Self::V2(separator) => (*separator).into(),
                Self::N5 => '/',
            };
            let separator_str: &str = separator_char.encode_utf8(&mut separator_str);

            // Use itoa for integer conversion, faster than format!
            let mut buffers = vec![itoa::Buffer::new(); chunk_grid_indices.len()];

            let indices_and_buffers = chunk_grid_indices.iter().zip(&mut buffers);
            match self {
                Self::V2(_) => indices_and_buffers
                    .map(|(&n, buffer)| buffer.format(n))
                    .join(separator_str),
                Self::N5 => indices_and_buffers
                    .rev()
                    .map(|(&n, buffer)| buffer.format(n))
                    .join(separator_str),
            }
        };
        unsafe { StoreKey::new_unchecked(key) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn v2_dot_nd() {
        let key = ChunkKeyEncoding::V2(ChunkKeySeparator::Dot).encode(&[1, 23, 45]);
        assert_eq!(key, StoreKey::new("1.23.45").unwrap());
    }

    #[test]
    fn v2_slash_nd() {
        let key = ChunkKeyEncoding::V2(ChunkKeySeparator::Slash).encode(&[1, 23, 45]);
        assert_eq!(key, StoreKey::new("1/23/45").unwrap());
    }

    #[test]
    fn v2_scalar() {
        let key = ChunkKeyEncoding::V2(ChunkKeySeparator::Dot).encode(&[]);
        assert_eq!(key, StoreKey::new("0").unwrap());
    }

    #[test]
    fn n5_reversed() {
        let key = ChunkKeyEncoding::N5.encode(&[1, 23, 45]);
        assert_eq!(key, StoreKey::new("45/23/1").unwrap());
    }

    #[test]
    fn separator_serde() {
        assert_eq!(
            serde_json::to_value(ChunkKeySeparator::Dot).unwrap(),
            serde_json::json!(".")
        );
        assert_eq!(
            serde_json::from_value::<ChunkKeySeparator>(serde_json::json!("/")).unwrap(),
            ChunkKeySeparator::Slash
        );
    }
}
