//! Vector storage backends
//!
//! # Storage Model
//!
//! A store holds embeddings only. Each inserted vector gets a row id equal
//! to its insertion position; the chunk text lives in a parallel sequence
//! owned by the caller (see [`crate::search::SearchEngine`]), so row `i`
//! of the store always describes chunk `i`.
//!
//! # Usage
//!
//! ```ignore
//! use ahara_lib::store::{FlatIndex, VectorStore};
//!
//! let mut store = FlatIndex::new();
//! store.insert(&embeddings)?;
//!
//! // Exact nearest neighbors by squared Euclidean distance
//! let neighbors = store.search(&query_embedding, 3)?;
//! ```

use std::cmp::Ordering;

use crate::embed::Embedding;
use crate::Result;

/// A search hit: a row id and its distance to the query
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    /// Insertion position of the matched vector
    pub row: usize,
    /// Squared Euclidean distance (lower is closer)
    pub distance: f32,
}

impl Eq for Neighbor {}

impl PartialOrd for Neighbor {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

// Closer first; equal distances resolve to the earlier row.
impl Ord for Neighbor {
    fn cmp(&self, other: &Self) -> Ordering {
        self.distance
            .total_cmp(&other.distance)
            .then_with(|| self.row.cmp(&other.row))
    }
}

/// Trait for vector storage backends
pub trait VectorStore: Send + Sync {
    /// Append embeddings; row ids continue from the current length
    fn insert(&mut self, embeddings: &[Embedding]) -> Result<()>;

    /// Search for the nearest rows
    ///
    /// # Arguments
    /// * `query_embedding` - The query vector
    /// * `k` - Number of results to return
    ///
    /// # Returns
    /// Up to `k` neighbors, ascending by distance, ties by row id.
    /// Empty when the store is empty or `k` is zero.
    fn search(&self, query_embedding: &[f32], k: usize) -> Result<Vec<Neighbor>>;

    /// Vector dimension, or `None` before the first insert
    fn dimension(&self) -> Option<usize>;

    /// Get total number of stored vectors
    fn len(&self) -> usize;

    /// Check if store is empty
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Clear all stored data
    fn clear(&mut self);
}

mod flat;

pub use flat::*;
