use std::collections::BinaryHeap;

use serde::{Deserialize, Serialize};

use crate::embed::Embedding;
use crate::store::{Neighbor, VectorStore};
use crate::{Error, Result};

/// Exact nearest-neighbor index over squared Euclidean distance.
///
/// Vectors are stored row-major in one contiguous buffer. Search is brute
/// force, which is fast enough for the few thousand chunks a diet corpus
/// produces and gives exact, reproducible results.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FlatIndex {
    dimension: Option<usize>,
    data: Vec<f32>,
}

impl FlatIndex {
    /// Create a new empty index.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an index from vectors; row `i` is `embeddings[i]`.
    pub fn build(embeddings: &[Embedding]) -> Result<Self> {
        let mut index = Self::new();
        index.insert(embeddings)?;
        Ok(index)
    }

    /// Serialize the index.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        bincode::serialize(self).map_err(|e| Error::Store(e.to_string()))
    }

    /// Deserialize an index written by [`FlatIndex::to_bytes`].
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let index: Self =
            bincode::deserialize(bytes).map_err(|e| Error::Store(e.to_string()))?;

        match index.dimension {
            Some(0) => Err(Error::Store("index has zero dimension".to_string())),
            Some(dim) if index.data.len() % dim != 0 => Err(Error::Store(format!(
                "index buffer of {} floats is not a multiple of dimension {dim}",
                index.data.len()
            ))),
            None if !index.data.is_empty() => {
                Err(Error::Store("index has data but no dimension".to_string()))
            }
            _ => Ok(index),
        }
    }

    fn row(&self, row: usize, dim: usize) -> &[f32] {
        &self.data[row * dim..(row + 1) * dim]
    }
}

impl VectorStore for FlatIndex {
    fn insert(&mut self, embeddings: &[Embedding]) -> Result<()> {
        let Some(dim) = self.dimension.or_else(|| embeddings.first().map(Vec::len)) else {
            return Ok(());
        };
        for embedding in embeddings {
            if embedding.is_empty() || embedding.len() != dim {
                return Err(Error::Store(format!(
                    "embedding has dimension {}, index expects {dim}",
                    embedding.len()
                )));
            }
        }

        self.dimension = Some(dim);
        for embedding in embeddings {
            self.data.extend_from_slice(embedding);
        }
        Ok(())
    }

    fn search(&self, query_embedding: &[f32], k: usize) -> Result<Vec<Neighbor>> {
        let Some(dim) = self.dimension else {
            return Ok(Vec::new());
        };
        if k == 0 || self.data.is_empty() {
            return Ok(Vec::new());
        }
        if query_embedding.len() != dim {
            return Err(Error::Store(format!(
                "query has dimension {}, index expects {dim}",
                query_embedding.len()
            )));
        }

        // max-heap of the k best so far; the worst candidate sits on top
        let mut heap = BinaryHeap::with_capacity(k + 1);
        for row in 0..self.len() {
            heap.push(Neighbor {
                row,
                distance: squared_l2(query_embedding, self.row(row, dim)),
            });
            if heap.len() > k {
                heap.pop();
            }
        }

        Ok(heap.into_sorted_vec())
    }

    fn dimension(&self) -> Option<usize> {
        self.dimension
    }

    fn len(&self) -> usize {
        match self.dimension {
            Some(dim) if dim > 0 => self.data.len() / dim,
            _ => 0,
        }
    }

    fn clear(&mut self) {
        self.dimension = None;
        self.data.clear();
    }
}

/// Squared Euclidean distance between two vectors of equal length.
fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
    debug_assert_eq!(a.len(), b.len(), "vectors must have same length");

    a.iter()
        .zip(b)
        .map(|(x, y)| {
            let d = x - y;
            d * d
        })
        .sum()
}
