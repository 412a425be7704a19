//! Text embedding using local models
//!
//! Uses sentence-transformers/all-MiniLM-L6-v2 via the fastembed crate (ONNX runtime).
//!
//! # Model Details
//!
//! - Dimensions: 384
//! - Max tokens: 256
//!
//! The same model must be used when building an index and when querying it;
//! the persisted index records its dimension and rejects queries that differ.
//!
//! # Usage
//!
//! ```ignore
//! use ahara_lib::embed::{Embedder, MiniLmEmbedder};
//!
//! let mut embedder = MiniLmEmbedder::new(None)?;
//!
//! // Embed documents (for indexing)
//! let doc_embeddings = embedder.embed_documents(&["Vata: favor warm soups", "Pitta: avoid chilli"])?;
//!
//! // Embed query (for searching)
//! let query_embedding = embedder.embed_query("Is ginger good for Kapha?")?;
//! ```

use crate::Result;

/// A vector embedding - fixed size array of floats
pub type Embedding = Vec<f32>;

/// Trait for text embedding models
pub trait Embedder: Send + Sync {
    /// Embed multiple documents for indexing
    ///
    /// Documents may be batched for efficiency.
    fn embed_documents(&mut self, texts: &[&str]) -> Result<Vec<Embedding>>;

    /// Embed a single query for searching
    fn embed_query(&mut self, text: &str) -> Result<Embedding>;

    /// Returns the embedding dimension
    fn dimension(&self) -> usize;

    /// Returns the model name/identifier
    fn model_name(&self) -> &str;
}

mod minilm;
pub use minilm::*;

#[cfg(test)]
pub(crate) mod testing {
    use std::collections::HashMap;

    use super::{Embedder, Embedding};
    use crate::Result;

    /// Embedder with hand-assigned vectors, for tests that must not load a model.
    ///
    /// Unknown texts embed to the zero vector.
    pub(crate) struct StaticEmbedder {
        vectors: HashMap<String, Embedding>,
        dimension: usize,
    }

    impl StaticEmbedder {
        pub(crate) fn new(dimension: usize, pairs: &[(&str, Embedding)]) -> Self {
            Self {
                vectors: pairs
                    .iter()
                    .map(|(text, v)| (text.to_string(), v.clone()))
                    .collect(),
                dimension,
            }
        }

        fn lookup(&self, text: &str) -> Embedding {
            self.vectors
                .get(text)
                .cloned()
                .unwrap_or_else(|| vec![0.0; self.dimension])
        }
    }

    impl Embedder for StaticEmbedder {
        fn embed_documents(&mut self, texts: &[&str]) -> Result<Vec<Embedding>> {
            Ok(texts.iter().map(|t| self.lookup(t)).collect())
        }

        fn embed_query(&mut self, text: &str) -> Result<Embedding> {
            Ok(self.lookup(text))
        }

        fn dimension(&self) -> usize {
            self.dimension
        }

        fn model_name(&self) -> &str {
            "static"
        }
    }
}
