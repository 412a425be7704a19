//! High-level search interface
//!
//! Combines embedder, vector store and the parallel chunk sequence into a
//! unified search API, plus the persisted artifact pair and the lazily
//! loaded [`Retriever`] used at request time.
//!
//! # Usage
//!
//! ```ignore
//! use ahara_lib::search::SearchEngine;
//!
//! // Offline: embed and index chunks, then persist both artifacts together
//! let mut engine = SearchEngine::new(embedder, FlatIndex::new());
//! engine.index(&chunks)?;
//! artifacts.save(&engine)?;
//!
//! // Online: text of the three closest chunks, blank-line separated
//! let context = engine.retrieve_context("Which grains suit Vata?", 3)?;
//! ```

use parking_lot::Mutex;
use tracing::debug;

use crate::chunk::Chunk;
use crate::embed::Embedder;
use crate::store::VectorStore;
use crate::{Error, Result};

/// Separator between retrieved chunk texts
pub const CONTEXT_SEPARATOR: &str = "\n\n";

/// Default number of chunks retrieved per query
pub const DEFAULT_TOP_K: usize = 3;

/// A search result: the matched chunk and its distance to the query
#[derive(Debug, Clone, PartialEq)]
pub struct SearchResult {
    /// Row id of the match in the vector store
    pub row: usize,
    /// The matched chunk
    pub chunk: Chunk,
    /// Squared Euclidean distance (lower is closer)
    pub distance: f32,
}

/// Search engine combining an embedder, a vector store and the chunk texts.
///
/// Store row `i` always corresponds to `chunks[i]`; the two are only ever
/// grown together by [`SearchEngine::index`] or checked together by
/// [`SearchEngine::from_parts`].
pub struct SearchEngine<E: Embedder, S: VectorStore> {
    embedder: Mutex<E>,
    store: S,
    chunks: Vec<Chunk>,
}

impl<E: Embedder, S: VectorStore> SearchEngine<E, S> {
    /// Create a new search engine over an empty store.
    #[must_use]
    pub fn new(embedder: E, store: S) -> Self {
        Self {
            embedder: Mutex::new(embedder),
            store,
            chunks: Vec::new(),
        }
    }

    /// Assemble an engine from a loaded store and its chunk metadata.
    ///
    /// Fails when the two disagree in length or the embedder produces vectors
    /// of a different dimension than the store holds.
    pub fn from_parts(embedder: E, store: S, chunks: Vec<Chunk>) -> Result<Self> {
        if store.len() != chunks.len() {
            return Err(Error::RetrievalUnavailable(format!(
                "index has {} rows but chunk metadata has {} entries",
                store.len(),
                chunks.len()
            )));
        }
        if let Some(dim) = store.dimension() {
            if dim != embedder.dimension() {
                return Err(Error::RetrievalUnavailable(format!(
                    "index dimension {dim} does not match embedder {} ({})",
                    embedder.model_name(),
                    embedder.dimension()
                )));
            }
        }

        Ok(Self {
            embedder: Mutex::new(embedder),
            store,
            chunks,
        })
    }

    /// Index chunks by computing embeddings and storing them.
    pub fn index(&mut self, chunks: &[Chunk]) -> Result<()> {
        if chunks.is_empty() {
            return Ok(());
        }

        let texts: Vec<&str> = chunks.iter().map(|c| c.content.as_str()).collect();
        let embeddings = self.embedder.get_mut().embed_documents(&texts)?;
        if embeddings.len() != chunks.len() {
            return Err(Error::Embedding(format!(
                "model returned {} embeddings for {} chunks",
                embeddings.len(),
                chunks.len()
            )));
        }

        self.store.insert(&embeddings)?;
        self.chunks.extend_from_slice(chunks);
        debug!(added = chunks.len(), total = self.chunks.len(), "indexed chunks");

        Ok(())
    }

    /// Search for the `k` chunks closest to the query.
    pub fn search(&self, query: &str, k: usize) -> Result<Vec<SearchResult>> {
        if k == 0 || self.store.is_empty() {
            return Ok(Vec::new());
        }

        let query_embedding = self.embedder.lock().embed_query(query)?;
        let neighbors = self.store.search(&query_embedding, k)?;

        neighbors
            .into_iter()
            .map(|n| {
                let chunk = self.chunks.get(n.row).ok_or_else(|| {
                    Error::RetrievalUnavailable(format!("row {} has no chunk metadata", n.row))
                })?;
                Ok(SearchResult {
                    row: n.row,
                    chunk: chunk.clone(),
                    distance: n.distance,
                })
            })
            .collect()
    }

    /// Texts of the `k` closest chunks, in result order, separated by a blank line.
    pub fn retrieve_context(&self, query: &str, k: usize) -> Result<String> {
        let results = self.search(query, k)?;
        Ok(results
            .iter()
            .map(|r| r.chunk.content.as_str())
            .collect::<Vec<_>>()
            .join(CONTEXT_SEPARATOR))
    }

    /// Returns the number of indexed chunks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    /// Returns `true` if no chunks are indexed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Returns the indexed chunks in row order.
    #[must_use]
    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    /// Returns a reference to the store.
    #[must_use]
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Name of the embedding model behind this engine.
    pub fn model_name(&self) -> String {
        self.embedder.lock().model_name().to_string()
    }
}

mod artifacts;
mod retriever;

pub use artifacts::*;
pub use retriever::*;

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::chunk::ChunkMetadata;
    use crate::embed::testing::StaticEmbedder;
    use crate::store::FlatIndex;

    pub(crate) const VATA: &str = "Vata should favor warm foods";
    pub(crate) const PITTA: &str = "Pitta should avoid spicy foods";
    pub(crate) const KAPHA: &str = "Kapha should favor light foods";
    pub(crate) const PITTA_QUERY: &str = "Can Pitta eat chilli?";

    pub(crate) fn make_chunk(content: &str) -> Chunk {
        Chunk {
            id: crate::chunk::generate_id(content),
            content: content.to_string(),
            metadata: ChunkMetadata::default(),
        }
    }

    pub(crate) fn dosha_embedder() -> StaticEmbedder {
        StaticEmbedder::new(
            3,
            &[
                (VATA, vec![1.0, 0.0, 0.0]),
                (PITTA, vec![0.0, 1.0, 0.0]),
                (KAPHA, vec![0.0, 0.0, 1.0]),
                (PITTA_QUERY, vec![0.1, 0.9, 0.0]),
            ],
        )
    }

    pub(crate) fn dosha_engine() -> SearchEngine<StaticEmbedder, FlatIndex> {
        let mut engine = SearchEngine::new(dosha_embedder(), FlatIndex::new());
        engine
            .index(&[make_chunk(VATA), make_chunk(PITTA), make_chunk(KAPHA)])
            .unwrap();
        engine
    }

    #[test]
    fn test_nearest_chunk_is_retrieved() {
        let engine = dosha_engine();
        let context = engine.retrieve_context(PITTA_QUERY, 1).unwrap();
        assert_eq!(context, PITTA);
    }

    #[test]
    fn test_context_joined_in_result_order() {
        let engine = dosha_engine();
        let results = engine.search(PITTA_QUERY, 3).unwrap();
        assert_eq!(results[0].row, 1);

        let context = engine.retrieve_context(PITTA_QUERY, 2).unwrap();
        assert_eq!(context, format!("{PITTA}\n\n{VATA}"));
    }

    #[test]
    fn test_k_zero_and_empty_engine() {
        let engine = dosha_engine();
        assert_eq!(engine.retrieve_context(PITTA_QUERY, 0).unwrap(), "");

        let empty = SearchEngine::new(dosha_embedder(), FlatIndex::new());
        assert!(empty.search(PITTA_QUERY, 3).unwrap().is_empty());
    }

    #[test]
    fn test_from_parts_rejects_misaligned_metadata() {
        let store = FlatIndex::build(&[vec![1.0, 0.0, 0.0], vec![0.0, 1.0, 0.0]]).unwrap();
        let result = SearchEngine::from_parts(dosha_embedder(), store, vec![make_chunk(VATA)]);
        assert!(matches!(result, Err(Error::RetrievalUnavailable(_))));
    }

    #[test]
    fn test_from_parts_rejects_dimension_mismatch() {
        let store = FlatIndex::build(&[vec![1.0, 0.0]]).unwrap();
        let result = SearchEngine::from_parts(dosha_embedder(), store, vec![make_chunk(VATA)]);
        assert!(matches!(result, Err(Error::RetrievalUnavailable(_))));
    }
}
