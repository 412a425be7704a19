use std::path::PathBuf;

use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};

use crate::embed::{Embedder, Embedding};
use crate::{Error, Result};

/// MiniLM embedder using sentence-transformers/all-MiniLM-L6-v2.
///
/// Uses fastembed for ONNX-based inference. This model produces 384-dimensional
/// embeddings and is small enough to load on request-serving machines.
pub struct MiniLmEmbedder {
    model: TextEmbedding,
}

impl MiniLmEmbedder {
    /// Create a new MiniLM embedder.
    ///
    /// Downloads the model on first use (~90MB) into `cache_dir`, or the
    /// fastembed default cache when `None`.
    pub fn new(cache_dir: Option<PathBuf>) -> Result<Self> {
        let mut opts = InitOptions::new(EmbeddingModel::AllMiniLML6V2)
            .with_show_download_progress(true);
        if let Some(dir) = cache_dir {
            opts = opts.with_cache_dir(dir);
        }

        TextEmbedding::try_new(opts)
            .map(|model| Self { model })
            .map_err(|e| Error::Embedding(e.to_string()))
    }
}

impl Embedder for MiniLmEmbedder {
    fn model_name(&self) -> &str {
        "sentence-transformers/all-MiniLM-L6-v2"
    }

    fn dimension(&self) -> usize {
        384
    }

    fn embed_documents(&mut self, texts: &[&str]) -> Result<Vec<Embedding>> {
        self.model
            .embed(texts, None)
            .map_err(|e| Error::Embedding(e.to_string()))
    }

    fn embed_query(&mut self, text: &str) -> Result<Embedding> {
        self.model
            .embed([text], None)
            .map_err(|e| Error::Embedding(e.to_string()))?
            .into_iter()
            .next()
            .ok_or_else(|| Error::Embedding("model returned no embeddings".to_string()))
    }
}
