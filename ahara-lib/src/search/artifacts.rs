use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::info;

use crate::chunk::Chunk;
use crate::embed::Embedder;
use crate::search::SearchEngine;
use crate::store::FlatIndex;
use crate::{Error, Result};

/// Paths of the two files a built corpus is persisted as.
///
/// The vector index (`<base>.index`, bincode) and the chunk metadata
/// (`<base>.chunks.json`) are always written together and both record a
/// fingerprint of the chunk sequence, so a stale or foreign half of the pair
/// is detected on load instead of silently returning the wrong text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexArtifacts {
    pub index_path: PathBuf,
    pub chunks_path: PathBuf,
}

/// Contents of a loaded artifact pair.
#[derive(Debug)]
pub struct LoadedArtifacts {
    pub index: FlatIndex,
    pub chunks: Vec<Chunk>,
    /// Embedding model the index was built with
    pub model: String,
}

#[derive(Serialize, Deserialize)]
struct IndexFile {
    fingerprint: String,
    model: String,
    index: Vec<u8>,
}

#[derive(Serialize, Deserialize)]
struct ChunkFile {
    fingerprint: String,
    model: String,
    chunks: Vec<Chunk>,
}

impl IndexArtifacts {
    /// Artifact paths derived from a base path, e.g. `data/ayurveda`.
    pub fn new(base: impl AsRef<Path>) -> Self {
        let base = base.as_ref();
        Self {
            index_path: with_suffix(base, "index"),
            chunks_path: with_suffix(base, "chunks.json"),
        }
    }

    /// Returns `true` if both files are present.
    pub fn exists(&self) -> bool {
        self.index_path.is_file() && self.chunks_path.is_file()
    }

    /// Persist the engine's index and chunk metadata.
    pub fn save<E: Embedder>(&self, engine: &SearchEngine<E, FlatIndex>) -> Result<()> {
        let fingerprint = fingerprint(engine.chunks());
        let model = engine.model_name();

        let index_file = IndexFile {
            fingerprint: fingerprint.clone(),
            model: model.clone(),
            index: engine.store().to_bytes()?,
        };
        let chunk_file = ChunkFile {
            fingerprint,
            model,
            chunks: engine.chunks().to_vec(),
        };

        for path in [&self.index_path, &self.chunks_path] {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent)?;
            }
        }

        let index_bytes =
            bincode::serialize(&index_file).map_err(|e| Error::Store(e.to_string()))?;
        let chunk_bytes =
            serde_json::to_vec(&chunk_file).map_err(|e| Error::Store(e.to_string()))?;
        fs::write(&self.index_path, index_bytes)?;
        fs::write(&self.chunks_path, chunk_bytes)?;

        info!(
            index = %self.index_path.display(),
            chunks = %self.chunks_path.display(),
            rows = engine.len(),
            "saved index artifacts"
        );
        Ok(())
    }

    /// Load both files and check they belong together.
    ///
    /// Every failure, including a missing file, is reported as
    /// [`Error::RetrievalUnavailable`].
    pub fn load(&self) -> Result<LoadedArtifacts> {
        let index_bytes = read(&self.index_path)?;
        let chunk_bytes = read(&self.chunks_path)?;

        let index_file: IndexFile = bincode::deserialize(&index_bytes).map_err(|e| {
            unavailable(format!("corrupt index {}: {e}", self.index_path.display()))
        })?;
        let chunk_file: ChunkFile = serde_json::from_slice(&chunk_bytes).map_err(|e| {
            unavailable(format!("corrupt chunk metadata {}: {e}", self.chunks_path.display()))
        })?;

        if index_file.fingerprint != chunk_file.fingerprint
            || fingerprint(&chunk_file.chunks) != chunk_file.fingerprint
        {
            return Err(unavailable(format!(
                "{} and {} were not built together",
                self.index_path.display(),
                self.chunks_path.display()
            )));
        }
        if index_file.model != chunk_file.model {
            return Err(unavailable(format!(
                "index built with {} but chunk metadata with {}",
                index_file.model, chunk_file.model
            )));
        }

        let index = FlatIndex::from_bytes(&index_file.index)
            .map_err(|e| unavailable(format!("corrupt index {}: {e}", self.index_path.display())))?;

        Ok(LoadedArtifacts {
            index,
            chunks: chunk_file.chunks,
            model: index_file.model,
        })
    }
}

/// Hex SHA-256 over the chunk texts in row order.
fn fingerprint(chunks: &[Chunk]) -> String {
    let mut hasher = Sha256::new();
    for chunk in chunks {
        hasher.update(chunk.content.as_bytes());
        hasher.update([0u8]);
    }
    format!("{:x}", hasher.finalize())
}

fn with_suffix(base: &Path, suffix: &str) -> PathBuf {
    let mut name = base.as_os_str().to_owned();
    name.push(".");
    name.push(suffix);
    PathBuf::from(name)
}

fn read(path: &Path) -> Result<Vec<u8>> {
    fs::read(path).map_err(|e| unavailable(format!("cannot read {}: {e}", path.display())))
}

fn unavailable(message: String) -> Error {
    Error::RetrievalUnavailable(message)
}
