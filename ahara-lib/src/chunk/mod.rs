//! Document chunking strategies
//!
//! Reference documents (diet charts, food lists, dosha guidelines) are split
//! into overlapping windows before embedding. Two strategies are provided:
//! - [`RecursiveChunker`]: prefers paragraph, then line, then word boundaries,
//!   falling back to a hard cut at the size limit. This is the default.
//! - [`FixedSizeChunker`]: plain character windows, no boundary preference.
//!
//! Both are deterministic: the same document and configuration always yield
//! the same chunk sequence, which keeps index rows and chunk metadata aligned
//! across rebuilds.
//!
//! # Implementing a Chunker
//!
//! ```ignore
//! use ahara_lib::chunk::{Chunker, Chunk, ChunkMetadata};
//!
//! struct MyChunker { /* ... */ }
//!
//! impl Chunker for MyChunker {
//!     fn chunk(&self, content: &str, metadata: ChunkMetadata) -> Vec<Chunk> {
//!         // Your chunking logic here
//!         todo!()
//!     }
//!
//!     fn name(&self) -> &str {
//!         "mine"
//!     }
//! }
//! ```

use std::hash::{DefaultHasher, Hash, Hasher};

use serde::{Deserialize, Serialize};

/// Default maximum chunk length in characters
pub const DEFAULT_CHUNK_SIZE: usize = 800;

/// Default overlap between consecutive chunks in characters
pub const DEFAULT_CHUNK_OVERLAP: usize = 100;

/// A chunk of text with its metadata
#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
pub struct Chunk {
    /// Content-derived identifier for this chunk
    pub id: String,
    /// The text content of this chunk
    pub content: String,
    /// Metadata about the source and position
    pub metadata: ChunkMetadata,
}

/// Metadata associated with a chunk
#[derive(Debug, Clone, Default, Serialize, Deserialize, Eq, PartialEq)]
pub struct ChunkMetadata {
    /// Source document identifier (usually the file name)
    pub source_id: Option<String>,
    /// Character offset of the chunk within the source document
    pub position: usize,
    /// Total number of chunks from this source
    pub total_chunks: Option<usize>,
}

impl ChunkMetadata {
    /// Metadata for chunks taken from the named source.
    pub fn for_source(source_id: impl Into<String>) -> Self {
        Self {
            source_id: Some(source_id.into()),
            ..Self::default()
        }
    }
}

/// Trait for document chunking strategies
pub trait Chunker: Send + Sync {
    /// Split content into chunks
    ///
    /// # Arguments
    /// * `content` - The text content to chunk
    /// * `metadata` - Base metadata to attach to each chunk
    ///
    /// # Returns
    /// A vector of non-empty chunks, in document order
    fn chunk(&self, content: &str, metadata: ChunkMetadata) -> Vec<Chunk>;

    /// Returns the name of this chunking strategy
    fn name(&self) -> &str;
}

/// Chunk several documents in order.
///
/// Chunks of the first document come first, then the second and so on, so the
/// resulting sequence can be used directly as index row order.
pub fn chunk_documents<C, S>(chunker: &C, documents: &[(S, String)]) -> Vec<Chunk>
where
    C: Chunker + ?Sized,
    S: AsRef<str>,
{
    documents
        .iter()
        .flat_map(|(source, text)| chunker.chunk(text, ChunkMetadata::for_source(source.as_ref())))
        .collect()
}

pub(crate) fn generate_id(string: &str) -> String {
    let mut hasher = DefaultHasher::new();
    string.hash(&mut hasher);
    format!("{:x}", hasher.finish())
}

mod fixed;
mod recursive;

pub use fixed::*;
pub use recursive::*;
