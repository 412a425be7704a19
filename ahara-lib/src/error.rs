//! Error types for Ahara

use thiserror::Error;

/// Result type alias for Ahara operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in Ahara operations
#[derive(Error, Debug)]
pub enum Error {
    /// Failed to load or run the embedding model
    #[error("embedding error: {0}")]
    Embedding(String),

    /// Failed to chunk a document
    #[error("chunking error: {0}")]
    Chunking(String),

    /// Failed to insert into or search the vector index
    #[error("store error: {0}")]
    Store(String),

    /// Index, chunk metadata or embedding model missing or corrupt
    #[error("retrieval unavailable: {0}")]
    RetrievalUnavailable(String),

    /// The rule table could not be loaded
    #[error("failed to load rules: {0}")]
    RuleLoad(String),

    /// The generation service failed, timed out or answered with nothing usable
    #[error("generation failed: {0}")]
    Generation(String),

    /// Settings file unreadable or settings inconsistent
    #[error("configuration error: {0}")]
    Config(String),

    /// Invalid input provided
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Short classification string for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Embedding(_) => "embedding",
            Self::Chunking(_) => "chunking",
            Self::Store(_) => "store",
            Self::RetrievalUnavailable(_) => "retrieval_unavailable",
            Self::RuleLoad(_) => "rule_load",
            Self::Generation(_) => "generation",
            Self::Config(_) => "config",
            Self::InvalidInput(_) => "invalid_input",
            Self::Io(_) => "io",
        }
    }
}
