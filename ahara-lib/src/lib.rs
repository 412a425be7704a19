//! Ahara - dosha-aware diet question answering over a local knowledge base
//!
//! # Architecture
//!
//! ```text
//! Document -> Chunker -> Embedder -> FlatIndex -> artifacts (.index + .chunks.json)
//!                                                     |
//! ChatRequest -> Retriever (Embedder + FlatIndex) <---+
//!                    |
//!                 context + RuleTable lookup + SessionStore history
//!                    |
//!                 prompt::assemble -> Generator -> ChatResponse
//!                                                      |
//!                                          SessionStore::append_exchange
//! ```
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use ahara_lib::{
//!     chat::{ChatRequest, ChatService},
//!     embed::MiniLmEmbedder,
//!     generate::GeminiGenerator,
//!     rules::RuleTable,
//!     search::{IndexArtifacts, Retriever},
//!     session::SessionStore,
//! };
//!
//! let retriever = Retriever::from_artifacts(IndexArtifacts::new("data/ayurveda"), || {
//!     MiniLmEmbedder::new(None)
//! });
//! let service = ChatService::new(
//!     Arc::new(retriever),
//!     Arc::new(RuleTable::load("data/dosha_rules.json")?),
//!     Arc::new(SessionStore::new()),
//!     Arc::new(GeminiGenerator::new(api_key, "gemini-2.5-flash", 1000)?),
//! );
//!
//! let reply = service.chat(&ChatRequest::new("u1", "Pitta", "Is chilli ok?")).await?;
//! ```

pub mod chat;
pub mod chunk;
pub mod config;
pub mod embed;
pub mod error;
pub mod generate;
pub mod prompt;
pub mod rules;
pub mod search;
pub mod session;
pub mod store;

pub use error::{Error, Result};
