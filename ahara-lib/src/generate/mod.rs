//! Text generation backends
//!
//! The language model is an external service: it receives the ordered,
//! role-tagged prompt and returns a single text. Any transport error, error
//! status or empty answer is reported as [`crate::Error::Generation`].
//! Timeouts are applied by the caller.

use async_trait::async_trait;

use crate::prompt::Message;
use crate::Result;

/// Trait for text generation services
#[async_trait]
pub trait Generator: Send + Sync {
    /// Generate a reply to the message sequence
    async fn generate(&self, messages: &[Message]) -> Result<String>;

    /// Returns the backend/model identifier
    fn name(&self) -> &str;
}

mod gemini;
#[cfg(test)]
mod mock;

pub use gemini::*;
#[cfg(test)]
pub(crate) use mock::*;
