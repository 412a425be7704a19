use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::generate::Generator;
use crate::prompt::Message;
use crate::{Error, Result};

/// A canned reply for [`ScriptedGenerator`]
#[derive(Debug, Clone)]
pub enum ScriptedResponse {
    /// Return this text
    Text(String),
    /// Fail with a generation error carrying this message
    Error(String),
    /// Wait, then produce the inner response
    Delay(Duration, Box<ScriptedResponse>),
}

impl ScriptedResponse {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Error(message.into())
    }

    pub fn delayed(delay: Duration, inner: ScriptedResponse) -> Self {
        Self::Delay(delay, Box::new(inner))
    }
}

/// Offline generator that replays a fixed script of responses, for tests.
///
/// Each call consumes the next response; calls past the end of the script
/// fail. Every prompt received is kept for inspection.
#[derive(Debug, Default)]
pub struct ScriptedGenerator {
    responses: Mutex<VecDeque<ScriptedResponse>>,
    calls: AtomicUsize,
    prompts: Mutex<Vec<Vec<Message>>>,
}

impl ScriptedGenerator {
    pub fn new(responses: impl IntoIterator<Item = ScriptedResponse>) -> Self {
        Self {
            responses: Mutex::new(responses.into_iter().collect()),
            ..Self::default()
        }
    }

    /// Generator that answers every call with the same text.
    pub fn repeating(text: impl Into<String>, times: usize) -> Self {
        let text = text.into();
        Self::new((0..times).map(|_| ScriptedResponse::Text(text.clone())))
    }

    /// Number of `generate` calls made so far.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Prompts received, in call order.
    pub fn prompts(&self) -> Vec<Vec<Message>> {
        self.prompts.lock().clone()
    }

    /// The most recent prompt, if any.
    pub fn last_prompt(&self) -> Option<Vec<Message>> {
        self.prompts.lock().last().cloned()
    }
}

#[async_trait]
impl Generator for ScriptedGenerator {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn generate(&self, messages: &[Message]) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().push(messages.to_vec());

        let Some(mut response) = self.responses.lock().pop_front() else {
            return Err(Error::Generation("script exhausted".to_string()));
        };

        loop {
            match response {
                ScriptedResponse::Text(text) => return Ok(text),
                ScriptedResponse::Error(message) => return Err(Error::Generation(message)),
                ScriptedResponse::Delay(delay, inner) => {
                    tokio::time::sleep(delay).await;
                    response = *inner;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_replays_in_order() {
        let generator = ScriptedGenerator::new([
            ScriptedResponse::text("first"),
            ScriptedResponse::error("boom"),
        ]);
        let prompt = [Message::user("hi")];

        assert_eq!(generator.generate(&prompt).await.unwrap(), "first");
        assert!(matches!(generator.generate(&prompt).await, Err(Error::Generation(m)) if m == "boom"));
        assert!(generator.generate(&prompt).await.is_err());
        assert_eq!(generator.call_count(), 3);
        assert_eq!(generator.prompts().len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_delay_then_text() {
        let generator = ScriptedGenerator::new([ScriptedResponse::delayed(
            Duration::from_secs(5),
            ScriptedResponse::text("late"),
        )]);

        let reply = generator.generate(&[Message::user("q")]).await.unwrap();
        assert_eq!(reply, "late");
        assert_eq!(generator.last_prompt().unwrap(), vec![Message::user("q")]);
    }
}
