use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, instrument};

use crate::generate::Generator;
use crate::prompt::{Message, Role};
use crate::{Error, Result};

pub const GEMINI_API_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_MAX_OUTPUT_TOKENS: u32 = 1000;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Generator backed by the Gemini `generateContent` endpoint.
pub struct GeminiGenerator {
    client: Client,
    api_key: SecretString,
    model: String,
    max_output_tokens: u32,
    base_url: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<SystemInstruction>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(default)]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Serialize)]
struct SystemInstruction {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    max_output_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
}

impl GeminiGenerator {
    pub fn new(api_key: SecretString, model: impl Into<String>, max_output_tokens: u32) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|e| Error::Generation(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_key,
            model: model.into(),
            max_output_tokens,
            base_url: GEMINI_API_URL.to_string(),
        })
    }

    /// Point the generator at a different API root.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            self.model
        )
    }
}

/// Convert prompt messages to the Gemini request shape.
///
/// System messages become the system instruction; assistant turns use the
/// `model` role.
fn build_request(messages: &[Message], max_output_tokens: u32) -> GenerateRequest {
    let system: Vec<&str> = messages
        .iter()
        .filter(|m| m.role == Role::System)
        .map(|m| m.content.as_str())
        .collect();

    let contents = messages
        .iter()
        .filter_map(|m| {
            let role = match m.role {
                Role::System => return None,
                Role::User => "user",
                Role::Assistant => "model",
            };
            Some(Content {
                role: Some(role.to_string()),
                parts: vec![Part {
                    text: Some(m.content.clone()),
                }],
            })
        })
        .collect();

    GenerateRequest {
        contents,
        system_instruction: (!system.is_empty()).then(|| SystemInstruction {
            parts: vec![Part {
                text: Some(system.join("\n\n")),
            }],
        }),
        generation_config: GenerationConfig { max_output_tokens },
    }
}

fn extract_text(response: GenerateResponse) -> Result<String> {
    let text: String = response
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .map(|content| content.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();

    if text.trim().is_empty() {
        return Err(Error::Generation("model returned no text".to_string()));
    }
    Ok(text)
}

#[async_trait]
impl Generator for GeminiGenerator {
    fn name(&self) -> &str {
        &self.model
    }

    #[instrument(skip_all, fields(model = %self.model, messages = messages.len()))]
    async fn generate(&self, messages: &[Message]) -> Result<String> {
        let body = build_request(messages, self.max_output_tokens);

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", self.api_key.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::Generation(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            error!(status = status.as_u16(), "Gemini API error");
            return Err(Error::Generation(format!("status {}: {text}", status.as_u16())));
        }

        let parsed: GenerateResponse = response
            .json()
            .await
            .map_err(|e| Error::Generation(format!("malformed response: {e}")))?;
        let text = extract_text(parsed)?;
        debug!(len = text.len(), "generation complete");
        Ok(text)
    }
}
