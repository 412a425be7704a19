//! Chat orchestration
//!
//! One request runs through a fixed sequence of stages:
//!
//! ```text
//! Retrieve -> LookupRules -> Assemble -> Generate -> Record -> Done
//! ```
//!
//! A failure at any stage ends the request with [`FALLBACK_RESPONSE`] and
//! nothing is recorded. Only a successful generation appends the exchange to
//! the user's session.
//!
//! # Usage
//!
//! ```ignore
//! use std::sync::Arc;
//! use ahara_lib::chat::{ChatRequest, ChatService};
//!
//! let service = ChatService::new(retriever, rules, sessions, generator);
//! let reply = service
//!     .chat(&ChatRequest::new("u1", "Pitta", "Can I eat chilli?"))
//!     .await?;
//! println!("{}", reply.response);
//! ```

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, instrument, warn};

use crate::embed::Embedder;
use crate::generate::Generator;
use crate::prompt::{self, Message, SYSTEM_PROMPT};
use crate::rules::{RuleSet, RuleTable};
use crate::search::{Retriever, DEFAULT_TOP_K};
use crate::session::SessionStore;
use crate::{Error, Result};

/// Reply sent whenever the pipeline cannot produce an answer.
pub const FALLBACK_RESPONSE: &str =
    "I am sorry, I am unable to answer right now due to an internal error.";

pub const DEFAULT_GENERATION_TIMEOUT: Duration = Duration::from_secs(60);

/// Inbound chat request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub user_id: String,
    #[serde(alias = "dosha")]
    pub constitution_type: String,
    pub message: String,
}

impl ChatRequest {
    pub fn new(
        user_id: impl Into<String>,
        constitution_type: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            constitution_type: constitution_type.into(),
            message: message.into(),
        }
    }

    /// Reject requests with a blank user id, constitution type or message.
    pub fn validate(&self) -> Result<()> {
        require("user_id", &self.user_id)?;
        require("constitution_type", &self.constitution_type)?;
        require("message", &self.message)
    }
}

/// Outbound chat response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatResponse {
    pub response: String,
}

impl ChatResponse {
    pub fn fallback() -> Self {
        Self {
            response: FALLBACK_RESPONSE.to_string(),
        }
    }

    pub fn is_fallback(&self) -> bool {
        self.response == FALLBACK_RESPONSE
    }
}

/// Tunables for [`ChatService`]
#[derive(Debug, Clone)]
pub struct ChatConfig {
    pub system_prompt: String,
    pub top_k: usize,
    pub generation_timeout: Duration,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            system_prompt: SYSTEM_PROMPT.to_string(),
            top_k: DEFAULT_TOP_K,
            generation_timeout: DEFAULT_GENERATION_TIMEOUT,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Retrieve,
    LookupRules,
    Assemble,
    Generate,
    Record,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Retrieve => "retrieve",
            Stage::LookupRules => "lookup_rules",
            Stage::Assemble => "assemble",
            Stage::Generate => "generate",
            Stage::Record => "record",
        };
        f.write_str(name)
    }
}

/// The conversation pipeline shared by every request.
pub struct ChatService<E: Embedder> {
    retriever: Arc<Retriever<E>>,
    rules: Arc<RuleTable>,
    sessions: Arc<SessionStore>,
    generator: Arc<dyn Generator>,
    config: ChatConfig,
}

impl<E: Embedder + 'static> ChatService<E> {
    pub fn new(
        retriever: Arc<Retriever<E>>,
        rules: Arc<RuleTable>,
        sessions: Arc<SessionStore>,
        generator: Arc<dyn Generator>,
    ) -> Self {
        Self {
            retriever,
            rules,
            sessions,
            generator,
            config: ChatConfig::default(),
        }
    }

    #[must_use]
    pub fn with_config(mut self, config: ChatConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &ChatConfig {
        &self.config
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    /// Load the retrieval index ahead of the first request.
    pub async fn warm_up(&self) -> Result<()> {
        self.retriever.warm_up().await
    }

    /// Answer one chat message.
    ///
    /// Only an invalid request is returned as an error. Every pipeline
    /// failure is logged and answered with [`FALLBACK_RESPONSE`].
    #[instrument(skip_all, fields(user_id = %request.user_id, dosha = %request.constitution_type))]
    pub async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse> {
        request.validate()?;

        match self.run(request).await {
            Ok(response) => Ok(ChatResponse { response }),
            Err((stage, e)) => {
                error!(%stage, kind = e.kind(), error = %e, "chat failed, sending fallback");
                Ok(ChatResponse::fallback())
            }
        }
    }

    /// Structured advice on a single food.
    ///
    /// The exchange is not recorded in any session.
    #[instrument(skip(self))]
    pub async fn food_advice(
        &self,
        constitution_type: &str,
        food: &str,
        goal: &str,
    ) -> Result<ChatResponse> {
        require("constitution_type", constitution_type)?;
        require("food", food)?;

        let result = async {
            let context = self
                .retriever
                .retrieve(&prompt::food_query(food), self.config.top_k)
                .await
                .map_err(|e| (Stage::Retrieve, e))?;
            let rule_set = self.lookup_rules(constitution_type);
            let messages =
                prompt::assemble_food_query(constitution_type, food, goal, rule_set, &context);
            self.generate(&messages)
                .await
                .map_err(|e| (Stage::Generate, e))
        }
        .await;

        match result {
            Ok(response) => Ok(ChatResponse { response }),
            Err((stage, e)) => {
                error!(%stage, kind = e.kind(), error = %e, "food advice failed, sending fallback");
                Ok(ChatResponse::fallback())
            }
        }
    }

    async fn run(&self, request: &ChatRequest) -> std::result::Result<String, (Stage, Error)> {
        let context = self
            .retriever
            .retrieve(&request.message, self.config.top_k)
            .await
            .map_err(|e| (Stage::Retrieve, e))?;
        debug!(stage = %Stage::Retrieve, context_len = context.len());

        let rule_set = self.lookup_rules(&request.constitution_type);
        debug!(stage = %Stage::LookupRules, categories = rule_set.len());

        let history = self.sessions.get_history(&request.user_id);
        let messages = prompt::assemble(
            &self.config.system_prompt,
            &history,
            rule_set,
            &context,
            &request.constitution_type,
            &request.message,
        );
        debug!(stage = %Stage::Assemble, history = history.len(), messages = messages.len());

        let reply = self
            .generate(&messages)
            .await
            .map_err(|e| (Stage::Generate, e))?;

        self.sessions
            .append_exchange(&request.user_id, request.message.as_str(), reply.as_str());
        debug!(stage = %Stage::Record, turns = history.len() + 2);

        info!(reply_len = reply.len(), "chat answered");
        Ok(reply)
    }

    fn lookup_rules(&self, constitution_type: &str) -> &RuleSet {
        if !self.rules.contains(constitution_type) {
            warn!(constitution_type, "no rules for constitution type, continuing without");
        }
        self.rules.lookup(constitution_type)
    }

    async fn generate(&self, messages: &[Message]) -> Result<String> {
        let timeout = self.config.generation_timeout;
        match tokio::time::timeout(timeout, self.generator.generate(messages)).await {
            Ok(result) => result,
            Err(_) => Err(Error::Generation(format!(
                "{} timed out after {timeout:?}",
                self.generator.name()
            ))),
        }
    }
}

fn require(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::InvalidInput(format!("{field} must not be blank")));
    }
    Ok(())
}
