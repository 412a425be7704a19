//! Per-user conversation memory
//!
//! Each user id owns an ordered list of turns that lives for the lifetime of
//! the process. Sessions are created implicitly by the first append, never
//! evicted and never rewritten.
//!
//! Every session sits behind its own lock, so appends from concurrent
//! requests for the same user are applied one at a time in call order while
//! different users never contend.

use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

/// Author of a conversation turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    User,
    Assistant,
}

/// One message of a conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: TurnRole,
    pub content: String,
}

impl Turn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: TurnRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: TurnRole::Assistant,
            content: content.into(),
        }
    }
}

type Session = Arc<Mutex<Vec<Turn>>>;

/// In-memory store of every user's conversation history.
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: DashMap<String, Session>,
}

impl SessionStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Turns recorded for `user_id`, oldest first. Unknown users have none.
    pub fn get_history(&self, user_id: &str) -> Vec<Turn> {
        let Some(session) = self.sessions.get(user_id).map(|s| Arc::clone(s.value())) else {
            return Vec::new();
        };
        let turns = session.lock();
        turns.clone()
    }

    /// Append one turn to the end of the user's history.
    pub fn append(&self, user_id: &str, role: TurnRole, content: impl Into<String>) {
        let session = self.session(user_id);
        session.lock().push(Turn {
            role,
            content: content.into(),
        });
    }

    /// Append a question and its answer as one uninterrupted pair.
    pub fn append_exchange(
        &self,
        user_id: &str,
        question: impl Into<String>,
        answer: impl Into<String>,
    ) {
        let session = self.session(user_id);
        let mut turns = session.lock();
        turns.push(Turn::user(question));
        turns.push(Turn::assistant(answer));
    }

    /// Number of users with at least one recorded turn.
    pub fn user_count(&self) -> usize {
        self.sessions.len()
    }

    fn session(&self, user_id: &str) -> Session {
        if let Some(session) = self.sessions.get(user_id) {
            return Arc::clone(session.value());
        }
        // the shard guard is released before the caller locks the session
        Arc::clone(self.sessions.entry(user_id.to_string()).or_default().value())
    }
}
