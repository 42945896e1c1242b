use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::id::SessionIdGenerator;

/// Speaker of a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One role-tagged message in the conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub content: String,
}

impl Turn {
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Ordered, append-only turn log plus the session identifier.
///
/// Role alternation is not enforced; the exchange protocol is what keeps
/// turns alternating in practice.
pub struct Conversation {
    turns: Vec<Turn>,
    session_id: String,
    ids: Arc<dyn SessionIdGenerator>,
}

impl Conversation {
    #[must_use]
    pub fn new(ids: Arc<dyn SessionIdGenerator>) -> Self {
        let session_id = ids.next_session_id();
        Self {
            turns: Vec::new(),
            session_id,
            ids,
        }
    }

    /// Drop every turn and start over under a fresh identifier.
    pub fn reset(&mut self) {
        self.turns.clear();
        self.session_id = self.ids.next_session_id();
    }

    pub fn append(&mut self, turn: Turn) {
        self.turns.push(turn);
    }

    /// Replace the whole log, e.g. to resume a saved conversation.
    pub fn load(&mut self, turns: Vec<Turn>) {
        self.turns = turns;
    }

    /// Owned copy of the turns, safe to hand out for persistence.
    #[must_use]
    pub fn snapshot(&self) -> Vec<Turn> {
        self.turns.clone()
    }

    #[must_use]
    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    #[must_use]
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.turns.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Completed exchanges: `ceil(turns / 2)`.
    #[must_use]
    pub fn exchange_count(&self) -> usize {
        self.turns.len().div_ceil(2)
    }
}

impl fmt::Debug for Conversation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Conversation")
            .field("session_id", &self.session_id)
            .field("turns", &self.turns)
            .finish_non_exhaustive()
    }
}
