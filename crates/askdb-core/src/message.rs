//! UI-agnostic conversation types
//!
//! A conversation is an append-only list of [`Message`]s. Answers keep the
//! payload exactly as it was received so that classification can be re-run
//! at any time (see [`crate::shape::classify`]).

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One entry in the conversation history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Message {
    /// The user's question, trimmed and never blank
    Question { text: String },
    /// The payload returned by the query service, or the synthetic failure
    /// payload that stands in for a transport failure
    Answer { raw: Value },
}

impl Message {
    pub fn question(text: impl Into<String>) -> Self {
        Message::Question { text: text.into() }
    }

    pub fn answer(raw: Value) -> Self {
        Message::Answer { raw }
    }

    pub fn is_question(&self) -> bool {
        matches!(self, Message::Question { .. })
    }

    pub fn is_answer(&self) -> bool {
        matches!(self, Message::Answer { .. })
    }
}
