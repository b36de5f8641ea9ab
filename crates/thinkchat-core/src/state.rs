//! UI-agnostic conversation types
//!
//! These are shared between the stream client, the conversation session and
//! whatever front end renders them. None of them depend on a UI framework.

use serde::{Deserialize, Serialize};

/// The role of a chat message sender
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

/// A message as sent to the inference endpoint. Immutable once sent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

/// A message as the front end sees it.
///
/// `content` holds the raw accumulated text of the reply, think tags
/// included. `thinking` holds reasoning the endpoint reported out of band.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub role: ChatRole,
    pub content: String,
    pub thinking: Option<String>,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
            thinking: None,
        }
    }

    /// Empty assistant placeholder that a stream fills in.
    pub fn pending_assistant() -> Self {
        Self {
            role: ChatRole::Assistant,
            content: String::new(),
            thinking: Some(String::new()),
        }
    }

    pub fn to_chat_message(&self) -> ChatMessage {
        ChatMessage {
            role: self.role,
            content: self.content.clone(),
        }
    }
}

/// One update from the stream client.
///
/// `message` and `thinking` carry the full accumulated text so far, never
/// just the latest delta. `done` is set on the terminal fragment only.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamFragment {
    pub message: Option<String>,
    pub thinking: Option<String>,
    pub done: bool,
}
