//! Conversation state for one chat session.
//!
//! History only grows during a turn, and only the trailing assistant message
//! is ever rewritten while it streams.

use crate::state::{ChatMessage, ChatRole, Message, StreamFragment};

#[derive(Debug, Default)]
pub struct Conversation {
    messages: Vec<Message>,
    loading: bool,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a turn with the user's `input`.
    ///
    /// Returns the history to send, or `None` when the input is blank or a
    /// turn is already streaming. On success the user message and an empty
    /// assistant placeholder are appended.
    pub fn begin_turn(&mut self, input: &str) -> Option<Vec<ChatMessage>> {
        let input = input.trim();
        if input.is_empty() || self.loading {
            return None;
        }

        self.messages.push(Message::user(input));
        let history = self.messages.iter().map(Message::to_chat_message).collect();

        self.messages.push(Message::pending_assistant());
        self.loading = true;
        Some(history)
    }

    /// Fold a stream fragment into the in-flight assistant message.
    pub fn apply(&mut self, fragment: &StreamFragment) {
        let Some(last) = self.messages.last_mut() else {
            return;
        };
        if last.role != ChatRole::Assistant {
            return;
        }

        last.thinking = Some(fragment.thinking.clone().unwrap_or_default());
        if let Some(message) = fragment.message.as_deref().filter(|m| !m.is_empty()) {
            last.content = message.to_string();
        }
    }

    pub fn finish_turn(&mut self) {
        self.loading = false;
    }

    /// Drop the whole conversation ("new question").
    pub fn reset(&mut self) {
        self.messages.clear();
        self.loading = false;
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// The assistant message currently being streamed into.
    pub fn in_flight(&self) -> Option<&Message> {
        if !self.loading {
            return None;
        }
        self.messages.last().filter(|m| m.role == ChatRole::Assistant)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fragment(message: &str, thinking: Option<&str>) -> StreamFragment {
        StreamFragment {
            message: Some(message.to_string()),
            thinking: thinking.map(str::to_string),
            done: false,
        }
    }

    #[test]
    fn test_begin_turn_returns_history_without_placeholder() {
        let mut convo = Conversation::new();
        let history = convo.begin_turn("  hello  ").unwrap();
        assert_eq!(
            history,
            vec![ChatMessage {
                role: ChatRole::User,
                content: "hello".to_string()
            }]
        );
        assert_eq!(convo.messages().len(), 2);
        assert!(convo.is_loading());
        assert_eq!(convo.in_flight(), Some(&Message::pending_assistant()));
    }

    #[test]
    fn test_begin_turn_rejects_blank_and_concurrent() {
        let mut convo = Conversation::new();
        assert!(convo.begin_turn("   ").is_none());
        assert!(convo.begin_turn("first").is_some());
        assert!(convo.begin_turn("second").is_none());
        assert_eq!(convo.messages().len(), 2);
    }

    #[test]
    fn test_apply_replaces_content() {
        let mut convo = Conversation::new();
        convo.begin_turn("hi").unwrap();
        convo.apply(&fragment("Hel", None));
        convo.apply(&fragment("Hello", Some("greeting")));

        let last = convo.messages().last().unwrap();
        assert_eq!(last.content, "Hello");
        assert_eq!(last.thinking.as_deref(), Some("greeting"));
    }

    #[test]
    fn test_apply_keeps_content_on_empty_message() {
        let mut convo = Conversation::new();
        convo.begin_turn("hi").unwrap();
        convo.apply(&fragment("Hello", None));
        convo.apply(&fragment("", None));
        assert_eq!(convo.messages().last().unwrap().content, "Hello");
    }

    #[test]
    fn test_second_turn_sends_full_history() {
        let mut convo = Conversation::new();
        convo.begin_turn("one").unwrap();
        convo.apply(&fragment("<think>x</think>uno", None));
        convo.finish_turn();

        let history = convo.begin_turn("two").unwrap();
        let roles: Vec<ChatRole> = history.iter().map(|m| m.role).collect();
        assert_eq!(roles, vec![ChatRole::User, ChatRole::Assistant, ChatRole::User]);
        assert_eq!(history[1].content, "<think>x</think>uno");
    }

    #[test]
    fn test_finish_and_reset() {
        let mut convo = Conversation::new();
        convo.begin_turn("hi").unwrap();
        convo.finish_turn();
        assert!(!convo.is_loading());
        assert!(convo.in_flight().is_none());

        convo.reset();
        assert!(convo.messages().is_empty());
        assert!(convo.begin_turn("again").is_some());
    }

    #[test]
    fn test_apply_ignored_without_assistant() {
        let mut convo = Conversation::new();
        convo.apply(&fragment("stray", None));
        assert!(convo.messages().is_empty());
    }
}
