//! Conversation memory buffer.
//!
//! Holds the ordered exchange history fed to the language model on every
//! conversational call. Unlike the displayed transcript, the buffer only
//! ever receives complete exchanges (user input plus model output).

use crate::models::ChatMessage;

#[derive(Debug, Clone, Default)]
pub struct ConversationMemory {
    messages: Vec<ChatMessage>,
}

impl ConversationMemory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one exchange: the user's input followed by the model's output.
    pub fn save_context(&mut self, input: &str, output: &str) {
        self.messages.push(ChatMessage::user(input));
        self.messages.push(ChatMessage::assistant(output));
    }

    /// All remembered messages, oldest first.
    pub fn history(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// Number of remembered exchanges.
    pub fn exchanges(&self) -> usize {
        self.messages.len() / 2
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }
}
