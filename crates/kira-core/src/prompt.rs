//! Prompt construction for the two kinds of model call.
//!
//! - **Conversational**: persistent system instructions, the memory buffer,
//!   then the new user turn.
//! - **Grounded**: a single "stuff" prompt that places every retrieved
//!   passage above the question. No memory and no system instructions.

use crate::models::ChatMessage;

/// Instructions that precede the retrieved passages in a grounded call.
pub const GROUNDED_PREAMBLE: &str = "Use the following pieces of context to answer the question at the end. \
If you don't know the answer, just say that you don't know, don't try to make up an answer.";

/// Separator between passages in the grounded prompt.
const PASSAGE_SEPARATOR: &str = "\n\n";

/// `[system, ...history, user]`.
pub fn conversation_messages(
    system_prompt: &str,
    history: &[ChatMessage],
    input: &str,
) -> Vec<ChatMessage> {
    let mut messages = Vec::with_capacity(history.len() + 2);
    messages.push(ChatMessage::system(system_prompt));
    messages.extend(history.iter().cloned());
    messages.push(ChatMessage::user(input));
    messages
}

/// A single user message stuffing `passages` ahead of `question`.
pub fn grounded_messages<S: AsRef<str>>(passages: &[S], question: &str) -> Vec<ChatMessage> {
    let context = passages
        .iter()
        .map(|p| p.as_ref())
        .collect::<Vec<_>>()
        .join(PASSAGE_SEPARATOR);

    vec![ChatMessage::user(format!(
        "{}\n\n{}\n\nQuestion: {}\nHelpful Answer:",
        GROUNDED_PREAMBLE, context, question
    ))]
}
