use super::ChatMessage;

pub const NO_PREVIOUS_CONVERSATION: &str = "No previous conversation.";

/// Three user/assistant pairs.
pub const HISTORY_WINDOW_MESSAGES: usize = 6;

/// Renders the tail of a chat log as `Human: ...` / `Assistant: ...` lines.
pub fn format_chat_history(messages: &[ChatMessage]) -> String {
    if messages.is_empty() {
        return NO_PREVIOUS_CONVERSATION.to_string();
    }

    let window_start = messages.len().saturating_sub(HISTORY_WINDOW_MESSAGES);
    messages[window_start..]
        .iter()
        .map(|message| {
            format!(
                "{}: {}",
                message.message_type.speaker_label(),
                message.content
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}
