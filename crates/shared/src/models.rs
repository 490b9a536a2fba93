use serde::{Deserialize, Serialize};

use crate::chat::{Chat, ChatMessage, DEFAULT_CHAT_TITLE, MAX_TURNS_PER_CHAT};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AskForm {
    #[serde(default)]
    pub msg: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerPayload {
    pub answer: String,
    pub message_count: u32,
    pub remaining_messages: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatSummary {
    pub id: String,
    pub title: String,
    pub created_at: String,
    pub message_count: u32,
    pub is_active: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListChatsResponse {
    pub chats: Vec<ChatSummary>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewChatResponse {
    pub success: bool,
    pub chat_id: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwitchChatResponse {
    pub success: bool,
    pub messages: Vec<ChatMessage>,
    pub title: String,
    pub message_count: u32,
}

impl From<Chat> for SwitchChatResponse {
    fn from(chat: Chat) -> Self {
        Self {
            success: true,
            messages: chat.messages,
            title: chat.title,
            message_count: chat.message_count,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentChatResponse {
    pub messages: Vec<ChatMessage>,
    pub title: String,
    pub message_count: u32,
    pub remaining_messages: u32,
}

impl From<Chat> for CurrentChatResponse {
    fn from(chat: Chat) -> Self {
        let remaining_messages = chat.remaining_turns();
        Self {
            messages: chat.messages,
            title: chat.title,
            message_count: chat.message_count,
            remaining_messages,
        }
    }
}

impl Default for CurrentChatResponse {
    fn default() -> Self {
        Self {
            messages: Vec::new(),
            title: DEFAULT_CHAT_TITLE.to_string(),
            message_count: 0,
            remaining_messages: MAX_TURNS_PER_CHAT,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuccessResponse {
    pub success: bool,
    pub message: String,
}

impl SuccessResponse {
    pub fn with_message(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OkResponse {
    pub ok: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}
