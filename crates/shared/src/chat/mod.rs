use chrono::{DateTime, TimeZone};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod context;
pub mod manager;
pub mod store;

pub use context::{HISTORY_WINDOW_MESSAGES, NO_PREVIOUS_CONVERSATION, format_chat_history};
pub use manager::ChatSessionManager;
pub use store::{ChatStore, ChatStoreData, JsonFileStore, StoreError, UserChats};

pub const MAX_TURNS_PER_CHAT: u32 = 10;
pub const MAX_MESSAGE_CHARS: usize = 500;
pub const DEFAULT_CHAT_TITLE: &str = "New Chat";
pub const UNKNOWN_CREATED_AT: &str = "Unknown";
pub const CREATED_AT_FORMAT: &str = "%Y-%m-%d %H:%M";
pub const MESSAGE_TIMESTAMP_FORMAT: &str = "%H:%M";

const TITLE_MIN_SOURCE_CHARS: usize = 10;
const TITLE_MAX_CHARS: usize = 30;
const TITLE_ELLIPSIS: &str = "...";

#[derive(Debug, Error)]
pub enum ChatError {
    #[error("message is empty")]
    EmptyInput,
    #[error("message exceeds {max_chars} characters")]
    TooLong { max_chars: usize },
    #[error("chat reached its limit of {max_turns} turns")]
    QuotaExceeded { max_turns: u32 },
    #[error("chat not found")]
    NotFound,
    #[error("answer generation failed: {0}")]
    GenerationFailed(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Per-browser identity and active-chat pointer, persisted by the HTTP boundary.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionContext {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_chat_id: Option<String>,
}

impl SessionContext {
    pub fn is_empty(&self) -> bool {
        self.user_id.is_none() && self.active_chat_id.is_none()
    }

    pub fn clear(&mut self) {
        self.user_id = None;
        self.active_chat_id = None;
    }
}

/// Anything other than `user` in a stored record is read as an assistant reply.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageType {
    User,
    #[default]
    #[serde(other)]
    Assistant,
}

impl MessageType {
    pub fn speaker_label(self) -> &'static str {
        match self {
            Self::User => "Human",
            Self::Assistant => "Assistant",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    #[serde(rename = "type", default)]
    pub message_type: MessageType,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub timestamp: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chat {
    #[serde(default)]
    pub id: String,
    #[serde(default = "default_chat_title")]
    pub title: String,
    #[serde(default = "unknown_created_at")]
    pub created_at: String,
    #[serde(default)]
    pub messages: Vec<ChatMessage>,
    #[serde(default)]
    pub message_count: u32,
}

impl Chat {
    pub fn new<Tz: TimeZone>(id: impl Into<String>, now: &DateTime<Tz>) -> Self
    where
        Tz::Offset: std::fmt::Display,
    {
        Self {
            id: id.into(),
            title: DEFAULT_CHAT_TITLE.to_string(),
            created_at: now.format(CREATED_AT_FORMAT).to_string(),
            messages: Vec::new(),
            message_count: 0,
        }
    }

    pub fn is_at_quota(&self) -> bool {
        self.message_count >= MAX_TURNS_PER_CHAT
    }

    pub fn remaining_turns(&self) -> u32 {
        MAX_TURNS_PER_CHAT.saturating_sub(self.message_count)
    }

    /// Appends one user/assistant exchange. Leaves the chat untouched when the
    /// quota is already used up.
    pub fn push_turn<Tz: TimeZone>(
        &mut self,
        user_text: &str,
        assistant_text: &str,
        now: &DateTime<Tz>,
    ) -> Result<(), ChatError>
    where
        Tz::Offset: std::fmt::Display,
    {
        if self.is_at_quota() {
            return Err(ChatError::QuotaExceeded {
                max_turns: MAX_TURNS_PER_CHAT,
            });
        }

        let timestamp = now.format(MESSAGE_TIMESTAMP_FORMAT).to_string();
        self.messages.push(ChatMessage {
            message_type: MessageType::User,
            content: user_text.to_string(),
            timestamp: timestamp.clone(),
        });
        self.messages.push(ChatMessage {
            message_type: MessageType::Assistant,
            content: assistant_text.to_string(),
            timestamp,
        });
        self.message_count += 1;

        if self.message_count == 1 {
            self.assign_title_from(user_text);
        }

        Ok(())
    }

    fn assign_title_from(&mut self, user_text: &str) {
        if self.title != DEFAULT_CHAT_TITLE {
            return;
        }
        if let Some(title) = title_from_message(user_text) {
            self.title = title;
        }
    }
}

/// Derives a chat title from the first question, or `None` when it is too short.
pub fn title_from_message(message: &str) -> Option<String> {
    let char_count = message.chars().count();
    if char_count <= TITLE_MIN_SOURCE_CHARS {
        return None;
    }
    if char_count <= TITLE_MAX_CHARS {
        return Some(message.to_string());
    }

    let mut title = message.chars().take(TITLE_MAX_CHARS).collect::<String>();
    title.push_str(TITLE_ELLIPSIS);
    Some(title)
}

fn default_chat_title() -> String {
    DEFAULT_CHAT_TITLE.to_string()
}

fn unknown_created_at() -> String {
    UNKNOWN_CREATED_AT.to_string()
}
