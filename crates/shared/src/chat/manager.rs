use std::sync::Arc;

use chrono::{DateTime, Local};
use tokio::sync::Mutex;
use tracing::info;
use uuid::Uuid;

use super::store::{ChatStore, ChatStoreData};
use super::{Chat, ChatError, SessionContext};
use crate::models::ChatSummary;

/// Chat lifecycle on top of a [`ChatStore`].
///
/// Every mutation is a full load, an in-memory transform, and a full save.
/// Within one process those cycles are serialized by `write_lock`; separate
/// processes sharing one store file still race with last-writer-wins.
#[derive(Clone)]
pub struct ChatSessionManager {
    store: Arc<dyn ChatStore>,
    write_lock: Arc<Mutex<()>>,
}

impl ChatSessionManager {
    pub fn new(store: Arc<dyn ChatStore>) -> Self {
        Self {
            store,
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Returns the session's user id, minting and registering one if needed.
    pub async fn get_or_create_user(
        &self,
        session: &mut SessionContext,
    ) -> Result<String, ChatError> {
        let user_id = match session.user_id.clone() {
            Some(user_id) => user_id,
            None => {
                let user_id = Uuid::new_v4().to_string();
                info!(user_id = %user_id, "new user session created");
                session.user_id = Some(user_id.clone());
                user_id
            }
        };

        let _guard = self.write_lock.lock().await;
        let mut data = self.store.load().await;
        if register_user(&mut data, &user_id) {
            self.store.save(&data).await?;
            info!(user_id = %user_id, "user added to chat store");
        }

        Ok(user_id)
    }

    pub async fn create_chat(
        &self,
        user_id: &str,
        now: DateTime<Local>,
    ) -> Result<Chat, ChatError> {
        let _guard = self.write_lock.lock().await;
        let mut data = self.store.load().await;
        let chat = insert_new_chat(&mut data, user_id, &now);
        self.store.save(&data).await?;

        info!(user_id = %user_id, chat_id = %chat.id, "chat created");
        Ok(chat)
    }

    /// Resolves the session's active chat, creating one when the pointer is
    /// missing or stale.
    pub async fn get_active_chat(
        &self,
        user_id: &str,
        session: &mut SessionContext,
        now: DateTime<Local>,
    ) -> Result<Chat, ChatError> {
        let _guard = self.write_lock.lock().await;
        let mut data = self.store.load().await;
        let user_registered = register_user(&mut data, user_id);

        if let Some(active_chat_id) = session.active_chat_id.as_deref()
            && let Some(chat) = data.chat(user_id, active_chat_id)
        {
            let chat = chat.clone();
            if user_registered {
                self.store.save(&data).await?;
            }
            return Ok(chat);
        }

        let chat = insert_new_chat(&mut data, user_id, &now);
        self.store.save(&data).await?;
        session.active_chat_id = Some(chat.id.clone());

        info!(user_id = %user_id, chat_id = %chat.id, "active chat created");
        Ok(chat)
    }

    pub async fn switch_active(
        &self,
        user_id: &str,
        chat_id: &str,
        session: &mut SessionContext,
    ) -> Result<Chat, ChatError> {
        let data = self.store.load().await;
        let chat = data.chat(user_id, chat_id).cloned().ok_or(ChatError::NotFound)?;
        session.active_chat_id = Some(chat.id.clone());

        info!(user_id = %user_id, chat_id = %chat_id, "active chat switched");
        Ok(chat)
    }

    /// Removes a chat. Deleting the active chat re-points the session at the
    /// oldest remaining chat, or at a fresh one when none remain.
    pub async fn delete_chat(
        &self,
        user_id: &str,
        chat_id: &str,
        session: &mut SessionContext,
        now: DateTime<Local>,
    ) -> Result<(), ChatError> {
        let _guard = self.write_lock.lock().await;
        let mut data = self.store.load().await;
        let removed = data
            .users
            .get_mut(user_id)
            .and_then(|chats| chats.remove(chat_id));
        if removed.is_none() {
            return Err(ChatError::NotFound);
        }

        if session.active_chat_id.as_deref() == Some(chat_id) {
            let next_active = match oldest_chat_id(&data, user_id) {
                Some(next_active) => next_active,
                None => insert_new_chat(&mut data, user_id, &now).id,
            };
            session.active_chat_id = Some(next_active);
        }

        self.store.save(&data).await?;
        info!(
            user_id = %user_id,
            chat_id = %chat_id,
            active_chat_id = session.active_chat_id.as_deref().unwrap_or_default(),
            "chat deleted"
        );
        Ok(())
    }

    /// Appends one exchange to the stored copy of the chat and persists it.
    /// Rejects the turn without touching the store when the chat is at quota.
    pub async fn record_turn(
        &self,
        user_id: &str,
        chat_id: &str,
        user_text: &str,
        assistant_text: &str,
        now: DateTime<Local>,
    ) -> Result<Chat, ChatError> {
        let _guard = self.write_lock.lock().await;
        let mut data = self.store.load().await;
        let chat = data.chat_mut(user_id, chat_id).ok_or(ChatError::NotFound)?;
        chat.push_turn(user_text, assistant_text, &now)?;
        let chat = chat.clone();
        self.store.save(&data).await?;

        Ok(chat)
    }

    /// Chats for one user, newest first.
    pub async fn list_chats(
        &self,
        user_id: &str,
        active_chat_id: Option<&str>,
    ) -> Vec<ChatSummary> {
        let data = self.store.load().await;
        let Some(chats) = data.user_chats(user_id) else {
            return Vec::new();
        };

        let mut summaries = chats
            .values()
            .map(|chat| ChatSummary {
                id: chat.id.clone(),
                title: chat.title.clone(),
                created_at: chat.created_at.clone(),
                message_count: chat.message_count,
                is_active: active_chat_id == Some(chat.id.as_str()),
            })
            .collect::<Vec<_>>();
        summaries.sort_by(|left, right| right.created_at.cmp(&left.created_at));
        summaries
    }

    /// Wipes the whole store and forgets the caller's identity.
    pub async fn clear_all(&self, session: &mut SessionContext) -> Result<(), ChatError> {
        let _guard = self.write_lock.lock().await;
        self.store.clear().await?;
        session.clear();

        info!("chat store cleared");
        Ok(())
    }
}

fn register_user(data: &mut ChatStoreData, user_id: &str) -> bool {
    if data.users.contains_key(user_id) {
        return false;
    }
    data.users.insert(user_id.to_string(), Default::default());
    true
}

fn insert_new_chat(data: &mut ChatStoreData, user_id: &str, now: &DateTime<Local>) -> Chat {
    let chat = Chat::new(Uuid::new_v4().to_string(), now);
    data.users
        .entry(user_id.to_string())
        .or_default()
        .insert(chat.id.clone(), chat.clone());
    chat
}

fn oldest_chat_id(data: &ChatStoreData, user_id: &str) -> Option<String> {
    data.user_chats(user_id)?
        .values()
        .min_by(|left, right| {
            left.created_at
                .cmp(&right.created_at)
                .then_with(|| left.id.cmp(&right.id))
        })
        .map(|chat| chat.id.clone())
}
