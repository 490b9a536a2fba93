use std::collections::BTreeMap;
use std::ffi::OsString;
use std::future::Future;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::pin::Pin;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use super::Chat;

pub type UserChats = BTreeMap<String, Chat>;

pub type StoreLoadFuture<'a> = Pin<Box<dyn Future<Output = ChatStoreData> + Send + 'a>>;
pub type StoreWriteFuture<'a> = Pin<Box<dyn Future<Output = Result<(), StoreError>> + Send + 'a>>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("chat store io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("chat store serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Whole-store snapshot: `user_id -> chat_id -> chat`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChatStoreData {
    pub users: BTreeMap<String, UserChats>,
}

impl ChatStoreData {
    pub fn user_chats(&self, user_id: &str) -> Option<&UserChats> {
        self.users.get(user_id)
    }

    pub fn chat(&self, user_id: &str, chat_id: &str) -> Option<&Chat> {
        self.users.get(user_id)?.get(chat_id)
    }

    pub fn chat_mut(&mut self, user_id: &str, chat_id: &str) -> Option<&mut Chat> {
        self.users.get_mut(user_id)?.get_mut(chat_id)
    }

    /// Map keys are authoritative for chat ids.
    fn normalize_chat_ids(&mut self) {
        for chats in self.users.values_mut() {
            for (chat_id, chat) in chats.iter_mut() {
                if chat.id != *chat_id {
                    chat.id = chat_id.clone();
                }
            }
        }
    }
}

/// Durable backing for chat state. Every call goes to storage; nothing is cached.
pub trait ChatStore: Send + Sync {
    /// Never fails: missing or unreadable storage yields an empty store.
    fn load<'a>(&'a self) -> StoreLoadFuture<'a>;

    fn save<'a>(&'a self, data: &'a ChatStoreData) -> StoreWriteFuture<'a>;

    /// Drops every user and chat.
    fn clear<'a>(&'a self) -> StoreWriteFuture<'a>;
}

#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_snapshot(&self) -> ChatStoreData {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == ErrorKind::NotFound => return ChatStoreData::default(),
            Err(err) => {
                warn!(
                    path = %self.path.display(),
                    error = %err,
                    "chat store unreadable; treating as empty"
                );
                return ChatStoreData::default();
            }
        };

        match serde_json::from_slice::<ChatStoreData>(&bytes) {
            Ok(mut data) => {
                data.normalize_chat_ids();
                data
            }
            Err(err) => {
                warn!(
                    path = %self.path.display(),
                    error = %err,
                    "chat store is corrupt; treating as empty"
                );
                ChatStoreData::default()
            }
        }
    }

    async fn write_snapshot(&self, data: &ChatStoreData) -> Result<(), StoreError> {
        let body = serde_json::to_vec_pretty(data)?;

        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await?;
        }

        let staging_path = staging_path(&self.path);
        tokio::fs::write(&staging_path, &body).await?;
        tokio::fs::rename(&staging_path, &self.path).await?;

        debug!(
            path = %self.path.display(),
            users = data.users.len(),
            bytes = body.len(),
            "chat store saved"
        );
        Ok(())
    }

    async fn remove_file(&self) -> Result<(), StoreError> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

impl ChatStore for JsonFileStore {
    fn load<'a>(&'a self) -> StoreLoadFuture<'a> {
        Box::pin(self.read_snapshot())
    }

    fn save<'a>(&'a self, data: &'a ChatStoreData) -> StoreWriteFuture<'a> {
        Box::pin(self.write_snapshot(data))
    }

    fn clear<'a>(&'a self) -> StoreWriteFuture<'a> {
        Box::pin(self.remove_file())
    }
}

fn staging_path(path: &Path) -> PathBuf {
    let mut file_name = path
        .file_name()
        .map(OsString::from)
        .unwrap_or_else(|| OsString::from("chat_sessions.json"));
    file_name.push(".tmp");
    path.with_file_name(file_name)
}
