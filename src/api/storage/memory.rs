//! In-memory storage backend.
//!
//! Used when no DATABASE_URL is configured and by the test suite. All tables
//! live behind one RwLock so multi-row writes are atomic.

use super::{StorageError, traits::*};
use crate::models::{Draft, Message, NewDraft, NewMessage, Stream, UserProfile};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::{BTreeMap, HashMap};
use tokio::sync::RwLock;

#[derive(Default)]
struct Tables {
    users: BTreeMap<i64, UserProfile>,
    streams: BTreeMap<i64, Stream>,
    drafts: BTreeMap<i64, Draft>,
    messages: Vec<Message>,
    bot_configs: HashMap<i64, BotConfig>,
    next_draft_id: i64,
    next_message_id: i64,
}

/// In-memory storage backend.
#[derive(Default)]
pub struct MemoryStorageBackend {
    tables: RwLock<Tables>,
}

impl MemoryStorageBackend {
    /// Create an empty memory storage backend.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StorageBackend for MemoryStorageBackend {
    async fn get_user(&self, user_id: i64) -> Result<Option<UserProfile>, StorageError> {
        Ok(self.tables.read().await.users.get(&user_id).cloned())
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<UserProfile>, StorageError> {
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .values()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn get_user_by_api_key(
        &self,
        api_key: &str,
    ) -> Result<Option<UserProfile>, StorageError> {
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .values()
            .find(|u| u.is_active && u.api_key == api_key)
            .cloned())
    }

    async fn create_user(&self, user: UserProfile) -> Result<UserProfile, StorageError> {
        let mut tables = self.tables.write().await;
        let email_taken = tables
            .users
            .values()
            .any(|u| u.email.eq_ignore_ascii_case(&user.email));
        if tables.users.contains_key(&user.id) || email_taken {
            return Err(StorageError::Duplicate {
                entity_type: "user".to_string(),
                key: user.email,
            });
        }
        tables.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn set_drafts_synchronization(
        &self,
        user_id: i64,
        enabled: bool,
    ) -> Result<(), StorageError> {
        let mut tables = self.tables.write().await;
        let user = tables
            .users
            .get_mut(&user_id)
            .ok_or_else(|| StorageError::not_found("user", user_id))?;
        user.enable_drafts_synchronization = enabled;
        Ok(())
    }

    async fn get_stream(&self, stream_id: i64) -> Result<Option<Stream>, StorageError> {
        Ok(self.tables.read().await.streams.get(&stream_id).cloned())
    }

    async fn get_stream_by_name(
        &self,
        realm_id: i64,
        name: &str,
    ) -> Result<Option<Stream>, StorageError> {
        let tables = self.tables.read().await;
        Ok(tables
            .streams
            .values()
            .find(|s| s.realm_id == realm_id && s.name.eq_ignore_ascii_case(name))
            .cloned())
    }

    async fn create_stream(&self, stream: Stream) -> Result<Stream, StorageError> {
        let mut tables = self.tables.write().await;
        let name_taken = tables
            .streams
            .values()
            .any(|s| s.realm_id == stream.realm_id && s.name.eq_ignore_ascii_case(&stream.name));
        if tables.streams.contains_key(&stream.id) || name_taken {
            return Err(StorageError::Duplicate {
                entity_type: "stream".to_string(),
                key: stream.name,
            });
        }
        tables.streams.insert(stream.id, stream.clone());
        Ok(stream)
    }

    async fn list_drafts(&self, user_id: i64) -> Result<Vec<Draft>, StorageError> {
        let tables = self.tables.read().await;
        let mut drafts: Vec<Draft> = tables
            .drafts
            .values()
            .filter(|d| d.user_id == user_id)
            .cloned()
            .collect();
        // Stable sort keeps insertion (id) order for equal edit times.
        drafts.sort_by_key(|d| d.last_edit_time);
        Ok(drafts)
    }

    async fn get_draft(&self, user_id: i64, draft_id: i64) -> Result<Option<Draft>, StorageError> {
        let tables = self.tables.read().await;
        Ok(tables
            .drafts
            .get(&draft_id)
            .filter(|d| d.user_id == user_id)
            .cloned())
    }

    async fn create_drafts(&self, drafts: Vec<NewDraft>) -> Result<Vec<Draft>, StorageError> {
        let mut tables = self.tables.write().await;
        let mut created = Vec::with_capacity(drafts.len());
        for new_draft in drafts {
            tables.next_draft_id += 1;
            let draft = new_draft.into_draft(tables.next_draft_id);
            tables.drafts.insert(draft.id, draft.clone());
            created.push(draft);
        }
        Ok(created)
    }

    async fn update_draft(&self, draft: Draft) -> Result<Draft, StorageError> {
        let mut tables = self.tables.write().await;
        match tables.drafts.get_mut(&draft.id) {
            Some(existing) if existing.user_id == draft.user_id => {
                *existing = draft.clone();
                Ok(draft)
            }
            _ => Err(StorageError::not_found("draft", draft.id)),
        }
    }

    async fn delete_draft(&self, user_id: i64, draft_id: i64) -> Result<bool, StorageError> {
        let mut tables = self.tables.write().await;
        let owned = tables
            .drafts
            .get(&draft_id)
            .is_some_and(|d| d.user_id == user_id);
        if owned {
            tables.drafts.remove(&draft_id);
        }
        Ok(owned)
    }

    async fn delete_all_drafts(&self, user_id: i64) -> Result<u64, StorageError> {
        let mut tables = self.tables.write().await;
        let before = tables.drafts.len();
        tables.drafts.retain(|_, d| d.user_id != user_id);
        Ok((before - tables.drafts.len()) as u64)
    }

    async fn create_message(&self, message: NewMessage) -> Result<Message, StorageError> {
        let mut tables = self.tables.write().await;
        tables.next_message_id += 1;
        let message = message.into_message(tables.next_message_id, Utc::now());
        tables.messages.push(message.clone());
        Ok(message)
    }

    async fn list_messages_by_sender(&self, sender_id: i64) -> Result<Vec<Message>, StorageError> {
        let tables = self.tables.read().await;
        Ok(tables
            .messages
            .iter()
            .filter(|m| m.sender_id == sender_id)
            .cloned()
            .collect())
    }

    async fn get_bot_config(&self, bot_id: i64) -> Result<BotConfig, StorageError> {
        let tables = self.tables.read().await;
        Ok(tables.bot_configs.get(&bot_id).cloned().unwrap_or_default())
    }

    async fn set_bot_config(
        &self,
        bot_id: i64,
        key: String,
        value: String,
    ) -> Result<(), StorageError> {
        let mut tables = self.tables.write().await;
        tables.bot_configs.entry(bot_id).or_default().insert(key, value);
        Ok(())
    }
}
