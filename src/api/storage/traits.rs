//! Storage trait definitions for the API storage backends.

use crate::models::{Draft, Message, NewDraft, NewMessage, Stream, UserProfile};
use std::collections::BTreeMap;

/// Per-bot configuration (key/value pairs set when the bot was created).
pub type BotConfig = BTreeMap<String, String>;

/// Storage backend trait for database operations
#[async_trait::async_trait]
pub trait StorageBackend: Send + Sync {
    /// Get a user by ID
    async fn get_user(&self, user_id: i64) -> Result<Option<UserProfile>, super::StorageError>;

    /// Get a user by email (case-insensitive)
    async fn get_user_by_email(
        &self,
        email: &str,
    ) -> Result<Option<UserProfile>, super::StorageError>;

    /// Get an active user by API key
    async fn get_user_by_api_key(
        &self,
        api_key: &str,
    ) -> Result<Option<UserProfile>, super::StorageError>;

    /// Insert a user
    async fn create_user(&self, user: UserProfile) -> Result<UserProfile, super::StorageError>;

    /// Set the user's enable_drafts_synchronization flag
    async fn set_drafts_synchronization(
        &self,
        user_id: i64,
        enabled: bool,
    ) -> Result<(), super::StorageError>;

    /// Get a stream by ID
    async fn get_stream(&self, stream_id: i64) -> Result<Option<Stream>, super::StorageError>;

    /// Get a stream by name within a realm (case-insensitive)
    async fn get_stream_by_name(
        &self,
        realm_id: i64,
        name: &str,
    ) -> Result<Option<Stream>, super::StorageError>;

    /// Insert a stream
    async fn create_stream(&self, stream: Stream) -> Result<Stream, super::StorageError>;

    /// List a user's drafts ordered by last_edit_time
    async fn list_drafts(&self, user_id: i64) -> Result<Vec<Draft>, super::StorageError>;

    /// Get a draft owned by `user_id`
    async fn get_draft(
        &self,
        user_id: i64,
        draft_id: i64,
    ) -> Result<Option<Draft>, super::StorageError>;

    /// Insert drafts atomically, returning them with their new IDs in input order
    async fn create_drafts(&self, drafts: Vec<NewDraft>)
    -> Result<Vec<Draft>, super::StorageError>;

    /// Replace a draft's contents
    async fn update_draft(&self, draft: Draft) -> Result<Draft, super::StorageError>;

    /// Delete a draft owned by `user_id`; returns whether a row was removed
    async fn delete_draft(&self, user_id: i64, draft_id: i64) -> Result<bool, super::StorageError>;

    /// Delete all of a user's drafts; returns how many were removed
    async fn delete_all_drafts(&self, user_id: i64) -> Result<u64, super::StorageError>;

    /// Store a sent message
    async fn create_message(&self, message: NewMessage) -> Result<Message, super::StorageError>;

    /// Messages sent by a user, oldest first
    async fn list_messages_by_sender(
        &self,
        sender_id: i64,
    ) -> Result<Vec<Message>, super::StorageError>;

    /// Get a bot's configuration (empty when unset)
    async fn get_bot_config(&self, bot_id: i64) -> Result<BotConfig, super::StorageError>;

    /// Set one bot configuration entry
    async fn set_bot_config(
        &self,
        bot_id: i64,
        key: String,
        value: String,
    ) -> Result<(), super::StorageError>;
}
