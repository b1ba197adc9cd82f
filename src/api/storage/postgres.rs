//! PostgreSQL storage backend implementation.
//!
//! Uses sqlx for database operations and implements the StorageBackend trait.

use super::{StorageError, traits::*};
use crate::models::{Draft, Message, NewDraft, NewMessage, Recipient, Stream, UserProfile};
use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};

const USER_COLUMNS: &str = "id, realm_id, email, full_name, api_key, is_active, is_bot, \
                            bot_owner_id, enable_drafts_synchronization";
const DRAFT_COLUMNS: &str =
    "id, user_id, recipient_kind, recipient_ids, topic, content, last_edit_time";
const MESSAGE_COLUMNS: &str =
    "id, sender_id, recipient_kind, recipient_ids, topic, content, date_sent";

/// PostgreSQL storage backend implementation.
pub struct PostgresStorageBackend {
    pool: PgPool,
}

impl PostgresStorageBackend {
    /// Create a new PostgreSQL storage backend.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect to `database_url` and run the bundled migrations.
    pub async fn connect(database_url: &str) -> Result<Self, StorageError> {
        let pool = PgPool::connect(database_url).await.map_err(|e| {
            StorageError::ConnectionError(format!("Failed to connect to database: {}", e))
        })?;
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| StorageError::ConnectionError(format!("Migration failed: {}", e)))?;
        Ok(Self::new(pool))
    }
}

fn user_from_row(row: &PgRow) -> Result<UserProfile, StorageError> {
    Ok(UserProfile {
        id: row.try_get("id")?,
        realm_id: row.try_get("realm_id")?,
        email: row.try_get("email")?,
        full_name: row.try_get("full_name")?,
        api_key: row.try_get("api_key")?,
        is_active: row.try_get("is_active")?,
        is_bot: row.try_get("is_bot")?,
        bot_owner_id: row.try_get("bot_owner_id")?,
        enable_drafts_synchronization: row.try_get("enable_drafts_synchronization")?,
    })
}

fn stream_from_row(row: &PgRow) -> Result<Stream, StorageError> {
    Ok(Stream {
        id: row.try_get("id")?,
        realm_id: row.try_get("realm_id")?,
        name: row.try_get("name")?,
        invite_only: row.try_get("invite_only")?,
        subscribers: row.try_get("subscribers")?,
    })
}

fn recipient_from_columns(
    kind: Option<String>,
    ids: Option<Vec<i64>>,
) -> Result<Option<Recipient>, StorageError> {
    match (kind, ids) {
        (Some(kind), Some(ids)) => Recipient::from_parts(&kind, ids)
            .map(Some)
            .ok_or_else(|| StorageError::Other(format!("Malformed recipient of kind {}", kind))),
        _ => Ok(None),
    }
}

fn draft_from_row(row: &PgRow) -> Result<Draft, StorageError> {
    Ok(Draft {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        recipient: recipient_from_columns(
            row.try_get("recipient_kind")?,
            row.try_get("recipient_ids")?,
        )?,
        topic: row.try_get("topic")?,
        content: row.try_get("content")?,
        last_edit_time: row.try_get("last_edit_time")?,
    })
}

fn message_from_row(row: &PgRow) -> Result<Message, StorageError> {
    let recipient = recipient_from_columns(
        row.try_get("recipient_kind")?,
        row.try_get("recipient_ids")?,
    )?
    .ok_or_else(|| StorageError::Other("Message without recipient".to_string()))?;
    Ok(Message {
        id: row.try_get("id")?,
        sender_id: row.try_get("sender_id")?,
        recipient,
        topic: row.try_get("topic")?,
        content: row.try_get("content")?,
        date_sent: row.try_get("date_sent")?,
    })
}

fn map_unique_violation(e: sqlx::Error, entity_type: &str, key: &str) -> StorageError {
    match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => StorageError::Duplicate {
            entity_type: entity_type.to_string(),
            key: key.to_string(),
        },
        _ => e.into(),
    }
}

#[async_trait]
impl StorageBackend for PostgresStorageBackend {
    async fn get_user(&self, user_id: i64) -> Result<Option<UserProfile>, StorageError> {
        let row = sqlx::query(&format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS))
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(user_from_row).transpose()
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<UserProfile>, StorageError> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM users WHERE LOWER(email) = LOWER($1)",
            USER_COLUMNS
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(user_from_row).transpose()
    }

    async fn get_user_by_api_key(
        &self,
        api_key: &str,
    ) -> Result<Option<UserProfile>, StorageError> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM users WHERE api_key = $1 AND is_active",
            USER_COLUMNS
        ))
        .bind(api_key)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(user_from_row).transpose()
    }

    async fn create_user(&self, user: UserProfile) -> Result<UserProfile, StorageError> {
        sqlx::query(&format!(
            "INSERT INTO users ({}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
            USER_COLUMNS
        ))
        .bind(user.id)
        .bind(user.realm_id)
        .bind(&user.email)
        .bind(&user.full_name)
        .bind(&user.api_key)
        .bind(user.is_active)
        .bind(user.is_bot)
        .bind(user.bot_owner_id)
        .bind(user.enable_drafts_synchronization)
        .execute(&self.pool)
        .await
        .map_err(|e| map_unique_violation(e, "user", &user.email))?;
        Ok(user)
    }

    async fn set_drafts_synchronization(
        &self,
        user_id: i64,
        enabled: bool,
    ) -> Result<(), StorageError> {
        let result =
            sqlx::query("UPDATE users SET enable_drafts_synchronization = $2 WHERE id = $1")
                .bind(user_id)
                .bind(enabled)
                .execute(&self.pool)
                .await?;
        if result.rows_affected() == 0 {
            return Err(StorageError::not_found("user", user_id));
        }
        Ok(())
    }

    async fn get_stream(&self, stream_id: i64) -> Result<Option<Stream>, StorageError> {
        let row = sqlx::query(
            "SELECT id, realm_id, name, invite_only, subscribers FROM streams WHERE id = $1",
        )
        .bind(stream_id)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(stream_from_row).transpose()
    }

    async fn get_stream_by_name(
        &self,
        realm_id: i64,
        name: &str,
    ) -> Result<Option<Stream>, StorageError> {
        let row = sqlx::query(
            r#"
            SELECT id, realm_id, name, invite_only, subscribers
            FROM streams
            WHERE realm_id = $1 AND LOWER(name) = LOWER($2)
            "#,
        )
        .bind(realm_id)
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(stream_from_row).transpose()
    }

    async fn create_stream(&self, stream: Stream) -> Result<Stream, StorageError> {
        sqlx::query(
            r#"
            INSERT INTO streams (id, realm_id, name, invite_only, subscribers)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(stream.id)
        .bind(stream.realm_id)
        .bind(&stream.name)
        .bind(stream.invite_only)
        .bind(&stream.subscribers)
        .execute(&self.pool)
        .await
        .map_err(|e| map_unique_violation(e, "stream", &stream.name))?;
        Ok(stream)
    }

    async fn list_drafts(&self, user_id: i64) -> Result<Vec<Draft>, StorageError> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM drafts WHERE user_id = $1 ORDER BY last_edit_time, id",
            DRAFT_COLUMNS
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(draft_from_row).collect()
    }

    async fn get_draft(&self, user_id: i64, draft_id: i64) -> Result<Option<Draft>, StorageError> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM drafts WHERE id = $1 AND user_id = $2",
            DRAFT_COLUMNS
        ))
        .bind(draft_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(draft_from_row).transpose()
    }

    async fn create_drafts(&self, drafts: Vec<NewDraft>) -> Result<Vec<Draft>, StorageError> {
        let mut tx = self.pool.begin().await?;
        let mut created = Vec::with_capacity(drafts.len());
        for new_draft in drafts {
            let (kind, ids) = match &new_draft.recipient {
                Some(recipient) => (Some(recipient.kind()), Some(recipient.ids())),
                None => (None, None),
            };
            let id: i64 = sqlx::query_scalar(
                r#"
                INSERT INTO drafts (user_id, recipient_kind, recipient_ids, topic, content, last_edit_time)
                VALUES ($1, $2, $3, $4, $5, $6)
                RETURNING id
                "#,
            )
            .bind(new_draft.user_id)
            .bind(kind)
            .bind(ids)
            .bind(&new_draft.topic)
            .bind(&new_draft.content)
            .bind(new_draft.last_edit_time)
            .fetch_one(&mut *tx)
            .await?;
            created.push(new_draft.into_draft(id));
        }
        tx.commit().await?;
        Ok(created)
    }

    async fn update_draft(&self, draft: Draft) -> Result<Draft, StorageError> {
        let (kind, ids) = match &draft.recipient {
            Some(recipient) => (Some(recipient.kind()), Some(recipient.ids())),
            None => (None, None),
        };
        let result = sqlx::query(
            r#"
            UPDATE drafts
            SET recipient_kind = $3, recipient_ids = $4, topic = $5, content = $6, last_edit_time = $7
            WHERE id = $1 AND user_id = $2
            "#,
        )
        .bind(draft.id)
        .bind(draft.user_id)
        .bind(kind)
        .bind(ids)
        .bind(&draft.topic)
        .bind(&draft.content)
        .bind(draft.last_edit_time)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(StorageError::not_found("draft", draft.id));
        }
        Ok(draft)
    }

    async fn delete_draft(&self, user_id: i64, draft_id: i64) -> Result<bool, StorageError> {
        let result = sqlx::query("DELETE FROM drafts WHERE id = $1 AND user_id = $2")
            .bind(draft_id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_all_drafts(&self, user_id: i64) -> Result<u64, StorageError> {
        let result = sqlx::query("DELETE FROM drafts WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn create_message(&self, message: NewMessage) -> Result<Message, StorageError> {
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO messages (sender_id, recipient_kind, recipient_ids, topic, content)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {}
            "#,
            MESSAGE_COLUMNS
        ))
        .bind(message.sender_id)
        .bind(message.recipient.kind())
        .bind(message.recipient.ids())
        .bind(&message.topic)
        .bind(&message.content)
        .fetch_one(&self.pool)
        .await?;
        message_from_row(&row)
    }

    async fn list_messages_by_sender(&self, sender_id: i64) -> Result<Vec<Message>, StorageError> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM messages WHERE sender_id = $1 ORDER BY id",
            MESSAGE_COLUMNS
        ))
        .bind(sender_id)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(message_from_row).collect()
    }

    async fn get_bot_config(&self, bot_id: i64) -> Result<BotConfig, StorageError> {
        let rows = sqlx::query("SELECT key, value FROM bot_configs WHERE bot_id = $1")
            .bind(bot_id)
            .fetch_all(&self.pool)
            .await?;
        rows.iter()
            .map(|row| -> Result<(String, String), StorageError> {
                Ok((row.try_get("key")?, row.try_get("value")?))
            })
            .collect()
    }

    async fn set_bot_config(
        &self,
        bot_id: i64,
        key: String,
        value: String,
    ) -> Result<(), StorageError> {
        sqlx::query(
            r#"
            INSERT INTO bot_configs (bot_id, key, value)
            VALUES ($1, $2, $3)
            ON CONFLICT (bot_id, key) DO UPDATE SET value = EXCLUDED.value
            "#,
        )
        .bind(bot_id)
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
