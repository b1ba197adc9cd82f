//! Draft service - validation and persistence of message drafts.
//!
//! Drafts arrive as loosely-typed JSON objects. They are checked in two
//! passes: `validate_draft_value` checks the shape of the object, then
//! `DraftService::further_validate` sanitises the values and resolves the
//! recipient against the caller's realm.

use crate::config::MessageLimits;
use crate::models::{Draft, DraftType, NewDraft, Recipient, UserProfile};
use crate::storage::{StorageBackend, StorageError};
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::collections::BTreeSet;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

pub const MESSAGE_TRUNCATION_SUFFIX: &str = "\n[message truncated]";
pub const TOPIC_TRUNCATION_SUFFIX: &str = "...";

const REQUIRED_KEYS: [&str; 4] = ["type", "to", "topic", "content"];
const OPTIONAL_KEYS: [&str; 1] = ["timestamp"];

#[derive(Error, Debug)]
pub enum DraftError {
    /// The request was malformed or failed a business rule
    #[error("{0}")]
    Invalid(String),
    #[error("Draft does not exist")]
    NotFound,
    #[error("User has not enabled drafts syncing.")]
    SyncDisabled,
    #[error(transparent)]
    Storage(#[from] StorageError),
}

fn invalid(message: impl Into<String>) -> DraftError {
    DraftError::Invalid(message.into())
}

/// A draft whose structure has been checked but whose values have not.
#[derive(Debug, Clone, PartialEq)]
pub struct DraftInput {
    pub draft_type: DraftType,
    pub to: Vec<i64>,
    pub topic: String,
    pub content: String,
    /// Unix timestamp; defaults to now when absent.
    pub timestamp: Option<f64>,
}

/// A fully validated draft, ready to be attached to a user.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedDraft {
    pub recipient: Option<Recipient>,
    pub topic: String,
    pub content: String,
    pub last_edit_time: DateTime<Utc>,
}

fn expect_string(value: &Value, var_name: &str) -> Result<String, DraftError> {
    value
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| invalid(format!("{} is not a string", var_name)))
}

fn required_field<'a>(
    object: &'a serde_json::Map<String, Value>,
    key: &str,
    var_name: &str,
) -> Result<&'a Value, DraftError> {
    object
        .get(key)
        .ok_or_else(|| invalid(format!("{} key is missing from {}", key, var_name)))
}

/// Check that `value` is a draft object. Each required key is checked for
/// presence and type in turn, then the optional timestamp, and unknown keys
/// last, so the first problem found is the one reported.
pub fn validate_draft_value(value: &Value, var_name: &str) -> Result<DraftInput, DraftError> {
    let object = value
        .as_object()
        .ok_or_else(|| invalid(format!("{} is not a dict", var_name)))?;

    let field = |key: &'static str| required_field(object, key, var_name);

    let type_var = format!("{}[\"type\"]", var_name);
    let draft_type = DraftType::parse(&expect_string(field("type")?, &type_var)?)
        .ok_or_else(|| invalid(format!("Invalid {}", type_var)))?;

    let to_var = format!("{}[\"to\"]", var_name);
    let to = field("to")?
        .as_array()
        .ok_or_else(|| invalid(format!("{} is not a list", to_var)))?
        .iter()
        .enumerate()
        .map(|(i, item)| {
            item.as_i64()
                .ok_or_else(|| invalid(format!("{}[{}] is not an integer", to_var, i)))
        })
        .collect::<Result<Vec<i64>, DraftError>>()?;

    let topic = expect_string(field("topic")?, &format!("{}[\"topic\"]", var_name))?;

    let content_var = format!("{}[\"content\"]", var_name);
    let content = expect_string(field("content")?, &content_var)?;
    if content.trim().is_empty() {
        return Err(invalid(format!("{} cannot be blank.", content_var)));
    }

    let timestamp = match object.get("timestamp") {
        None => None,
        Some(ts) => Some(ts.as_f64().ok_or_else(|| {
            invalid(format!(
                "{}[\"timestamp\"] is not an allowed_type",
                var_name
            ))
        })?),
    };

    let unexpected: BTreeSet<&str> = object
        .keys()
        .map(String::as_str)
        .filter(|k| !REQUIRED_KEYS.contains(k) && !OPTIONAL_KEYS.contains(k))
        .collect();
    if !unexpected.is_empty() {
        let keys: Vec<&str> = unexpected.into_iter().collect();
        return Err(invalid(format!("Unexpected arguments: {}", keys.join(", "))));
    }

    Ok(DraftInput {
        draft_type,
        to,
        topic,
        content,
        timestamp,
    })
}

/// Parse a JSON-encoded list of drafts, as sent in the `drafts` parameter.
pub fn parse_draft_list(raw: &str, var_name: &str) -> Result<Vec<DraftInput>, DraftError> {
    let value: Value = serde_json::from_str(raw)
        .map_err(|_| invalid(format!("Argument \"{}\" is not valid JSON.", var_name)))?;
    let items = value
        .as_array()
        .ok_or_else(|| invalid(format!("{} is not a list", var_name)))?;
    items
        .iter()
        .enumerate()
        .map(|(i, item)| validate_draft_value(item, &format!("{}[{}]", var_name, i)))
        .collect()
}

/// Parse a single JSON-encoded draft, as sent in the `draft` parameter.
pub fn parse_draft(raw: &str, var_name: &str) -> Result<DraftInput, DraftError> {
    let value: Value = serde_json::from_str(raw)
        .map_err(|_| invalid(format!("Argument \"{}\" is not valid JSON.", var_name)))?;
    validate_draft_value(&value, var_name)
}

/// Cut `content` down to `max_length` characters, ending with `suffix`.
pub fn truncate_content(content: &str, max_length: usize, suffix: &str) -> String {
    if content.chars().count() <= max_length {
        return content.to_string();
    }
    let keep = max_length.saturating_sub(suffix.chars().count());
    let mut truncated: String = content.chars().take(keep).collect();
    truncated.push_str(suffix);
    truncated
}

/// Round a Unix timestamp to microseconds and convert it.
fn timestamp_to_datetime(timestamp: f64) -> Result<DateTime<Utc>, DraftError> {
    let micros = (timestamp * 1_000_000.0).round();
    if !micros.is_finite() || micros < 0.0 {
        return Err(invalid("Timestamp must not be negative."));
    }
    DateTime::from_timestamp_micros(micros as i64)
        .ok_or_else(|| invalid("Timestamp is out of range."))
}

/// Business logic for drafts.
#[derive(Clone)]
pub struct DraftService {
    storage: Arc<dyn StorageBackend>,
    limits: MessageLimits,
}

impl DraftService {
    pub fn new(storage: Arc<dyn StorageBackend>, limits: MessageLimits) -> Self {
        Self { storage, limits }
    }

    fn ensure_sync_enabled(user: &UserProfile) -> Result<(), DraftError> {
        if user.enable_drafts_synchronization {
            Ok(())
        } else {
            Err(DraftError::SyncDisabled)
        }
    }

    /// Sanitise a structurally valid draft and resolve its recipient.
    pub async fn further_validate(
        &self,
        input: &DraftInput,
        user: &UserProfile,
    ) -> Result<ValidatedDraft, DraftError> {
        let content = truncate_content(
            &input.content,
            self.limits.max_message_length,
            MESSAGE_TRUNCATION_SUFFIX,
        );
        if content.contains('\0') {
            return Err(invalid("Content must not contain null bytes"));
        }

        let timestamp = input
            .timestamp
            .unwrap_or_else(|| Utc::now().timestamp_micros() as f64 / 1_000_000.0);
        let last_edit_time = timestamp_to_datetime(timestamp)?;

        let mut topic = String::new();
        let mut recipient = None;
        match input.draft_type {
            DraftType::Stream => {
                topic = truncate_content(
                    &input.topic,
                    self.limits.max_topic_length,
                    TOPIC_TRUNCATION_SUFFIX,
                );
                if topic.contains('\0') {
                    return Err(invalid("Topic must not contain null bytes"));
                }
                let [stream_id] = input.to.as_slice() else {
                    return Err(invalid(
                        "Must specify exactly 1 stream ID for stream messages",
                    ));
                };
                let stream = self
                    .storage
                    .get_stream(*stream_id)
                    .await?
                    .filter(|s| s.is_accessible_by(user.id, user.realm_id))
                    .ok_or_else(|| invalid("Invalid stream id"))?;
                recipient = Some(Recipient::Stream(stream.id));
            }
            DraftType::Private if !input.to.is_empty() => {
                let user_ids: BTreeSet<i64> = input.to.iter().copied().collect();
                let mut targets = Vec::with_capacity(user_ids.len());
                for user_id in &user_ids {
                    let target = self
                        .storage
                        .get_user(*user_id)
                        .await?
                        .filter(|u| u.realm_id == user.realm_id)
                        .ok_or_else(|| invalid(format!("Invalid user ID {}", user_id)))?;
                    targets.push(target);
                }
                if let Some(former) = targets.iter().find(|u| !u.is_active) {
                    return Err(invalid(format!(
                        "'{}' is no longer using Zulip.",
                        former.email
                    )));
                }
                let user_ids: Vec<i64> = user_ids.into_iter().collect();
                recipient = Some(Recipient::for_private_message(user.id, &user_ids));
            }
            DraftType::Private | DraftType::Unaddressed => {}
        }

        Ok(ValidatedDraft {
            recipient,
            topic,
            content,
            last_edit_time,
        })
    }

    /// The user's drafts, oldest edit first.
    pub async fn fetch_drafts(&self, user: &UserProfile) -> Result<Vec<Draft>, DraftError> {
        Self::ensure_sync_enabled(user)?;
        Ok(self.storage.list_drafts(user.id).await?)
    }

    /// Validate and store drafts in bulk. Nothing is stored if any draft is invalid.
    pub async fn create_drafts(
        &self,
        inputs: &[DraftInput],
        user: &UserProfile,
    ) -> Result<Vec<Draft>, DraftError> {
        Self::ensure_sync_enabled(user)?;

        let mut new_drafts = Vec::with_capacity(inputs.len());
        for input in inputs {
            let valid = self.further_validate(input, user).await?;
            new_drafts.push(NewDraft {
                user_id: user.id,
                recipient: valid.recipient,
                topic: valid.topic,
                content: valid.content,
                last_edit_time: valid.last_edit_time,
            });
        }

        let created = self.storage.create_drafts(new_drafts).await?;
        info!("Created {} drafts for user {}", created.len(), user.id);
        Ok(created)
    }

    /// Replace the contents of one of the user's drafts.
    pub async fn edit_draft(
        &self,
        draft_id: i64,
        input: &DraftInput,
        user: &UserProfile,
    ) -> Result<Draft, DraftError> {
        Self::ensure_sync_enabled(user)?;

        let mut draft = self
            .storage
            .get_draft(user.id, draft_id)
            .await?
            .ok_or(DraftError::NotFound)?;

        let valid = self.further_validate(input, user).await?;
        draft.recipient = valid.recipient;
        draft.topic = valid.topic;
        draft.content = valid.content;
        draft.last_edit_time = valid.last_edit_time;

        let draft = self.storage.update_draft(draft).await?;
        debug!("Edited draft {} for user {}", draft.id, user.id);
        Ok(draft)
    }

    /// Delete one of the user's drafts.
    pub async fn delete_draft(&self, draft_id: i64, user: &UserProfile) -> Result<(), DraftError> {
        Self::ensure_sync_enabled(user)?;
        if !self.storage.delete_draft(user.id, draft_id).await? {
            return Err(DraftError::NotFound);
        }
        debug!("Deleted draft {} for user {}", draft_id, user.id);
        Ok(())
    }

    pub async fn enable_drafts_syncing(&self, user: &UserProfile) -> Result<(), DraftError> {
        self.storage.set_drafts_synchronization(user.id, true).await?;
        info!("Enabled drafts syncing for user {}", user.id);
        Ok(())
    }

    /// Turn syncing off and delete every draft the user has stored.
    pub async fn disable_drafts_syncing(&self, user: &UserProfile) -> Result<(), DraftError> {
        self.storage.set_drafts_synchronization(user.id, false).await?;
        let removed = self.storage.delete_all_drafts(user.id).await?;
        info!(
            "Disabled drafts syncing for user {} ({} drafts removed)",
            user.id, removed
        );
        Ok(())
    }
}
