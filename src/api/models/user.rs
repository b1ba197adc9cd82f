use serde::{Deserialize, Serialize};

/// A user account. Bots are users with `is_bot` set and an owner.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserProfile {
    pub id: i64,
    pub realm_id: i64,
    pub email: String,
    pub full_name: String,
    pub api_key: String,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub is_bot: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bot_owner_id: Option<i64>,
    #[serde(default = "default_true")]
    pub enable_drafts_synchronization: bool,
}

fn default_true() -> bool {
    true
}

impl UserProfile {
    pub fn new(id: i64, realm_id: i64, email: &str, full_name: &str, api_key: &str) -> Self {
        Self {
            id,
            realm_id,
            email: email.to_string(),
            full_name: full_name.to_string(),
            api_key: api_key.to_string(),
            is_active: true,
            is_bot: false,
            bot_owner_id: None,
            enable_drafts_synchronization: true,
        }
    }

    /// Turn this profile into a bot owned by `owner_id`.
    pub fn into_bot(mut self, owner_id: i64) -> Self {
        self.is_bot = true;
        self.bot_owner_id = Some(owner_id);
        self
    }
}
