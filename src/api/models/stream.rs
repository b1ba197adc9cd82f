use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Stream {
    pub id: i64,
    pub realm_id: i64,
    pub name: String,
    #[serde(default)]
    pub invite_only: bool,
    #[serde(default)]
    pub subscribers: Vec<i64>,
}

impl Stream {
    pub fn new(id: i64, realm_id: i64, name: &str) -> Self {
        Self {
            id,
            realm_id,
            name: name.to_string(),
            invite_only: false,
            subscribers: Vec::new(),
        }
    }

    /// Whether `user_id` may address messages to this stream.
    ///
    /// Public streams are open to everyone in the realm; invite-only streams
    /// require a subscription.
    pub fn is_accessible_by(&self, user_id: i64, realm_id: i64) -> bool {
        if self.realm_id != realm_id {
            return false;
        }
        !self.invite_only || self.subscribers.contains(&user_id)
    }
}
