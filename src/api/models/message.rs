use super::recipient::Recipient;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A sent message. Only webhook integrations create these.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Message {
    pub id: i64,
    pub sender_id: i64,
    pub recipient: Recipient,
    pub topic: String,
    pub content: String,
    pub date_sent: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewMessage {
    pub sender_id: i64,
    pub recipient: Recipient,
    pub topic: String,
    pub content: String,
}

impl NewMessage {
    pub fn into_message(self, id: i64, date_sent: DateTime<Utc>) -> Message {
        Message {
            id,
            sender_id: self.sender_id,
            recipient: self.recipient,
            topic: self.topic,
            content: self.content,
            date_sent,
        }
    }
}
