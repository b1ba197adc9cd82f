use super::recipient::Recipient;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// The kind of conversation a draft is addressed to.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
pub enum DraftType {
    /// Not addressed to anyone yet.
    #[serde(rename = "")]
    Unaddressed,
    #[serde(rename = "private")]
    Private,
    #[serde(rename = "stream")]
    Stream,
}

impl DraftType {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "" => Some(DraftType::Unaddressed),
            "private" => Some(DraftType::Private),
            "stream" => Some(DraftType::Stream),
            _ => None,
        }
    }
}

/// A stored draft.
#[derive(Debug, Clone, PartialEq)]
pub struct Draft {
    pub id: i64,
    pub user_id: i64,
    pub recipient: Option<Recipient>,
    pub topic: String,
    pub content: String,
    pub last_edit_time: DateTime<Utc>,
}

/// A draft that passed validation and is ready to be stored.
#[derive(Debug, Clone, PartialEq)]
pub struct NewDraft {
    pub user_id: i64,
    pub recipient: Option<Recipient>,
    pub topic: String,
    pub content: String,
    pub last_edit_time: DateTime<Utc>,
}

impl NewDraft {
    pub fn into_draft(self, id: i64) -> Draft {
        Draft {
            id,
            user_id: self.user_id,
            recipient: self.recipient,
            topic: self.topic,
            content: self.content,
            last_edit_time: self.last_edit_time,
        }
    }
}

/// Wire representation of a draft.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
pub struct DraftDict {
    /// The unique ID of the draft.
    #[schema(example = 1)]
    pub id: i64,
    /// The type of the draft: `"stream"`, `"private"` or `""` for drafts
    /// that are not addressed to anyone yet.
    #[serde(rename = "type")]
    pub draft_type: DraftType,
    /// For stream drafts, a list holding the stream ID. For private drafts,
    /// the IDs of the other users in the conversation.
    #[schema(example = json!([3]))]
    pub to: Vec<i64>,
    /// The topic of a stream draft; empty for private drafts.
    #[schema(example = "sync drafts")]
    pub topic: String,
    /// The body of the draft.
    #[schema(example = "Let's add backend support for syncing drafts.")]
    pub content: String,
    /// Unix timestamp of the last edit to the draft.
    #[schema(example = 1595479019)]
    pub timestamp: i64,
}

impl Draft {
    pub fn to_dict(&self) -> DraftDict {
        let (draft_type, to) = match &self.recipient {
            None => (DraftType::Unaddressed, Vec::new()),
            Some(Recipient::Stream(stream_id)) => (DraftType::Stream, vec![*stream_id]),
            Some(Recipient::Personal(user_id)) => (DraftType::Private, vec![*user_id]),
            Some(Recipient::Huddle(members)) => (
                DraftType::Private,
                members
                    .iter()
                    .copied()
                    .filter(|id| *id != self.user_id)
                    .collect(),
            ),
        };

        DraftDict {
            id: self.id,
            draft_type,
            to,
            topic: self.topic.clone(),
            content: self.content.clone(),
            timestamp: self.last_edit_time.timestamp(),
        }
    }
}
