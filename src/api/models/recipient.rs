use serde::{Deserialize, Serialize};

/// Who a message (or a draft of one) is addressed to.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", content = "ids", rename_all = "lowercase")]
pub enum Recipient {
    Stream(i64),
    Personal(i64),
    /// Sorted, de-duplicated member ids, sender included.
    Huddle(Vec<i64>),
}

impl Recipient {
    /// Build the recipient for a private message from `sender_id` to `user_ids`.
    ///
    /// One other participant (or only the sender) yields a personal recipient;
    /// anything larger becomes a huddle that includes the sender.
    pub fn for_private_message(sender_id: i64, user_ids: &[i64]) -> Self {
        let mut members: Vec<i64> = user_ids.to_vec();
        members.sort_unstable();
        members.dedup();

        let others: Vec<i64> = members
            .iter()
            .copied()
            .filter(|id| *id != sender_id)
            .collect();

        match others.as_slice() {
            [] => Recipient::Personal(sender_id),
            [only] => Recipient::Personal(*only),
            _ => {
                if !members.contains(&sender_id) {
                    members.push(sender_id);
                    members.sort_unstable();
                }
                Recipient::Huddle(members)
            }
        }
    }

    /// Storage discriminator used by the SQL backend.
    pub fn kind(&self) -> &'static str {
        match self {
            Recipient::Stream(_) => "stream",
            Recipient::Personal(_) => "personal",
            Recipient::Huddle(_) => "huddle",
        }
    }

    pub fn ids(&self) -> Vec<i64> {
        match self {
            Recipient::Stream(id) | Recipient::Personal(id) => vec![*id],
            Recipient::Huddle(ids) => ids.clone(),
        }
    }

    /// Rebuild a recipient from its storage discriminator and ids.
    pub fn from_parts(kind: &str, ids: Vec<i64>) -> Option<Self> {
        match (kind, ids.as_slice()) {
            ("stream", [id]) => Some(Recipient::Stream(*id)),
            ("personal", [id]) => Some(Recipient::Personal(*id)),
            ("huddle", _) if !ids.is_empty() => Some(Recipient::Huddle(ids)),
            _ => None,
        }
    }
}
