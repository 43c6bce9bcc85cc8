//! Chat data model shared by every layer.
//!
//! Field names follow the channel's JSON convention (camelCase).

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashSet;

use crate::{ConversationId, MessageId, UserId};

/// A person taking part in conversations.
///
/// Captured once per session from the identity provider and never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    /// Stable user identifier
    pub user_id: UserId,
    /// Account category (free-form, server defined)
    #[serde(default)]
    pub user_type: String,
    /// Display name
    pub preferred_name: String,
    /// Given name
    pub first_name: String,
    /// Family name
    pub last_name: String,
    /// Avatar location, may be empty
    #[serde(default)]
    pub profile_picture_url: String,
}

impl Identity {
    /// Build an identity carrying the fields registration requires.
    pub fn new(user_id: impl Into<UserId>, preferred: &str, first: &str, last: &str) -> Self {
        Self {
            user_id: user_id.into(),
            preferred_name: preferred.to_string(),
            first_name: first.to_string(),
            last_name: last.to_string(),
            ..Self::default()
        }
    }

    /// True when every field registration depends on is non-empty.
    pub fn is_complete(&self) -> bool {
        !self.user_id.is_empty()
            && !self.preferred_name.is_empty()
            && !self.first_name.is_empty()
            && !self.last_name.is_empty()
    }
}

/// A single chat message.
///
/// `message_id` and `conversation_id` never change once created. The three
/// status flags only ever move from `false` to `true`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    /// Server-assigned identifier
    pub message_id: MessageId,
    /// Conversation this message belongs to
    pub conversation_id: ConversationId,
    /// Author of the message
    pub sender: Identity,
    /// Message body
    pub content: String,
    /// Logical send time in milliseconds, used for ordering
    pub timestamp: u64,
    /// Delivered to the recipient's device
    #[serde(default)]
    pub is_received: bool,
    /// Seen by the recipient
    #[serde(default)]
    pub is_read: bool,
    /// Removed by its author
    #[serde(default)]
    pub is_deleted: bool,
}

impl Message {
    /// Mark as read. A read message is never un-read.
    pub fn mark_read(&mut self) {
        self.is_read = true;
    }

    /// Mark as delivered.
    pub fn mark_received(&mut self) {
        self.is_received = true;
    }

    /// Mark as deleted.
    pub fn mark_deleted(&mut self) {
        self.is_deleted = true;
    }

    /// True when the message was written by `user_id`.
    pub fn is_from(&self, user_id: &UserId) -> bool {
        &self.sender.user_id == user_id
    }
}

/// A chat thread with its full message history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    /// Stable conversation identifier
    pub conversation_id: ConversationId,
    /// Members of the conversation, unique by user id
    #[serde(default, deserialize_with = "unique_participants")]
    pub participants: Vec<Identity>,
    /// Message history in server order
    #[serde(default)]
    pub messages: Vec<Message>,
}

impl Conversation {
    /// Create an empty conversation.
    pub fn new(conversation_id: impl Into<ConversationId>) -> Self {
        Self {
            conversation_id: conversation_id.into(),
            participants: Vec::new(),
            messages: Vec::new(),
        }
    }

    /// The message with the greatest timestamp, if any.
    pub fn latest_message(&self) -> Option<&Message> {
        self.messages.iter().max_by_key(|m| m.timestamp)
    }

    /// Look up a participant by user id.
    pub fn participant(&self, user_id: &UserId) -> Option<&Identity> {
        self.participants.iter().find(|p| &p.user_id == user_id)
    }
}

/// Directory entry projected from a [`Conversation`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationSummary {
    /// Conversation this summary describes
    pub conversation_id: ConversationId,
    /// Members of the conversation, unique by user id
    #[serde(default, deserialize_with = "unique_participants")]
    pub participants: Vec<Identity>,
    /// Most recent message observed, absent for an empty conversation
    #[serde(default)]
    pub latest_message: Option<Message>,
}

impl ConversationSummary {
    /// Timestamp of the latest message, `None` for an empty conversation.
    pub fn latest_timestamp(&self) -> Option<u64> {
        self.latest_message.as_ref().map(|m| m.timestamp)
    }
}

impl From<&Conversation> for ConversationSummary {
    fn from(conversation: &Conversation) -> Self {
        Self {
            conversation_id: conversation.conversation_id.clone(),
            participants: conversation.participants.clone(),
            latest_message: conversation.latest_message().cloned(),
        }
    }
}

/// Decode a participant list, keeping the first entry for each user id.
fn unique_participants<'de, D>(deserializer: D) -> Result<Vec<Identity>, D::Error>
where
    D: Deserializer<'de>,
{
    let participants = Vec::<Identity>::deserialize(deserializer)?;
    let mut seen = HashSet::new();
    Ok(participants
        .into_iter()
        .filter(|p| seen.insert(p.user_id.clone()))
        .collect())
}
