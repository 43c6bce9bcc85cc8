//! Outbound message and read-receipt construction.
//!
//! Sending is fire-and-forget: the stored message only appears once the
//! server pushes the conversation back. Nothing is inserted optimistically.

use chatsync_types::{ConversationId, Identity, Message, MessageId, Outbound, UserId};

use crate::CoreError;

/// Build a `sendMessage` request.
pub fn send_request(
    conversation_id: ConversationId,
    sender: Identity,
    content: String,
    timestamp: u64,
) -> Outbound {
    Outbound::SendMessage {
        conversation_id,
        sender,
        content,
        timestamp,
    }
}

/// Ids of messages written by someone else and not yet read.
pub fn unread_from_others(candidates: &[Message], current_user: &UserId) -> Vec<MessageId> {
    candidates
        .iter()
        .filter(|m| !m.is_from(current_user) && !m.is_read)
        .map(|m| m.message_id.clone())
        .collect()
}

/// Build a `readMessages` request, or `None` when nothing is eligible.
pub fn read_receipt(
    conversation_id: ConversationId,
    candidates: &[Message],
    current_user: &UserId,
) -> Option<Outbound> {
    let message_ids = unread_from_others(candidates, current_user);
    if message_ids.is_empty() {
        return None;
    }
    Some(Outbound::ReadMessages {
        conversation_id,
        message_ids,
    })
}

/// Resolve the current user: live session first, then the fallback lookup.
///
/// Empty ids count as unresolved. `fallback` is only called when the live
/// session has nothing.
pub fn resolve_current_user<F>(live: Option<&UserId>, fallback: F) -> Result<UserId, CoreError>
where
    F: FnOnce() -> Option<UserId>,
{
    if let Some(user_id) = live.filter(|id| !id.is_empty()) {
        return Ok(user_id.clone());
    }
    fallback()
        .filter(|id| !id.is_empty())
        .ok_or(CoreError::NoCurrentUser)
}
