//! Conversation store: full message history per conversation.
//!
//! Both an explicit fetch response and a server push replace the stored
//! conversation wholesale. Responses apply in arrival order with no timestamp
//! check (latest-applied-wins), so a push that races an in-flight fetch for
//! the same conversation can be overwritten by the older fetch result. That
//! lost update is accepted; merging by message id is not done here.
//!
//! One conversation at a time is "selected" (the one the user last asked to
//! fetch). The displayed list only ever holds messages of the selected
//! conversation: switching selection shows its cached copy (or nothing), and
//! every later fetch response or push for it is mirrored in.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use chatsync_types::{Conversation, ConversationId, Message, Outbound, UserId};

use crate::load::TIMED_OUT;
use crate::{Action, ChatEvent, LoadState, LoadTarget};

/// Per-conversation message cache plus the displayed list.
#[derive(Debug, Clone, Default)]
pub struct ConversationStore {
    conversations: HashMap<ConversationId, Conversation>,
    fetches: HashMap<ConversationId, LoadState>,
    selected: Option<ConversationId>,
    displayed: Vec<Message>,
}

impl ConversationStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stored conversation, if any.
    pub fn get(&self, conversation_id: &ConversationId) -> Option<&Conversation> {
        self.conversations.get(conversation_id)
    }

    /// All stored conversations, in no particular order.
    pub fn conversations(&self) -> impl Iterator<Item = &Conversation> {
        self.conversations.values()
    }

    /// Number of stored conversations.
    pub fn len(&self) -> usize {
        self.conversations.len()
    }

    /// True when nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.conversations.is_empty()
    }

    /// The conversation last requested for display.
    pub fn selected(&self) -> Option<&ConversationId> {
        self.selected.as_ref()
    }

    /// Messages currently displayed.
    pub fn displayed(&self) -> &[Message] {
        &self.displayed
    }

    /// Progress of the last fetch for `conversation_id`.
    pub fn fetch_state(&self, conversation_id: &ConversationId) -> LoadState {
        self.fetches
            .get(conversation_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Greatest message timestamp held for `conversation_id`.
    pub fn latest_timestamp(&self, conversation_id: &ConversationId) -> Option<u64> {
        self.conversations
            .get(conversation_id)
            .and_then(Conversation::latest_message)
            .map(|m| m.timestamp)
    }

    /// Request a conversation's history and select it for display.
    pub fn fetch(
        &mut self,
        conversation_id: ConversationId,
        user_id: UserId,
        now: Instant,
    ) -> Vec<Action> {
        self.fetches
            .insert(conversation_id.clone(), LoadState::Loading { since: now });

        let mut actions = vec![Action::Emit(Outbound::ListMessages {
            conversation_id: conversation_id.clone(),
            user_id,
        })];
        if self.selected.as_ref() != Some(&conversation_id) {
            // Show the cached copy (or nothing) until the response arrives.
            self.displayed = self
                .conversations
                .get(&conversation_id)
                .map(|c| c.messages.clone())
                .unwrap_or_default();
            self.selected = Some(conversation_id.clone());
            actions.push(Action::Notify(ChatEvent::DisplayedChanged { conversation_id }));
        }
        actions
    }

    /// `messagesList` arrived.
    pub fn on_messages_list(&mut self, conversation: Conversation) -> Vec<Action> {
        self.fetches
            .insert(conversation.conversation_id.clone(), LoadState::Loaded);
        self.replace(conversation)
    }

    /// `newMessage` push arrived.
    ///
    /// Acknowledges delivery with the first message of the batch. An empty
    /// batch has nothing to acknowledge.
    pub fn on_push(&mut self, conversation: Conversation) -> Vec<Action> {
        let mut actions = Vec::new();
        if let Some(first) = conversation.messages.first() {
            actions.push(Action::Emit(Outbound::ReceiveMessage(first.clone())));
        }
        actions.extend(self.replace(conversation));
        actions
    }

    /// Mark fetches older than `timeout` as failed.
    pub fn expire(&mut self, now: Instant, timeout: Duration) -> Vec<Action> {
        let mut expired: Vec<ConversationId> = self
            .fetches
            .iter()
            .filter(|(_, state)| state.expired(now, timeout))
            .map(|(id, _)| id.clone())
            .collect();
        expired.sort();

        expired
            .into_iter()
            .map(|id| {
                self.fetches.insert(
                    id.clone(),
                    LoadState::Failed {
                        reason: TIMED_OUT.to_string(),
                    },
                );
                Action::Notify(ChatEvent::LoadFailed {
                    target: LoadTarget::Conversation(id),
                    reason: TIMED_OUT.to_string(),
                })
            })
            .collect()
    }

    fn replace(&mut self, conversation: Conversation) -> Vec<Action> {
        let conversation_id = conversation.conversation_id.clone();
        let mut actions = vec![Action::Notify(ChatEvent::ConversationUpdated {
            conversation_id: conversation_id.clone(),
        })];

        if self.selected.as_ref() == Some(&conversation_id) {
            self.displayed = conversation.messages.clone();
            actions.push(Action::Notify(ChatEvent::DisplayedChanged {
                conversation_id: conversation_id.clone(),
            }));
        }

        self.conversations.insert(conversation_id, conversation);
        actions
    }
}
