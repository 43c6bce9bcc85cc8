//! Outputs of the core state machines.

use chatsync_types::{ConversationId, Outbound, UserId};

/// Instructions produced by a single component.
///
/// `RefreshDirectory` chains one component into another and is resolved
/// inside [`ChatState`](crate::ChatState); it never reaches the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Emit a request on the channel.
    Emit(Outbound),
    /// Tell the application something changed.
    Notify(ChatEvent),
    /// Ask the chat directory to refresh for this user.
    RefreshDirectory {
        /// User whose chat list should be requested.
        user_id: UserId,
    },
}

/// I/O the client must perform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Emit a request on the channel.
    Emit(Outbound),
    /// Forward a notification to the application.
    Notify(ChatEvent),
}

/// What a timed-out load was for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadTarget {
    /// The chat list.
    Directory,
    /// One conversation's history.
    Conversation(ConversationId),
}

/// Notifications for the application layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatEvent {
    /// Channel is connected (first time or after a drop).
    Connected,
    /// Channel dropped; the transport is reconnecting.
    ConnectionLost {
        /// Reason reported by the transport.
        reason: String,
    },
    /// Server accepted the registration.
    Registered {
        /// The registered user.
        user_id: UserId,
    },
    /// Registration was rejected or timed out.
    RegistrationFailed {
        /// Server- or client-side description.
        error: String,
    },
    /// The chat list changed.
    DirectoryUpdated,
    /// The chat list request failed; the previous list is kept.
    DirectoryFailed {
        /// Server-side description.
        error: String,
    },
    /// A conversation's stored history changed.
    ConversationUpdated {
        /// The conversation that changed.
        conversation_id: ConversationId,
    },
    /// The displayed message list changed.
    DisplayedChanged {
        /// The conversation now displayed.
        conversation_id: ConversationId,
    },
    /// A request never got an answer.
    LoadFailed {
        /// What was being loaded.
        target: LoadTarget,
        /// Why it failed.
        reason: String,
    },
}
