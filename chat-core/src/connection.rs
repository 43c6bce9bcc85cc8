//! Connection lifecycle state machine.
//!
//! The channel is created exactly once per client. After that the transport
//! owns reconnection; the core only observes drops and restorations.
//!
//! ```text
//! Uninitialized ──ChannelOpened──► Connected ◄──Restored── Disconnected
//!                                      └──────────Lost─────────►┘
//! ```

use crate::{Action, ChatEvent};

/// Connection state - NO I/O, just state transitions.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ConnectionState {
    /// No channel has been created yet.
    #[default]
    Uninitialized,
    /// Channel is live.
    Connected,
    /// Channel exists but the transport dropped.
    Disconnected {
        /// Reason reported by the transport.
        reason: String,
    },
}

/// Lifecycle events reported by the channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionEvent {
    /// The channel was created and connected.
    ChannelOpened,
    /// The transport dropped.
    Lost {
        /// Reason for the drop.
        reason: String,
    },
    /// The transport reconnected on its own.
    Restored,
}

impl ConnectionState {
    /// Create a new state machine in the Uninitialized state.
    pub fn new() -> Self {
        Self::Uninitialized
    }

    /// Process an event and return the new state plus actions to execute.
    pub fn on_event(self, event: ConnectionEvent) -> (Self, Vec<Action>) {
        match (self, event) {
            (Self::Uninitialized, ConnectionEvent::ChannelOpened) => {
                (Self::Connected, vec![Action::Notify(ChatEvent::Connected)])
            }
            (Self::Connected, ConnectionEvent::Lost { reason }) => (
                Self::Disconnected {
                    reason: reason.clone(),
                },
                vec![Action::Notify(ChatEvent::ConnectionLost { reason })],
            ),
            (Self::Disconnected { .. }, ConnectionEvent::Restored) => {
                (Self::Connected, vec![Action::Notify(ChatEvent::Connected)])
            }

            // Invalid transitions - stay in current state
            (state, _) => (state, vec![]),
        }
    }

    /// Check if currently connected.
    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected)
    }

    /// Check if a channel has ever been created.
    pub fn is_initialized(&self) -> bool {
        !matches!(self, Self::Uninitialized)
    }
}
