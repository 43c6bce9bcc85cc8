//! Channel abstraction for chatsync.
//!
//! The channel is a persistent, bidirectional, named-event connection
//! (for example a Socket.IO or WebSocket client). The core only needs four
//! primitives from it:
//! - `connect()` opens the connection once
//! - `subscribe()` registers interest in an inbound event name
//! - `emit()` sends a named event with a JSON payload
//! - `recv()` yields the next inbound event or lifecycle change
//!
//! Delivery is at-least-once and in order per direction while connected.
//! Reconnection after a drop is the channel's job; it reports drops and
//! restorations through [`ChannelEvent`].

mod mock;

pub use mock::{MockChannel, MockOp};

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

/// Channel errors.
#[derive(Debug, Error)]
pub enum ChannelError {
    /// Connection failed.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// Not connected.
    #[error("not connected")]
    NotConnected,

    /// Connection closed for good; no more events will arrive.
    #[error("connection closed")]
    ConnectionClosed,

    /// Emit failed.
    #[error("emit of {event} failed: {reason}")]
    EmitFailed {
        /// Event that could not be sent.
        event: String,
        /// Transport description.
        reason: String,
    },

    /// Subscription could not be registered.
    #[error("subscribe to {0} failed")]
    SubscribeFailed(String),
}

/// Something the channel delivered.
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelEvent {
    /// A subscribed named event.
    Named {
        /// Event name.
        name: String,
        /// JSON payload.
        payload: Value,
    },
    /// The transport dropped and is reconnecting.
    Disconnected {
        /// Reason reported by the transport.
        reason: String,
    },
    /// The transport reconnected.
    Reconnected,
}

/// Named-event channel used by the chat client.
#[async_trait]
pub trait Channel: Send + Sync {
    /// Open the connection.
    async fn connect(&self) -> Result<(), ChannelError>;

    /// Deliver future inbound events named `event`.
    ///
    /// Events arriving for names nobody subscribed to are dropped.
    fn subscribe(&self, event: &str) -> Result<(), ChannelError>;

    /// Send a named event.
    async fn emit(&self, event: &str, payload: Value) -> Result<(), ChannelError>;

    /// Wait for the next inbound event.
    async fn recv(&self) -> Result<ChannelEvent, ChannelError>;

    /// Check if currently connected.
    fn is_connected(&self) -> bool;

    /// Close the connection gracefully.
    async fn close(&self) -> Result<(), ChannelError>;
}
