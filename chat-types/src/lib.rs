//! # chat-types
//!
//! Wire format types for the chatsync real-time chat protocol.
//!
//! This crate provides the foundational types used across all chatsync crates:
//! - [`UserId`], [`ConversationId`], [`MessageId`] - Identity types
//! - [`Identity`], [`Message`], [`Conversation`], [`ConversationSummary`] - Data model
//! - [`Outbound`], [`Inbound`] - Named events exchanged over the channel
//! - [`ChatError`] - Error types

#![warn(missing_docs)]
#![warn(clippy::all)]

mod error;
mod ids;
mod model;
mod protocol;

pub use error::ChatError;
pub use ids::{ConversationId, MessageId, UserId};
pub use model::{Conversation, ConversationSummary, Identity, Message};
pub use protocol::{events, Inbound, Outbound, INBOUND_EVENTS};
