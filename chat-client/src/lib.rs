//! # chat-client
//!
//! Client library for the chatsync real-time chat protocol.
//!
//! This is the library that chat front ends use to keep a local mirror of
//! the user's conversations in step with the server.
//!
//! ## Features
//!
//! - **Lazy Single Channel**: one channel per client, created on first use
//! - **Automatic Registration**: registers once the identity is complete
//! - **Channel Abstraction**: pluggable channel layer (mock included)
//! - **Pure State Machine**: uses chat-core for side-effect-free logic
//!
//! ## Example
//!
//! ```ignore
//! use chatsync_client::{ChatClient, ClientConfig, StaticIdentityProvider};
//!
//! let client = ChatClient::new(ClientConfig::default(), my_channel_factory, identity);
//!
//! // Open the channel and register
//! client.connect().await?;
//!
//! // Open a conversation
//! client.fetch(conversation_id, user_id).await?;
//!
//! // Reconcile server events until the channel closes
//! client.run().await?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod channel;
pub mod client;
pub mod config;
pub mod connection;
pub mod identity;

pub use channel::{Channel, ChannelError, ChannelEvent, MockChannel, MockOp};
pub use chatsync_core::{ChatEvent, Drift, LoadState, LoadTarget};
pub use client::{ChatClient, ClientError};
pub use config::{ClientConfig, ConfigError};
pub use connection::ConnectionManager;
pub use identity::{IdentityProvider, StaticIdentityProvider};
