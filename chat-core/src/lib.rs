//! # chat-core
//!
//! Pure logic for chatsync (no I/O, instant tests).
//!
//! This crate implements the state machines that keep a local mirror of a
//! user's conversations in step with the server, without any network I/O.
//!
//! ## Design Philosophy
//!
//! All modules in this crate are **pure** - they take input and produce output
//! without side effects. Every transition returns a list of [`Action`]s (or,
//! at the [`ChatState`] level, [`Effect`]s) describing what must happen next:
//! an event to emit on the channel or a notification for the application.
//!
//! The actual I/O is performed by `chat-client`, which interprets the effects
//! produced here.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod action;
pub mod connection;
pub mod directory;
pub mod dispatch;
pub mod error;
pub mod load;
pub mod registrar;
pub mod state;
pub mod store;

pub use action::{Action, ChatEvent, Effect, LoadTarget};
pub use connection::{ConnectionEvent, ConnectionState};
pub use directory::{ChatDirectory, Drift};
pub use error::CoreError;
pub use load::LoadState;
pub use registrar::{Registrar, RegistrationStatus};
pub use state::ChatState;
pub use store::ConversationStore;
