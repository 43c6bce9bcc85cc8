//! Named events exchanged over the bidirectional channel.
//!
//! Outbound requests are encoded to `(name, JSON payload)` pairs; inbound
//! events are decoded from the same shape. The channel itself never sees
//! anything but names and JSON.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    ChatError, Conversation, ConversationId, ConversationSummary, Identity, Message, MessageId,
    UserId,
};

/// Event names as they appear on the wire.
pub mod events {
    /// Registration request (outbound)
    pub const REGISTER_USER: &str = "registerUser";
    /// Registration accepted (inbound)
    pub const USER_REGISTERED: &str = "userRegistered";
    /// Registration rejected (inbound)
    pub const REGISTER_USER_ERROR: &str = "registerUserError";
    /// Chat list request (outbound)
    pub const LIST_CHAT_ROOMS: &str = "listChatRooms";
    /// Chat list response (inbound)
    pub const CHATS_LIST: &str = "chatsList";
    /// Chat list failure (inbound)
    pub const LIST_CHATS_ERROR: &str = "listChatsError";
    /// Message history request (outbound)
    pub const LIST_MESSAGES: &str = "listMessages";
    /// Message history response (inbound)
    pub const MESSAGES_LIST: &str = "messagesList";
    /// New message request (outbound)
    pub const SEND_MESSAGE: &str = "sendMessage";
    /// Read receipt (outbound)
    pub const READ_MESSAGES: &str = "readMessages";
    /// Read receipt confirmation (inbound)
    pub const MESSAGE_READ: &str = "messageRead";
    /// Delivery acknowledgment (outbound)
    pub const RECEIVE_MESSAGE: &str = "receiveMessage";
    /// Delivery acknowledgment confirmation (inbound)
    pub const MESSAGE_RECEIVED: &str = "messageReceived";
    /// Unsolicited conversation push (inbound)
    pub const NEW_MESSAGE: &str = "newMessage";
}

/// Every inbound event name the client must subscribe to.
pub const INBOUND_EVENTS: &[&str] = &[
    events::USER_REGISTERED,
    events::REGISTER_USER_ERROR,
    events::CHATS_LIST,
    events::LIST_CHATS_ERROR,
    events::MESSAGES_LIST,
    events::NEW_MESSAGE,
    events::MESSAGE_READ,
    events::MESSAGE_RECEIVED,
];

/// Requests the client emits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    /// Register the current user with the server
    RegisterUser(Identity),
    /// Ask for the user's conversation summaries
    ListChatRooms {
        /// Whose conversations to list
        user_id: UserId,
    },
    /// Ask for a conversation's full history
    ListMessages {
        /// Conversation to fetch
        conversation_id: ConversationId,
        /// Requesting user
        user_id: UserId,
    },
    /// Send a new message
    SendMessage {
        /// Target conversation
        conversation_id: ConversationId,
        /// Author
        sender: Identity,
        /// Message body
        content: String,
        /// Logical send time
        timestamp: u64,
    },
    /// Tell the server these messages were read
    ReadMessages {
        /// Conversation the messages belong to
        conversation_id: ConversationId,
        /// Messages being marked read
        message_ids: Vec<MessageId>,
    },
    /// Acknowledge delivery of a pushed batch
    ReceiveMessage(Message),
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct UserRef<'a> {
    user_id: &'a UserId,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ListMessagesRequest<'a> {
    conversation_id: &'a ConversationId,
    user_id: &'a UserId,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SendMessageRequest<'a> {
    conversation_id: &'a ConversationId,
    sender: &'a Identity,
    content: &'a str,
    timestamp: u64,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ReadMessagesRequest<'a> {
    conversation_id: &'a ConversationId,
    message_ids: &'a [MessageId],
}

impl Outbound {
    /// Wire name of this request.
    pub fn event_name(&self) -> &'static str {
        match self {
            Outbound::RegisterUser(_) => events::REGISTER_USER,
            Outbound::ListChatRooms { .. } => events::LIST_CHAT_ROOMS,
            Outbound::ListMessages { .. } => events::LIST_MESSAGES,
            Outbound::SendMessage { .. } => events::SEND_MESSAGE,
            Outbound::ReadMessages { .. } => events::READ_MESSAGES,
            Outbound::ReceiveMessage(_) => events::RECEIVE_MESSAGE,
        }
    }

    /// Encode the request payload as JSON.
    pub fn payload(&self) -> Result<Value, ChatError> {
        let encoded = match self {
            Outbound::RegisterUser(identity) => serde_json::to_value(identity),
            Outbound::ListChatRooms { user_id } => serde_json::to_value(UserRef { user_id }),
            Outbound::ListMessages {
                conversation_id,
                user_id,
            } => serde_json::to_value(ListMessagesRequest {
                conversation_id,
                user_id,
            }),
            Outbound::SendMessage {
                conversation_id,
                sender,
                content,
                timestamp,
            } => serde_json::to_value(SendMessageRequest {
                conversation_id,
                sender,
                content,
                timestamp: *timestamp,
            }),
            Outbound::ReadMessages {
                conversation_id,
                message_ids,
            } => serde_json::to_value(ReadMessagesRequest {
                conversation_id,
                message_ids,
            }),
            Outbound::ReceiveMessage(message) => serde_json::to_value(message),
        };
        encoded.map_err(|source| ChatError::Serialization {
            event: self.event_name(),
            source,
        })
    }
}

/// Events the server delivers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    /// Registration accepted
    UserRegistered {
        /// The user now registered
        user_id: UserId,
    },
    /// Registration rejected
    RegisterUserError(String),
    /// Conversation summaries for the current user
    ChatsList(Vec<ConversationSummary>),
    /// Chat list request failed
    ListChatsError(String),
    /// Full history for one conversation
    MessagesList(Conversation),
    /// Server push carrying a whole conversation
    NewMessage(Conversation),
    /// Read receipt confirmation (payload kept opaque)
    MessageRead(Value),
    /// Delivery confirmation (payload kept opaque)
    MessageReceived(Value),
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RegisteredPayload {
    user_id: UserId,
}

impl Inbound {
    /// Decode a named inbound event.
    pub fn decode(name: &str, payload: Value) -> Result<Self, ChatError> {
        fn parse<T: serde::de::DeserializeOwned>(
            name: &str,
            payload: Value,
        ) -> Result<T, ChatError> {
            serde_json::from_value(payload).map_err(|source| ChatError::Deserialization {
                event: name.to_string(),
                source,
            })
        }

        match name {
            events::USER_REGISTERED => {
                let RegisteredPayload { user_id } = parse(name, payload)?;
                Ok(Inbound::UserRegistered { user_id })
            }
            events::REGISTER_USER_ERROR => Ok(Inbound::RegisterUserError(error_text(payload))),
            events::CHATS_LIST => Ok(Inbound::ChatsList(parse(name, payload)?)),
            events::LIST_CHATS_ERROR => Ok(Inbound::ListChatsError(error_text(payload))),
            events::MESSAGES_LIST => Ok(Inbound::MessagesList(parse(name, payload)?)),
            events::NEW_MESSAGE => Ok(Inbound::NewMessage(parse(name, payload)?)),
            events::MESSAGE_READ => Ok(Inbound::MessageRead(payload)),
            events::MESSAGE_RECEIVED => Ok(Inbound::MessageReceived(payload)),
            other => Err(ChatError::UnknownEvent(other.to_string())),
        }
    }
}

/// Error events carry either a bare string or an arbitrary JSON value.
fn error_text(payload: Value) -> String {
    match payload {
        Value::String(text) => text,
        other => other.to_string(),
    }
}
