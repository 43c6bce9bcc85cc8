//! Aggregate chat state and inbound reconciliation.
//!
//! [`ChatState`] owns every component and is the single place inbound
//! events are routed. Component-to-component chaining (registration success
//! refreshing the directory) is resolved here, so callers only ever see
//! [`Effect`]s.

use std::time::{Duration, Instant};

use chatsync_types::{ConversationId, Identity, Inbound, Message, UserId};

use crate::{
    dispatch, Action, ChatDirectory, ConnectionEvent, ConnectionState, ConversationStore,
    CoreError, Drift, Effect, Registrar,
};

/// Complete local mirror of the user's chats.
#[derive(Debug, Clone, Default)]
pub struct ChatState {
    connection: ConnectionState,
    registrar: Registrar,
    directory: ChatDirectory,
    store: ConversationStore,
}

impl ChatState {
    /// Create an empty, uninitialized state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Connection lifecycle.
    pub fn connection(&self) -> &ConnectionState {
        &self.connection
    }

    /// Registration handshake.
    pub fn registrar(&self) -> &Registrar {
        &self.registrar
    }

    /// Conversation summaries.
    pub fn directory(&self) -> &ChatDirectory {
        &self.directory
    }

    /// Per-conversation history.
    pub fn store(&self) -> &ConversationStore {
        &self.store
    }

    /// User id known from the live session: the registered user, else the
    /// identity last supplied.
    pub fn live_user(&self) -> Option<&UserId> {
        self.registrar.registered_user().or_else(|| {
            let user_id = &self.registrar.identity().user_id;
            (!user_id.is_empty()).then_some(user_id)
        })
    }

    /// Apply a connection lifecycle event.
    pub fn on_connection(&mut self, event: ConnectionEvent, now: Instant) -> Vec<Effect> {
        let was_connected = self.connection.is_connected();
        let lost = matches!(event, ConnectionEvent::Lost { .. });
        let (next, mut actions) = std::mem::take(&mut self.connection).on_event(event);
        self.connection = next;

        if lost && was_connected {
            self.registrar.on_connection_lost();
        } else if !was_connected && self.connection.is_connected() {
            actions.extend(self.registrar.on_connected(now));
        }
        self.settle(actions, now)
    }

    /// The identity provider reported a (possibly incomplete) identity.
    pub fn identity_changed(&mut self, identity: Identity, now: Instant) -> Vec<Effect> {
        let connected = self.connection.is_connected();
        let actions = self.registrar.on_identity(identity, connected, now);
        self.settle(actions, now)
    }

    /// Explicit registration.
    pub fn register(&mut self, identity: Identity, now: Instant) -> Result<Vec<Effect>, CoreError> {
        let connected = self.connection.is_connected();
        let actions = self.registrar.register(identity, connected, now)?;
        Ok(self.settle(actions, now))
    }

    /// Request the chat list.
    pub fn refresh_directory(&mut self, user_id: UserId, now: Instant) -> Vec<Effect> {
        let actions = self.directory.refresh(user_id, now);
        self.settle(actions, now)
    }

    /// Request one conversation's history.
    pub fn fetch(
        &mut self,
        conversation_id: ConversationId,
        user_id: UserId,
        now: Instant,
    ) -> Vec<Effect> {
        let actions = self.store.fetch(conversation_id, user_id, now);
        self.settle(actions, now)
    }

    /// Send a message. Local state is untouched until the server pushes it back.
    pub fn send(
        &self,
        conversation_id: ConversationId,
        sender: Identity,
        content: String,
        timestamp: u64,
    ) -> Vec<Effect> {
        vec![Effect::Emit(dispatch::send_request(
            conversation_id,
            sender,
            content,
            timestamp,
        ))]
    }

    /// Emit a read receipt for the eligible subset of `candidates`.
    pub fn mark_read(
        &self,
        conversation_id: ConversationId,
        candidates: &[Message],
        current_user: &UserId,
    ) -> Vec<Effect> {
        dispatch::read_receipt(conversation_id, candidates, current_user)
            .map(Effect::Emit)
            .into_iter()
            .collect()
    }

    /// Route an inbound event into the owning component.
    pub fn apply(&mut self, inbound: Inbound, now: Instant) -> Vec<Effect> {
        let actions = match inbound {
            Inbound::UserRegistered { user_id } => self.registrar.on_registered(user_id),
            Inbound::RegisterUserError(error) => self.registrar.on_error(error),
            Inbound::ChatsList(summaries) => {
                let actions = self.directory.on_list(summaries);
                self.directory.catch_up(&self.store);
                actions
            }
            Inbound::ListChatsError(error) => self.directory.on_error(error),
            Inbound::MessagesList(conversation) => {
                let mut actions = self.directory.observe(&conversation);
                actions.extend(self.store.on_messages_list(conversation));
                actions
            }
            Inbound::NewMessage(conversation) => {
                let mut actions = self.directory.observe(&conversation);
                actions.extend(self.store.on_push(conversation));
                actions
            }
            // Receipt confirmations are not reconciled into local state.
            Inbound::MessageRead(_) | Inbound::MessageReceived(_) => vec![],
        };
        self.settle(actions, now)
    }

    /// Fail every request outstanding for at least `timeout`.
    pub fn expire(&mut self, now: Instant, timeout: Duration) -> Vec<Effect> {
        let mut actions = self.registrar.expire(now, timeout);
        actions.extend(self.directory.expire(now, timeout));
        actions.extend(self.store.expire(now, timeout));
        self.settle(actions, now)
    }

    /// Summaries lagging behind the store. Always empty unless there is a bug.
    pub fn drift(&self) -> Vec<Drift> {
        self.directory.drift(&self.store)
    }

    fn settle(&mut self, actions: Vec<Action>, now: Instant) -> Vec<Effect> {
        let mut effects = Vec::with_capacity(actions.len());
        for action in actions {
            match action {
                Action::Emit(request) => effects.push(Effect::Emit(request)),
                Action::Notify(event) => effects.push(Effect::Notify(event)),
                Action::RefreshDirectory { user_id } => {
                    let chained = self.directory.refresh(user_id, now);
                    effects.extend(self.settle(chained, now));
                }
            }
        }
        effects
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ChatEvent;
    use chatsync_types::{Conversation, ConversationSummary, Outbound};

    fn t1() -> Identity {
        Identity::new("t1", "A", "B", "C")
    }

    fn emitted(effects: &[Effect]) -> Vec<&Outbound> {
        effects
            .iter()
            .filter_map(|e| match e {
                Effect::Emit(request) => Some(request),
                Effect::Notify(_) => None,
            })
            .collect()
    }

    fn connected() -> ChatState {
        let mut state = ChatState::new();
        state.on_connection(ConnectionEvent::ChannelOpened, Instant::now());
        state
    }

    fn message(conversation: &str, id: &str, sender: &str, ts: u64) -> Message {
        Message {
            message_id: id.into(),
            conversation_id: conversation.into(),
            sender: Identity::new(sender, "N", "F", "L"),
            content: String::new(),
            timestamp: ts,
            is_received: false,
            is_read: false,
            is_deleted: false,
        }
    }

    // ===========================================
    // Handshake Chain Tests
    // ===========================================

    #[test]
    fn registration_success_requests_chat_list() {
        let now = Instant::now();
        let mut state = connected();
        state.identity_changed(t1(), now);

        let effects = state.apply(
            Inbound::UserRegistered {
                user_id: "t1".into(),
            },
            now,
        );

        assert_eq!(
            emitted(&effects),
            vec![&Outbound::ListChatRooms {
                user_id: "t1".into()
            }]
        );
        assert!(state.directory().load_state().is_loading());
        assert!(effects.contains(&Effect::Notify(ChatEvent::Registered {
            user_id: "t1".into()
        })));
    }

    #[test]
    fn identity_before_channel_registers_on_open() {
        let now = Instant::now();
        let mut state = ChatState::new();
        assert!(state.identity_changed(t1(), now).is_empty());

        let effects = state.on_connection(ConnectionEvent::ChannelOpened, now);
        assert_eq!(emitted(&effects), vec![&Outbound::RegisterUser(t1())]);
    }

    #[test]
    fn explicit_register_before_connect_fails() {
        let mut state = ChatState::new();
        assert_eq!(
            state.register(t1(), Instant::now()),
            Err(CoreError::NotConnected)
        );
    }

    #[test]
    fn reconnect_re_registers() {
        let now = Instant::now();
        let mut state = connected();
        state.identity_changed(t1(), now);
        state.apply(
            Inbound::UserRegistered {
                user_id: "t1".into(),
            },
            now,
        );

        let effects = state.on_connection(
            ConnectionEvent::Lost {
                reason: "ping timeout".into(),
            },
            now,
        );
        assert!(emitted(&effects).is_empty());
        assert!(!state.registrar().is_registered());

        let effects = state.on_connection(ConnectionEvent::Restored, now);
        assert_eq!(emitted(&effects), vec![&Outbound::RegisterUser(t1())]);
    }

    // ===========================================
    // Reconciliation Tests
    // ===========================================

    #[test]
    fn push_keeps_directory_in_step() {
        let now = Instant::now();
        let mut state = connected();
        state.apply(
            Inbound::ChatsList(vec![ConversationSummary {
                conversation_id: "c1".into(),
                participants: vec![],
                latest_message: Some(message("c1", "m1", "t2", 10)),
            }]),
            now,
        );

        let mut conversation = Conversation::new("c1");
        conversation.messages = vec![message("c1", "m1", "t2", 10), message("c1", "m2", "t2", 20)];
        let effects = state.apply(Inbound::NewMessage(conversation), now);

        assert_eq!(
            state
                .directory()
                .get(&"c1".into())
                .and_then(|s| s.latest_timestamp()),
            Some(20)
        );
        assert!(state.drift().is_empty());
        let acks = emitted(&effects)
            .into_iter()
            .filter(|o| matches!(o, Outbound::ReceiveMessage(_)))
            .count();
        assert_eq!(acks, 1);
    }

    #[test]
    fn stale_chat_list_is_caught_up_from_store() {
        let now = Instant::now();
        let mut state = connected();

        let mut conversation = Conversation::new("c1");
        conversation.messages = vec![message("c1", "m2", "t2", 20)];
        state.apply(Inbound::NewMessage(conversation), now);

        // Chat list response reflects the server before the push
        state.apply(
            Inbound::ChatsList(vec![ConversationSummary {
                conversation_id: "c1".into(),
                participants: vec![],
                latest_message: Some(message("c1", "m1", "t2", 10)),
            }]),
            now,
        );

        assert!(state.drift().is_empty());
    }

    #[test]
    fn receipt_confirmations_do_not_touch_state() {
        let now = Instant::now();
        let mut state = connected();
        let effects = state.apply(Inbound::MessageRead(serde_json::json!("m1")), now);
        assert!(effects.is_empty());
        let effects = state.apply(Inbound::MessageReceived(serde_json::json!(null)), now);
        assert!(effects.is_empty());
    }

    // ===========================================
    // Dispatch Tests
    // ===========================================

    #[test]
    fn send_does_not_insert_optimistically() {
        let state = connected();
        let effects = state.send("c1".into(), t1(), "hello".into(), 1);

        assert_eq!(emitted(&effects).len(), 1);
        assert!(state.store().get(&"c1".into()).is_none());
    }

    #[test]
    fn mark_read_filters_candidates() {
        let state = connected();
        let mut read = message("c1", "m3", "t2", 3);
        read.mark_read();
        let candidates = vec![
            message("c1", "m1", "t1", 1),
            message("c1", "m2", "t2", 2),
            read,
        ];

        let effects = state.mark_read("c1".into(), &candidates, &"t1".into());
        assert_eq!(
            emitted(&effects),
            vec![&Outbound::ReadMessages {
                conversation_id: "c1".into(),
                message_ids: vec!["m2".into()],
            }]
        );
    }

    #[test]
    fn live_user_comes_from_supplied_identity() {
        let now = Instant::now();
        let mut state = connected();
        assert!(state.live_user().is_none());

        state.identity_changed(t1(), now);
        assert_eq!(state.live_user(), Some(&"t1".into()));
    }

    #[test]
    fn expire_collects_every_component() {
        let start = Instant::now();
        let mut state = connected();
        state.identity_changed(t1(), start);
        state.refresh_directory("t1".into(), start);
        state.fetch("c1".into(), "t1".into(), start);

        let effects = state.expire(start + Duration::from_secs(1), Duration::from_secs(1));
        let failures = effects
            .iter()
            .filter(|e| {
                matches!(
                    e,
                    Effect::Notify(ChatEvent::LoadFailed { .. })
                        | Effect::Notify(ChatEvent::RegistrationFailed { .. })
                )
            })
            .count();
        assert_eq!(failures, 3);
    }
}
