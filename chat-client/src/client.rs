//! ChatClient - the main interface for chatsync.
//!
//! This module provides [`ChatClient`], which keeps a local mirror of the
//! user's conversations in step with the server over a [`Channel`].
//!
//! # Architecture
//!
//! ChatClient uses the pure state machines from chat-core for all
//! reconciliation logic and interprets the resulting effects to perform
//! actual I/O.
//!
//! ```text
//! Application ─► ChatClient ─► ConnectionManager ─► Channel ─► Server
//!      ▲              │                                 │
//!      │              ▼                                 │
//!  ChatEvent ◄── chat-core (ChatState) ◄── inbound ─────┘
//! ```
//!
//! Three sources feed the state: user requests, server pushes and channel
//! lifecycle changes. All of them go through the same `ChatState` lock, and
//! effects are executed in the order the state machine produced them.
//!
//! # Example
//!
//! ```ignore
//! use chatsync_client::{ChatClient, ClientConfig, MockChannel, StaticIdentityProvider};
//!
//! let identity = StaticIdentityProvider::with_identity(me);
//! let client = ChatClient::new(ClientConfig::default(), |_url| MockChannel::new(), identity);
//!
//! client.connect().await?;     // registers, then requests the chat list
//! client.run().await?;         // reconcile inbound events until the channel closes
//! ```

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use thiserror::Error;
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, error, info, warn};

use chatsync_core::{
    dispatch, ChatEvent, ChatState, ConnectionEvent, CoreError, Drift, Effect, LoadState,
};
use chatsync_types::{
    Conversation, ConversationId, ConversationSummary, Identity, Inbound, Message, Outbound,
    UserId,
};

use crate::channel::{Channel, ChannelError, ChannelEvent};
use crate::config::{ClientConfig, ConfigError};
use crate::connection::ConnectionManager;
use crate::identity::IdentityProvider;

/// Client errors.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Channel error.
    #[error("channel error: {0}")]
    Channel(#[from] ChannelError),

    /// An operation's precondition was not met.
    #[error("{0}")]
    Core(#[from] CoreError),

    /// The channel could not be created.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// No channel exists yet.
    #[error("not connected")]
    NotConnected,

    /// Configuration could not be loaded.
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
}

/// The main chat client.
///
/// Owns the connection, the local chat state and the notification stream.
pub struct ChatClient<C: Channel, P: IdentityProvider> {
    config: ClientConfig,
    connection: ConnectionManager<C>,
    identity: P,
    state: Arc<Mutex<ChatState>>,
    events: broadcast::Sender<ChatEvent>,
}

impl<C: Channel, P: IdentityProvider> ChatClient<C, P> {
    /// Create a new ChatClient. No channel is opened until first use.
    pub fn new<F>(config: ClientConfig, factory: F, identity: P) -> Self
    where
        F: Fn(&str) -> C + Send + Sync + 'static,
    {
        let connection = ConnectionManager::new(config.channel.url.clone(), factory);
        let (events, _) = broadcast::channel(config.events.capacity.max(1));
        Self {
            config,
            connection,
            identity,
            state: Arc::new(Mutex::new(ChatState::new())),
            events,
        }
    }

    /// Create a ChatClient from a TOML configuration file.
    pub fn from_config_file<F>(path: &Path, factory: F, identity: P) -> Result<Self, ClientError>
    where
        F: Fn(&str) -> C + Send + Sync + 'static,
    {
        let config = ClientConfig::from_file(path)?;
        Ok(Self::new(config, factory, identity))
    }

    // ===========================================
    // Connection and Registration
    // ===========================================

    /// Open the channel (once) and start the registration handshake.
    ///
    /// Calling this again after the channel exists does nothing.
    pub async fn connect(&self) -> Result<(), ClientError> {
        self.connection
            .channel()
            .await
            .map_err(|e| ClientError::ConnectionFailed(e.to_string()))?;

        let effects = {
            let mut state = self.state.lock().await;
            if state.connection().is_initialized() {
                return Ok(());
            }
            let now = clock();
            let mut effects = state.identity_changed(self.identity.current_identity(), now);
            effects.extend(state.on_connection(ConnectionEvent::ChannelOpened, now));
            effects
        };
        info!(url = %self.connection.url(), "chat channel connected");
        self.execute(effects).await;
        Ok(())
    }

    /// Report an updated identity from the provider.
    ///
    /// Registers automatically when the identity first becomes complete
    /// while connected. Repeated or partial updates never re-register.
    pub async fn identity_changed(&self, identity: Identity) {
        let effects = self
            .state
            .lock()
            .await
            .identity_changed(identity, clock());
        self.execute(effects).await;
    }

    /// Register `identity` explicitly. A no-op while in flight or registered.
    pub async fn register(&self, identity: Identity) -> Result<(), ClientError> {
        if !self.ensure_connected().await {
            return Ok(());
        }
        let result = self.state.lock().await.register(identity, clock());
        match result {
            Ok(effects) => self.execute(effects).await,
            Err(CoreError::NotConnected) => {
                error!("registration skipped: chat channel is disconnected");
            }
            Err(e) => return Err(e.into()),
        }
        Ok(())
    }

    // ===========================================
    // Requests
    // ===========================================

    /// Request the chat list for `user_id`.
    pub async fn refresh(&self, user_id: UserId) -> Result<(), ClientError> {
        if !self.ensure_connected().await {
            return Ok(());
        }
        let effects = self
            .state
            .lock()
            .await
            .refresh_directory(user_id, clock());
        self.execute(effects).await;
        Ok(())
    }

    /// Request a conversation's history and select it for display.
    ///
    /// Only one conversation is displayed at a time; callers should fetch in
    /// navigation order.
    pub async fn fetch(
        &self,
        conversation_id: ConversationId,
        user_id: UserId,
    ) -> Result<(), ClientError> {
        if !self.ensure_connected().await {
            return Ok(());
        }
        let effects = self
            .state
            .lock()
            .await
            .fetch(conversation_id, user_id, clock());
        self.execute(effects).await;
        Ok(())
    }

    /// Send a message. It shows up locally once the server pushes it back.
    pub async fn send(
        &self,
        conversation_id: ConversationId,
        sender: Identity,
        content: String,
        timestamp: u64,
    ) -> Result<(), ClientError> {
        if !self.ensure_connected().await {
            return Ok(());
        }
        let effects = self
            .state
            .lock()
            .await
            .send(conversation_id, sender, content, timestamp);
        self.execute(effects).await;
        Ok(())
    }

    /// Send a read receipt for the messages in `candidates` that someone
    /// else wrote and that are not read yet.
    ///
    /// The current user comes from the live session, falling back to the
    /// identity provider. If neither knows it, nothing is emitted and
    /// [`CoreError::NoCurrentUser`] is returned.
    pub async fn mark_read(
        &self,
        conversation_id: ConversationId,
        candidates: &[Message],
    ) -> Result<(), ClientError> {
        let live = self.state.lock().await.live_user().cloned();
        let current_user = match dispatch::resolve_current_user(live.as_ref(), || {
            Some(self.identity.refresh_identity().user_id)
        }) {
            Ok(user_id) => user_id,
            Err(e) => {
                error!(%conversation_id, "read receipt aborted: current user unknown");
                return Err(e.into());
            }
        };

        if !self.ensure_connected().await {
            return Ok(());
        }
        let effects = self
            .state
            .lock()
            .await
            .mark_read(conversation_id, candidates, &current_user);
        if effects.is_empty() {
            debug!("no messages eligible for a read receipt");
        }
        self.execute(effects).await;
        Ok(())
    }

    // ===========================================
    // Inbound Processing
    // ===========================================

    /// Reconcile one event delivered by the channel.
    pub async fn process_event(&self, event: ChannelEvent) {
        let now = clock();
        let effects = match event {
            ChannelEvent::Named { name, payload } => {
                let inbound = match Inbound::decode(&name, payload) {
                    Ok(inbound) => inbound,
                    Err(e) => {
                        warn!(event = %name, error = %e, "dropping inbound event");
                        return;
                    }
                };
                log_inbound(&name, &inbound);

                let mut state = self.state.lock().await;
                let effects = state.apply(inbound, now);
                report_drift(&state.drift());
                effects
            }
            ChannelEvent::Disconnected { reason } => {
                warn!(%reason, "chat channel lost");
                self.state
                    .lock()
                    .await
                    .on_connection(ConnectionEvent::Lost { reason }, now)
            }
            ChannelEvent::Reconnected => {
                info!("chat channel restored");
                self.state
                    .lock()
                    .await
                    .on_connection(ConnectionEvent::Restored, now)
            }
        };
        self.execute(effects).await;
    }

    /// Receive and reconcile the next inbound event.
    pub async fn process_next(&self) -> Result<(), ClientError> {
        let channel = self.connection.get().ok_or(ClientError::NotConnected)?;
        let event = channel.recv().await?;
        self.process_event(event).await;
        Ok(())
    }

    /// Connect, then reconcile inbound events until the channel closes.
    ///
    /// Outstanding requests are expired on a fixed interval in between.
    pub async fn run(&self) -> Result<(), ClientError> {
        self.connect().await?;
        let channel = self.connection.get().ok_or(ClientError::NotConnected)?;
        let mut ticker = tokio::time::interval(self.config.requests.expiry_interval());

        loop {
            tokio::select! {
                received = channel.recv() => match received {
                    Ok(event) => self.process_event(event).await,
                    Err(ChannelError::ConnectionClosed) => {
                        info!("chat channel closed");
                        return Ok(());
                    }
                    Err(e) => return Err(e.into()),
                },
                _ = ticker.tick() => self.expire_stale_requests().await,
            }
        }
    }

    /// Fail every request that has waited longer than the configured timeout.
    pub async fn expire_stale_requests(&self) {
        let effects = self
            .state
            .lock()
            .await
            .expire(clock(), self.config.requests.timeout());
        for effect in &effects {
            if let Effect::Notify(ChatEvent::LoadFailed { target, reason }) = effect {
                warn!(?target, %reason, "request failed");
            }
        }
        self.execute(effects).await;
    }

    // ===========================================
    // State Access
    // ===========================================

    /// Subscribe to application notifications.
    pub fn subscribe(&self) -> broadcast::Receiver<ChatEvent> {
        self.events.subscribe()
    }

    /// Check if the channel is live.
    pub async fn is_connected(&self) -> bool {
        self.state.lock().await.connection().is_connected()
    }

    /// Check if the server accepted the registration.
    pub async fn is_registered(&self) -> bool {
        self.state.lock().await.registrar().is_registered()
    }

    /// Conversation summaries, newest first.
    pub async fn summaries(&self) -> Vec<ConversationSummary> {
        self.state.lock().await.directory().summaries().to_vec()
    }

    /// Progress of the last chat list refresh.
    pub async fn directory_state(&self) -> LoadState {
        self.state.lock().await.directory().load_state().clone()
    }

    /// Stored conversation, if any.
    pub async fn conversation(&self, conversation_id: &ConversationId) -> Option<Conversation> {
        self.state.lock().await.store().get(conversation_id).cloned()
    }

    /// Progress of the last fetch for `conversation_id`.
    pub async fn fetch_state(&self, conversation_id: &ConversationId) -> LoadState {
        self.state.lock().await.store().fetch_state(conversation_id)
    }

    /// Conversation currently selected for display.
    pub async fn selected(&self) -> Option<ConversationId> {
        self.state.lock().await.store().selected().cloned()
    }

    /// Messages currently displayed.
    pub async fn displayed(&self) -> Vec<Message> {
        self.state.lock().await.store().displayed().to_vec()
    }

    /// Summaries that lag behind the store. Non-empty means a bug.
    pub async fn check_consistency(&self) -> Vec<Drift> {
        self.state.lock().await.drift()
    }

    /// The channel, if it has been created (for testing).
    pub fn channel(&self) -> Option<&C> {
        self.connection.get()
    }

    /// Client configuration.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    // ===========================================
    // Effect Execution
    // ===========================================

    async fn ensure_connected(&self) -> bool {
        match self.connect().await {
            Ok(()) => true,
            Err(e) => {
                error!(error = %e, "no chat channel; operation skipped");
                false
            }
        }
    }

    async fn execute(&self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::Emit(request) => self.emit(request).await,
                Effect::Notify(event) => {
                    // No subscribers is not an error.
                    let _ = self.events.send(event);
                }
            }
        }
    }

    async fn emit(&self, request: Outbound) {
        let event = request.event_name();
        let Some(channel) = self.connection.get() else {
            error!(event, "no chat channel; emission skipped");
            return;
        };
        let payload = match request.payload() {
            Ok(payload) => payload,
            Err(e) => {
                error!(event, error = %e, "could not encode request");
                return;
            }
        };
        debug!(event, "emit");
        if let Err(e) = channel.emit(event, payload).await {
            error!(event, error = %e, "emit failed");
        }
    }
}

/// Current time on the tokio clock (pausable in tests).
fn clock() -> Instant {
    tokio::time::Instant::now().into_std()
}

fn log_inbound(name: &str, inbound: &Inbound) {
    match inbound {
        Inbound::RegisterUserError(error) => warn!(%error, "registration rejected"),
        Inbound::ListChatsError(error) => {
            warn!(%error, "chat list refresh failed; keeping previous list")
        }
        Inbound::NewMessage(conversation) if conversation.messages.is_empty() => {
            warn!(
                conversation_id = %conversation.conversation_id,
                "push without messages; nothing to acknowledge"
            )
        }
        Inbound::MessageRead(_) | Inbound::MessageReceived(_) => {
            debug!(event = name, "receipt confirmation not handled")
        }
        _ => debug!(event = name, "inbound"),
    }
}

fn report_drift(drift: &[Drift]) {
    for d in drift {
        error!(
            conversation_id = %d.conversation_id,
            summary_timestamp = ?d.summary_timestamp,
            store_timestamp = d.store_timestamp,
            "directory summary is behind the conversation store"
        );
    }
}
