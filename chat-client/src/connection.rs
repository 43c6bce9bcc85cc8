//! Connection manager: owns the single channel for the client's lifetime.
//!
//! The channel is created lazily on first use through a factory and is never
//! created a second time while the manager lives. Every inbound event in
//! [`INBOUND_EVENTS`] is subscribed before the channel is handed out, so no
//! emission can race ahead of the subscription for its response.

use tokio::sync::OnceCell;
use tracing::{debug, info};

use chatsync_types::INBOUND_EVENTS;

use crate::channel::{Channel, ChannelError};

type Factory<C> = Box<dyn Fn(&str) -> C + Send + Sync>;

/// Lazily creates and then reuses one channel.
pub struct ConnectionManager<C: Channel> {
    url: String,
    factory: Factory<C>,
    channel: OnceCell<C>,
}

impl<C: Channel> ConnectionManager<C> {
    /// Create a manager that will build its channel with `factory(url)`.
    pub fn new<F>(url: impl Into<String>, factory: F) -> Self
    where
        F: Fn(&str) -> C + Send + Sync + 'static,
    {
        Self {
            url: url.into(),
            factory: Box::new(factory),
            channel: OnceCell::new(),
        }
    }

    /// The channel, creating, connecting and subscribing it on first call.
    ///
    /// Concurrent first callers share one creation. A failed creation leaves
    /// the manager empty so a later call can try again.
    pub async fn channel(&self) -> Result<&C, ChannelError> {
        self.channel
            .get_or_try_init(|| async {
                info!(url = %self.url, "opening chat channel");
                let channel = (self.factory)(&self.url);
                channel.connect().await?;
                for event in INBOUND_EVENTS {
                    channel.subscribe(event)?;
                    debug!(event, "subscribed");
                }
                Ok::<C, ChannelError>(channel)
            })
            .await
    }

    /// The channel if it already exists. Never creates one.
    pub fn get(&self) -> Option<&C> {
        self.channel.get()
    }

    /// True once a channel exists and reports itself connected.
    pub fn is_connected(&self) -> bool {
        self.channel.get().is_some_and(|c| c.is_connected())
    }

    /// Address the channel connects to.
    pub fn url(&self) -> &str {
        &self.url
    }
}

impl<C: Channel> std::fmt::Debug for ConnectionManager<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionManager")
            .field("url", &self.url)
            .field("created", &self.channel.initialized())
            .finish()
    }
}
