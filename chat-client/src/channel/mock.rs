//! Mock channel for testing.
//!
//! Queues inbound events and records subscriptions and emissions in the
//! order they happen, so tests can check that every subscription precedes
//! the first emission.

use super::{Channel, ChannelError, ChannelEvent};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::{HashSet, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};

/// One recorded interaction with the mock.
#[derive(Debug, Clone, PartialEq)]
pub enum MockOp {
    /// `subscribe()` was called.
    Subscribe(String),
    /// `emit()` succeeded.
    Emit {
        /// Event name.
        event: String,
        /// JSON payload.
        payload: Value,
    },
}

/// Mock channel for testing.
///
/// Clones share state, so a test can keep a handle while the client owns
/// another.
#[derive(Debug, Default, Clone)]
pub struct MockChannel {
    inner: Arc<Mutex<MockChannelInner>>,
}

#[derive(Debug, Default)]
struct MockChannelInner {
    connected: bool,
    connect_calls: usize,
    subscriptions: HashSet<String>,
    ops: Vec<MockOp>,
    inbound: VecDeque<ChannelEvent>,
    dropped: Vec<String>,
    fail_next_connect: Option<String>,
    fail_next_emit: Option<String>,
    hold_open: bool,
}

impl MockChannel {
    /// Create a new mock channel.
    pub fn new() -> Self {
        Self::default()
    }

    fn inner(&self) -> MutexGuard<'_, MockChannelInner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Queue a named event to be returned by `recv()`.
    pub fn queue_event(&self, name: &str, payload: Value) {
        self.inner().inbound.push_back(ChannelEvent::Named {
            name: name.to_string(),
            payload,
        });
    }

    /// Queue a transport drop.
    pub fn queue_disconnect(&self, reason: &str) {
        self.inner().inbound.push_back(ChannelEvent::Disconnected {
            reason: reason.to_string(),
        });
    }

    /// Queue a transport reconnection.
    pub fn queue_reconnect(&self) {
        self.inner().inbound.push_back(ChannelEvent::Reconnected);
    }

    /// Make `recv()` wait forever on an empty queue instead of reporting
    /// the connection closed.
    pub fn hold_open(&self) {
        self.inner().hold_open = true;
    }

    /// Every subscription and emission, in order.
    pub fn ops(&self) -> Vec<MockOp> {
        self.inner().ops.clone()
    }

    /// All successful emissions as `(event, payload)`.
    pub fn emitted(&self) -> Vec<(String, Value)> {
        self.inner()
            .ops
            .iter()
            .filter_map(|op| match op {
                MockOp::Emit { event, payload } => Some((event.clone(), payload.clone())),
                MockOp::Subscribe(_) => None,
            })
            .collect()
    }

    /// Payloads of every emission named `event`.
    pub fn emitted_named(&self, event: &str) -> Vec<Value> {
        self.emitted()
            .into_iter()
            .filter(|(name, _)| name == event)
            .map(|(_, payload)| payload)
            .collect()
    }

    /// Whether `event` has been subscribed.
    pub fn is_subscribed(&self, event: &str) -> bool {
        self.inner().subscriptions.contains(event)
    }

    /// Names of inbound events dropped for lack of a subscription.
    pub fn dropped(&self) -> Vec<String> {
        self.inner().dropped.clone()
    }

    /// How many times `connect()` was called.
    pub fn connect_calls(&self) -> usize {
        self.inner().connect_calls
    }

    /// Cause the next connect() to fail with the given error.
    pub fn fail_next_connect(&self, error: &str) {
        self.inner().fail_next_connect = Some(error.to_string());
    }

    /// Cause the next emit() to fail with the given error.
    pub fn fail_next_emit(&self, error: &str) {
        self.inner().fail_next_emit = Some(error.to_string());
    }
}

#[async_trait]
impl Channel for MockChannel {
    async fn connect(&self) -> Result<(), ChannelError> {
        let mut inner = self.inner();
        inner.connect_calls += 1;

        if let Some(error) = inner.fail_next_connect.take() {
            return Err(ChannelError::ConnectionFailed(error));
        }

        inner.connected = true;
        Ok(())
    }

    fn subscribe(&self, event: &str) -> Result<(), ChannelError> {
        let mut inner = self.inner();
        inner.subscriptions.insert(event.to_string());
        inner.ops.push(MockOp::Subscribe(event.to_string()));
        Ok(())
    }

    async fn emit(&self, event: &str, payload: Value) -> Result<(), ChannelError> {
        let mut inner = self.inner();

        if !inner.connected {
            return Err(ChannelError::NotConnected);
        }

        if let Some(reason) = inner.fail_next_emit.take() {
            return Err(ChannelError::EmitFailed {
                event: event.to_string(),
                reason,
            });
        }

        inner.ops.push(MockOp::Emit {
            event: event.to_string(),
            payload,
        });
        Ok(())
    }

    async fn recv(&self) -> Result<ChannelEvent, ChannelError> {
        let hold_open = {
            let mut inner = self.inner();

            if !inner.connected {
                return Err(ChannelError::NotConnected);
            }

            while let Some(event) = inner.inbound.pop_front() {
                if let ChannelEvent::Named { name, .. } = &event {
                    if !inner.subscriptions.contains(name) {
                        inner.dropped.push(name.clone());
                        continue;
                    }
                }
                return Ok(event);
            }
            inner.hold_open
        };

        if hold_open {
            std::future::pending::<()>().await;
        }
        Err(ChannelError::ConnectionClosed)
    }

    fn is_connected(&self) -> bool {
        self.inner().connected
    }

    async fn close(&self) -> Result<(), ChannelError> {
        self.inner().connected = false;
        Ok(())
    }
}
