//! Identity provider: the external source of the current user's profile.

use std::sync::{Arc, Mutex, MutexGuard};

use chatsync_types::Identity;

/// Supplies the current user's identity.
///
/// `current_identity` may return an incomplete (even empty) identity while
/// the profile is still loading. `refresh_identity` re-reads the profile and
/// is only used as a fallback when resolving the current user id.
pub trait IdentityProvider: Send + Sync {
    /// Identity as currently known, possibly incomplete.
    fn current_identity(&self) -> Identity;

    /// Re-fetch the identity from the backing store.
    fn refresh_identity(&self) -> Identity;
}

/// In-memory identity provider.
///
/// Clones share state, so the application can update the identity after
/// handing the provider to the client.
#[derive(Debug, Default, Clone)]
pub struct StaticIdentityProvider {
    inner: Arc<Mutex<StaticIdentityInner>>,
}

#[derive(Debug, Default)]
struct StaticIdentityInner {
    current: Identity,
    refreshed: Option<Identity>,
}

impl StaticIdentityProvider {
    /// Provider with an empty identity.
    pub fn new() -> Self {
        Self::default()
    }

    /// Provider starting with `identity`.
    pub fn with_identity(identity: Identity) -> Self {
        let provider = Self::new();
        provider.set(identity);
        provider
    }

    fn inner(&self) -> MutexGuard<'_, StaticIdentityInner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Replace the current identity.
    pub fn set(&self, identity: Identity) {
        self.inner().current = identity;
    }

    /// Make `refresh_identity` return `identity` instead of the current one.
    pub fn set_refreshed(&self, identity: Identity) {
        self.inner().refreshed = Some(identity);
    }
}

impl IdentityProvider for StaticIdentityProvider {
    fn current_identity(&self) -> Identity {
        self.inner().current.clone()
    }

    fn refresh_identity(&self) -> Identity {
        let inner = self.inner();
        inner
            .refreshed
            .clone()
            .unwrap_or_else(|| inner.current.clone())
    }
}
