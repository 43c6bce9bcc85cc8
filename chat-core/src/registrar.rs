//! Registration handshake.
//!
//! No chat operation is valid until the server has accepted the current
//! identity. Registration is attempted when the identity becomes complete
//! while connected, or when the channel (re)connects with a complete identity.
//! It is never attempted while a request is in flight or after success.
//!
//! Success chains straight into a directory refresh via
//! [`Action::RefreshDirectory`].

use std::time::{Duration, Instant};

use chatsync_types::{Identity, Outbound, UserId};

use crate::load::TIMED_OUT;
use crate::{Action, ChatEvent, CoreError};

/// Where the handshake stands.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum RegistrationStatus {
    /// Not registered; an attempt may be made.
    #[default]
    Unregistered,
    /// `registerUser` emitted, waiting for the outcome.
    InFlight {
        /// When the request was emitted.
        since: Instant,
    },
    /// Server accepted the registration.
    Registered {
        /// The registered user.
        user_id: UserId,
    },
}

/// Registration state machine.
#[derive(Debug, Clone, Default)]
pub struct Registrar {
    status: RegistrationStatus,
    identity: Identity,
    identity_complete: bool,
}

impl Registrar {
    /// Create an unregistered registrar with no identity.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current handshake status.
    pub fn status(&self) -> &RegistrationStatus {
        &self.status
    }

    /// True once the server has accepted the registration.
    pub fn is_registered(&self) -> bool {
        matches!(self.status, RegistrationStatus::Registered { .. })
    }

    /// True while a registration request is outstanding.
    pub fn is_in_flight(&self) -> bool {
        matches!(self.status, RegistrationStatus::InFlight { .. })
    }

    /// The user the server registered, if any.
    pub fn registered_user(&self) -> Option<&UserId> {
        match &self.status {
            RegistrationStatus::Registered { user_id } => Some(user_id),
            _ => None,
        }
    }

    /// The most recent identity seen.
    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    /// Explicitly register `identity`.
    ///
    /// A no-op while in flight or already registered.
    pub fn register(
        &mut self,
        identity: Identity,
        connected: bool,
        now: Instant,
    ) -> Result<Vec<Action>, CoreError> {
        if !identity.is_complete() {
            return Err(CoreError::IncompleteIdentity);
        }
        if !connected {
            return Err(CoreError::NotConnected);
        }
        self.identity = identity;
        self.identity_complete = true;
        Ok(self.attempt(now))
    }

    /// Record a new identity from the provider.
    ///
    /// Registers only on an incomplete-to-complete transition while connected.
    pub fn on_identity(&mut self, identity: Identity, connected: bool, now: Instant) -> Vec<Action> {
        let complete = identity.is_complete();
        let became_complete = complete && !self.identity_complete;
        self.identity = identity;
        self.identity_complete = complete;

        if became_complete && connected {
            self.attempt(now)
        } else {
            vec![]
        }
    }

    /// The channel connected or reconnected.
    pub fn on_connected(&mut self, now: Instant) -> Vec<Action> {
        if self.identity_complete {
            self.attempt(now)
        } else {
            vec![]
        }
    }

    /// The channel dropped. The server forgets registrations with the connection.
    pub fn on_connection_lost(&mut self) {
        self.status = RegistrationStatus::Unregistered;
    }

    /// `userRegistered` arrived.
    pub fn on_registered(&mut self, user_id: UserId) -> Vec<Action> {
        self.status = RegistrationStatus::Registered {
            user_id: user_id.clone(),
        };
        vec![
            Action::Notify(ChatEvent::Registered {
                user_id: user_id.clone(),
            }),
            Action::RefreshDirectory { user_id },
        ]
    }

    /// `registerUserError` arrived. Only an in-flight attempt is cleared.
    pub fn on_error(&mut self, error: String) -> Vec<Action> {
        if self.is_in_flight() {
            self.status = RegistrationStatus::Unregistered;
        }
        vec![Action::Notify(ChatEvent::RegistrationFailed { error })]
    }

    /// Give up on an in-flight attempt older than `timeout`.
    pub fn expire(&mut self, now: Instant, timeout: Duration) -> Vec<Action> {
        match self.status {
            RegistrationStatus::InFlight { since }
                if now.saturating_duration_since(since) >= timeout =>
            {
                self.status = RegistrationStatus::Unregistered;
                vec![Action::Notify(ChatEvent::RegistrationFailed {
                    error: TIMED_OUT.to_string(),
                })]
            }
            _ => vec![],
        }
    }

    fn attempt(&mut self, now: Instant) -> Vec<Action> {
        if self.status != RegistrationStatus::Unregistered {
            return vec![];
        }
        self.status = RegistrationStatus::InFlight { since: now };
        vec![Action::Emit(Outbound::RegisterUser(self.identity.clone()))]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t1() -> Identity {
        Identity::new("t1", "A", "B", "C")
    }

    fn register_emissions(actions: &[Action]) -> usize {
        actions
            .iter()
            .filter(|a| matches!(a, Action::Emit(Outbound::RegisterUser(_))))
            .count()
    }

    // ===========================================
    // Identity Transition Tests
    // ===========================================

    #[test]
    fn identity_arriving_after_connect_registers_once() {
        let now = Instant::now();
        let mut registrar = Registrar::new();

        let actions = registrar.on_identity(t1(), true, now);
        assert_eq!(register_emissions(&actions), 1);
        assert!(registrar.is_in_flight());

        let actions = registrar.on_registered("t1".into());
        assert!(registrar.is_registered());
        assert!(actions.contains(&Action::RefreshDirectory {
            user_id: "t1".into()
        }));

        // Same identity supplied again while registered
        let actions = registrar.on_identity(t1(), true, now);
        assert_eq!(register_emissions(&actions), 0);
    }

    #[test]
    fn incomplete_identity_does_not_register() {
        let mut registrar = Registrar::new();
        let partial = Identity::new("t1", "A", "", "C");

        let actions = registrar.on_identity(partial, true, Instant::now());
        assert!(actions.is_empty());
        assert_eq!(registrar.status(), &RegistrationStatus::Unregistered);
    }

    #[test]
    fn incomplete_then_complete_registers() {
        let now = Instant::now();
        let mut registrar = Registrar::new();
        registrar.on_identity(Identity::default(), true, now);

        let actions = registrar.on_identity(t1(), true, now);
        assert_eq!(register_emissions(&actions), 1);
    }

    #[test]
    fn identity_changes_while_in_flight_do_not_storm() {
        let now = Instant::now();
        let mut registrar = Registrar::new();
        registrar.on_identity(t1(), true, now);

        let mut renamed = t1();
        renamed.preferred_name = "Al".into();
        let actions = registrar.on_identity(renamed, true, now);
        assert_eq!(register_emissions(&actions), 0);
    }

    #[test]
    fn identity_before_connect_waits_for_connection() {
        let now = Instant::now();
        let mut registrar = Registrar::new();

        let actions = registrar.on_identity(t1(), false, now);
        assert!(actions.is_empty());

        let actions = registrar.on_connected(now);
        assert_eq!(register_emissions(&actions), 1);
    }

    #[test]
    fn connect_without_identity_does_nothing() {
        let mut registrar = Registrar::new();
        assert!(registrar.on_connected(Instant::now()).is_empty());
    }

    // ===========================================
    // Explicit Register Tests
    // ===========================================

    #[test]
    fn register_rejects_incomplete_identity() {
        let mut registrar = Registrar::new();
        let result = registrar.register(Identity::new("", "A", "B", "C"), true, Instant::now());
        assert_eq!(result, Err(CoreError::IncompleteIdentity));
    }

    #[test]
    fn register_requires_connection() {
        let mut registrar = Registrar::new();
        let result = registrar.register(t1(), false, Instant::now());
        assert_eq!(result, Err(CoreError::NotConnected));
    }

    #[test]
    fn register_is_noop_when_registered() {
        let now = Instant::now();
        let mut registrar = Registrar::new();
        registrar.register(t1(), true, now).unwrap();
        registrar.on_registered("t1".into());

        let actions = registrar.register(t1(), true, now).unwrap();
        assert!(actions.is_empty());
    }

    // ===========================================
    // Failure and Recovery Tests
    // ===========================================

    #[test]
    fn error_clears_in_flight_and_allows_retry() {
        let now = Instant::now();
        let mut registrar = Registrar::new();
        registrar.register(t1(), true, now).unwrap();

        let actions = registrar.on_error("duplicate".into());
        assert!(!registrar.is_registered());
        assert!(!registrar.is_in_flight());
        assert!(actions.iter().any(|a| matches!(
            a,
            Action::Notify(ChatEvent::RegistrationFailed { error }) if error == "duplicate"
        )));

        let actions = registrar.register(t1(), true, now).unwrap();
        assert_eq!(register_emissions(&actions), 1);
    }

    #[test]
    fn error_after_success_keeps_registration() {
        let mut registrar = Registrar::new();
        registrar.register(t1(), true, Instant::now()).unwrap();
        registrar.on_registered("t1".into());

        registrar.on_error("late".into());
        assert!(registrar.is_registered());
    }

    #[test]
    fn in_flight_times_out() {
        let start = Instant::now();
        let mut registrar = Registrar::new();
        registrar.register(t1(), true, start).unwrap();

        let timeout = Duration::from_secs(30);
        assert!(registrar.expire(start + Duration::from_secs(10), timeout).is_empty());

        let actions = registrar.expire(start + Duration::from_secs(30), timeout);
        assert_eq!(registrar.status(), &RegistrationStatus::Unregistered);
        assert!(actions.iter().any(|a| matches!(
            a,
            Action::Notify(ChatEvent::RegistrationFailed { error }) if error == TIMED_OUT
        )));
    }

    #[test]
    fn connection_loss_resets_and_reconnect_registers_again() {
        let now = Instant::now();
        let mut registrar = Registrar::new();
        registrar.register(t1(), true, now).unwrap();
        registrar.on_registered("t1".into());

        registrar.on_connection_lost();
        assert!(!registrar.is_registered());

        let actions = registrar.on_connected(now);
        assert_eq!(register_emissions(&actions), 1);
    }
}
