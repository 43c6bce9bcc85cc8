//! Chat directory: the ordered list of conversation summaries.
//!
//! The list is always sorted newest-first by the latest message timestamp,
//! whatever order the server used. Ties keep their relative input order and
//! summaries without a latest message sort last.

use std::time::{Duration, Instant};

use chatsync_types::{Conversation, ConversationId, ConversationSummary, Outbound, UserId};

use crate::load::TIMED_OUT;
use crate::{Action, ChatEvent, ConversationStore, LoadState, LoadTarget};

/// A summary that lags behind the store for the same conversation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Drift {
    /// Conversation whose summary is stale.
    pub conversation_id: ConversationId,
    /// Latest timestamp the summary shows.
    pub summary_timestamp: Option<u64>,
    /// Latest timestamp held in the store.
    pub store_timestamp: u64,
}

/// Ordered conversation summaries for the current user.
#[derive(Debug, Clone, Default)]
pub struct ChatDirectory {
    summaries: Vec<ConversationSummary>,
    load: LoadState,
}

impl ChatDirectory {
    /// Create an empty directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Summaries, newest first.
    pub fn summaries(&self) -> &[ConversationSummary] {
        &self.summaries
    }

    /// Look up one summary.
    pub fn get(&self, conversation_id: &ConversationId) -> Option<&ConversationSummary> {
        self.summaries
            .iter()
            .find(|s| &s.conversation_id == conversation_id)
    }

    /// Progress of the last refresh.
    pub fn load_state(&self) -> &LoadState {
        &self.load
    }

    /// Request the chat list for `user_id`.
    pub fn refresh(&mut self, user_id: UserId, now: Instant) -> Vec<Action> {
        self.load = LoadState::Loading { since: now };
        vec![Action::Emit(Outbound::ListChatRooms { user_id })]
    }

    /// `chatsList` arrived: replace the list wholesale.
    pub fn on_list(&mut self, mut summaries: Vec<ConversationSummary>) -> Vec<Action> {
        sort_newest_first(&mut summaries);
        self.summaries = summaries;
        self.load = LoadState::Loaded;
        vec![Action::Notify(ChatEvent::DirectoryUpdated)]
    }

    /// `listChatsError` arrived: keep the previous list.
    pub fn on_error(&mut self, error: String) -> Vec<Action> {
        self.load = LoadState::Failed {
            reason: error.clone(),
        };
        vec![Action::Notify(ChatEvent::DirectoryFailed { error })]
    }

    /// Fold a reconciled conversation into its summary, inserting one if absent.
    pub fn observe(&mut self, conversation: &Conversation) -> Vec<Action> {
        let changed = match self
            .summaries
            .iter_mut()
            .find(|s| s.conversation_id == conversation.conversation_id)
        {
            Some(summary) => lift(summary, conversation),
            None => {
                self.summaries.push(ConversationSummary::from(conversation));
                true
            }
        };

        if changed {
            sort_newest_first(&mut self.summaries);
            vec![Action::Notify(ChatEvent::DirectoryUpdated)]
        } else {
            vec![]
        }
    }

    /// Lift existing summaries that lag behind `store`. Never inserts.
    pub fn catch_up(&mut self, store: &ConversationStore) {
        let mut changed = false;
        for summary in &mut self.summaries {
            if let Some(conversation) = store.get(&summary.conversation_id) {
                changed |= lift(summary, conversation);
            }
        }
        if changed {
            sort_newest_first(&mut self.summaries);
        }
    }

    /// Mark a refresh older than `timeout` as failed.
    pub fn expire(&mut self, now: Instant, timeout: Duration) -> Vec<Action> {
        if !self.load.expired(now, timeout) {
            return vec![];
        }
        self.load = LoadState::Failed {
            reason: TIMED_OUT.to_string(),
        };
        vec![Action::Notify(ChatEvent::LoadFailed {
            target: LoadTarget::Directory,
            reason: TIMED_OUT.to_string(),
        })]
    }

    /// Summaries whose latest message is older than what `store` holds.
    pub fn drift(&self, store: &ConversationStore) -> Vec<Drift> {
        self.summaries
            .iter()
            .filter_map(|summary| {
                let store_timestamp = store.latest_timestamp(&summary.conversation_id)?;
                let summary_timestamp = summary.latest_timestamp();
                match summary_timestamp {
                    Some(ts) if ts >= store_timestamp => None,
                    _ => Some(Drift {
                        conversation_id: summary.conversation_id.clone(),
                        summary_timestamp,
                        store_timestamp,
                    }),
                }
            })
            .collect()
    }
}

/// Replace the summary's latest message when the conversation has a newer one.
fn lift(summary: &mut ConversationSummary, conversation: &Conversation) -> bool {
    let Some(latest) = conversation.latest_message() else {
        return false;
    };
    let newer = summary
        .latest_timestamp()
        .map_or(true, |ts| latest.timestamp > ts);
    if newer {
        summary.latest_message = Some(latest.clone());
        summary.participants = conversation.participants.clone();
    }
    newer
}

/// Stable sort, descending by latest timestamp. `None` sorts last.
fn sort_newest_first(summaries: &mut [ConversationSummary]) {
    summaries.sort_by(|a, b| b.latest_timestamp().cmp(&a.latest_timestamp()));
}

#[cfg(test)]
mod tests {
    use super::*;
    use chatsync_types::{Identity, Message};

    fn message(conversation: &str, id: &str, ts: u64) -> Message {
        Message {
            message_id: id.into(),
            conversation_id: conversation.into(),
            sender: Identity::new("t2", "D", "E", "F"),
            content: String::new(),
            timestamp: ts,
            is_received: false,
            is_read: false,
            is_deleted: false,
        }
    }

    fn summary(conversation: &str, ts: Option<u64>) -> ConversationSummary {
        ConversationSummary {
            conversation_id: conversation.into(),
            participants: vec![],
            latest_message: ts.map(|ts| message(conversation, &format!("{conversation}-m"), ts)),
        }
    }

    fn ids(directory: &ChatDirectory) -> Vec<&str> {
        directory
            .summaries()
            .iter()
            .map(|s| s.conversation_id.as_str())
            .collect()
    }

    // ===========================================
    // Refresh Tests
    // ===========================================

    #[test]
    fn refresh_emits_request_and_loads() {
        let mut directory = ChatDirectory::new();
        let actions = directory.refresh("t1".into(), Instant::now());

        assert!(directory.load_state().is_loading());
        assert_eq!(
            actions,
            vec![Action::Emit(Outbound::ListChatRooms {
                user_id: "t1".into()
            })]
        );
    }

    #[test]
    fn list_is_sorted_descending() {
        let mut directory = ChatDirectory::new();
        directory.refresh("t1".into(), Instant::now());
        directory.on_list(vec![
            summary("a", Some(10)),
            summary("b", Some(30)),
            summary("c", Some(20)),
        ]);

        assert_eq!(ids(&directory), vec!["b", "c", "a"]);
        assert!(directory.load_state().is_loaded());
    }

    #[test]
    fn equal_timestamps_keep_server_order() {
        let mut directory = ChatDirectory::new();
        directory.on_list(vec![
            summary("x", Some(5)),
            summary("first", Some(9)),
            summary("second", Some(9)),
            summary("third", Some(9)),
        ]);

        assert_eq!(ids(&directory), vec!["first", "second", "third", "x"]);
    }

    #[test]
    fn empty_conversations_sort_last() {
        let mut directory = ChatDirectory::new();
        directory.on_list(vec![summary("empty", None), summary("a", Some(1))]);
        assert_eq!(ids(&directory), vec!["a", "empty"]);
    }

    #[test]
    fn list_replaces_wholesale() {
        let mut directory = ChatDirectory::new();
        directory.on_list(vec![summary("a", Some(1)), summary("b", Some(2))]);
        directory.on_list(vec![summary("c", Some(3))]);
        assert_eq!(ids(&directory), vec!["c"]);
    }

    #[test]
    fn error_keeps_previous_list() {
        let mut directory = ChatDirectory::new();
        directory.on_list(vec![summary("a", Some(1))]);
        directory.refresh("t1".into(), Instant::now());

        let actions = directory.on_error("boom".into());
        assert_eq!(ids(&directory), vec!["a"]);
        assert!(matches!(directory.load_state(), LoadState::Failed { reason } if reason == "boom"));
        assert!(actions.iter().any(|a| matches!(
            a,
            Action::Notify(ChatEvent::DirectoryFailed { .. })
        )));
    }

    #[test]
    fn refresh_times_out() {
        let start = Instant::now();
        let mut directory = ChatDirectory::new();
        directory.refresh("t1".into(), start);

        let actions = directory.expire(start + Duration::from_secs(5), Duration::from_secs(5));
        assert!(matches!(directory.load_state(), LoadState::Failed { .. }));
        assert!(actions.iter().any(|a| matches!(
            a,
            Action::Notify(ChatEvent::LoadFailed {
                target: LoadTarget::Directory,
                ..
            })
        )));

        // Nothing left to expire
        assert!(directory
            .expire(start + Duration::from_secs(60), Duration::from_secs(5))
            .is_empty());
    }

    // ===========================================
    // Observation Tests
    // ===========================================

    #[test]
    fn observe_lifts_stale_summary_and_resorts() {
        let mut directory = ChatDirectory::new();
        directory.on_list(vec![summary("a", Some(20)), summary("b", Some(10))]);

        let mut conversation = Conversation::new("b");
        conversation.messages = vec![message("b", "b-new", 50)];
        let actions = directory.observe(&conversation);

        assert_eq!(ids(&directory), vec!["b", "a"]);
        assert_eq!(
            directory
                .get(&"b".into())
                .and_then(|s| s.latest_timestamp()),
            Some(50)
        );
        assert_eq!(actions, vec![Action::Notify(ChatEvent::DirectoryUpdated)]);
    }

    #[test]
    fn observe_never_moves_summary_backwards() {
        let mut directory = ChatDirectory::new();
        directory.on_list(vec![summary("a", Some(20))]);

        let mut conversation = Conversation::new("a");
        conversation.messages = vec![message("a", "old", 5)];
        assert!(directory.observe(&conversation).is_empty());
        assert_eq!(
            directory
                .get(&"a".into())
                .and_then(|s| s.latest_timestamp()),
            Some(20)
        );
    }

    #[test]
    fn observe_inserts_unknown_conversation() {
        let mut directory = ChatDirectory::new();
        directory.on_list(vec![summary("a", Some(20))]);

        let mut conversation = Conversation::new("new");
        conversation.messages = vec![message("new", "m", 99)];
        directory.observe(&conversation);

        assert_eq!(ids(&directory), vec!["new", "a"]);
    }

    // ===========================================
    // Drift Tests
    // ===========================================

    #[test]
    fn drift_detects_lagging_summary() {
        let mut store = ConversationStore::new();
        let mut conversation = Conversation::new("a");
        conversation.messages = vec![message("a", "m", 40)];
        store.on_push(conversation);

        let mut directory = ChatDirectory::new();
        directory.on_list(vec![summary("a", Some(30)), summary("b", Some(10))]);

        assert_eq!(
            directory.drift(&store),
            vec![Drift {
                conversation_id: "a".into(),
                summary_timestamp: Some(30),
                store_timestamp: 40,
            }]
        );

        directory.catch_up(&store);
        assert!(directory.drift(&store).is_empty());
    }
}
