//! Caller-owned read/dismissed tracking.
//!
//! The engine never consults this state. Callers evaluate first, then use
//! [`NotificationState`] to hide dismissed events and count unread ones.

use std::collections::{BTreeSet, HashSet};

use serde::{Deserialize, Serialize};

use crate::engine::Evaluation;
use crate::notification::{NotificationEvent, NotificationKind, SubjectId};

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NotificationKey {
    pub subject: SubjectId,
    pub kind: NotificationKind,
}

impl NotificationKey {
    pub fn new(subject: SubjectId, kind: NotificationKind) -> Self {
        Self { subject, kind }
    }
}

/// Read and dismissed keys. Sets are ordered so the serialised form is stable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationState {
    #[serde(default)]
    read: BTreeSet<NotificationKey>,
    #[serde(default)]
    dismissed: BTreeSet<NotificationKey>,
}

impl NotificationState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if the key was not already read.
    pub fn mark_read(&mut self, key: NotificationKey) -> bool {
        self.read.insert(key)
    }

    /// Dismissing also marks as read. Returns `true` if newly dismissed.
    pub fn dismiss(&mut self, key: NotificationKey) -> bool {
        self.read.insert(key.clone());
        self.dismissed.insert(key)
    }

    pub fn is_read(&self, key: &NotificationKey) -> bool {
        self.read.contains(key)
    }

    pub fn is_dismissed(&self, key: &NotificationKey) -> bool {
        self.dismissed.contains(key)
    }

    /// Events not dismissed, in their original order.
    pub fn visible(&self, events: Vec<NotificationEvent>) -> Vec<NotificationEvent> {
        events
            .into_iter()
            .filter(|event| !self.is_dismissed(&event.key()))
            .collect()
    }

    pub fn unread_count(&self, events: &[NotificationEvent]) -> usize {
        events
            .iter()
            .map(NotificationEvent::key)
            .filter(|key| !self.is_dismissed(key) && !self.is_read(key))
            .count()
    }

    /// Forget keys whose notification is no longer produced, so a condition
    /// that clears and later recurs surfaces again. Keys of subjects skipped
    /// as faults are kept: their notifications are unknown, not cleared.
    /// Returns the number of keys dropped.
    pub fn prune(&mut self, evaluation: &Evaluation) -> usize {
        let live: HashSet<NotificationKey> =
            evaluation.events.iter().map(NotificationEvent::key).collect();
        let faulted: HashSet<&SubjectId> =
            evaluation.faults.iter().map(|fault| &fault.subject).collect();
        let keep = |key: &NotificationKey| live.contains(key) || faulted.contains(&key.subject);

        let before = self.read.len() + self.dismissed.len();
        self.read.retain(|key| keep(key));
        self.dismissed.retain(|key| keep(key));
        before - (self.read.len() + self.dismissed.len())
    }

    pub fn is_empty(&self) -> bool {
        self.read.is_empty() && self.dismissed.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::EngineError;
    use crate::engine::EntityFault;
    use crate::notification::{Alert, Priority, Subject};
    use chrono::NaiveDate;

    fn payment_event(id: &str) -> NotificationEvent {
        NotificationEvent {
            subject: Subject::Client {
                id: id.into(),
                name: "Test Client".into(),
            },
            alert: Alert::PaymentReminder {
                remaining: 100.0,
                reminder_date: NaiveDate::from_ymd_opt(2025, 3, 15).unwrap(),
                days_remaining: 0,
            },
            priority: Priority::High,
            message: String::new(),
        }
    }

    fn evaluation(events: Vec<NotificationEvent>) -> Evaluation {
        Evaluation {
            events,
            faults: Vec::new(),
        }
    }

    fn key(id: &str) -> NotificationKey {
        NotificationKey::new(SubjectId::Client(id.into()), NotificationKind::PaymentReminder)
    }

    #[test]
    fn dismiss_implies_read() {
        let mut state = NotificationState::new();
        assert!(state.dismiss(key("1")));
        assert!(state.is_read(&key("1")));
        assert!(state.is_dismissed(&key("1")));
        assert!(!state.dismiss(key("1")));
    }

    #[test]
    fn visible_hides_dismissed_and_keeps_order() {
        let mut state = NotificationState::new();
        state.dismiss(key("2"));
        let events = vec![payment_event("1"), payment_event("2"), payment_event("3")];
        let visible = state.visible(events);
        let ids: Vec<String> = visible.iter().map(|e| e.subject_id().to_string()).collect();
        assert_eq!(ids, ["client:1", "client:3"]);
    }

    #[test]
    fn state_is_keyed_by_subject_and_kind() {
        let mut state = NotificationState::new();
        state.dismiss(NotificationKey::new(
            SubjectId::Client("1".into()),
            NotificationKind::SilenceExpired,
        ));
        state.dismiss(NotificationKey::new(
            SubjectId::Reminder("1".into()),
            NotificationKind::PaymentReminder,
        ));
        assert_eq!(state.visible(vec![payment_event("1")]).len(), 1);
    }

    #[test]
    fn unread_count_skips_read_and_dismissed() {
        let mut state = NotificationState::new();
        let events = vec![payment_event("1"), payment_event("2"), payment_event("3")];
        assert_eq!(state.unread_count(&events), 3);
        state.mark_read(key("1"));
        state.dismiss(key("2"));
        assert_eq!(state.unread_count(&events), 1);
    }

    #[test]
    fn prune_drops_stale_keys() {
        let mut state = NotificationState::new();
        state.mark_read(key("1"));
        state.dismiss(key("2"));
        let dropped = state.prune(&evaluation(vec![payment_event("1")]));
        // key 2 was in both sets
        assert_eq!(dropped, 2);
        assert!(state.is_read(&key("1")));
        assert!(!state.is_dismissed(&key("2")));
        assert_eq!(state.prune(&evaluation(vec![])), 1);
        assert!(state.is_empty());
    }

    #[test]
    fn prune_keeps_keys_of_faulted_subjects() {
        let mut state = NotificationState::new();
        state.dismiss(key("1"));
        state.mark_read(key("2"));
        let faulted = Evaluation {
            events: Vec::new(),
            faults: vec![EntityFault {
                subject: SubjectId::Client("1".into()),
                error: EngineError::InvalidDate {
                    field: "applicationDate",
                    value: "garbage".into(),
                },
            }],
        };
        // client 2 cleared, client 1 could not be evaluated
        assert_eq!(state.prune(&faulted), 1);
        assert!(state.is_dismissed(&key("1")));
        assert!(!state.is_read(&key("2")));
    }

    #[test]
    fn serialised_form_is_stable() {
        let mut a = NotificationState::new();
        a.mark_read(key("b"));
        a.mark_read(key("a"));
        let mut b = NotificationState::new();
        b.mark_read(key("a"));
        b.mark_read(key("b"));
        let json = serde_json::to_string(&a).unwrap();
        assert_eq!(json, serde_json::to_string(&b).unwrap());
        let parsed: NotificationState = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, a);
        let empty: NotificationState = serde_json::from_str("{}").unwrap();
        assert!(empty.is_empty());
    }
}
