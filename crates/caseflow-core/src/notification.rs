//! Notification events produced by the engine.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::EngineError;
use crate::state::NotificationKey;

/// Identifies what a notification is about.
///
/// Client and reminder ids live in separate namespaces, so `client:7` and
/// `reminder:7` never collide.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "snake_case")]
pub enum SubjectId {
    Client(String),
    Reminder(String),
}

impl fmt::Display for SubjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Client(id) => write!(f, "client:{id}"),
            Self::Reminder(id) => write!(f, "reminder:{id}"),
        }
    }
}

impl FromStr for SubjectId {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once(':') {
            Some(("client", id)) if !id.is_empty() => Ok(Self::Client(id.to_string())),
            Some(("reminder", id)) if !id.is_empty() => Ok(Self::Reminder(id.to_string())),
            _ => Err(EngineError::InvalidSubject(s.to_string())),
        }
    }
}

/// The record a notification was raised for, with what a renderer needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Subject {
    Client {
        id: String,
        name: String,
    },
    Reminder {
        id: String,
        name: String,
        phone: Option<String>,
        notes: Option<String>,
    },
}

impl Subject {
    pub fn id(&self) -> SubjectId {
        match self {
            Self::Client { id, .. } => SubjectId::Client(id.clone()),
            Self::Reminder { id, .. } => SubjectId::Reminder(id.clone()),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Client { name, .. } | Self::Reminder { name, .. } => name,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    PaymentReminder,
    SilenceExpiring,
    SilenceExpired,
    DocumentsPending,
    StandaloneReminder,
}

impl NotificationKind {
    pub const ALL: [NotificationKind; 5] = [
        Self::PaymentReminder,
        Self::SilenceExpiring,
        Self::SilenceExpired,
        Self::DocumentsPending,
        Self::StandaloneReminder,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PaymentReminder => "payment_reminder",
            Self::SilenceExpiring => "silence_expiring",
            Self::SilenceExpired => "silence_expired",
            Self::DocumentsPending => "documents_pending",
            Self::StandaloneReminder => "standalone_reminder",
        }
    }
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NotificationKind {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| EngineError::UnknownKind(s.to_string()))
    }
}

/// Urgency of a notification. Orders most urgent first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        })
    }
}

/// What triggered a notification, with the figures behind it.
///
/// `days_remaining` is signed: negative is overdue, zero is due today.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Alert {
    PaymentReminder {
        remaining: f64,
        reminder_date: NaiveDate,
        days_remaining: i64,
    },
    SilenceExpiring {
        end_date: NaiveDate,
        days_remaining: i64,
    },
    /// Reports days elapsed since the silence period ended instead of days remaining.
    SilenceExpired {
        end_date: NaiveDate,
        days_elapsed: i64,
    },
    DocumentsPending {
        pending: usize,
        next_reminder: NaiveDate,
        days_remaining: i64,
    },
    StandaloneReminder {
        due_at: DateTime<Utc>,
        days_remaining: i64,
    },
}

impl Alert {
    pub fn kind(&self) -> NotificationKind {
        match self {
            Self::PaymentReminder { .. } => NotificationKind::PaymentReminder,
            Self::SilenceExpiring { .. } => NotificationKind::SilenceExpiring,
            Self::SilenceExpired { .. } => NotificationKind::SilenceExpired,
            Self::DocumentsPending { .. } => NotificationKind::DocumentsPending,
            Self::StandaloneReminder { .. } => NotificationKind::StandaloneReminder,
        }
    }

    pub fn days_remaining(&self) -> Option<i64> {
        match self {
            Self::PaymentReminder { days_remaining, .. }
            | Self::SilenceExpiring { days_remaining, .. }
            | Self::DocumentsPending { days_remaining, .. }
            | Self::StandaloneReminder { days_remaining, .. } => Some(*days_remaining),
            Self::SilenceExpired { .. } => None,
        }
    }
}

/// A single notification. Recomputed on every evaluation, never persisted
/// by the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationEvent {
    pub subject: Subject,
    pub alert: Alert,
    pub priority: Priority,
    /// Default English rendering; callers may localise from `alert` instead.
    pub message: String,
}

impl NotificationEvent {
    pub fn subject_id(&self) -> SubjectId {
        self.subject.id()
    }

    pub fn kind(&self) -> NotificationKind {
        self.alert.kind()
    }

    pub fn days_remaining(&self) -> Option<i64> {
        self.alert.days_remaining()
    }

    /// The `(subject, kind)` pair callers use to track read/dismissed state.
    pub fn key(&self) -> NotificationKey {
        NotificationKey {
            subject: self.subject_id(),
            kind: self.kind(),
        }
    }
}

/// Stable sort, most urgent first. Events of equal priority keep their
/// evaluation order.
pub fn sort_by_priority(events: &mut [NotificationEvent]) {
    events.sort_by_key(|event| event.priority);
}
