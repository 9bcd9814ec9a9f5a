//! Deadline & reminder engine.
//!
//! Pure evaluation: given a fixed `now` and a snapshot, produce every
//! notification that is currently relevant. No I/O, no shared state, and the
//! same inputs always yield the same output.
//!
//! Rules run independently per record:
//!
//! | Rule                | Applies when                               | Emitted window            |
//! |---------------------|--------------------------------------------|---------------------------|
//! | payment reminder    | custom reminder date set, balance owed     | 0..=2 days until the date |
//! | administrative silence | filed with an application date          | 7 days before, or expired |
//! | pending documents   | not filed, mandatory documents missing     | 2 days before, or overdue |
//! | standalone reminder | always                                     | due within 3 days, at most 7 days late |
//!
//! A record whose dates cannot be parsed is skipped as a whole and reported
//! as an [`EntityFault`]; the rest of the batch is still evaluated.

use chrono::{DateTime, NaiveDate, Utc};
use tracing::{debug, info, warn};

use crate::calendar::{self, DAY_MS};
use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::notification::{Alert, NotificationEvent, Priority, Subject, SubjectId};
use crate::snapshot::{ClientSnapshot, Snapshot, StandaloneReminder};

/// Payment reminders surface from this many days ahead of the date.
const PAYMENT_LEAD_DAYS: i64 = 2;
/// Silence deadlines surface this many days before they end.
const SILENCE_LEAD_DAYS: i64 = 7;
/// Silence deadlines this close are high priority.
const SILENCE_URGENT_DAYS: i64 = 3;
/// Document nudges surface from this many days ahead of the next reminder.
const DOCUMENTS_LEAD_DAYS: i64 = 2;
/// Standalone reminders surface once due within this many days.
const STANDALONE_LEAD_DAYS: i64 = 3;
/// Standalone reminders further out (or later) than this are dropped.
const STANDALONE_MAX_DAYS: i64 = 7;
/// Overdue thresholds shared by document and standalone reminders.
const OVERDUE_HIGH_DAYS: i64 = -7;
const OVERDUE_MEDIUM_DAYS: i64 = -3;

/// Outcome of one evaluation run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Evaluation {
    /// Client events first, in snapshot order, then standalone reminders.
    pub events: Vec<NotificationEvent>,
    /// Records skipped because their data could not be evaluated.
    pub faults: Vec<EntityFault>,
}

/// A record that was skipped during evaluation.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityFault {
    pub subject: SubjectId,
    pub error: EngineError,
}

/// Evaluate clients and standalone reminders at `now` in UTC.
///
/// Records with malformed dates are skipped; use [`evaluate_snapshot`] to
/// see which.
pub fn evaluate(
    now: DateTime<Utc>,
    clients: &[ClientSnapshot],
    reminders: &[StandaloneReminder],
) -> Vec<NotificationEvent> {
    run(now, clients, reminders, &EngineConfig::default()).events
}

/// Evaluate a snapshot with an explicit configuration, reporting skipped records.
pub fn evaluate_snapshot(
    now: DateTime<Utc>,
    snapshot: &Snapshot,
    config: &EngineConfig,
) -> Evaluation {
    run(now, &snapshot.clients, &snapshot.reminders, config)
}

/// A single "now" shared by every rule in a run.
struct Clock<'a> {
    now: DateTime<Utc>,
    today: NaiveDate,
    config: &'a EngineConfig,
}

impl Clock<'_> {
    fn date(&self, field: &'static str, raw: &str) -> Result<NaiveDate, EngineError> {
        calendar::parse_calendar_date(field, raw, &self.config.utc_offset)
    }

    fn days_until(&self, target: NaiveDate) -> i64 {
        calendar::days_until(target, self.today)
    }
}

fn run(
    now: DateTime<Utc>,
    clients: &[ClientSnapshot],
    reminders: &[StandaloneReminder],
    config: &EngineConfig,
) -> Evaluation {
    let clock = Clock {
        now,
        today: calendar::local_today(now, &config.utc_offset),
        config,
    };
    let mut evaluation = Evaluation::default();

    for client in clients {
        match client_events(client, &clock) {
            Ok(events) => evaluation.events.extend(events),
            Err(error) => evaluation.faults.push(fault(SubjectId::Client(client.id.clone()), error)),
        }
    }

    for reminder in reminders {
        match standalone_reminder(reminder, &clock) {
            Ok(event) => evaluation.events.extend(event),
            Err(error) => evaluation
                .faults
                .push(fault(SubjectId::Reminder(reminder.id.clone()), error)),
        }
    }

    for event in &evaluation.events {
        debug!(
            subject = %event.subject_id(),
            kind = %event.kind(),
            priority = %event.priority,
            "notification raised"
        );
    }
    info!(
        clients = clients.len(),
        reminders = reminders.len(),
        events = evaluation.events.len(),
        faults = evaluation.faults.len(),
        today = %clock.today,
        "evaluation complete"
    );
    evaluation
}

fn fault(subject: SubjectId, error: EngineError) -> EntityFault {
    warn!(subject = %subject, error = %error, "skipping record");
    EntityFault { subject, error }
}

/// All events for one client, or the first error. Nothing is emitted for a
/// client with any bad date, even from rules that parsed fine.
fn client_events(
    client: &ClientSnapshot,
    clock: &Clock<'_>,
) -> Result<Vec<NotificationEvent>, EngineError> {
    let subject = Subject::Client {
        id: client.id.clone(),
        name: client.display_name(),
    };

    let name = subject.name();
    let raised = [
        payment_reminder(client, name, clock)?,
        administrative_silence(client, name, clock)?,
        pending_documents(client, name, clock)?,
    ];

    Ok(raised
        .into_iter()
        .flatten()
        .map(|(alert, priority, message)| NotificationEvent {
            subject: subject.clone(),
            alert,
            priority,
            message,
        })
        .collect())
}

/// A client rule's output: the alert, its priority, and the rendered message.
type Raised = (Alert, Priority, String);

// ── Rule 1: payment reminder ──

fn payment_reminder(
    client: &ClientSnapshot,
    name: &str,
    clock: &Clock<'_>,
) -> Result<Option<Raised>, EngineError> {
    let Some(raw) = client.custom_reminder_date.as_deref() else {
        return Ok(None);
    };
    let remaining = client.payment.remaining();
    if remaining <= 0.0 {
        return Ok(None);
    }

    let reminder_date = clock.date("customReminderDate", raw)?;
    let days = clock.days_until(reminder_date);
    // Overdue dates are suppressed as well as distant ones.
    let priority = match days {
        0 => Priority::High,
        1 => Priority::Medium,
        d if d == PAYMENT_LEAD_DAYS => Priority::Low,
        _ => return Ok(None),
    };

    Ok(Some((
        Alert::PaymentReminder {
            remaining,
            reminder_date,
            days_remaining: days,
        },
        priority,
        format!(
            "Payment follow-up for {name} {}: {remaining:.2} outstanding",
            due_phrase(days)
        ),
    )))
}

// ── Rule 2: administrative silence ──

fn administrative_silence(
    client: &ClientSnapshot,
    name: &str,
    clock: &Clock<'_>,
) -> Result<Option<Raised>, EngineError> {
    if !client.submitted_to_immigration {
        return Ok(None);
    }
    let Some(raw) = client.application_date.as_deref() else {
        return Ok(None);
    };

    let application_date = clock.date("applicationDate", raw)?;
    let end_date = calendar::add_days(
        application_date,
        client.administrative_silence_days,
        "administrativeSilenceDays",
    )?;
    let days = clock.days_until(end_date);

    let result = if days < 0 {
        Some((
            Alert::SilenceExpired {
                end_date,
                days_elapsed: days.abs(),
            },
            Priority::High,
            format!(
                "Administrative silence for {name} expired {} ago",
                day_count(days.abs())
            ),
        ))
    } else if days <= SILENCE_LEAD_DAYS {
        let priority = if days <= SILENCE_URGENT_DAYS {
            Priority::High
        } else {
            Priority::Medium
        };
        Some((
            Alert::SilenceExpiring {
                end_date,
                days_remaining: days,
            },
            priority,
            format!(
                "Administrative silence for {name} ends {}",
                due_phrase(days)
            ),
        ))
    } else {
        None
    };
    Ok(result)
}

// ── Rule 3: pending required documents ──

fn pending_documents(
    client: &ClientSnapshot,
    name: &str,
    clock: &Clock<'_>,
) -> Result<Option<Raised>, EngineError> {
    if client.submitted_to_immigration {
        return Ok(None);
    }
    let pending = client.pending_documents();
    if pending == 0 {
        return Ok(None);
    }

    let baseline = last_activity(client, clock)?;
    let next_reminder = calendar::add_days(
        baseline,
        client.reminder_interval_days,
        "reminderIntervalDays",
    )?;
    let days = clock.days_until(next_reminder);
    // No lower bound: overdue nudges keep firing until documents arrive.
    if days > DOCUMENTS_LEAD_DAYS {
        return Ok(None);
    }

    let priority = if days < 0 {
        overdue_priority(days)
    } else if days == 0 {
        Priority::Medium
    } else {
        Priority::Low
    };

    Ok(Some((
        Alert::DocumentsPending {
            pending,
            next_reminder,
            days_remaining: days,
        },
        priority,
        documents_message(name, pending, days),
    )))
}

/// Most recent upload among submitted documents, else the client's creation date.
fn last_activity(client: &ClientSnapshot, clock: &Clock<'_>) -> Result<NaiveDate, EngineError> {
    let mut latest: Option<NaiveDate> = None;
    for doc in &client.required_documents {
        if doc.submitted
            && let Some(raw) = doc.uploaded_at.as_deref()
        {
            let uploaded = clock.date("uploadedAt", raw)?;
            latest = latest.max(Some(uploaded));
        }
    }
    match latest {
        Some(date) => Ok(date),
        None => clock.date("createdAt", &client.created_at),
    }
}

// ── Rule 4: standalone reminders ──

fn standalone_reminder(
    reminder: &StandaloneReminder,
    clock: &Clock<'_>,
) -> Result<Option<NotificationEvent>, EngineError> {
    let due_at =
        calendar::parse_instant("reminderDate", &reminder.reminder_date, &clock.config.utc_offset)?;
    let diff_ms = (due_at - clock.now).num_milliseconds();
    if diff_ms > STANDALONE_LEAD_DAYS * DAY_MS {
        return Ok(None);
    }

    let days = calendar::ceil_days(diff_ms);
    if days.abs() > STANDALONE_MAX_DAYS {
        return Ok(None);
    }

    let overdue = diff_ms < 0;
    // The gate above caps `days` at 3, so there is no "far away" tier.
    let priority = if overdue {
        overdue_priority(days)
    } else if days <= 1 {
        Priority::High
    } else {
        Priority::Medium
    };

    let subject = Subject::Reminder {
        id: reminder.id.clone(),
        name: reminder.display_name(),
        phone: reminder.phone.clone(),
        notes: reminder.notes.clone(),
    };
    let message = standalone_message(subject.name(), days, overdue);

    Ok(Some(NotificationEvent {
        subject,
        alert: Alert::StandaloneReminder {
            due_at,
            days_remaining: days,
        },
        priority,
        message,
    }))
}

fn overdue_priority(days: i64) -> Priority {
    if days <= OVERDUE_HIGH_DAYS {
        Priority::High
    } else if days <= OVERDUE_MEDIUM_DAYS {
        Priority::Medium
    } else {
        Priority::Low
    }
}

// ── Messages ──

fn documents_message(name: &str, pending: usize, days: i64) -> String {
    let documents = if pending == 1 {
        "1 required document".to_string()
    } else {
        format!("{pending} required documents")
    };
    if days < 0 {
        format!(
            "{name} has {documents} pending; follow-up overdue by {}",
            day_count(days.abs())
        )
    } else {
        format!("{name} has {documents} pending; follow-up due {}", due_phrase(days))
    }
}

fn standalone_message(name: &str, days: i64, overdue: bool) -> String {
    match (overdue, days) {
        (true, 0) => format!("Reminder for {name} was due earlier today"),
        (true, d) => format!("Reminder for {name} is overdue by {}", day_count(d.abs())),
        (false, d) => format!("Reminder for {name} is due {}", due_phrase(d)),
    }
}

fn due_phrase(days: i64) -> String {
    match days {
        0 => "today".to_string(),
        1 => "tomorrow".to_string(),
        d => format!("in {}", day_count(d)),
    }
}

fn day_count(days: i64) -> String {
    if days == 1 {
        "1 day".to_string()
    } else {
        format!("{days} days")
    }
}
