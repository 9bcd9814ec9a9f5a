//! Card display for notification lists.
//!
//! Groups consecutive events for the same subject under one header, with
//! an unread marker, priority, and kind per line.

use std::fmt::Write;

use caseflow_core::{NotificationEvent, NotificationState, Priority, Subject};

const PRIORITY_WIDTH: usize = 6;
const KIND_WIDTH: usize = 20;
const MAX_NOTES_CHARS: usize = 60;

/// Print notifications as cards grouped by subject.
pub fn print_notifications(events: &[NotificationEvent], state: &NotificationState) {
    print!("{}", render(events, state));
}

pub fn render(events: &[NotificationEvent], state: &NotificationState) -> String {
    let mut out = String::new();
    if events.is_empty() {
        out.push_str("No notifications.\n");
        return out;
    }

    let mut current = None;
    for event in events {
        let subject_id = event.subject_id();
        if current.as_ref() != Some(&subject_id) {
            if current.is_some() {
                out.push('\n');
            }
            render_header(&mut out, &event.subject);
            current = Some(subject_id);
        }
        render_line(&mut out, event, state);
    }

    let unread = state.unread_count(events);
    let _ = writeln!(
        out,
        "\n{} notification{} ({unread} unread)",
        events.len(),
        if events.len() == 1 { "" } else { "s" }
    );
    out
}

// ── Card pieces ──

fn render_header(out: &mut String, subject: &Subject) {
    let _ = writeln!(out, "=== {} ({}) ===", subject.name(), subject.id());
    if let Subject::Reminder { phone, notes, .. } = subject {
        if let Some(phone) = phone.as_deref().filter(|p| !p.is_empty()) {
            let _ = writeln!(out, "  phone: {phone}");
        }
        if let Some(notes) = notes.as_deref().filter(|n| !n.is_empty()) {
            let _ = writeln!(out, "  notes: {}", truncate(notes, MAX_NOTES_CHARS));
        }
    }
}

fn render_line(out: &mut String, event: &NotificationEvent, state: &NotificationState) {
    let marker = if state.is_read(&event.key()) { ' ' } else { '*' };
    let _ = writeln!(
        out,
        "{marker} {:<pw$} {:<kw$} {}",
        priority_label(event.priority),
        event.kind().as_str(),
        event.message,
        pw = PRIORITY_WIDTH,
        kw = KIND_WIDTH,
    );
}

fn priority_label(priority: Priority) -> &'static str {
    match priority {
        Priority::High => "HIGH",
        Priority::Medium => "MEDIUM",
        Priority::Low => "low",
    }
}

fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() > max_chars {
        let head: String = s.chars().take(max_chars - 3).collect();
        format!("{head}...")
    } else {
        s.to_string()
    }
}
