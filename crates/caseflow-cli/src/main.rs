mod display;

use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use caseflow_core::{
    EngineConfig, Evaluation, NotificationKey, NotificationKind, SubjectId, evaluate_snapshot,
    sort_by_priority,
};
use caseflow_store::JsonStore;
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "caseflow", version, about = "Deadline and reminder notifications for client cases")]
struct Cli {
    /// Directory holding clients.json, reminders.json, and the notification state file.
    #[arg(long, global = true, env = "CASEFLOW_DATA_DIR", default_value = "data")]
    data_dir: PathBuf,

    /// Office offset from UTC in minutes, used to decide where "today" starts.
    #[arg(
        long,
        global = true,
        env = "CASEFLOW_UTC_OFFSET_MINUTES",
        default_value_t = 0,
        allow_negative_numbers = true
    )]
    utc_offset_minutes: i32,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Evaluate the snapshot and print current notifications.
    Check {
        /// Evaluate as of this RFC 3339 instant instead of the current time.
        #[arg(long)]
        now: Option<DateTime<Utc>>,
        /// Include dismissed notifications.
        #[arg(long)]
        all: bool,
        /// Order by priority instead of evaluation order.
        #[arg(long)]
        sort: bool,
        /// Print JSON instead of cards.
        #[arg(long)]
        json: bool,
    },
    /// Mark a notification as read, e.g. `read client:42 payment_reminder`.
    Read {
        subject: SubjectId,
        kind: NotificationKind,
    },
    /// Hide a notification until its condition clears.
    Dismiss {
        subject: SubjectId,
        kind: NotificationKind,
    },
    /// Re-evaluate on a fixed cadence, printing notifications as they appear.
    Watch {
        #[arg(long, default_value_t = 60)]
        interval_secs: u64,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = EngineConfig::with_offset_minutes(cli.utc_offset_minutes)
        .context("reading --utc-offset-minutes")?;
    let store = JsonStore::new(&cli.data_dir);
    info!(
        data_dir = %cli.data_dir.display(),
        "caseflow v{}",
        env!("CARGO_PKG_VERSION")
    );

    match cli.command {
        Command::Check {
            now,
            all,
            sort,
            json,
        } => cmd_check(&store, &config, now.unwrap_or_else(Utc::now), all, sort, json),
        Command::Read { subject, kind } => {
            let key = NotificationKey::new(subject, kind);
            cmd_mark(&store, &config, Utc::now(), key, false).map(|_| ())
        }
        Command::Dismiss { subject, kind } => {
            let key = NotificationKey::new(subject, kind);
            cmd_mark(&store, &config, Utc::now(), key, true).map(|_| ())
        }
        Command::Watch { interval_secs } => {
            cmd_watch(&store, &config, Duration::from_secs(interval_secs.max(1))).await
        }
    }
}

fn evaluate_store(
    store: &JsonStore,
    config: &EngineConfig,
    now: DateTime<Utc>,
) -> anyhow::Result<Evaluation> {
    let snapshot = store.load_snapshot().context("loading snapshot")?;
    Ok(evaluate_snapshot(now, &snapshot, config))
}

fn cmd_check(
    store: &JsonStore,
    config: &EngineConfig,
    now: DateTime<Utc>,
    all: bool,
    sort: bool,
    json: bool,
) -> anyhow::Result<()> {
    let evaluation = evaluate_store(store, config, now)?;
    let state = store.load_state().context("loading notification state")?;

    let mut events = if all {
        evaluation.events
    } else {
        state.visible(evaluation.events)
    };
    if sort {
        sort_by_priority(&mut events);
    }

    if !evaluation.faults.is_empty() {
        eprintln!(
            "  {} record(s) skipped because of invalid dates",
            evaluation.faults.len()
        );
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&events)?);
    } else {
        display::print_notifications(&events, &state);
    }
    Ok(())
}

/// Record a read or dismissal. Returns whether the notification is currently
/// raised; a key that is not will be pruned by the next `watch` tick.
fn cmd_mark(
    store: &JsonStore,
    config: &EngineConfig,
    now: DateTime<Utc>,
    key: NotificationKey,
    dismiss: bool,
) -> anyhow::Result<bool> {
    let live = match evaluate_store(store, config, now) {
        Ok(evaluation) => {
            evaluation.events.iter().any(|event| event.key() == key)
                || evaluation.faults.iter().any(|fault| fault.subject == key.subject)
        }
        Err(e) => {
            // Can't tell without a snapshot; record it anyway.
            warn!(error = ?e, "could not check whether notification is raised");
            true
        }
    };
    if !live {
        warn!(subject = %key.subject, kind = %key.kind, "notification is not currently raised");
        eprintln!(
            "  {} {} is not currently raised; the next watch tick will clear it",
            key.subject, key.kind
        );
    }

    let mut state = store.load_state().context("loading notification state")?;
    let changed = if dismiss {
        state.dismiss(key.clone())
    } else {
        state.mark_read(key.clone())
    };
    if changed {
        store.save_state(&state).context("saving notification state")?;
    }
    let verb = if dismiss { "dismissed" } else { "read" };
    println!(
        "{} {} {verb}{}",
        key.subject,
        key.kind,
        if changed { "" } else { " (unchanged)" }
    );
    Ok(live)
}

/// Each tick picks a fresh "now" and reloads the snapshot. A failed load is
/// logged and retried on the next tick; Ctrl-C stops between ticks.
async fn cmd_watch(
    store: &JsonStore,
    config: &EngineConfig,
    interval: Duration,
) -> anyhow::Result<()> {
    let mut ticker = tokio::time::interval(interval);
    let mut seen: HashSet<NotificationKey> = HashSet::new();
    info!(interval_secs = interval.as_secs(), "watching for notifications");

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = tokio::signal::ctrl_c() => {
                info!("stopping watch");
                return Ok(());
            }
        }

        match watch_tick(store, config, Utc::now(), &mut seen) {
            Ok(tick) => {
                if tick.new > 0 {
                    info!(new = tick.new, "new notifications");
                }
            }
            Err(e) => warn!(error = ?e, "evaluation failed; retrying next tick"),
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
struct Tick {
    /// Visible events not printed by an earlier tick.
    new: usize,
    /// Visible events not yet read.
    unread: usize,
}

/// One watch cycle: evaluate, prune stale state, print events not seen in
/// earlier cycles.
fn watch_tick(
    store: &JsonStore,
    config: &EngineConfig,
    now: DateTime<Utc>,
    seen: &mut HashSet<NotificationKey>,
) -> anyhow::Result<Tick> {
    let evaluation = evaluate_store(store, config, now)?;
    let mut state = store.load_state().context("loading notification state")?;
    if state.prune(&evaluation) > 0 {
        store.save_state(&state).context("saving notification state")?;
    }

    let live: HashSet<NotificationKey> = evaluation.events.iter().map(|e| e.key()).collect();
    let visible = state.visible(evaluation.events);
    let unread = state.unread_count(&visible);
    let fresh: Vec<_> = visible
        .into_iter()
        .filter(|event| !seen.contains(&event.key()))
        .collect();
    // Forget cleared conditions so they print again if they come back.
    *seen = live;

    if !fresh.is_empty() {
        display::print_notifications(&fresh, &state);
    }
    info!(live = seen.len(), unread, "watch tick");
    Ok(Tick {
        new: fresh.len(),
        unread,
    })
}
