//! JSON file store for snapshot exports and notification state.

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use caseflow_core::{ClientSnapshot, NotificationState, Snapshot, StandaloneReminder};
use serde::de::DeserializeOwned;
use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::StoreError;

pub const CLIENTS_FILE: &str = "clients.json";
pub const REMINDERS_FILE: &str = "reminders.json";
pub const STATE_FILE: &str = "notification_state.json";

/// A data directory holding the office's JSON exports.
///
/// ```text
/// data/
///   clients.json              array of client records
///   reminders.json            array of standalone reminders
///   notification_state.json   read/dismissed keys (written by us)
/// ```
///
/// The two exports are read independently on every load, so a snapshot may
/// pair clients and reminders captured at slightly different times.
#[derive(Debug, Clone)]
pub struct JsonStore {
    data_dir: PathBuf,
}

impl JsonStore {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn load_clients(&self) -> Result<Vec<ClientSnapshot>, StoreError> {
        let path = self.data_dir.join(CLIENTS_FILE);
        let clients: Vec<ClientSnapshot> = read_json(&path)?;
        info!(count = clients.len(), path = %path.display(), "loaded clients");
        Ok(clients)
    }

    pub fn load_reminders(&self) -> Result<Vec<StandaloneReminder>, StoreError> {
        let path = self.data_dir.join(REMINDERS_FILE);
        let reminders: Vec<StandaloneReminder> = read_json(&path)?;
        info!(count = reminders.len(), path = %path.display(), "loaded reminders");
        Ok(reminders)
    }

    /// Load both exports. Either file missing is an error.
    pub fn load_snapshot(&self) -> Result<Snapshot, StoreError> {
        Ok(Snapshot {
            clients: self.load_clients()?,
            reminders: self.load_reminders()?,
        })
    }

    /// Load notification state, or an empty state if none has been saved yet.
    pub fn load_state(&self) -> Result<NotificationState, StoreError> {
        let path = self.data_dir.join(STATE_FILE);
        match read_json(&path) {
            Ok(state) => Ok(state),
            Err(StoreError::NotFound(_)) => {
                debug!(path = %path.display(), "no notification state yet");
                Ok(NotificationState::new())
            }
            Err(e) => Err(e),
        }
    }

    /// Write notification state through a uniquely named temp file in the
    /// data directory, renamed over the state file once complete.
    ///
    /// A crash mid-write never leaves a truncated state file and concurrent
    /// writers never share a temp file. Each save replaces the whole state,
    /// so with concurrent read-modify-write callers the last save wins.
    pub fn save_state(&self, state: &NotificationState) -> Result<(), StoreError> {
        let path = self.data_dir.join(STATE_FILE);
        let io_error = |source| StoreError::Io {
            path: path.clone(),
            source,
        };

        let mut tmp = NamedTempFile::new_in(&self.data_dir).map_err(io_error)?;
        serde_json::to_writer_pretty(&mut tmp, state).map_err(|source| StoreError::Json {
            path: path.clone(),
            source,
        })?;
        tmp.flush().map_err(io_error)?;
        tmp.persist(&path).map_err(|e| io_error(e.error))?;
        debug!(path = %path.display(), "saved notification state");
        Ok(())
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, StoreError> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return Err(StoreError::NotFound(path.to_path_buf()));
        }
        Err(source) => {
            return Err(StoreError::Io {
                path: path.to_path_buf(),
                source,
            });
        }
    };
    serde_json::from_slice(&bytes).map_err(|source| StoreError::Json {
        path: path.to_path_buf(),
        source,
    })
}
