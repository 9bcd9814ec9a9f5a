//! Storage layer: JSON snapshot exports and the caller-owned notification state file.

mod error;
mod json;

pub use error::StoreError;
pub use json::{CLIENTS_FILE, JsonStore, REMINDERS_FILE, STATE_FILE};
