pub mod calendar;
pub mod config;
pub mod engine;
pub mod error;
pub mod notification;
pub mod snapshot;
pub mod state;

pub use config::EngineConfig;
pub use engine::{EntityFault, Evaluation, evaluate, evaluate_snapshot};
pub use error::EngineError;
pub use notification::{
    Alert, NotificationEvent, NotificationKind, Priority, Subject, SubjectId, sort_by_priority,
};
pub use snapshot::{ClientSnapshot, Payment, RequiredDocument, Snapshot, StandaloneReminder};
pub use state::{NotificationKey, NotificationState};
