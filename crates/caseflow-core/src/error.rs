use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    #[error("invalid date in `{field}`: {value:?}")]
    InvalidDate { field: &'static str, value: String },

    #[error("date out of range: `{field}` shifted by {days} days")]
    DateOutOfRange { field: &'static str, days: i64 },

    #[error("UTC offset out of range: {0} minutes")]
    InvalidOffset(i32),

    #[error("unknown notification kind: {0}")]
    UnknownKind(String),

    #[error("invalid subject id {0:?} (expected `client:<id>` or `reminder:<id>`)")]
    InvalidSubject(String),
}
