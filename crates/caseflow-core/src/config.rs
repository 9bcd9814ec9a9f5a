//! Engine configuration.

use chrono::{FixedOffset, Offset, Utc};

use crate::EngineError;

/// Settings shared by every rule in an evaluation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
    /// The office's local offset. Calendar dates and "today" are taken at
    /// local midnight in this offset before any day difference is computed.
    pub utc_offset: FixedOffset,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            utc_offset: Utc.fix(),
        }
    }
}

impl EngineConfig {
    /// Build a config for an office `minutes` east of UTC (negative for west).
    pub fn with_offset_minutes(minutes: i32) -> Result<Self, EngineError> {
        let utc_offset = minutes
            .checked_mul(60)
            .and_then(FixedOffset::east_opt)
            .ok_or(EngineError::InvalidOffset(minutes))?;
        Ok(Self { utc_offset })
    }
}
