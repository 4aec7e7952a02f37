use serde::{Deserialize, Serialize};

use super::state::{SessionConfig, SessionStatus, SessionTimestamps, TimerState};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TimerSnapshot {
    pub status: SessionStatus,
    pub config: Option<SessionConfig>,
    pub timestamps: SessionTimestamps,
    pub remaining_seconds: u64,
    pub progress: f64,
}

impl TimerSnapshot {
    pub fn capture(state: &TimerState, now_ms: i64) -> Self {
        Self {
            status: state.status,
            config: state.config.clone(),
            timestamps: state.timestamps,
            remaining_seconds: state.remaining_seconds(now_ms),
            progress: state.progress(now_ms),
        }
    }
}

/// Published to observers whenever the session moves.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum TimerEvent {
    StateChanged(TimerSnapshot),
    Tick {
        remaining_seconds: u64,
        progress: f64,
    },
    Completed {
        duration_seconds: u64,
        subject_id: Option<String>,
    },
}
