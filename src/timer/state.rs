use serde::{Deserialize, Serialize};

use crate::error::TimerError;
use crate::notify::NotificationHandle;

use super::accountant;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum SessionStatus {
    #[default]
    Idle,
    Running,
    Paused,
    Completed,
}

impl SessionStatus {
    /// Running or Paused: a session exists and can still be cancelled.
    pub fn is_active(self) -> bool {
        matches!(self, SessionStatus::Running | SessionStatus::Paused)
    }
}

/// App visibility transitions reported by the host.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum AppPhase {
    Foreground,
    Background,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SessionConfig {
    pub total_duration_seconds: u64,
    pub subject_id: Option<String>,
    /// Display only; shows up in the completion alert.
    pub subject_label: Option<String>,
}

impl SessionConfig {
    pub fn new(total_duration_seconds: u64) -> Result<Self, TimerError> {
        let config = Self {
            total_duration_seconds,
            subject_id: None,
            subject_label: None,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn with_subject(mut self, id: impl Into<String>, label: Option<String>) -> Self {
        self.subject_id = Some(id.into());
        self.subject_label = label;
        self
    }

    pub fn validate(&self) -> Result<(), TimerError> {
        if self.total_duration_seconds == 0 {
            return Err(TimerError::InvalidConfig(
                "total_duration_seconds must be greater than zero".into(),
            ));
        }
        // Keeps total * 1000 inside i64 for the accountant.
        if self.total_duration_seconds > (i64::MAX / 1000) as u64 {
            return Err(TimerError::InvalidConfig(format!(
                "total_duration_seconds {} is out of range",
                self.total_duration_seconds
            )));
        }
        Ok(())
    }

    pub fn total_ms(&self) -> i64 {
        (self.total_duration_seconds as i64).saturating_mul(1000)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct SessionTimestamps {
    pub started_at_ms: i64,
    pub paused_at_ms: Option<i64>,
    pub cumulative_paused_ms: u64,
}

impl SessionTimestamps {
    pub fn started(now_ms: i64) -> Self {
        Self {
            started_at_ms: now_ms,
            paused_at_ms: None,
            cumulative_paused_ms: 0,
        }
    }

    pub fn pause(&mut self, now_ms: i64) {
        self.paused_at_ms = Some(now_ms);
    }

    /// Folds the open pause interval into the running total. A clock that
    /// moved backwards contributes nothing.
    pub fn resume(&mut self, now_ms: i64) {
        if let Some(paused_at) = self.paused_at_ms.take() {
            let paused_for = now_ms.saturating_sub(paused_at).max(0) as u64;
            self.cumulative_paused_ms = self.cumulative_paused_ms.saturating_add(paused_for);
        }
    }
}

/// In-memory session state owned by the controller.
#[derive(Debug, Clone, Default)]
pub struct TimerState {
    pub status: SessionStatus,
    pub config: Option<SessionConfig>,
    pub timestamps: SessionTimestamps,
    pub notification: Option<NotificationHandle>,
    /// Set once the completion sink has been invoked; cleared only by `begin`.
    pub completion_fired: bool,
}

impl TimerState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin(&mut self, config: SessionConfig, now_ms: i64) {
        *self = Self {
            status: SessionStatus::Running,
            config: Some(config),
            timestamps: SessionTimestamps::started(now_ms),
            notification: None,
            completion_fired: false,
        };
    }

    pub fn remaining_seconds(&self, now_ms: i64) -> u64 {
        match (&self.config, self.status) {
            (Some(config), SessionStatus::Running | SessionStatus::Paused) => {
                accountant::remaining_seconds(config, &self.timestamps, now_ms)
            }
            _ => 0,
        }
    }

    pub fn progress(&self, now_ms: i64) -> f64 {
        match (&self.config, self.status) {
            (Some(config), SessionStatus::Running | SessionStatus::Paused) => {
                accountant::progress_fraction(config, &self.timestamps, now_ms)
            }
            (Some(_), SessionStatus::Completed) => 1.0,
            _ => 0.0,
        }
    }

    /// Drops the session and returns to Idle.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
