//! Completion alerts through the host's one-shot notification facility.

mod log_scheduler;
mod notifier;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::NotificationError;

pub use log_scheduler::LogScheduler;
pub use notifier::CompletionNotifier;

/// Opaque id of a scheduled one-shot alert.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NotificationHandle(String);

impl NotificationHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NotificationHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// OS notification capability. Alerts must fire even if this process is gone.
pub trait NotificationScheduler: Send + Sync {
    /// Returns `Ok(None)` when the platform silently declines (no permission).
    fn schedule_one_shot(
        &self,
        after_seconds: u64,
        title: &str,
        body: &str,
    ) -> Result<Option<NotificationHandle>, NotificationError>;

    /// Unknown or already-fired ids are ignored.
    fn cancel(&self, handle: &NotificationHandle);
}
