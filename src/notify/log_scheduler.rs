use chrono::{Duration, Utc};
use log::info;
use uuid::Uuid;

use crate::error::NotificationError;

use super::{NotificationHandle, NotificationScheduler};

/// Stand-in scheduler for hosts without a notification center (the CLI).
/// Logs the alert and its due time instead of handing it to the OS.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogScheduler;

impl NotificationScheduler for LogScheduler {
    fn schedule_one_shot(
        &self,
        after_seconds: u64,
        title: &str,
        body: &str,
    ) -> Result<Option<NotificationHandle>, NotificationError> {
        let seconds = i64::try_from(after_seconds)
            .map_err(|_| NotificationError::Failed(format!("delay {after_seconds}s too large")))?;
        let due = Utc::now() + Duration::seconds(seconds);
        let handle = NotificationHandle::new(Uuid::new_v4().to_string());
        info!(
            "Alert {handle} \"{title}: {body}\" due at {}",
            due.to_rfc3339()
        );
        Ok(Some(handle))
    }

    fn cancel(&self, handle: &NotificationHandle) {
        info!("Alert {handle} cancelled");
    }
}
