use std::sync::Arc;

use log::{debug, warn};

use crate::error::NotificationError;
use crate::settings::NotificationSettings;

use super::{NotificationHandle, NotificationScheduler};

/// Keeps at most one completion alert pending for the active session.
#[derive(Clone)]
pub struct CompletionNotifier {
    scheduler: Arc<dyn NotificationScheduler>,
    settings: NotificationSettings,
}

impl CompletionNotifier {
    pub fn new(scheduler: Arc<dyn NotificationScheduler>, settings: NotificationSettings) -> Self {
        Self {
            scheduler,
            settings,
        }
    }

    /// Requests an alert `remaining_seconds` from now. `None` means the session
    /// runs silently; the timer itself is unaffected.
    pub fn schedule(&self, remaining_seconds: u64, label: Option<&str>) -> Option<NotificationHandle> {
        if !self.settings.enabled {
            debug!("Completion alerts disabled; not scheduling");
            return None;
        }

        let body = self.settings.body_for(label);
        match self
            .scheduler
            .schedule_one_shot(remaining_seconds, &self.settings.title, &body)
        {
            Ok(Some(handle)) => {
                debug!("Scheduled completion alert {handle} in {remaining_seconds}s");
                Some(handle)
            }
            Ok(None) => {
                warn!(
                    "{}",
                    NotificationError::Unavailable("scheduler returned no handle".into())
                );
                None
            }
            Err(err) => {
                warn!("{err}; session continues without an alert");
                None
            }
        }
    }

    pub fn cancel(&self, handle: &NotificationHandle) {
        debug!("Cancelling completion alert {handle}");
        self.scheduler.cancel(handle);
    }

    /// Cancels whatever `slot` holds, then schedules a replacement into it.
    /// The old alert is gone before the new one exists.
    pub fn supersede(
        &self,
        slot: &mut Option<NotificationHandle>,
        remaining_seconds: u64,
        label: Option<&str>,
    ) {
        if let Some(old) = slot.take() {
            self.cancel(&old);
        }
        *slot = self.schedule(remaining_seconds, label);
    }

    /// Cancels and empties `slot`.
    pub fn cancel_slot(&self, slot: &mut Option<NotificationHandle>) {
        if let Some(old) = slot.take() {
            self.cancel(&old);
        }
    }
}
