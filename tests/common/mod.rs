#![allow(dead_code)]

use std::sync::{
    atomic::{AtomicBool, AtomicUsize, Ordering},
    Arc, Mutex,
};
use std::time::Duration;

use monkmode_lib::{
    CompletionSink, ControllerDeps, KeyValueStore, ManualClock, MemoryKv, NotificationError,
    NotificationHandle, NotificationScheduler, PersistedSessionStore, SessionStatus,
    SessionTimerController, StorageError, UserSettings,
};

pub const T0: i64 = 1_700_000_000_000;

#[derive(Default)]
pub struct RecordingScheduler {
    next_id: AtomicUsize,
    live: Mutex<Vec<(NotificationHandle, u64)>>,
    cancelled: Mutex<Vec<NotificationHandle>>,
    deny: AtomicBool,
}

impl RecordingScheduler {
    pub fn deny(&self, deny: bool) {
        self.deny.store(deny, Ordering::SeqCst);
    }

    /// Delays of alerts that are still pending, in scheduling order.
    pub fn live_delays(&self) -> Vec<u64> {
        self.live.lock().unwrap().iter().map(|(_, d)| *d).collect()
    }

    pub fn live_handles(&self) -> Vec<NotificationHandle> {
        self.live.lock().unwrap().iter().map(|(h, _)| h.clone()).collect()
    }

    pub fn cancelled(&self) -> Vec<NotificationHandle> {
        self.cancelled.lock().unwrap().clone()
    }

    pub fn issued(&self) -> usize {
        self.next_id.load(Ordering::SeqCst)
    }
}

impl NotificationScheduler for RecordingScheduler {
    fn schedule_one_shot(
        &self,
        after_seconds: u64,
        _title: &str,
        _body: &str,
    ) -> Result<Option<NotificationHandle>, NotificationError> {
        if self.deny.load(Ordering::SeqCst) {
            return Err(NotificationError::Unavailable("permission denied".into()));
        }
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let handle = NotificationHandle::new(format!("alert-{id}"));
        self.live
            .lock()
            .unwrap()
            .push((handle.clone(), after_seconds));
        Ok(Some(handle))
    }

    fn cancel(&self, handle: &NotificationHandle) {
        self.live.lock().unwrap().retain(|(h, _)| h != handle);
        self.cancelled.lock().unwrap().push(handle.clone());
    }
}

#[derive(Default)]
pub struct RecordingSink {
    calls: Mutex<Vec<(u64, Option<String>)>>,
}

impl RecordingSink {
    pub fn calls(&self) -> Vec<(u64, Option<String>)> {
        self.calls.lock().unwrap().clone()
    }
}

impl CompletionSink for RecordingSink {
    fn on_session_complete(&self, duration_seconds: u64, subject_id: Option<&str>) {
        self.calls
            .lock()
            .unwrap()
            .push((duration_seconds, subject_id.map(str::to_string)));
    }
}

/// In-memory store whose reads and writes can be made to fail.
#[derive(Clone, Default)]
pub struct FlakyKv {
    inner: MemoryKv,
    fail_reads: Arc<AtomicBool>,
    fail_writes: Arc<AtomicBool>,
    writes: Arc<AtomicUsize>,
}

impl FlakyKv {
    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Successful `set` and `delete` calls so far.
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    fn check_write(&self) -> Result<(), StorageError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StorageError::Backend("disk full".into()));
        }
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

impl KeyValueStore for FlakyKv {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StorageError::Backend("read failed".into()));
        }
        self.inner.get(key)
    }

    fn set(&self, key: &str, value: &[u8]) -> Result<(), StorageError> {
        self.check_write()?;
        self.inner.set(key, value)
    }

    fn delete(&self, key: &str) -> Result<(), StorageError> {
        self.check_write()?;
        self.inner.delete(key)
    }
}

/// Shared collaborators. Building several controllers from one harness
/// simulates process restarts against the same device.
pub struct Harness {
    pub clock: ManualClock,
    pub kv: FlakyKv,
    pub alerts: Arc<RecordingScheduler>,
    pub sink: Arc<RecordingSink>,
}

impl Harness {
    pub fn new() -> Self {
        Self {
            clock: ManualClock::new(T0),
            kv: FlakyKv::default(),
            alerts: Arc::new(RecordingScheduler::default()),
            sink: Arc::new(RecordingSink::default()),
        }
    }

    pub fn store(&self) -> PersistedSessionStore {
        PersistedSessionStore::new(Arc::new(self.kv.clone()))
    }

    pub fn controller(&self) -> SessionTimerController {
        self.controller_with(UserSettings::default())
    }

    pub fn controller_with(&self, settings: UserSettings) -> SessionTimerController {
        let deps = ControllerDeps::new(self.store(), self.alerts.clone(), self.sink.clone())
            .with_clock(Arc::new(self.clock.clone()))
            .with_settings(settings);
        SessionTimerController::new(deps).unwrap()
    }
}

pub fn fast_ticks() -> UserSettings {
    let mut settings = UserSettings::default();
    settings.timer.tick_interval_ms = 20;
    settings
}

pub async fn wait_for_status(
    timer: &SessionTimerController,
    status: SessionStatus,
    within: Duration,
) -> bool {
    let deadline = tokio::time::Instant::now() + within;
    while tokio::time::Instant::now() < deadline {
        if timer.status().await == status {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    timer.status().await == status
}
