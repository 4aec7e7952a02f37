use std::{
    sync::{Arc, Weak},
    time::Duration,
};

use anyhow::Result;
use log::{debug, error, info, warn};
use tokio::{
    sync::{broadcast, Mutex},
    time::{self, MissedTickBehavior},
};
use tokio_util::sync::CancellationToken;

use crate::{
    clock::{Clock, SystemClock},
    error::{LoadError, TimerError},
    ledger::CompletionSink,
    notify::{CompletionNotifier, NotificationScheduler},
    settings::UserSettings,
    store::{PersistQueue, PersistedRecord, PersistedSessionStore},
};

use super::{
    AppPhase, SessionConfig, SessionStatus, TimerEvent, TimerSnapshot, TimerState,
};

const EVENT_CAPACITY: usize = 64;

/// Collaborators injected into the controller.
pub struct ControllerDeps {
    pub store: PersistedSessionStore,
    pub scheduler: Arc<dyn NotificationScheduler>,
    pub sink: Arc<dyn CompletionSink>,
    pub clock: Arc<dyn Clock>,
    pub settings: UserSettings,
}

impl ControllerDeps {
    pub fn new(
        store: PersistedSessionStore,
        scheduler: Arc<dyn NotificationScheduler>,
        sink: Arc<dyn CompletionSink>,
    ) -> Self {
        Self {
            store,
            scheduler,
            sink,
            clock: Arc::new(SystemClock),
            settings: UserSettings::default(),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_settings(mut self, settings: UserSettings) -> Self {
        self.settings = settings;
        self
    }
}

#[derive(Default)]
struct ControllerState {
    timer: TimerState,
    ticker: Option<CancellationToken>,
}

struct Completion {
    duration_seconds: u64,
    subject_id: Option<String>,
}

struct Inner {
    state: Mutex<ControllerState>,
    clock: Arc<dyn Clock>,
    notifier: CompletionNotifier,
    persistence: PersistQueue,
    sink: Arc<dyn CompletionSink>,
    events: broadcast::Sender<TimerEvent>,
    tick_interval: Duration,
}

/// Owns the one active focus session: its state machine, its tick, its
/// persisted record and its pending completion alert.
///
/// Every transition updates memory first, then queues the record write.
/// Must be created and used inside a Tokio runtime.
#[derive(Clone)]
pub struct SessionTimerController {
    inner: Arc<Inner>,
}

impl SessionTimerController {
    /// Builds the controller and recovers any session left in `deps.store`.
    pub fn new(deps: ControllerDeps) -> Result<Self> {
        let persistence = PersistQueue::new(deps.store.clone())?;
        let (events, _) = broadcast::channel(EVENT_CAPACITY);

        let controller = Self {
            inner: Arc::new(Inner {
                state: Mutex::new(ControllerState::default()),
                clock: deps.clock,
                notifier: CompletionNotifier::new(deps.scheduler, deps.settings.notification),
                persistence,
                sink: deps.sink,
                events,
                tick_interval: deps.settings.timer.tick_interval(),
            }),
        };

        controller.recover(&deps.store);
        Ok(controller)
    }

    fn recover(&self, store: &PersistedSessionStore) {
        let record = match store.load() {
            Ok(Some(record)) => record,
            Ok(None) => {
                debug!("No persisted session; starting idle");
                return;
            }
            Err(LoadError::CorruptRecord(reason)) => {
                warn!("Discarding corrupt session record: {reason}");
                self.inner.persistence.clear();
                return;
            }
            Err(LoadError::Storage(err)) => {
                error!("Could not read persisted session; starting idle: {err}");
                return;
            }
        };

        let Ok(mut state) = self.inner.state.try_lock() else {
            error!("Controller state busy during recovery; skipping");
            return;
        };

        state.timer = TimerState {
            status: record.status,
            config: Some(record.config),
            timestamps: record.timestamps,
            notification: record.notification,
            completion_fired: false,
        };

        let now = self.inner.clock.now_ms();
        let remaining = state.timer.remaining_seconds(now);
        info!(
            "Recovered {:?} session with {remaining}s remaining",
            state.timer.status
        );

        if remaining == 0 {
            let completion = self.inner.complete_locked(&mut state, now);
            drop(state);
            if let Some(completion) = completion {
                self.inner.deliver(completion);
            }
            return;
        }

        if state.timer.status == SessionStatus::Running {
            self.start_ticker(&mut state);
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<TimerEvent> {
        self.inner.events.subscribe()
    }

    pub async fn snapshot(&self) -> TimerSnapshot {
        let state = self.inner.state.lock().await;
        TimerSnapshot::capture(&state.timer, self.inner.clock.now_ms())
    }

    pub async fn status(&self) -> SessionStatus {
        self.inner.state.lock().await.timer.status
    }

    pub async fn start(&self, config: SessionConfig) -> Result<TimerSnapshot, TimerError> {
        config.validate()?;

        let mut state = self.inner.state.lock().await;
        let status = state.timer.status;
        if !matches!(status, SessionStatus::Idle | SessionStatus::Completed) {
            return Err(invalid("start", status));
        }

        let now = self.inner.clock.now_ms();
        let duration = config.total_duration_seconds;
        let label = config.subject_label.clone();
        state.timer.begin(config, now);
        state.timer.notification = self.inner.notifier.schedule(duration, label.as_deref());
        self.inner.persist(&state.timer);
        self.start_ticker(&mut state);

        info!("Session started for {duration}s");
        Ok(self.inner.publish_state(&state.timer, now))
    }

    pub async fn pause(&self) -> Result<TimerSnapshot, TimerError> {
        let mut state = self.inner.state.lock().await;
        let now = self.inner.clock.now_ms();
        if let Some(completion) = self.inner.settle_locked(&mut state, now) {
            drop(state);
            self.inner.deliver(completion);
            return Err(invalid("pause", SessionStatus::Completed));
        }

        let status = state.timer.status;
        if status != SessionStatus::Running {
            return Err(invalid("pause", status));
        }

        state.timer.timestamps.pause(now);
        state.timer.status = SessionStatus::Paused;
        self.inner.stop_ticker(&mut state);
        self.inner
            .notifier
            .cancel_slot(&mut state.timer.notification);
        self.inner.persist(&state.timer);

        info!(
            "Session paused with {}s remaining",
            state.timer.remaining_seconds(now)
        );
        Ok(self.inner.publish_state(&state.timer, now))
    }

    pub async fn resume(&self) -> Result<TimerSnapshot, TimerError> {
        let mut state = self.inner.state.lock().await;
        let status = state.timer.status;
        if status != SessionStatus::Paused {
            return Err(invalid("resume", status));
        }

        let now = self.inner.clock.now_ms();
        state.timer.timestamps.resume(now);
        state.timer.status = SessionStatus::Running;

        let remaining = state.timer.remaining_seconds(now);
        if remaining == 0 {
            // Paused exactly on the boundary; nothing left to run.
            let completion = self.inner.complete_locked(&mut state, now);
            let snapshot = TimerSnapshot::capture(&state.timer, now);
            drop(state);
            if let Some(completion) = completion {
                self.inner.deliver(completion);
            }
            return Ok(snapshot);
        }

        let label = state
            .timer
            .config
            .as_ref()
            .and_then(|config| config.subject_label.clone());
        self.start_ticker(&mut state);
        let slot = &mut state.timer.notification;
        self.inner.notifier.supersede(slot, remaining, label.as_deref());
        self.inner.persist(&state.timer);

        info!("Session resumed with {remaining}s remaining");
        Ok(self.inner.publish_state(&state.timer, now))
    }

    /// Abandons the session without crediting it.
    pub async fn cancel(&self) -> Result<TimerSnapshot, TimerError> {
        let mut state = self.inner.state.lock().await;
        let now = self.inner.clock.now_ms();
        if let Some(completion) = self.inner.settle_locked(&mut state, now) {
            drop(state);
            self.inner.deliver(completion);
            return Err(invalid("cancel", SessionStatus::Completed));
        }

        let status = state.timer.status;
        if !status.is_active() {
            return Err(invalid("cancel", status));
        }

        self.inner.stop_ticker(&mut state);
        self.inner
            .notifier
            .cancel_slot(&mut state.timer.notification);
        self.inner.persistence.clear();
        state.timer.reset();

        info!("Session cancelled");
        Ok(self.inner.publish_state(&state.timer, now))
    }

    /// Recomputes remaining time from timestamps and completes the session if
    /// it ran out while ticks were not being delivered.
    pub async fn resync(&self) -> TimerSnapshot {
        let mut state = self.inner.state.lock().await;
        let now = self.inner.clock.now_ms();
        let completion = self.inner.settle_locked(&mut state, now);
        let snapshot = TimerSnapshot::capture(&state.timer, now);
        drop(state);

        match completion {
            Some(completion) => self.inner.deliver(completion),
            None if snapshot.status == SessionStatus::Running => {
                let _ = self.inner.events.send(TimerEvent::Tick {
                    remaining_seconds: snapshot.remaining_seconds,
                    progress: snapshot.progress,
                });
            }
            None => {}
        }
        snapshot
    }

    pub async fn on_lifecycle(&self, phase: AppPhase) -> TimerSnapshot {
        match phase {
            AppPhase::Foreground => {
                debug!("App foregrounded; resyncing from timestamps");
                self.resync().await
            }
            AppPhase::Background => {
                // Ticks may stop here; nothing depends on them.
                debug!("App backgrounded");
                self.snapshot().await
            }
        }
    }

    /// Waits until every queued record write has landed.
    pub async fn flush(&self) {
        self.inner.persistence.flush().await;
    }

    /// Stops ticking and drains pending writes. The persisted record is kept
    /// so a later controller can recover the session.
    pub async fn shutdown(&self) {
        {
            let mut state = self.inner.state.lock().await;
            self.inner.stop_ticker(&mut state);
        }
        self.flush().await;
    }

    fn start_ticker(&self, state: &mut ControllerState) {
        self.inner.stop_ticker(state);

        let token = CancellationToken::new();
        state.ticker = Some(token.clone());

        let weak: Weak<Inner> = Arc::downgrade(&self.inner);
        let tick_interval = self.inner.tick_interval;

        tokio::spawn(async move {
            let mut interval = time::interval(tick_interval);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = interval.tick() => {}
                }

                let Some(inner) = weak.upgrade() else {
                    break;
                };
                if !inner.tick(&token).await {
                    break;
                }
            }
        });
    }
}

impl Inner {
    /// One tick. Returns false once this ticker should stop.
    async fn tick(&self, token: &CancellationToken) -> bool {
        let mut state = self.state.lock().await;
        if token.is_cancelled() || state.timer.status != SessionStatus::Running {
            return false;
        }

        let now = self.clock.now_ms();
        let remaining = state.timer.remaining_seconds(now);
        if remaining == 0 {
            let completion = self.complete_locked(&mut state, now);
            drop(state);
            if let Some(completion) = completion {
                self.deliver(completion);
            }
            return false;
        }

        let _ = self.events.send(TimerEvent::Tick {
            remaining_seconds: remaining,
            progress: state.timer.progress(now),
        });
        true
    }

    fn stop_ticker(&self, state: &mut ControllerState) {
        if let Some(token) = state.ticker.take() {
            token.cancel();
        }
    }

    fn persist(&self, timer: &TimerState) {
        if let Some(record) = PersistedRecord::from_state(timer) {
            self.persistence.save(record);
        }
    }

    fn settle_locked(&self, state: &mut ControllerState, now: i64) -> Option<Completion> {
        if state.timer.status == SessionStatus::Running && state.timer.remaining_seconds(now) == 0 {
            self.complete_locked(state, now)
        } else {
            None
        }
    }

    /// Moves an active session to Completed. Returns the completion to deliver
    /// once the state lock is released, or `None` if it was already delivered.
    fn complete_locked(&self, state: &mut ControllerState, now: i64) -> Option<Completion> {
        if !state.timer.status.is_active() || state.timer.completion_fired {
            return None;
        }

        self.stop_ticker(state);
        self.persistence.clear();
        // The alert has fired or is about to; cancelling a spent one-shot is harmless.
        self.notifier.cancel_slot(&mut state.timer.notification);

        state.timer.status = SessionStatus::Completed;
        state.timer.timestamps.paused_at_ms = None;
        state.timer.completion_fired = true;
        self.publish_state(&state.timer, now);

        let config = state.timer.config.as_ref()?;
        info!("Session completed ({}s)", config.total_duration_seconds);
        Some(Completion {
            duration_seconds: config.total_duration_seconds,
            subject_id: config.subject_id.clone(),
        })
    }

    fn deliver(&self, completion: Completion) {
        let _ = self.events.send(TimerEvent::Completed {
            duration_seconds: completion.duration_seconds,
            subject_id: completion.subject_id.clone(),
        });
        self.sink
            .on_session_complete(completion.duration_seconds, completion.subject_id.as_deref());
    }

    fn publish_state(&self, timer: &TimerState, now: i64) -> TimerSnapshot {
        let snapshot = TimerSnapshot::capture(timer, now);
        let _ = self.events.send(TimerEvent::StateChanged(snapshot.clone()));
        snapshot
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        if let Some(token) = self.state.get_mut().ticker.take() {
            token.cancel();
        }
    }
}

fn invalid(action: &'static str, status: SessionStatus) -> TimerError {
    warn!("Ignoring {action}: session is {status:?}");
    TimerError::InvalidState { action, status }
}
