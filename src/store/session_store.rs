use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{LoadError, StorageError};
use crate::notify::NotificationHandle;
use crate::timer::{SessionConfig, SessionStatus, SessionTimestamps, TimerState};

use super::KeyValueStore;

pub const ACTIVE_SESSION_KEY: &str = "monkmode.active_session";
pub const RECORD_VERSION: u32 = 1;

/// Everything needed to rebuild a session after the process is gone.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PersistedRecord {
    pub version: u32,
    pub config: SessionConfig,
    pub timestamps: SessionTimestamps,
    pub status: SessionStatus,
    pub notification: Option<NotificationHandle>,
}

impl PersistedRecord {
    /// `None` unless the state holds a Running or Paused session.
    pub fn from_state(state: &TimerState) -> Option<Self> {
        if !state.status.is_active() {
            return None;
        }
        Some(Self {
            version: RECORD_VERSION,
            config: state.config.clone()?,
            timestamps: state.timestamps,
            status: state.status,
            notification: state.notification.clone(),
        })
    }

    fn validate(&self) -> Result<(), String> {
        if self.version != RECORD_VERSION {
            return Err(format!("unsupported record version {}", self.version));
        }
        self.config.validate().map_err(|err| err.to_string())?;
        match (self.status, self.timestamps.paused_at_ms) {
            (SessionStatus::Running, None) | (SessionStatus::Paused, Some(_)) => Ok(()),
            (SessionStatus::Running | SessionStatus::Paused, _) => Err(format!(
                "status {:?} disagrees with paused_at {:?}",
                self.status, self.timestamps.paused_at_ms
            )),
            (status, _) => Err(format!("status {status:?} is not recoverable")),
        }
    }
}

/// One record slot per device.
#[derive(Clone)]
pub struct PersistedSessionStore {
    kv: Arc<dyn KeyValueStore>,
    key: String,
}

impl PersistedSessionStore {
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self::with_key(kv, ACTIVE_SESSION_KEY)
    }

    pub fn with_key(kv: Arc<dyn KeyValueStore>, key: impl Into<String>) -> Self {
        Self {
            kv,
            key: key.into(),
        }
    }

    pub fn save(&self, record: &PersistedRecord) -> Result<(), StorageError> {
        let bytes = serde_json::to_vec(record)?;
        self.kv.set(&self.key, &bytes)
    }

    pub fn load(&self) -> Result<Option<PersistedRecord>, LoadError> {
        let Some(bytes) = self.kv.get(&self.key)? else {
            return Ok(None);
        };
        let record: PersistedRecord = serde_json::from_slice(&bytes)
            .map_err(|err| LoadError::CorruptRecord(err.to_string()))?;
        record.validate().map_err(LoadError::CorruptRecord)?;
        Ok(Some(record))
    }

    pub fn clear(&self) -> Result<(), StorageError> {
        self.kv.delete(&self.key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryKv;

    fn record() -> PersistedRecord {
        PersistedRecord {
            version: RECORD_VERSION,
            config: SessionConfig::new(1500)
                .unwrap()
                .with_subject("book-7", Some("Dune".into())),
            timestamps: SessionTimestamps {
                started_at_ms: 1_700_000_000_123,
                paused_at_ms: Some(1_700_000_300_456),
                cumulative_paused_ms: 61_789,
            },
            status: SessionStatus::Paused,
            notification: Some(NotificationHandle::new("alert-1")),
        }
    }

    #[test]
    fn save_then_load_is_lossless() {
        let store = PersistedSessionStore::new(Arc::new(MemoryKv::new()));
        store.save(&record()).unwrap();
        assert_eq!(store.load().unwrap(), Some(record()));
    }

    #[test]
    fn empty_slot_loads_none_and_clear_is_idempotent() {
        let store = PersistedSessionStore::new(Arc::new(MemoryKv::new()));
        assert!(store.load().unwrap().is_none());
        store.clear().unwrap();
        store.save(&record()).unwrap();
        store.clear().unwrap();
        store.clear().unwrap();
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn garbage_bytes_are_corrupt() {
        let kv = Arc::new(MemoryKv::new());
        kv.set(ACTIVE_SESSION_KEY, b"{not json").unwrap();
        let store = PersistedSessionStore::new(kv);
        assert!(matches!(store.load(), Err(LoadError::CorruptRecord(_))));
    }

    #[test]
    fn inconsistent_pause_state_is_corrupt() {
        let store = PersistedSessionStore::new(Arc::new(MemoryKv::new()));
        let mut bad = record();
        bad.status = SessionStatus::Running;
        store.save(&bad).unwrap();
        assert!(matches!(store.load(), Err(LoadError::CorruptRecord(_))));

        let mut finished = record();
        finished.status = SessionStatus::Completed;
        store.save(&finished).unwrap();
        assert!(matches!(store.load(), Err(LoadError::CorruptRecord(_))));
    }

    #[test]
    fn zero_duration_is_corrupt() {
        let store = PersistedSessionStore::new(Arc::new(MemoryKv::new()));
        let mut bad = record();
        bad.config.total_duration_seconds = 0;
        store.save(&bad).unwrap();
        assert!(matches!(store.load(), Err(LoadError::CorruptRecord(_))));
    }

    #[test]
    fn from_state_skips_inactive_sessions() {
        let mut state = TimerState::new();
        assert!(PersistedRecord::from_state(&state).is_none());
        state.begin(SessionConfig::new(60).unwrap(), 5);
        let record = PersistedRecord::from_state(&state).unwrap();
        assert_eq!(record.status, SessionStatus::Running);
        assert_eq!(record.timestamps.started_at_ms, 5);
    }
}
