//! Error taxonomy for the session timer.
//!
//! Transition errors are surfaced to the caller. Storage and notification
//! errors are logged by the controller and never abort a transition.

use thiserror::Error;

use crate::timer::SessionStatus;

/// Errors returned synchronously from controller operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TimerError {
    /// A transition was requested from a status that does not permit it.
    #[error("cannot {action} while session is {status:?}")]
    InvalidState {
        action: &'static str,
        status: SessionStatus,
    },

    /// The session configuration is unusable (e.g. zero duration).
    #[error("invalid session config: {0}")]
    InvalidConfig(String),
}

/// Durable storage failure. Non-fatal for a running session.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("storage backend failed: {0}")]
    Backend(String),

    #[error("failed to encode session record: {0}")]
    Encode(#[from] serde_json::Error),
}

impl From<anyhow::Error> for StorageError {
    fn from(err: anyhow::Error) -> Self {
        StorageError::Backend(format!("{err:#}"))
    }
}

/// Failure while reading back a persisted session.
#[derive(Error, Debug)]
pub enum LoadError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// The stored bytes do not describe a recoverable session.
    #[error("corrupt session record: {0}")]
    CorruptRecord(String),
}

/// OS notification failure. The session keeps running without an alert.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NotificationError {
    #[error("notifications unavailable: {0}")]
    Unavailable(String),

    #[error("notification scheduling failed: {0}")]
    Failed(String),
}

pub type Result<T, E = TimerError> = std::result::Result<T, E>;
