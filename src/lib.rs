//! # Monk Mode
//!
//! Focused reading sessions that keep accurate time across backgrounding,
//! process death and device sleep.
//!
//! - [`SessionTimerController`] runs the session state machine.
//! - [`timer::accountant`] derives remaining time from timestamps only.
//! - [`PersistedSessionStore`] keeps the in-flight session on disk so a new
//!   process can pick it up.
//! - [`CompletionNotifier`] keeps one OS completion alert pending.
//! - [`CompletionSink`] receives each finished session once.

pub mod clock;
pub mod db;
pub mod error;
pub mod ledger;
pub mod notify;
pub mod settings;
pub mod store;
pub mod timer;

pub use clock::{Clock, ManualClock, SystemClock};
pub use db::Database;
pub use error::{LoadError, NotificationError, StorageError, TimerError};
pub use ledger::{CompletionSink, SessionLedger};
pub use notify::{CompletionNotifier, LogScheduler, NotificationHandle, NotificationScheduler};
pub use settings::{SettingsStore, UserSettings};
pub use store::{KeyValueStore, MemoryKv, PersistedRecord, PersistedSessionStore, SqliteKv};
pub use timer::{
    AppPhase, ControllerDeps, SessionConfig, SessionStatus, SessionTimerController,
    SessionTimestamps, TimerEvent, TimerSnapshot,
};

/// Installs the global logger. Info by default, Debug when `MONKMODE_DEBUG`
/// is set; `RUST_LOG` directives take precedence over both.
pub fn init_logging() {
    let debug_mode = std::env::var("MONKMODE_DEBUG")
        .map(|value| value == "1" || value.eq_ignore_ascii_case("true"))
        .unwrap_or(false);

    let mut builder = env_logger::Builder::new();
    builder.filter_level(if debug_mode {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    });
    builder.parse_default_env();

    if builder.try_init().is_err() {
        log::debug!("Logger already initialized");
    }
}
