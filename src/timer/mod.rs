pub mod accountant;
pub mod controller;
pub mod events;
pub mod state;

pub use controller::{ControllerDeps, SessionTimerController};
pub use events::{TimerEvent, TimerSnapshot};
pub use state::{AppPhase, SessionConfig, SessionStatus, SessionTimestamps, TimerState};
