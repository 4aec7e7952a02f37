pub mod completed_session;

pub use completed_session::CompletedSession;
