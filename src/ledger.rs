//! Where finished sessions go.

use chrono::Utc;
use log::info;
use uuid::Uuid;

use crate::db::{CompletedSession, Database};

/// Receives each completed session exactly once. Cancelled sessions never
/// reach the sink.
pub trait CompletionSink: Send + Sync {
    fn on_session_complete(&self, duration_seconds: u64, subject_id: Option<&str>);
}

impl<F> CompletionSink for F
where
    F: Fn(u64, Option<&str>) + Send + Sync,
{
    fn on_session_complete(&self, duration_seconds: u64, subject_id: Option<&str>) {
        self(duration_seconds, subject_id)
    }
}

/// Sink that records completions in the `completed_sessions` table.
#[derive(Clone)]
pub struct SessionLedger {
    db: Database,
}

impl SessionLedger {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub async fn recent(&self, limit: usize) -> anyhow::Result<Vec<CompletedSession>> {
        self.db.list_completed_sessions(limit).await
    }
}

impl CompletionSink for SessionLedger {
    fn on_session_complete(&self, duration_seconds: u64, subject_id: Option<&str>) {
        let session = CompletedSession {
            id: Uuid::new_v4().to_string(),
            subject_id: subject_id.map(str::to_string),
            duration_seconds,
            completed_at: Utc::now(),
        };
        info!(
            "Recording completed session {} ({}s, subject {:?})",
            session.id, duration_seconds, session.subject_id
        );
        self.db.insert_completed_session(&session);
    }
}
