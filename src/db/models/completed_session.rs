use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A session that ran to completion.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CompletedSession {
    pub id: String,
    pub subject_id: Option<String>,
    pub duration_seconds: u64,
    pub completed_at: DateTime<Utc>,
}
