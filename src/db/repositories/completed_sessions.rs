use anyhow::Result;
use chrono::SecondsFormat;
use rusqlite::{params, Row};

use crate::db::{
    helpers::{parse_datetime, to_i64, to_u64},
    models::CompletedSession,
    Database,
};

fn row_to_completed_session(row: &Row) -> Result<CompletedSession> {
    let duration_seconds: i64 = row.get("duration_seconds")?;
    let completed_at: String = row.get("completed_at")?;

    Ok(CompletedSession {
        id: row.get("id")?,
        subject_id: row.get("subject_id")?,
        duration_seconds: to_u64(duration_seconds, "duration_seconds")?,
        completed_at: parse_datetime(&completed_at, "completed_at")?,
    })
}

impl Database {
    /// Fire-and-forget insert; the ledger never waits on disk.
    pub fn insert_completed_session(&self, session: &CompletedSession) {
        let record = session.clone();
        self.submit("insert completed session", move |conn| {
            conn.execute(
                "INSERT INTO completed_sessions (id, subject_id, duration_seconds, completed_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    record.id,
                    record.subject_id,
                    to_i64(record.duration_seconds)?,
                    record
                        .completed_at
                        .to_rfc3339_opts(SecondsFormat::Millis, true),
                ],
            )?;
            Ok(())
        });
    }

    /// Most recent first.
    pub async fn list_completed_sessions(&self, limit: usize) -> Result<Vec<CompletedSession>> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        self.execute(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, subject_id, duration_seconds, completed_at
                 FROM completed_sessions
                 ORDER BY completed_at DESC
                 LIMIT ?1",
            )?;

            let mut rows = stmt.query(params![limit])?;
            let mut sessions = Vec::new();
            while let Some(row) = rows.next()? {
                sessions.push(row_to_completed_session(row)?);
            }
            Ok(sessions)
        })
        .await
    }
}
