use anyhow::Result;
use chrono::Utc;
use rusqlite::{params, OptionalExtension};

use crate::db::Database;

impl Database {
    pub fn kv_get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let key = key.to_string();
        self.execute_blocking(move |conn| {
            let value = conn
                .query_row(
                    "SELECT value FROM kv WHERE key = ?1",
                    params![key],
                    |row| row.get::<_, Vec<u8>>(0),
                )
                .optional()?;
            Ok(value)
        })
    }

    pub fn kv_set(&self, key: &str, value: &[u8]) -> Result<()> {
        let key = key.to_string();
        let value = value.to_vec();
        self.execute_blocking(move |conn| {
            conn.execute(
                "INSERT INTO kv (key, value, updated_at) VALUES (?1, ?2, ?3)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
                params![key, value, Utc::now().to_rfc3339()],
            )?;
            Ok(())
        })
    }

    pub fn kv_delete(&self, key: &str) -> Result<()> {
        let key = key.to_string();
        self.execute_blocking(move |conn| {
            conn.execute("DELETE FROM kv WHERE key = ?1", params![key])?;
            Ok(())
        })
    }
}
