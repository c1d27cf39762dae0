use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use uuid::Uuid;

use super::{format_timestamp, now_timestamp, Store};

#[derive(Debug, Clone, PartialEq)]
pub struct MoodEntry {
    pub mood_score: u8,
    pub energy_level: Option<u8>,
    pub stress_level: Option<u8>,
    pub notes: Option<String>,
    pub entry_date: String,
}

impl Store {
    pub async fn save_mood(
        &self,
        user_id: &str,
        mood_score: u8,
        energy_level: Option<u8>,
        stress_level: Option<u8>,
        notes: Option<&str>,
    ) -> Result<String> {
        let id = Uuid::new_v4().to_string();
        let conn = self.conn.lock().await;
        conn.execute(
            "INSERT INTO moods (id, user_id, mood_score, energy_level, stress_level, notes, entry_date)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            rusqlite::params![
                &id,
                user_id,
                mood_score,
                energy_level,
                stress_level,
                notes,
                now_timestamp(),
            ],
        )
        .context("Failed to save mood")?;
        Ok(id)
    }

    /// Entries at or after `since`, newest first.
    pub async fn moods_since(&self, user_id: &str, since: NaiveDateTime) -> Result<Vec<MoodEntry>> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare(
            "SELECT mood_score, energy_level, stress_level, notes, entry_date FROM moods
             WHERE user_id = ?1 AND entry_date >= ?2
             ORDER BY entry_date DESC, rowid DESC",
        )?;
        let moods = stmt
            .query_map(rusqlite::params![user_id, format_timestamp(since)], |row| {
                Ok(MoodEntry {
                    mood_score: row.get(0)?,
                    energy_level: row.get(1)?,
                    stress_level: row.get(2)?,
                    notes: row.get(3)?,
                    entry_date: row.get(4)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()
            .context("Failed to load moods")?;
        Ok(moods)
    }
}
