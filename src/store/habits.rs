use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use rusqlite::OptionalExtension;
use uuid::Uuid;

use super::{format_timestamp, now_timestamp, Store};

#[derive(Debug, Clone)]
pub struct HabitStatus {
    pub name: String,
    pub category: String,
    pub completed_since: bool,
}

impl Store {
    pub async fn add_habit(&self, user_id: &str, name: &str, category: &str) -> Result<String> {
        let id = Uuid::new_v4().to_string();
        let conn = self.conn.lock().await;
        conn.execute(
            "INSERT INTO habits (id, user_id, name, category, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            rusqlite::params![&id, user_id, name, category, now_timestamp()],
        )
        .context("Failed to insert habit")?;
        Ok(id)
    }

    /// Log a completion for the active habit called `name`.
    /// Returns false when no such habit exists.
    pub async fn log_habit(&self, user_id: &str, name: &str) -> Result<bool> {
        let conn = self.conn.lock().await;
        let habit_id: Option<String> = conn
            .query_row(
                "SELECT id FROM habits
                 WHERE user_id = ?1 AND lower(name) = lower(?2) AND is_active = 1
                 ORDER BY created_at ASC LIMIT 1",
                rusqlite::params![user_id, name],
                |row| row.get(0),
            )
            .optional()
            .context("Failed to look up habit")?;

        let Some(habit_id) = habit_id else {
            return Ok(false);
        };

        conn.execute(
            "INSERT INTO habit_logs (id, habit_id, user_id, completed_at)
             VALUES (?1, ?2, ?3, ?4)",
            rusqlite::params![Uuid::new_v4().to_string(), habit_id, user_id, now_timestamp()],
        )
        .context("Failed to log habit")?;
        Ok(true)
    }

    /// Active habits ordered by category then name, flagged when logged at or
    /// after `since`.
    pub async fn list_habits(&self, user_id: &str, since: NaiveDateTime) -> Result<Vec<HabitStatus>> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare(
            "SELECT h.name, h.category,
                    EXISTS (SELECT 1 FROM habit_logs l
                            WHERE l.habit_id = h.id AND l.completed_at >= ?2)
             FROM habits h
             WHERE h.user_id = ?1 AND h.is_active = 1
             ORDER BY h.category ASC, h.name ASC",
        )?;
        let habits = stmt
            .query_map(rusqlite::params![user_id, format_timestamp(since)], |row| {
                Ok(HabitStatus {
                    name: row.get(0)?,
                    category: row.get(1)?,
                    completed_since: row.get(2)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()
            .context("Failed to list habits")?;
        Ok(habits)
    }
}
