use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use uuid::Uuid;

use super::{format_timestamp, now_timestamp, Store};

/// A pending reminder joined with the recipient's WhatsApp address.
#[derive(Debug, Clone)]
pub struct DueReminder {
    pub id: String,
    pub whatsapp_number: String,
    pub reminder_text: String,
    pub reminder_time: String,
}

impl Store {
    pub async fn create_reminder(
        &self,
        user_id: &str,
        reminder_text: &str,
        due_at: NaiveDateTime,
    ) -> Result<String> {
        let id = Uuid::new_v4().to_string();
        let conn = self.conn.lock().await;
        conn.execute(
            "INSERT INTO reminders (id, user_id, reminder_text, reminder_time, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            rusqlite::params![&id, user_id, reminder_text, format_timestamp(due_at), now_timestamp()],
        )
        .context("Failed to insert reminder")?;
        Ok(id)
    }

    /// Pending reminders due at or before `now`, oldest first.
    pub async fn due_reminders(&self, now: NaiveDateTime) -> Result<Vec<DueReminder>> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare(
            "SELECT r.id, u.whatsapp_number, r.reminder_text, r.reminder_time
             FROM reminders r
             JOIN users u ON u.id = r.user_id
             WHERE r.status = 'pending' AND r.reminder_time <= ?1
             ORDER BY r.reminder_time ASC",
        )?;
        let reminders = stmt
            .query_map(rusqlite::params![format_timestamp(now)], |row| {
                Ok(DueReminder {
                    id: row.get(0)?,
                    whatsapp_number: row.get(1)?,
                    reminder_text: row.get(2)?,
                    reminder_time: row.get(3)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()
            .context("Failed to load due reminders")?;
        Ok(reminders)
    }

    pub async fn mark_reminder_triggered(&self, id: &str) -> Result<()> {
        let conn = self.conn.lock().await;
        conn.execute(
            "UPDATE reminders SET status = 'triggered' WHERE id = ?1",
            rusqlite::params![id],
        )
        .context("Failed to update reminder status")?;
        Ok(())
    }
}
