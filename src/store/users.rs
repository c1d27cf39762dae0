use anyhow::{Context, Result};
use rusqlite::OptionalExtension;
use uuid::Uuid;

use super::{now_timestamp, Store};

impl Store {
    /// Look up the user for a WhatsApp address, creating one on first
    /// contact. The flag is true when the user was just created.
    pub async fn ensure_user(&self, whatsapp_number: &str, name: Option<&str>) -> Result<(String, bool)> {
        let conn = self.conn.lock().await;
        let existing: Option<String> = conn
            .query_row(
                "SELECT id FROM users WHERE whatsapp_number = ?1",
                rusqlite::params![whatsapp_number],
                |row| row.get(0),
            )
            .optional()
            .context("Failed to look up user")?;

        if let Some(id) = existing {
            return Ok((id, false));
        }

        let id = Uuid::new_v4().to_string();
        conn.execute(
            "INSERT INTO users (id, whatsapp_number, name, created_at) VALUES (?1, ?2, ?3, ?4)",
            rusqlite::params![&id, whatsapp_number, name, now_timestamp()],
        )
        .context("Failed to create user")?;
        Ok((id, true))
    }

    pub async fn save_raw_input(&self, user_id: &str, raw_text: &str) -> Result<String> {
        let id = Uuid::new_v4().to_string();
        let conn = self.conn.lock().await;
        conn.execute(
            "INSERT INTO raw_inputs (id, user_id, raw_text, created_at) VALUES (?1, ?2, ?3, ?4)",
            rusqlite::params![&id, user_id, raw_text, now_timestamp()],
        )
        .context("Failed to save raw input")?;
        Ok(id)
    }

    pub async fn mark_raw_input_processed(&self, id: &str) -> Result<()> {
        let conn = self.conn.lock().await;
        conn.execute(
            "UPDATE raw_inputs SET processed = 1 WHERE id = ?1",
            rusqlite::params![id],
        )
        .context("Failed to mark raw input processed")?;
        Ok(())
    }

    pub async fn unprocessed_raw_input_count(&self) -> Result<usize> {
        let conn = self.conn.lock().await;
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM raw_inputs WHERE processed = 0", [], |row| row.get(0))
            .context("Failed to count raw inputs")?;
        Ok(count as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_ensure_user_is_idempotent() {
        let store = Store::open_in_memory().unwrap();
        let (id, created) = store.ensure_user("whatsapp:+1555", Some("Sam")).await.unwrap();
        assert!(created);

        let (again, created) = store.ensure_user("whatsapp:+1555", None).await.unwrap();
        assert!(!created);
        assert_eq!(id, again);

        let (other, _) = store.ensure_user("whatsapp:+1666", None).await.unwrap();
        assert_ne!(id, other);
    }

    #[tokio::test]
    async fn test_raw_input_processing() {
        let store = Store::open_in_memory().unwrap();
        let first = store.save_raw_input("u1", "HIGHLIGHT: hi").await.unwrap();
        store.save_raw_input("u1", "hello").await.unwrap();
        assert_eq!(store.unprocessed_raw_input_count().await.unwrap(), 2);

        store.mark_raw_input_processed(&first).await.unwrap();
        assert_eq!(store.unprocessed_raw_input_count().await.unwrap(), 1);
    }
}
