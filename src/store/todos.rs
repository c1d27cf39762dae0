use anyhow::{Context, Result};
use rusqlite::OptionalExtension;
use uuid::Uuid;

use super::{now_timestamp, Store};

#[derive(Debug, Clone)]
pub struct TodoItem {
    pub content: String,
    pub is_completed: bool,
}

impl Store {
    pub async fn add_todo(&self, user_id: &str, category: &str, content: &str) -> Result<String> {
        let id = Uuid::new_v4().to_string();
        let conn = self.conn.lock().await;
        conn.execute(
            "INSERT INTO todos (id, user_id, category, content, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            rusqlite::params![&id, user_id, category, content, now_timestamp()],
        )
        .context("Failed to insert todo")?;
        Ok(id)
    }

    /// Complete one pending item in `category`: the first whose content
    /// matches `content` (case-insensitive), or the oldest when `content` is
    /// `None`. Returns the completed item's content.
    pub async fn complete_todo(
        &self,
        user_id: &str,
        category: &str,
        content: Option<&str>,
    ) -> Result<Option<String>> {
        let conn = self.conn.lock().await;
        let target: Option<(String, String)> = match content {
            Some(content) => conn
                .query_row(
                    "SELECT id, content FROM todos
                     WHERE user_id = ?1 AND category = ?2 AND is_completed = 0
                       AND lower(content) = lower(?3)
                     ORDER BY created_at ASC, rowid ASC LIMIT 1",
                    rusqlite::params![user_id, category, content],
                    |row| Ok((row.get(0)?, row.get(1)?)),
                )
                .optional(),
            None => conn
                .query_row(
                    "SELECT id, content FROM todos
                     WHERE user_id = ?1 AND category = ?2 AND is_completed = 0
                     ORDER BY created_at ASC, rowid ASC LIMIT 1",
                    rusqlite::params![user_id, category],
                    |row| Ok((row.get(0)?, row.get(1)?)),
                )
                .optional(),
        }
        .context("Failed to look up pending todo")?;

        let Some((id, content)) = target else {
            return Ok(None);
        };

        conn.execute(
            "UPDATE todos SET is_completed = 1, completed_at = ?1 WHERE id = ?2",
            rusqlite::params![now_timestamp(), &id],
        )
        .context("Failed to complete todo")?;
        Ok(Some(content))
    }

    /// Most recent items in `category`, completed or not.
    pub async fn list_todos(
        &self,
        user_id: &str,
        category: &str,
        limit: usize,
    ) -> Result<Vec<TodoItem>> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare(
            "SELECT content, is_completed FROM todos
             WHERE user_id = ?1 AND category = ?2
             ORDER BY created_at DESC, rowid DESC
             LIMIT ?3",
        )?;
        let items = stmt
            .query_map(rusqlite::params![user_id, category, limit as i64], |row| {
                Ok(TodoItem {
                    content: row.get(0)?,
                    is_completed: row.get(1)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()
            .context("Failed to list todos")?;
        Ok(items)
    }
}
