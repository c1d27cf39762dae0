use anyhow::{Context, Result};
use uuid::Uuid;

use super::{now_timestamp, Store};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    Highlight,
    Thought,
    Idea,
    Affirmation,
    Gratitude,
    Reflection,
}

impl EntryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryKind::Highlight => "highlight",
            EntryKind::Thought => "thought",
            EntryKind::Idea => "idea",
            EntryKind::Affirmation => "affirmation",
            EntryKind::Gratitude => "gratitude",
            EntryKind::Reflection => "reflection",
        }
    }
}

#[derive(Debug, Clone)]
pub struct JournalEntry {
    pub content: String,
    pub created_at: String,
}

impl Store {
    pub async fn save_journal_entry(
        &self,
        user_id: &str,
        kind: EntryKind,
        content: &str,
    ) -> Result<String> {
        let id = Uuid::new_v4().to_string();
        let conn = self.conn.lock().await;
        conn.execute(
            "INSERT INTO journal_entries (id, user_id, kind, content, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            rusqlite::params![&id, user_id, kind.as_str(), content, now_timestamp()],
        )
        .with_context(|| format!("Failed to save {} entry", kind.as_str()))?;
        Ok(id)
    }

    /// Most recent entries of one kind, newest first.
    pub async fn recent_journal_entries(
        &self,
        user_id: &str,
        kind: EntryKind,
        limit: usize,
    ) -> Result<Vec<JournalEntry>> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare(
            "SELECT content, created_at FROM journal_entries
             WHERE user_id = ?1 AND kind = ?2
             ORDER BY created_at DESC, rowid DESC
             LIMIT ?3",
        )?;
        let entries = stmt
            .query_map(rusqlite::params![user_id, kind.as_str(), limit as i64], |row| {
                Ok(JournalEntry {
                    content: row.get(0)?,
                    created_at: row.get(1)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()
            .context("Failed to load journal entries")?;
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_save_and_list_entries() {
        let store = Store::open_in_memory().unwrap();
        store
            .save_journal_entry("u1", EntryKind::Highlight, "shipped")
            .await
            .unwrap();
        store
            .save_journal_entry("u1", EntryKind::Highlight, "demo went well")
            .await
            .unwrap();
        store
            .save_journal_entry("u1", EntryKind::Gratitude, "coffee")
            .await
            .unwrap();
        store
            .save_journal_entry("u2", EntryKind::Highlight, "not mine")
            .await
            .unwrap();

        let entries = store
            .recent_journal_entries("u1", EntryKind::Highlight, 10)
            .await
            .unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].content, "demo went well");
        assert_eq!(entries[1].content, "shipped");

        let limited = store
            .recent_journal_entries("u1", EntryKind::Highlight, 1)
            .await
            .unwrap();
        assert_eq!(limited.len(), 1);
    }
}
