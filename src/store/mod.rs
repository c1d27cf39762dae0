pub mod budget;
pub mod habits;
pub mod journal;
pub mod moods;
pub mod reminders;
pub mod todos;
pub mod users;

use anyhow::{Context, Result};
use chrono::{Local, NaiveDateTime};
use rusqlite::Connection;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;

/// Timestamps are stored as local wall-clock text so range queries
/// ("today", "this week") compare lexicographically.
pub(crate) const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub(crate) fn format_timestamp(at: NaiveDateTime) -> String {
    at.format(TIMESTAMP_FORMAT).to_string()
}

pub(crate) fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(value, TIMESTAMP_FORMAT).ok()
}

pub(crate) fn now_timestamp() -> String {
    format_timestamp(Local::now().naive_local())
}

/// Thread-safe SQLite store for journal, task, habit, mood, budget and
/// reminder data. Constructed once and handed to the handlers.
#[derive(Clone)]
pub struct Store {
    conn: Arc<Mutex<Connection>>,
}

impl Store {
    /// Open or create the SQLite database at the given path.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database: {}", path.display()))?;

        // journal_mode PRAGMA always returns the resulting mode, so use query_row
        let _: String = conn.query_row("PRAGMA journal_mode=WAL", [], |row| row.get(0))?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;

        // Migrate before wrapping in the async Mutex so no lock is needed here.
        Self::run_migrations(&conn)?;

        info!("Store initialized at: {}", path.display());
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open an in-memory database (for testing)
    #[cfg(test)]
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;

        Self::run_migrations(&conn)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    #[cfg(test)]
    pub async fn execute_batch(&self, sql: &str) -> Result<()> {
        self.conn.lock().await.execute_batch(sql)?;
        Ok(())
    }

    fn run_migrations(conn: &Connection) -> Result<()> {
        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS users (
                id TEXT PRIMARY KEY,
                whatsapp_number TEXT NOT NULL UNIQUE,
                name TEXT,
                created_at TEXT NOT NULL
            );

            -- Every inbound message, before classification
            CREATE TABLE IF NOT EXISTS raw_inputs (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                raw_text TEXT NOT NULL,
                processed INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_raw_inputs_processed
                ON raw_inputs(processed, created_at);

            -- Highlights, thoughts, ideas, affirmations, gratitude, reflections
            CREATE TABLE IF NOT EXISTS journal_entries (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                kind TEXT NOT NULL,
                content TEXT NOT NULL,
                created_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_journal_user
                ON journal_entries(user_id, kind, created_at);

            CREATE TABLE IF NOT EXISTS todos (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                category TEXT NOT NULL,
                content TEXT NOT NULL,
                is_completed INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL,
                completed_at TEXT
            );

            CREATE INDEX IF NOT EXISTS idx_todos_user
                ON todos(user_id, category, is_completed);

            CREATE TABLE IF NOT EXISTS habits (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                name TEXT NOT NULL,
                category TEXT NOT NULL,
                frequency TEXT NOT NULL DEFAULT 'daily',
                is_active INTEGER NOT NULL DEFAULT 1,
                created_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS habit_logs (
                id TEXT PRIMARY KEY,
                habit_id TEXT NOT NULL,
                user_id TEXT NOT NULL,
                completed_at TEXT NOT NULL,
                FOREIGN KEY (habit_id) REFERENCES habits(id)
            );

            CREATE TABLE IF NOT EXISTS moods (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                mood_score INTEGER NOT NULL CHECK (mood_score BETWEEN 1 AND 5),
                energy_level INTEGER CHECK (energy_level BETWEEN 1 AND 5),
                stress_level INTEGER CHECK (stress_level BETWEEN 1 AND 5),
                notes TEXT,
                entry_date TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS budget_categories (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                name TEXT NOT NULL,
                type TEXT NOT NULL,
                UNIQUE (user_id, name, type)
            );

            CREATE TABLE IF NOT EXISTS budget_transactions (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                category_id TEXT NOT NULL,
                amount REAL NOT NULL,
                description TEXT,
                payment_method TEXT NOT NULL,
                transaction_date TEXT NOT NULL,
                FOREIGN KEY (category_id) REFERENCES budget_categories(id)
            );

            CREATE TABLE IF NOT EXISTS budget_goals (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                category_id TEXT NOT NULL,
                name TEXT NOT NULL,
                target_amount REAL NOT NULL,
                current_amount REAL NOT NULL DEFAULT 0,
                start_date TEXT NOT NULL,
                end_date TEXT NOT NULL,
                status TEXT NOT NULL DEFAULT 'active',
                FOREIGN KEY (category_id) REFERENCES budget_categories(id)
            );

            CREATE TABLE IF NOT EXISTS reminders (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                reminder_text TEXT NOT NULL,
                reminder_time TEXT NOT NULL,
                status TEXT NOT NULL DEFAULT 'pending',
                created_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_reminders_due
                ON reminders(status, reminder_time);
            ",
        )?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timestamp_round_trip() {
        let at = NaiveDateTime::parse_from_str("2026-03-28 09:05:00", TIMESTAMP_FORMAT).unwrap();
        assert_eq!(format_timestamp(at), "2026-03-28 09:05:00");
        assert_eq!(parse_timestamp("2026-03-28 09:05:00"), Some(at));
        assert_eq!(parse_timestamp("yesterday"), None);
    }

    #[test]
    fn test_open_on_disk_is_idempotent() {
        let dir = std::env::temp_dir().join(format!("journalbot-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("test.db");

        Store::open(&path).unwrap();
        // Second open re-runs migrations against existing tables.
        Store::open(&path).unwrap();

        std::fs::remove_dir_all(&dir).ok();
    }
}
