use anyhow::{Context, Result};
use chrono::{Months, NaiveDateTime};
use rusqlite::OptionalExtension;
use uuid::Uuid;

use super::{format_timestamp, now_timestamp, Store};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CategoryType {
    Expense,
    Income,
}

impl CategoryType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CategoryType::Expense => "expense",
            CategoryType::Income => "income",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PeriodTotals {
    pub income: f64,
    pub expenses: f64,
}

impl PeriodTotals {
    pub fn balance(&self) -> f64 {
        self.income - self.expenses
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GoalProgress {
    pub name: String,
    pub category: String,
    pub target_amount: f64,
    pub current_amount: f64,
}

impl GoalProgress {
    pub fn percent(&self) -> f64 {
        if self.target_amount <= 0.0 {
            return 0.0;
        }
        self.current_amount / self.target_amount * 100.0
    }
}

impl Store {
    pub async fn find_budget_category(
        &self,
        user_id: &str,
        name: &str,
        kind: CategoryType,
    ) -> Result<Option<String>> {
        let conn = self.conn.lock().await;
        conn.query_row(
            "SELECT id FROM budget_categories WHERE user_id = ?1 AND name = ?2 AND type = ?3",
            rusqlite::params![user_id, name, kind.as_str()],
            |row| row.get(0),
        )
        .optional()
        .context("Failed to look up budget category")
    }

    /// Record a transaction, creating the category on first use.
    pub async fn add_transaction(
        &self,
        user_id: &str,
        kind: CategoryType,
        category: &str,
        amount: f64,
        description: Option<&str>,
        payment_method: &str,
    ) -> Result<String> {
        let mut conn = self.conn.lock().await;
        let tx = conn.transaction()?;

        tx.execute(
            "INSERT OR IGNORE INTO budget_categories (id, user_id, name, type)
             VALUES (?1, ?2, ?3, ?4)",
            rusqlite::params![Uuid::new_v4().to_string(), user_id, category, kind.as_str()],
        )
        .context("Failed to create budget category")?;
        let category_id: String = tx.query_row(
            "SELECT id FROM budget_categories WHERE user_id = ?1 AND name = ?2 AND type = ?3",
            rusqlite::params![user_id, category, kind.as_str()],
            |row| row.get(0),
        )?;

        let id = Uuid::new_v4().to_string();
        tx.execute(
            "INSERT INTO budget_transactions
                (id, user_id, category_id, amount, description, payment_method, transaction_date)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            rusqlite::params![
                &id,
                user_id,
                category_id,
                amount,
                description,
                payment_method,
                now_timestamp(),
            ],
        )
        .context("Failed to insert transaction")?;

        tx.commit()?;
        Ok(id)
    }

    /// Create an active goal running one month from `start`.
    pub async fn add_budget_goal(
        &self,
        user_id: &str,
        category_id: &str,
        name: &str,
        target_amount: f64,
        start: NaiveDateTime,
    ) -> Result<String> {
        let end = start
            .checked_add_months(Months::new(1))
            .context("Goal end date out of range")?;
        let id = Uuid::new_v4().to_string();
        let conn = self.conn.lock().await;
        conn.execute(
            "INSERT INTO budget_goals
                (id, user_id, category_id, name, target_amount, start_date, end_date)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            rusqlite::params![
                &id,
                user_id,
                category_id,
                name,
                target_amount,
                format_timestamp(start),
                format_timestamp(end),
            ],
        )
        .context("Failed to insert budget goal")?;
        Ok(id)
    }

    /// Income and expense totals for transactions in `[from, to)`.
    pub async fn budget_totals(
        &self,
        user_id: &str,
        from: NaiveDateTime,
        to: NaiveDateTime,
    ) -> Result<PeriodTotals> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare(
            "SELECT c.type, SUM(t.amount) FROM budget_transactions t
             JOIN budget_categories c ON c.id = t.category_id
             WHERE t.user_id = ?1 AND t.transaction_date >= ?2 AND t.transaction_date < ?3
             GROUP BY c.type",
        )?;
        let rows = stmt
            .query_map(
                rusqlite::params![user_id, format_timestamp(from), format_timestamp(to)],
                |row| Ok((row.get::<_, String>(0)?, row.get::<_, f64>(1)?)),
            )?
            .collect::<rusqlite::Result<Vec<_>>>()
            .context("Failed to total transactions")?;

        let mut totals = PeriodTotals::default();
        for (kind, sum) in rows {
            match kind.as_str() {
                "income" => totals.income = sum,
                "expense" => totals.expenses = sum,
                _ => {}
            }
        }
        Ok(totals)
    }

    pub async fn active_budget_goals(&self, user_id: &str) -> Result<Vec<GoalProgress>> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare(
            "SELECT g.name, c.name, g.target_amount, g.current_amount FROM budget_goals g
             JOIN budget_categories c ON c.id = g.category_id
             WHERE g.user_id = ?1 AND g.status = 'active'
             ORDER BY g.start_date ASC, g.rowid ASC",
        )?;
        let goals = stmt
            .query_map(rusqlite::params![user_id], |row| {
                Ok(GoalProgress {
                    name: row.get(0)?,
                    category: row.get(1)?,
                    target_amount: row.get(2)?,
                    current_amount: row.get(3)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()
            .context("Failed to load budget goals")?;
        Ok(goals)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Local};

    #[tokio::test]
    async fn test_transactions_create_categories_once() {
        let store = Store::open_in_memory().unwrap();
        store
            .add_transaction("u1", CategoryType::Expense, "food", 12.5, Some("lunch"), "cash")
            .await
            .unwrap();
        store
            .add_transaction("u1", CategoryType::Expense, "food", 7.5, None, "card")
            .await
            .unwrap();
        store
            .add_transaction("u1", CategoryType::Income, "salary", 100.0, None, "bank_transfer")
            .await
            .unwrap();

        assert!(store
            .find_budget_category("u1", "food", CategoryType::Expense)
            .await
            .unwrap()
            .is_some());
        assert!(store
            .find_budget_category("u1", "food", CategoryType::Income)
            .await
            .unwrap()
            .is_none());

        let now = Local::now().naive_local();
        let totals = store
            .budget_totals("u1", now - Duration::days(1), now + Duration::days(1))
            .await
            .unwrap();
        assert_eq!(totals.expenses, 20.0);
        assert_eq!(totals.income, 100.0);
        assert_eq!(totals.balance(), 80.0);

        let empty = store
            .budget_totals("u2", now - Duration::days(1), now + Duration::days(1))
            .await
            .unwrap();
        assert_eq!(empty, PeriodTotals::default());
    }

    #[tokio::test]
    async fn test_goals() {
        let store = Store::open_in_memory().unwrap();
        store
            .add_transaction("u1", CategoryType::Expense, "travel", 5.0, None, "cash")
            .await
            .unwrap();
        let category_id = store
            .find_budget_category("u1", "travel", CategoryType::Expense)
            .await
            .unwrap()
            .unwrap();

        let start = NaiveDateTime::parse_from_str("2026-01-31 10:00:00", super::super::TIMESTAMP_FORMAT)
            .unwrap();
        store
            .add_budget_goal("u1", &category_id, "Trip to Rome", 500.0, start)
            .await
            .unwrap();

        let goals = store.active_budget_goals("u1").await.unwrap();
        assert_eq!(goals.len(), 1);
        assert_eq!(goals[0].name, "Trip to Rome");
        assert_eq!(goals[0].category, "travel");
        assert_eq!(goals[0].percent(), 0.0);

        let conn = store.conn.lock().await;
        let end: String = conn
            .query_row("SELECT end_date FROM budget_goals", [], |row| row.get(0))
            .unwrap();
        // Month arithmetic clamps to the last day of February.
        assert_eq!(end, "2026-02-28 10:00:00");
    }
}
