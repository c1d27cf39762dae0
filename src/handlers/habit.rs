use anyhow::Result;
use async_trait::async_trait;
use chrono::Local;
use tracing::info;

use super::split_action;
use crate::intent::registry::IntentHandler;
use crate::intent::types::ParsedIntent;
use crate::store::Store;

const CATEGORIES: [&str; 4] = ["health", "productivity", "learning", "lifestyle"];

pub struct HabitHandler {
    store: Store,
}

impl HabitHandler {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    async fn add(&self, user_id: &str, args: &str) -> Result<String> {
        let Some((name, category)) = args.rsplit_once(" in ") else {
            return Ok(
                "❌ Please provide habit name and category. Format: add [habit name] in [category]"
                    .to_string(),
            );
        };
        let (name, category) = (name.trim(), category.trim().to_lowercase());
        if name.is_empty() {
            return Ok("❌ Please provide a habit name.".to_string());
        }
        if !CATEGORIES.contains(&category.as_str()) {
            return Ok(
                "❌ Invalid category. Use: health, productivity, learning, or lifestyle".to_string(),
            );
        }

        self.store.add_habit(user_id, name, &category).await?;
        info!("Habit '{}' added for user {}", name, user_id);
        Ok(format!("✅ Habit \"{}\" added to {} category!", name, category))
    }

    async fn complete(&self, user_id: &str, name: &str) -> Result<String> {
        if name.is_empty() {
            return Ok("❌ Which habit? Format: complete [habit name]".to_string());
        }
        if self.store.log_habit(user_id, name).await? {
            Ok(format!("✅ Habit \"{}\" marked as completed!", name))
        } else {
            Ok("❌ Habit not found.".to_string())
        }
    }

    async fn list(&self, user_id: &str) -> Result<String> {
        let start_of_day = Local::now().date_naive().and_time(chrono::NaiveTime::MIN);
        let habits = self.store.list_habits(user_id, start_of_day).await?;
        if habits.is_empty() {
            return Ok("📝 No active habits found. Add some habits to get started!".to_string());
        }

        let mut reply = String::from("📝 Your Habits:\n");
        let mut current = "";
        for habit in &habits {
            if habit.category != current {
                current = &habit.category;
                reply.push_str(&format!("\n{}:\n", current.to_uppercase()));
            }
            let mark = if habit.completed_since { " ✅" } else { "" };
            reply.push_str(&format!("• {}{}\n", habit.name, mark));
        }
        Ok(reply.trim_end().to_string())
    }
}

#[async_trait]
impl IntentHandler for HabitHandler {
    async fn handle(&self, user_id: &str, intent: &ParsedIntent) -> Result<String> {
        let (action, args) = split_action(intent);
        match action.as_str() {
            "add" => self.add(user_id, args).await,
            "complete" | "done" => self.complete(user_id, args).await,
            "list" => self.list(user_id).await,
            _ => Ok("❌ Invalid habit command. Use: add, complete, or list".to_string()),
        }
    }
}
