use anyhow::Result;
use async_trait::async_trait;

use crate::intent::registry::IntentHandler;
use crate::intent::types::{ParsedIntent, TodoAction, TodoCategory, TodoCommand, TODO_USAGE};
use crate::store::Store;

const LIST_LIMIT: usize = 5;

pub struct TodoHandler {
    store: Store,
}

impl TodoHandler {
    pub fn new(store: Store) -> Self {
        Self { store }
    }
}

/// Structured category/action when both are valid, else the content is read
/// as `<category> <action> [text]`.
fn resolve_command(intent: &ParsedIntent) -> Result<TodoCommand, String> {
    let structured = intent
        .category
        .as_deref()
        .and_then(|c| c.parse::<TodoCategory>().ok())
        .zip(intent.action.as_deref().and_then(|a| a.parse::<TodoAction>().ok()));

    if let Some((category, action)) = structured {
        return Ok(TodoCommand {
            category,
            action,
            content: intent.content.trim().to_string(),
        });
    }

    TodoCommand::parse(&intent.content).map_err(|e| e.usage_hint())
}

#[async_trait]
impl IntentHandler for TodoHandler {
    async fn handle(&self, user_id: &str, intent: &ParsedIntent) -> Result<String> {
        let command = match resolve_command(intent) {
            Ok(command) => command,
            Err(hint) => return Ok(hint),
        };
        let category = command.category.as_str();

        match command.action {
            TodoAction::Add => {
                if command.content.is_empty() {
                    return Ok(format!("❌ Please say what to add.\n{}", TODO_USAGE));
                }
                self.store.add_todo(user_id, category, &command.content).await?;
                Ok(format!("✅ Added to {} todo list", category))
            }
            TodoAction::Complete => {
                let target = Some(command.content.as_str()).filter(|c| !c.is_empty());
                match self.store.complete_todo(user_id, category, target).await? {
                    Some(done) => Ok(format!("✅ Completed \"{}\" in {} todo list", done, category)),
                    None if target.is_some() => Ok(format!(
                        "No pending item \"{}\" in {} todo list",
                        command.content, category
                    )),
                    None => Ok(format!("No pending items in {} todo list", category)),
                }
            }
            TodoAction::List => {
                let items = self.store.list_todos(user_id, category, LIST_LIMIT).await?;
                if items.is_empty() {
                    return Ok(format!("No items in {} todo list", category));
                }
                Ok(items
                    .iter()
                    .map(|item| {
                        let mark = if item.is_completed { "✅" } else { "⏳" };
                        format!("{} {}", mark, item.content)
                    })
                    .collect::<Vec<_>>()
                    .join("\n"))
            }
        }
    }
}
