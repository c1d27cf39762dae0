use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

/// Canonical intent names. These are the keys of the handler registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentKind {
    Highlight,
    Thought,
    Idea,
    Affirmation,
    Gratitude,
    Reflection,
    Todo,
    Habit,
    Mood,
    Expense,
    Income,
    BudgetGoal,
    Reminder,
    Unknown,
}

impl IntentKind {
    pub const ALL: [IntentKind; 14] = [
        IntentKind::Highlight,
        IntentKind::Thought,
        IntentKind::Idea,
        IntentKind::Affirmation,
        IntentKind::Gratitude,
        IntentKind::Reflection,
        IntentKind::Todo,
        IntentKind::Habit,
        IntentKind::Mood,
        IntentKind::Expense,
        IntentKind::Income,
        IntentKind::BudgetGoal,
        IntentKind::Reminder,
        IntentKind::Unknown,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            IntentKind::Highlight => "highlight",
            IntentKind::Thought => "thought",
            IntentKind::Idea => "idea",
            IntentKind::Affirmation => "affirmation",
            IntentKind::Gratitude => "gratitude",
            IntentKind::Reflection => "reflection",
            IntentKind::Todo => "todo",
            IntentKind::Habit => "habit",
            IntentKind::Mood => "mood",
            IntentKind::Expense => "expense",
            IntentKind::Income => "income",
            IntentKind::BudgetGoal => "budget_goal",
            IntentKind::Reminder => "reminder",
            IntentKind::Unknown => "unknown",
        }
    }

    /// Exact lookup by canonical name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }
}

impl fmt::Display for IntentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Result of classifying one inbound message. Built once, never mutated.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParsedIntent {
    pub intent: IntentKind,
    pub category: Option<String>,
    pub action: Option<String>,
    /// Payload extracted from the message.
    pub content: String,
    /// 1.0 on a match, 0.0 otherwise. Informational only.
    pub confidence: f32,
    /// Extra structured fields reported by the classifier (mood_score, amount, time, ...).
    pub attributes: Map<String, Value>,
}

impl ParsedIntent {
    pub fn matched(intent: IntentKind, content: impl Into<String>) -> Self {
        Self {
            intent,
            category: None,
            action: None,
            content: content.into(),
            confidence: 1.0,
            attributes: Map::new(),
        }
    }

    pub fn unknown(text: &str) -> Self {
        Self {
            intent: IntentKind::Unknown,
            category: None,
            action: None,
            content: text.to_string(),
            confidence: 0.0,
            attributes: Map::new(),
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_action(mut self, action: impl Into<String>) -> Self {
        self.action = Some(action.into());
        self
    }

    pub fn with_attribute(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.attributes.insert(key.to_string(), value.into());
        self
    }

    pub fn attribute_str(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).and_then(Value::as_str)
    }

    /// Numeric attribute; accepts JSON numbers and numeric strings.
    pub fn attribute_f64(&self, key: &str) -> Option<f64> {
        match self.attributes.get(key)? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }
}

/// A command the user typed but got wrong. Rendered back as a usage hint.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CommandError {
    #[error("todo command needs a category and an action")]
    MissingTodoParts,
    #[error("unknown todo category '{0}'")]
    InvalidTodoCategory(String),
    #[error("unknown todo action '{0}'")]
    InvalidTodoAction(String),
}

pub const TODO_USAGE: &str = "Format: TODO: [work/family/self_care] [add/complete/list] [text]";

impl CommandError {
    pub fn usage_hint(&self) -> String {
        let problem = match self {
            CommandError::MissingTodoParts => "❌ Invalid todo command format.",
            CommandError::InvalidTodoCategory(_) => {
                "❌ Invalid category. Use: work, family, or self_care"
            }
            CommandError::InvalidTodoAction(_) => "❌ Invalid action. Use: add, complete, or list",
        };
        format!("{}\n{}", problem, TODO_USAGE)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TodoCategory {
    Work,
    Family,
    SelfCare,
}

impl TodoCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            TodoCategory::Work => "work",
            TodoCategory::Family => "family",
            TodoCategory::SelfCare => "self_care",
        }
    }
}

impl FromStr for TodoCategory {
    type Err = CommandError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "work" => Ok(TodoCategory::Work),
            "family" => Ok(TodoCategory::Family),
            "self_care" | "self-care" | "selfcare" => Ok(TodoCategory::SelfCare),
            other => Err(CommandError::InvalidTodoCategory(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TodoAction {
    Add,
    Complete,
    List,
}

impl TodoAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            TodoAction::Add => "add",
            TodoAction::Complete => "complete",
            TodoAction::List => "list",
        }
    }
}

impl FromStr for TodoAction {
    type Err = CommandError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "add" => Ok(TodoAction::Add),
            "complete" => Ok(TodoAction::Complete),
            "list" => Ok(TodoAction::List),
            other => Err(CommandError::InvalidTodoAction(other.to_string())),
        }
    }
}

/// `<category> <action> [content]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TodoCommand {
    pub category: TodoCategory,
    pub action: TodoAction,
    pub content: String,
}

impl TodoCommand {
    pub fn parse(input: &str) -> Result<Self, CommandError> {
        let mut parts = input.split_whitespace();
        let (Some(category), Some(action)) = (parts.next(), parts.next()) else {
            return Err(CommandError::MissingTodoParts);
        };

        let category = category.parse::<TodoCategory>()?;
        let action = action.parse::<TodoAction>()?;
        let content = parts.collect::<Vec<_>>().join(" ");

        Ok(Self {
            category,
            action,
            content,
        })
    }
}
