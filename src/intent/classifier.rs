use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use super::types::{IntentKind, ParsedIntent};
use crate::llm::TextGenerator;

/// Why a classification attempt produced nothing usable.
#[derive(Debug, thiserror::Error)]
pub enum ClassifyError {
    #[error("language model request failed: {0:#}")]
    Transport(anyhow::Error),
    #[error("language model request timed out after {0:?}")]
    Timeout(Duration),
    #[error("no JSON object in language model response")]
    NoJsonObject,
    #[error("language model response is not valid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),
    #[error("language model response is missing '{0}'")]
    MissingField(&'static str),
    #[error("language model returned unsupported intent '{0}'")]
    UnknownIntent(String),
}

/// Provider spellings mapped onto canonical intent names.
const INTENT_SYNONYMS: &[(&str, IntentKind)] = &[
    ("daily_affirmation", IntentKind::Affirmation),
    ("highlight_of_the_day", IntentKind::Highlight),
    ("thought_of_the_day", IntentKind::Thought),
    ("idea_of_the_day", IntentKind::Idea),
    ("daily_reflection", IntentKind::Reflection),
    ("note", IntentKind::Thought),
    ("journal", IntentKind::Thought),
    ("task", IntentKind::Todo),
    ("self_care", IntentKind::Todo),
    ("todo_list", IntentKind::Todo),
    ("habit_tracking", IntentKind::Habit),
    ("mood_tracking", IntentKind::Mood),
    ("budget", IntentKind::BudgetGoal),
    ("goal", IntentKind::BudgetGoal),
    ("remind", IntentKind::Reminder),
    ("alert", IntentKind::Reminder),
];

/// Fields lifted into `ParsedIntent` directly; everything else lands in `attributes`.
const CORE_FIELDS: &[&str] = &["intent", "text_summary", "original_text", "category", "action"];

const SYSTEM_PROMPT: &str = r#"You are a structured AI assistant that extracts intent-based data from user messages sent to a personal journaling bot.

Users follow a command format:
- "Save [intent] for [date]: [text]"
- "Track [intent] [details]"
- "Add [intent] [details]"

Recognized intents:
- daily_affirmation
- highlight_of_the_day
- thought
- idea
- gratitude
- reflection
- todo (requires category: work, family, or self_care; requires action: add, complete, or list)
- habit (text_summary holds the habit command: "add [name] in [health|productivity|learning|lifestyle]", "complete [name]" or "list")
- mood (requires mood_score: 1-5, optional: energy_level, stress_level)
- expense (requires amount, category, optional: payment_method)
- income (requires amount, category)
- budget_goal (requires target_amount, category; use action "summary" when the user asks for a budget overview)
- reminder (requires time)

Extract the following details:
- intent: The type of entry
- date: Convert to ISO format (default to today if missing)
- text_summary: Shortened form of the text
- original_text: Exact message
- category: For todo/habit/expense/income/budget_goal items
- action: For todo items (add, complete, or list); "summary" for a budget_goal overview request
- amount: For expense/income items
- payment_method: For expense items (cash, card, upi, bank_transfer, other)
- mood_score: For mood entries (1-5)
- energy_level: For mood entries (1-5)
- stress_level: For mood entries (1-5)
- target_amount: For budget goals
- time: For reminders ("HH:MM", "tomorrow" or "later")

Respond with a single JSON object and nothing else.

Example Inputs & Outputs:

Input 1:
"Save daily affirmation for March 28: I am strong & proud."
Output:
{
  "intent": "daily_affirmation",
  "text_summary": "I am strong & proud.",
  "original_text": "Save daily affirmation for March 28: I am strong & proud.",
  "date": "2025-03-28"
}

Input 2:
"Add face mask to my self-care tasks for today"
Output:
{
  "intent": "todo",
  "text_summary": "face mask",
  "original_text": "Add face mask to my self-care tasks for today",
  "category": "self_care",
  "action": "add"
}

Input 3:
"Track my mood today - feeling great (5/5), high energy (4/5), low stress (2/5)"
Output:
{
  "intent": "mood",
  "text_summary": "feeling great, high energy, low stress",
  "original_text": "Track my mood today - feeling great (5/5), high energy (4/5), low stress (2/5)",
  "mood_score": 5,
  "energy_level": 4,
  "stress_level": 2
}

Input 4:
"Spent $50 on groceries using card"
Output:
{
  "intent": "expense",
  "text_summary": "groceries",
  "original_text": "Spent $50 on groceries using card",
  "amount": 50.00,
  "category": "groceries",
  "payment_method": "card"
}"#;

/// Classifies messages by asking a language model for structured JSON.
pub struct IntentClassifier {
    generator: Arc<dyn TextGenerator>,
}

impl IntentClassifier {
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self { generator }
    }

    pub fn build_prompt(message: &str) -> String {
        format!("{}\n\nUser message: {}", SYSTEM_PROMPT, message)
    }

    /// One attempt, no retry.
    pub async fn classify(&self, text: &str) -> Result<ParsedIntent, ClassifyError> {
        let prompt = Self::build_prompt(text);
        let raw = self
            .generator
            .generate(&prompt)
            .await
            .map_err(ClassifyError::Transport)?;

        debug!("Classifier raw response: {}", raw);
        parse_response(&raw, text)
    }
}

/// Map a provider intent spelling onto a canonical one.
/// `unknown` and unlisted names have no mapping.
pub fn canonical_intent(name: &str) -> Option<IntentKind> {
    let normalized = name.trim().to_lowercase().replace(['-', ' '], "_");

    IntentKind::from_name(&normalized)
        .or_else(|| {
            INTENT_SYNONYMS
                .iter()
                .find(|(synonym, _)| *synonym == normalized)
                .map(|(_, kind)| *kind)
        })
        .filter(|kind| *kind != IntentKind::Unknown)
}

/// Turn the model's reply into a `ParsedIntent`.
pub fn parse_response(raw: &str, original_text: &str) -> Result<ParsedIntent, ClassifyError> {
    let json = extract_json_object(raw).ok_or(ClassifyError::NoJsonObject)?;
    let object: Map<String, Value> = serde_json::from_str(json)?;

    let intent_name = object
        .get("intent")
        .and_then(Value::as_str)
        .ok_or(ClassifyError::MissingField("intent"))?;
    let intent = canonical_intent(intent_name)
        .ok_or_else(|| ClassifyError::UnknownIntent(intent_name.to_string()))?;

    let text_field = |key: &str| {
        object
            .get(key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
    };

    let content = text_field("text_summary")
        .or_else(|| text_field("original_text"))
        .unwrap_or_else(|| original_text.trim());

    let mut parsed = ParsedIntent::matched(intent, content);
    if let Some(category) = text_field("category") {
        parsed = parsed.with_category(category);
    }
    if let Some(action) = text_field("action") {
        parsed = parsed.with_action(action.to_lowercase());
    }
    for (key, value) in &object {
        if !CORE_FIELDS.contains(&key.as_str()) && !value.is_null() {
            parsed = parsed.with_attribute(key, value.clone());
        }
    }

    Ok(parsed)
}

/// Strip code fences and any prose around the outermost `{ ... }`.
fn extract_json_object(raw: &str) -> Option<&str> {
    let cleaned = raw.trim();
    let start = cleaned.find('{')?;
    let end = cleaned.rfind('}')?;
    (start < end).then(|| &cleaned[start..=end])
}
