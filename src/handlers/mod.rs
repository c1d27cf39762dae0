//! Intent handlers backed by the SQLite store.

pub mod budget;
pub mod habit;
pub mod journal;
pub mod mood;
pub mod reminder;
pub mod todo;

use async_trait::async_trait;
use std::sync::Arc;

use crate::intent::registry::{HandlerRegistry, IntentHandler, HELP_TEXT};
use crate::intent::types::{IntentKind, ParsedIntent};
use crate::store::journal::EntryKind;
use crate::store::Store;

use budget::BudgetHandler;
use habit::HabitHandler;
use journal::JournalHandler;
use mood::MoodHandler;
use reminder::ReminderHandler;
use todo::TodoHandler;

/// Registry with a handler for every canonical intent.
pub fn standard_registry(store: Store) -> HandlerRegistry {
    let mut registry = HandlerRegistry::new();

    for (kind, entry) in [
        (IntentKind::Highlight, EntryKind::Highlight),
        (IntentKind::Thought, EntryKind::Thought),
        (IntentKind::Idea, EntryKind::Idea),
        (IntentKind::Affirmation, EntryKind::Affirmation),
        (IntentKind::Gratitude, EntryKind::Gratitude),
        (IntentKind::Reflection, EntryKind::Reflection),
    ] {
        registry.register(kind, JournalHandler::new(store.clone(), entry));
    }

    registry.register(IntentKind::Todo, TodoHandler::new(store.clone()));
    registry.register(IntentKind::Habit, HabitHandler::new(store.clone()));
    registry.register(IntentKind::Mood, MoodHandler::new(store.clone()));

    let budget: Arc<dyn IntentHandler> = Arc::new(BudgetHandler::new(store.clone()));
    for kind in [IntentKind::Expense, IntentKind::Income, IntentKind::BudgetGoal] {
        registry.register_shared(kind, budget.clone());
    }

    registry.register(IntentKind::Reminder, ReminderHandler::new(store));
    registry.register(IntentKind::Unknown, UnknownHandler);

    registry
}

pub struct UnknownHandler;

#[async_trait]
impl IntentHandler for UnknownHandler {
    async fn handle(&self, _user_id: &str, _intent: &ParsedIntent) -> anyhow::Result<String> {
        Ok(HELP_TEXT.to_string())
    }
}

/// Sub-command for handlers whose content reads `<action> [args]`.
///
/// A structured `action` from the classifier wins; a leading copy of it in
/// the content is dropped. Otherwise the first word is the action.
pub(crate) fn split_action<'a>(intent: &'a ParsedIntent) -> (String, &'a str) {
    let content = intent.content.trim();
    let (first, rest) = match content.split_once(char::is_whitespace) {
        Some((first, rest)) => (first, rest.trim()),
        None => (content, ""),
    };

    match intent.action.as_deref() {
        Some(action) if !action.is_empty() => {
            if first.eq_ignore_ascii_case(action) {
                (action.to_lowercase(), rest)
            } else {
                (action.to_lowercase(), content)
            }
        }
        _ => (first.to_lowercase(), rest),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_action_from_content() {
        let intent = ParsedIntent::matched(IntentKind::Habit, "Complete Morning run");
        assert_eq!(split_action(&intent), ("complete".to_string(), "Morning run"));

        let intent = ParsedIntent::matched(IntentKind::Habit, "list");
        assert_eq!(split_action(&intent), ("list".to_string(), ""));

        let intent = ParsedIntent::matched(IntentKind::Habit, "");
        assert_eq!(split_action(&intent), (String::new(), ""));
    }

    #[test]
    fn test_split_action_prefers_structured_field() {
        let intent = ParsedIntent::matched(IntentKind::Habit, "Read in learning").with_action("add");
        assert_eq!(split_action(&intent), ("add".to_string(), "Read in learning"));

        let intent =
            ParsedIntent::matched(IntentKind::Habit, "add Read in learning").with_action("ADD");
        assert_eq!(split_action(&intent), ("add".to_string(), "Read in learning"));
    }

    #[test]
    fn test_standard_registry_covers_every_intent() {
        let store = Store::open_in_memory().unwrap();
        let registry = standard_registry(store);
        for kind in IntentKind::ALL {
            assert!(registry.is_registered(kind), "no handler for {}", kind);
        }
        assert_eq!(registry.len(), IntentKind::ALL.len());
    }

    #[tokio::test]
    async fn test_unknown_handler_replies_with_help() {
        let reply = UnknownHandler
            .handle("u1", &ParsedIntent::unknown("??"))
            .await
            .unwrap();
        assert_eq!(reply, HELP_TEXT);
    }
}
