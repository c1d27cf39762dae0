use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, error, warn};

use super::types::{IntentKind, ParsedIntent};

/// Fulfils one intent and produces the reply for the user.
///
/// Validation problems should come back as `Ok` with a usage hint; `Err` is
/// for things that went wrong underneath (storage, downstream calls).
#[async_trait]
pub trait IntentHandler: Send + Sync {
    async fn handle(&self, user_id: &str, intent: &ParsedIntent) -> anyhow::Result<String>;
}

pub const HELP_TEXT: &str = "🤖 I'm not sure how to help with that. Available commands:\n\
    HIGHLIGHT: [text]\n\
    THOUGHT: [text]\n\
    IDEA: [text]\n\
    AFFIRMATION: [text]\n\
    GRATITUDE: [text]\n\
    REFLECTION: [text]\n\
    TODO: [work/family/self_care] [add/complete/list] [text]\n\
    HABIT: [add <name> in <category> | complete <name> | list]\n\
    MOOD: [track <mood> [energy] [stress] [notes] | view]\n\
    EXPENSE: [amount] [category] [description]\n\
    INCOME: [amount] [category] [description]\n\
    GOAL: [category] [amount] [name]\n\
    BUDGET: [summary | expense ... | income ... | goal ...]\n\
    Remind me to [text] at [time]";

pub const FAILURE_REPLY: &str = "❌ Sorry, I encountered an error while processing your request.";

/// Intent-to-handler table. Filled by `register` during bootstrap and only
/// read afterwards.
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: HashMap<IntentKind, Arc<dyn IntentHandler>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<H>(&mut self, kind: IntentKind, handler: H)
    where
        H: IntentHandler + 'static,
    {
        self.register_shared(kind, Arc::new(handler));
    }

    /// Register one handler instance under several intents.
    pub fn register_shared(&mut self, kind: IntentKind, handler: Arc<dyn IntentHandler>) {
        if self.handlers.insert(kind, handler).is_some() {
            warn!("Handler for intent '{}' registered twice", kind);
        }
    }

    #[cfg(test)]
    pub fn is_registered(&self, kind: IntentKind) -> bool {
        self.handlers.contains_key(&kind)
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// Run the handler for `intent`. Always returns a reply: unregistered
    /// intents get the help text and handler errors get a generic apology.
    pub async fn execute(&self, user_id: &str, intent: &ParsedIntent) -> String {
        let Some(handler) = self.handlers.get(&intent.intent) else {
            debug!("No handler for intent '{}'", intent.intent);
            return HELP_TEXT.to_string();
        };

        match handler.handle(user_id, intent).await {
            Ok(reply) => reply,
            Err(e) => {
                error!(
                    "Error executing intent '{}' for user {}: {:#}",
                    intent.intent, user_id, e
                );
                FAILURE_REPLY.to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Echo;

    #[async_trait]
    impl IntentHandler for Echo {
        async fn handle(&self, user_id: &str, intent: &ParsedIntent) -> anyhow::Result<String> {
            Ok(format!("{}:{}:{}", user_id, intent.intent, intent.content))
        }
    }

    struct Failing;

    #[async_trait]
    impl IntentHandler for Failing {
        async fn handle(&self, _user_id: &str, _intent: &ParsedIntent) -> anyhow::Result<String> {
            anyhow::bail!("database is on fire")
        }
    }

    #[tokio::test]
    async fn test_registered_handler_is_invoked() {
        let mut registry = HandlerRegistry::new();
        registry.register(IntentKind::Idea, Echo);

        let reply = registry
            .execute("u1", &ParsedIntent::matched(IntentKind::Idea, "kites"))
            .await;
        assert_eq!(reply, "u1:idea:kites");
    }

    #[tokio::test]
    async fn test_unregistered_intent_gets_help() {
        let mut registry = HandlerRegistry::new();
        registry.register(IntentKind::Idea, Echo);
        assert!(!registry.is_registered(IntentKind::Habit));

        let reply = registry
            .execute("u1", &ParsedIntent::matched(IntentKind::Habit, "list"))
            .await;
        assert_eq!(reply, HELP_TEXT);
    }

    #[tokio::test]
    async fn test_handler_error_is_contained() {
        let mut registry = HandlerRegistry::new();
        registry.register(IntentKind::Expense, Failing);

        let reply = registry
            .execute("u1", &ParsedIntent::matched(IntentKind::Expense, "5 food"))
            .await;
        assert_eq!(reply, FAILURE_REPLY);
        assert!(!reply.contains("fire"));
    }

    #[test]
    fn test_shared_registration() {
        let mut registry = HandlerRegistry::new();
        let shared: Arc<dyn IntentHandler> = Arc::new(Echo);
        registry.register_shared(IntentKind::Income, shared.clone());
        registry.register_shared(IntentKind::Expense, shared);
        assert_eq!(registry.len(), 2);
        assert!(registry.is_registered(IntentKind::Income));
    }
}
