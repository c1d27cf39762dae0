pub mod classifier;
pub mod patterns;
pub mod registry;
pub mod types;

use std::time::Duration;
use tracing::{debug, info, warn};

use crate::intent::classifier::{ClassifyError, IntentClassifier};
use crate::intent::registry::HandlerRegistry;
use crate::intent::types::{CommandError, ParsedIntent};

/// Entry point of the core: text in, reply out.
///
/// Classification goes language model first, pattern rules second. Whether
/// the language model is used is fixed at construction.
pub struct IntentService {
    classifier: Option<IntentClassifier>,
    classify_timeout: Duration,
    registry: HandlerRegistry,
}

impl IntentService {
    pub fn new(
        classifier: Option<IntentClassifier>,
        classify_timeout: Duration,
        registry: HandlerRegistry,
    ) -> Self {
        if classifier.is_some() {
            info!("Intent classification: language model with pattern fallback");
        } else {
            info!("Intent classification: pattern matching only");
        }
        Self {
            classifier,
            classify_timeout,
            registry,
        }
    }

    /// Classify `text`. Each stage runs at most once; a classifier failure is
    /// logged and never reaches the caller.
    pub async fn parse_message(&self, text: &str) -> Result<ParsedIntent, CommandError> {
        if let Some(classifier) = &self.classifier {
            match self.classify_with_timeout(classifier, text).await {
                Ok(parsed) => return Ok(parsed),
                Err(e) => warn!("Classifier failed, falling back to patterns: {}", e),
            }
        }
        patterns::parse(text)
    }

    async fn classify_with_timeout(
        &self,
        classifier: &IntentClassifier,
        text: &str,
    ) -> Result<ParsedIntent, ClassifyError> {
        tokio::time::timeout(self.classify_timeout, classifier.classify(text))
            .await
            .map_err(|_| ClassifyError::Timeout(self.classify_timeout))?
    }

    /// Classify and dispatch one message. Always resolves to a reply.
    pub async fn process_command(&self, user_id: &str, text: &str) -> String {
        match self.parse_message(text).await {
            Ok(parsed) => {
                debug!(
                    "Parsed intent '{}' (confidence {:.1}) for user {}",
                    parsed.intent, parsed.confidence, user_id
                );
                self.registry.execute(user_id, &parsed).await
            }
            Err(e) => {
                info!("Malformed command from user {}: {}", user_id, e);
                e.usage_hint()
            }
        }
    }
}
