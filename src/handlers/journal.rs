use anyhow::Result;
use async_trait::async_trait;
use tracing::info;

use crate::intent::registry::IntentHandler;
use crate::intent::types::ParsedIntent;
use crate::store::journal::EntryKind;
use crate::store::{parse_timestamp, Store};

const RECENT_LIMIT: usize = 5;

/// Appends highlight / thought / idea / affirmation / gratitude / reflection
/// entries. An empty payload lists the latest entries of that kind.
pub struct JournalHandler {
    store: Store,
    kind: EntryKind,
}

impl JournalHandler {
    pub fn new(store: Store, kind: EntryKind) -> Self {
        Self { store, kind }
    }

    fn saved_reply(&self) -> &'static str {
        match self.kind {
            EntryKind::Highlight => "✅ Highlight saved!",
            EntryKind::Thought => "💡 Thought of the day saved!",
            EntryKind::Idea => "🚀 Idea of the day saved!",
            EntryKind::Affirmation => "✨ Daily affirmation saved!",
            EntryKind::Gratitude => "🙏 Gratitude entry saved!",
            EntryKind::Reflection => "🤔 Daily reflection saved!",
        }
    }

    fn usage(&self) -> String {
        format!(
            "❌ Please add some text. Format: {}: [text]",
            self.kind.as_str().to_uppercase()
        )
    }
}

#[async_trait]
impl IntentHandler for JournalHandler {
    async fn handle(&self, user_id: &str, intent: &ParsedIntent) -> Result<String> {
        let content = intent.content.trim();

        if content.is_empty() {
            let entries = self
                .store
                .recent_journal_entries(user_id, self.kind, RECENT_LIMIT)
                .await?;
            if entries.is_empty() {
                return Ok(self.usage());
            }
            let mut reply = format!("📖 Your recent {} entries:\n", self.kind.as_str());
            for entry in entries {
                let day = parse_timestamp(&entry.created_at)
                    .map(|at| at.format("%d %b").to_string())
                    .unwrap_or_else(|| entry.created_at.clone());
                reply.push_str(&format!("\n• {} ({})", entry.content, day));
            }
            return Ok(reply);
        }

        self.store
            .save_journal_entry(user_id, self.kind, content)
            .await?;
        info!("Saved {} entry for user {}", self.kind.as_str(), user_id);
        Ok(self.saved_reply().to_string())
    }
}
