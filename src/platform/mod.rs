pub mod twilio;
pub mod whatsapp;

use anyhow::Result;
use async_trait::async_trait;

/// WhatsApp bodies are capped at 1600 characters.
pub const MAX_MESSAGE_LEN: usize = 1600;

/// A message received from the chat provider
#[derive(Debug, Clone)]
pub struct IncomingMessage {
    /// Provider address of the sender, e.g. "whatsapp:+15551234567"
    pub sender: String,
    /// Display name, when the provider sends one
    pub profile_name: Option<String>,
    /// The message text
    pub text: String,
}

/// Outbound delivery of reply text.
#[async_trait]
pub trait MessagingGateway: Send + Sync {
    async fn send_message(&self, to: &str, text: &str) -> Result<()>;
}

/// Split long messages into chunks of at most `max_len` characters,
/// preferring line and word breaks.
pub fn split_message(text: &str, max_len: usize) -> Vec<String> {
    if text.chars().count() <= max_len {
        return vec![text.to_string()];
    }

    let mut chunks = Vec::new();
    let mut rest = text;

    while !rest.is_empty() {
        // Byte offset just past the first `max_len` chars
        let end = rest
            .char_indices()
            .nth(max_len)
            .map(|(i, _)| i)
            .unwrap_or(rest.len());
        let actual_end = if end < rest.len() {
            rest[..end]
                .rfind('\n')
                .or_else(|| rest[..end].rfind(' '))
                .map(|pos| pos + 1)
                .unwrap_or(end)
        } else {
            end
        };

        chunks.push(rest[..actual_end].to_string());
        rest = &rest[actual_end..];
    }

    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_message_is_one_chunk() {
        assert_eq!(split_message("hello", 10), vec!["hello".to_string()]);
        assert_eq!(split_message("", 10), vec![String::new()]);
    }

    #[test]
    fn test_splits_on_word_boundaries() {
        let chunks = split_message("one two three four", 9);
        assert_eq!(chunks, vec!["one two ", "three ", "four"]);
        assert_eq!(chunks.concat(), "one two three four");
    }

    #[test]
    fn test_prefers_newlines() {
        let chunks = split_message("ab cd\nef gh", 8);
        assert_eq!(chunks[0], "ab cd\n");
    }

    #[test]
    fn test_counts_characters_not_bytes() {
        let text = "✅".repeat(5);
        let chunks = split_message(&text, 2);
        assert_eq!(chunks.len(), 3);
        assert!(chunks.iter().all(|c| c.chars().count() <= 2));
        assert_eq!(chunks.concat(), text);
    }

    #[test]
    fn test_chunk_limit_respected() {
        let text = "word ".repeat(1000);
        let chunks = split_message(&text, MAX_MESSAGE_LEN);
        assert!(chunks.len() > 1);
        assert!(chunks.iter().all(|c| c.chars().count() <= MAX_MESSAGE_LEN));
        assert_eq!(chunks.concat(), text);
    }
}
