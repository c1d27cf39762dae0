use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::{LlmConfig, LlmProvider};

/// Single-shot text generation: prompt in, completion text out.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChatMessage,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    generation_config: GeminiGenerationConfig,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiPart {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiGenerationConfig {
    max_output_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: GeminiContent,
}

/// Classification wants near-deterministic output.
const TEMPERATURE: f32 = 0.2;

pub struct LlmClient {
    client: reqwest::Client,
    config: LlmConfig,
}

impl LlmClient {
    pub fn new(config: LlmConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    async fn generate_gemini(&self, prompt: &str) -> Result<String> {
        let request = GeminiRequest {
            contents: vec![GeminiContent {
                role: Some("user".to_string()),
                parts: vec![GeminiPart {
                    text: prompt.to_string(),
                }],
            }],
            generation_config: GeminiGenerationConfig {
                max_output_tokens: self.config.max_tokens,
                temperature: TEMPERATURE,
            },
        };

        let url = format!(
            "{}/models/{}:generateContent",
            self.config.effective_base_url(),
            self.config.model
        );

        debug!("Sending request to Gemini: {}", url);

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.config.api_key)
            .json(&request)
            .send()
            .await
            .context("Failed to send request to Gemini")?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            anyhow::bail!("Gemini API error ({}): {}", status, error_body);
        }

        let gemini_response: GeminiResponse = response
            .json()
            .await
            .context("Failed to parse Gemini response")?;

        let text = gemini_response
            .candidates
            .into_iter()
            .next()
            .context("No candidates in Gemini response")?
            .content
            .parts
            .into_iter()
            .map(|part| part.text)
            .collect::<String>();

        Ok(text)
    }

    async fn generate_chat(&self, prompt: &str) -> Result<String> {
        let request = ChatRequest {
            model: self.config.model.clone(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: Some(prompt.to_string()),
            }],
            max_tokens: self.config.max_tokens,
            temperature: TEMPERATURE,
        };

        let url = format!("{}/chat/completions", self.config.effective_base_url());

        debug!("Sending request to {}: {}", self.config.provider, url);

        let mut builder = self
            .client
            .post(&url)
            .header("Content-Type", "application/json");
        if !self.config.api_key.is_empty() {
            builder = builder.header("Authorization", format!("Bearer {}", self.config.api_key));
        }

        let response = builder
            .json(&request)
            .send()
            .await
            .with_context(|| format!("Failed to send request to {}", self.config.provider))?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            anyhow::bail!(
                "{} API error ({}): {}",
                self.config.provider,
                status,
                error_body
            );
        }

        let chat_response: ChatResponse = response
            .json()
            .await
            .with_context(|| format!("Failed to parse {} response", self.config.provider))?;

        chat_response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .with_context(|| format!("No response from {}", self.config.provider))
    }
}

#[async_trait]
impl TextGenerator for LlmClient {
    async fn generate(&self, prompt: &str) -> Result<String> {
        match self.config.provider {
            LlmProvider::Gemini => self.generate_gemini(prompt).await,
            LlmProvider::Openrouter | LlmProvider::Ollama | LlmProvider::Openai => {
                self.generate_chat(prompt).await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config(provider: LlmProvider, base_url: String) -> LlmConfig {
        LlmConfig {
            provider,
            model: "test-model".to_string(),
            base_url,
            api_key: "test-key".to_string(),
            max_tokens: 128,
            timeout_secs: 5,
        }
    }

    #[tokio::test]
    async fn test_gemini_returns_candidate_text() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/models/test-model:generateContent"))
            .and(header("x-goog-api-key", "test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "candidates": [
                    { "content": { "role": "model", "parts": [
                        { "text": "{\"intent\": " },
                        { "text": "\"idea\"}" }
                    ] } }
                ]
            })))
            .mount(&server)
            .await;

        let client = LlmClient::new(config(LlmProvider::Gemini, server.uri()));
        let text = client.generate("hello").await.unwrap();
        assert_eq!(text, "{\"intent\": \"idea\"}");
    }

    #[tokio::test]
    async fn test_gemini_error_status_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_string("quota exceeded"))
            .mount(&server)
            .await;

        let client = LlmClient::new(config(LlmProvider::Gemini, server.uri()));
        let err = client.generate("hello").await.unwrap_err();
        assert!(err.to_string().contains("429"));
        assert!(err.to_string().contains("quota exceeded"));
    }

    #[tokio::test]
    async fn test_chat_completions_returns_message_content() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("Authorization", "Bearer test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [
                    { "message": { "role": "assistant", "content": "{\"intent\": \"mood\"}" } }
                ]
            })))
            .mount(&server)
            .await;

        let client = LlmClient::new(config(LlmProvider::Openai, server.uri()));
        let text = client.generate("hello").await.unwrap();
        assert_eq!(text, "{\"intent\": \"mood\"}");
    }

    #[tokio::test]
    async fn test_chat_completions_without_choices_fails() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "choices": [] })))
            .mount(&server)
            .await;

        let client = LlmClient::new(config(LlmProvider::Openrouter, server.uri()));
        assert!(client.generate("hello").await.is_err());
    }
}
