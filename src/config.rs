use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    #[default]
    Gemini,
    Openrouter,
    Ollama,
    Openai,
}

impl std::fmt::Display for LlmProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LlmProvider::Gemini => write!(f, "gemini"),
            LlmProvider::Openrouter => write!(f, "openrouter"),
            LlmProvider::Ollama => write!(f, "ollama"),
            LlmProvider::Openai => write!(f, "openai"),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct LlmConfig {
    #[serde(default)]
    pub provider: LlmProvider,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default)]
    pub base_url: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// Upper bound on a single classification call, in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl LlmConfig {
    /// Returns the effective base_url: if the stored value is empty,
    /// fall back to the canonical URL for the configured provider.
    pub fn effective_base_url(&self) -> &str {
        if !self.base_url.is_empty() {
            return &self.base_url;
        }
        match self.provider {
            LlmProvider::Gemini => "https://generativelanguage.googleapis.com/v1beta",
            LlmProvider::Openrouter => "https://openrouter.ai/api/v1",
            LlmProvider::Ollama => "http://localhost:11434/v1",
            LlmProvider::Openai => "https://api.openai.com/v1",
        }
    }

    /// Whether enough credentials are present to call the provider.
    /// Ollama runs locally and needs no key.
    pub fn has_credentials(&self) -> bool {
        !self.api_key.trim().is_empty() || self.provider == LlmProvider::Ollama
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default = "default_server_config")]
    pub server: ServerConfig,
    pub twilio: TwilioConfig,
    #[serde(default)]
    pub llm: Option<LlmConfig>,
    #[serde(default = "default_memory_config")]
    pub memory: MemoryConfig,
    #[serde(default = "default_reminders_config")]
    pub reminders: RemindersConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    #[serde(default = "default_webhook_path")]
    pub webhook_path: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct TwilioConfig {
    pub account_sid: String,
    pub auth_token: String,
    #[serde(default = "default_from_number")]
    pub from_number: String,
    #[serde(default = "default_twilio_base_url")]
    pub base_url: String,
    /// WhatsApp senders allowed to use the bot (e.g. "whatsapp:+15551234567").
    /// Empty means everyone.
    #[serde(default)]
    pub allowed_senders: Vec<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct MemoryConfig {
    #[serde(default = "default_db_path")]
    pub database_path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RemindersConfig {
    /// Cron expression (with seconds) for the due-reminder sweep.
    #[serde(default = "default_poll_cron")]
    pub poll_cron: String,
}

fn default_model() -> String {
    "gemini-2.0-flash".to_string()
}

fn default_max_tokens() -> u32 {
    512
}

/// Classifier deadline when `[llm]` does not set one.
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

fn default_bind_address() -> String {
    "0.0.0.0:3000".to_string()
}

fn default_webhook_path() -> String {
    "/webhook".to_string()
}

fn default_from_number() -> String {
    "whatsapp:+14155238886".to_string()
}

fn default_twilio_base_url() -> String {
    "https://api.twilio.com".to_string()
}

fn default_db_path() -> PathBuf {
    PathBuf::from("journalbot.db")
}

fn default_poll_cron() -> String {
    "0 * * * * *".to_string()
}

fn default_server_config() -> ServerConfig {
    ServerConfig {
        bind_address: default_bind_address(),
        webhook_path: default_webhook_path(),
    }
}

fn default_memory_config() -> MemoryConfig {
    MemoryConfig {
        database_path: default_db_path(),
    }
}

fn default_reminders_config() -> RemindersConfig {
    RemindersConfig {
        poll_cron: default_poll_cron(),
    }
}

impl Config {
    /// The language-model section, only when it carries usable credentials.
    pub fn classifier_llm(&self) -> Option<&LlmConfig> {
        self.llm.as_ref().filter(|llm| llm.has_credentials())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content).context("Failed to parse config file")?;

        if !config.server.webhook_path.starts_with('/') {
            anyhow::bail!(
                "server.webhook_path must start with '/': {}",
                config.server.webhook_path
            );
        }

        Ok(config)
    }
}
