mod config;
mod handlers;
mod intent;
mod llm;
mod platform;
mod scheduler;
mod store;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;
use crate::intent::classifier::IntentClassifier;
use crate::intent::IntentService;
use crate::llm::{LlmClient, TextGenerator};
use crate::platform::twilio::TwilioGateway;
use crate::platform::whatsapp::{self, AppState};
use crate::platform::MessagingGateway;
use crate::scheduler::Scheduler;
use crate::store::Store;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,journalbot=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("config.toml"));

    info!("Loading configuration from: {}", config_path.display());
    let config = Config::load(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;

    info!("Configuration loaded successfully");
    info!("  Webhook: {}{}", config.server.bind_address, config.server.webhook_path);
    info!("  Database: {}", config.memory.database_path.display());
    info!("  Allowed senders: {:?}", config.twilio.allowed_senders);

    let store = Store::open(&config.memory.database_path)?;

    // The classifier is decided once: without credentials it is never tried.
    let (classifier, classify_timeout) = match config.classifier_llm() {
        Some(llm) => {
            info!("  Classifier: {} / {}", llm.provider, llm.model);
            let generator: Arc<dyn TextGenerator> = Arc::new(LlmClient::new(llm.clone()));
            (
                Some(IntentClassifier::new(generator)),
                Duration::from_secs(llm.timeout_secs),
            )
        }
        None => {
            warn!("No language model credentials configured, using pattern matching only");
            (None, Duration::from_secs(config::DEFAULT_TIMEOUT_SECS))
        }
    };

    let registry = handlers::standard_registry(store.clone());
    let service = Arc::new(IntentService::new(classifier, classify_timeout, registry));
    let gateway: Arc<dyn MessagingGateway> = Arc::new(TwilioGateway::new(config.twilio.clone()));

    let mut scheduler = Scheduler::new().await?;
    scheduler::tasks::register_builtin_tasks(
        &scheduler,
        store.clone(),
        gateway.clone(),
        &config.reminders.poll_cron,
    )
    .await?;
    scheduler.start().await?;

    let state = AppState {
        service,
        store,
        gateway,
        allowed_senders: Arc::new(config.twilio.allowed_senders.clone()),
    };
    let app = whatsapp::router(state, &config.server.webhook_path);

    let listener = tokio::net::TcpListener::bind(&config.server.bind_address)
        .await
        .with_context(|| format!("Failed to bind to {}", config.server.bind_address))?;

    info!("Bot is listening on {}", config.server.bind_address);
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutdown requested");
        })
        .await
        .context("Server error")?;

    scheduler.shutdown().await?;
    Ok(())
}
