use std::sync::Arc;

use anyhow::Context;

use onboard_chat::config::AppConfig;
use onboard_chat::knowledge::KnowledgeIndex;
use onboard_chat::llm::create_provider;
use onboard_chat::onboarding::{self, ChatSettings, OnboardingDeps, OnboardingManager};
use onboard_chat::session::MemorySessionStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = AppConfig::from_env().context("Failed to load configuration")?;

    // Missing knowledge is fatal
    let knowledge = KnowledgeIndex::load(&config.knowledge_path)
        .await
        .context("Failed to load knowledge base")?;

    let llm = create_provider(&config.llm).context("Failed to create LLM provider")?;
    let sessions = Arc::new(MemorySessionStore::new(config.session_eviction));

    let manager = Arc::new(OnboardingManager::new(OnboardingDeps {
        knowledge: Arc::new(knowledge),
        sessions,
        llm,
        settings: ChatSettings::from(&config),
    }));

    let app = onboarding::app(manager, &config.allowed_origins);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind_addr))?;
    tracing::info!(
        addr = %config.bind_addr,
        model = %config.llm.model,
        debug_mode = config.debug_mode,
        version = env!("CARGO_PKG_VERSION"),
        "Onboarding chat server started"
    );

    axum::serve(listener, app).await.context("Server error")?;
    Ok(())
}
