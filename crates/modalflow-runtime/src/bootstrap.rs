//! Bootstrap helpers for starting Modalflow from a single YAML config.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::info;

use modalflow_config::{load_config, ConfigError, ModalflowConfig};
use modalflow_core::intent::IntentRecognizer;
use modalflow_core::repository::TaskRepository;
use modalflow_core::strategy::standard_strategies;
use modalflow_engines::{InMemoryLendingService, LendingEngine, TextGenerationEngine};
use modalflow_nlp::{HttpLlmClient, LlmClient, LlmError, LlmNlpEngine};
use modalflow_stores::InMemoryTaskRepository;

use crate::orchestrator::{OrchestratorConfig, ProcessingOrchestrator};

/// Runtime bootstrap errors
#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("llm client error: {0}")]
    LlmClient(#[from] LlmError),
}

/// Running app bundle created from unified config
pub struct RuntimeApp {
    pub orchestrator: Arc<ProcessingOrchestrator>,
    pub repository: Arc<dyn TaskRepository>,
}

/// Assemble the runtime from an already-parsed configuration
pub fn build_runtime(config: &ModalflowConfig) -> Result<RuntimeApp, BootstrapError> {
    let api_key = config
        .nlp
        .api_key_env
        .as_ref()
        .and_then(|name| std::env::var(name).ok());

    let client: Arc<dyn LlmClient> = Arc::new(HttpLlmClient::new(
        &config.nlp.endpoint,
        api_key.as_deref(),
        Duration::from_secs(config.nlp.timeout_secs),
    )?);

    let recognizer = Arc::new(IntentRecognizer::new(Arc::new(LlmNlpEngine::new(
        Arc::clone(&client),
        config.nlp.model.clone(),
        config.nlp.temperature,
    ))));

    let lending = Arc::new(LendingEngine::new(Arc::new(
        InMemoryLendingService::with_sample_catalog(),
    )));
    let text_gen = Arc::new(TextGenerationEngine::new(
        Arc::clone(&client),
        config.nlp.model.clone(),
        config.nlp.temperature,
    ));

    let repository: Arc<dyn TaskRepository> = Arc::new(InMemoryTaskRepository::new());

    let orchestrator = Arc::new(ProcessingOrchestrator::with_config(
        vec![lending, text_gen],
        recognizer,
        standard_strategies(),
        Arc::clone(&repository),
        OrchestratorConfig {
            task_timeout: Duration::from_secs(config.runtime.task_timeout_secs),
        },
    ));

    info!(
        app = %config.app.name,
        model = %config.nlp.model,
        timeout_secs = config.runtime.task_timeout_secs,
        engine_count = orchestrator.available_engines().len(),
        "runtime assembled"
    );
    Ok(RuntimeApp {
        orchestrator,
        repository,
    })
}

/// Load the config file and assemble the runtime
pub fn build_runtime_from_file(path: &Path) -> Result<RuntimeApp, BootstrapError> {
    let config = load_config(path)?;
    build_runtime(&config)
}

/// Install the global tracing subscriber, honoring `RUST_LOG`
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();
}
