//! Reasoner - plan / execute / reflect question answering service.

use std::sync::Arc;
use std::time::Duration;

use reasoner_controller::ReflectionControllerBuilder;
use reasoner_core::{config::AppConfig, Capability, LlmClient, Retriever, RetryPolicy};
use reasoner_gateway::{GatewayServer, ReasonerService};
use reasoner_skills::{
    DeduceExecutor, ExecutorRegistry, MathExecutor, OutputExecutor, RetrievalExecutor,
};
use reasoner_store::{HttpRetriever, InMemoryRetriever};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let (config, config_error) = match AppConfig::load() {
        Ok(config) => (config, None),
        Err(e) => (AppConfig::default(), Some(e)),
    };

    reasoner_telemetry::configure_tracing(&config.logging)?;
    if let Some(e) = config_error {
        tracing::warn!(error = %e, "Failed to load configuration, using defaults");
    }

    tracing::info!("Starting Reasoner v{}", env!("CARGO_PKG_VERSION"));

    let metrics_handle = reasoner_telemetry::setup_metrics_recorder()?;
    let retry = RetryPolicy::from(config.retry.clone());

    // =========================================================================
    // Backends
    // =========================================================================
    if config.llm.api_key.is_none() {
        tracing::warn!(base_url = %config.llm.base_url, "No LLM API key configured");
    }
    let llm: Arc<dyn LlmClient> =
        Arc::new(reasoner_model_gateway::create_client_from_config(&config.llm)?);

    let retriever: Arc<dyn Retriever> = match (&config.retrieval.endpoint, &config.retrieval.corpus_path) {
        (Some(endpoint), _) => {
            tracing::info!(endpoint = %endpoint, "Using HTTP retrieval service");
            Arc::new(HttpRetriever::new(
                endpoint.clone(),
                Duration::from_secs(config.llm.timeout_secs.max(1)),
            )?)
        }
        (None, Some(path)) => {
            let corpus = InMemoryRetriever::from_json_file(path).await?;
            tracing::info!(path = %path, documents = corpus.len(), "Loaded retrieval corpus");
            Arc::new(corpus)
        }
        (None, None) => {
            tracing::warn!("No retrieval backend configured, retrieval tasks will find nothing");
            Arc::new(InMemoryRetriever::new())
        }
    };

    // =========================================================================
    // Executors & Controller
    // =========================================================================
    let registry = Arc::new(
        ExecutorRegistry::builder()
            .with_executor(Arc::new(
                RetrievalExecutor::new(retriever, config.retrieval.top_k).with_retry(retry),
            ))
            .with_executor(Arc::new(DeduceExecutor::new(llm.clone()).with_retry(retry)))
            .with_executor(Arc::new(MathExecutor::new()))
            .with_executor(Arc::new(OutputExecutor::new()))
            .require(Capability::ALL)
            .build()?,
    );
    tracing::info!(capabilities = registry.len(), "Executor registry initialized");

    let controller = ReflectionControllerBuilder::new()
        .with_llm(llm)
        .with_registry(registry)
        .with_config(config.controller.clone())
        .with_retry(retry)
        .build()?;
    tracing::info!(
        max_reflect_time = config.controller.max_reflect_time,
        strictness = ?config.controller.strictness,
        "Controller initialized"
    );

    // =========================================================================
    // Service & HTTP
    // =========================================================================
    let service = Arc::new(ReasonerService::new(Arc::new(controller), &config.service));
    let janitor = service.spawn_janitor();

    let server =
        GatewayServer::new(config.server.clone(), service.clone()).with_metrics(metrics_handle);
    tracing::info!(
        host = %config.server.host,
        port = config.server.port,
        "Gateway initialized"
    );

    server.run().await?;
    service.shutdown();
    janitor.abort();

    tracing::info!("Reasoner stopped");
    Ok(())
}
