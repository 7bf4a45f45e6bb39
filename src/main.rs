use std::sync::Arc;

use trip_crew::api::job_routes;
use trip_crew::config::{ExecutorConfig, ServerConfig};
use trip_crew::jobs::{JobExecutor, LogSink, RequestGateway, ResultStore, spawn_eviction_task};
use trip_crew::research::{
    LlmConfig, SearchConfig, SerperSearch, TavilySearch, TripCrew, create_backend,
};

#[tokio::main]
async fn main() -> trip_crew::error::Result<()> {
    // Install rustls crypto provider before any TLS usage
    let _ = rustls::crypto::ring::default_provider().install_default();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let server_config = ServerConfig::from_env();
    let executor_config = ExecutorConfig::from_env();
    let llm_config = LlmConfig::from_env().unwrap_or_else(|e| {
        eprintln!("Error: {e}");
        eprintln!("  export ANTHROPIC_API_KEY=sk-ant-...  (or TRIP_CREW_LLM_BACKEND=openai|groq + its API key)");
        std::process::exit(1);
    });

    eprintln!("🧭 trip-crew v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Model: {} ({:?})", llm_config.model, llm_config.backend);
    eprintln!("   API: http://{}", server_config.addr());
    eprintln!(
        "   Workers: {} (queue {}, timeout {:?})",
        executor_config.workers, executor_config.queue_capacity, executor_config.job_timeout
    );

    // ── Research crew ───────────────────────────────────────────────────
    let llm = create_backend(&llm_config)?;
    let mut crew = TripCrew::new(llm);
    let mut providers = Vec::new();
    if let Some(search_config) = SearchConfig::tavily_from_env() {
        crew = crew.with_search(Arc::new(TavilySearch::new(search_config)?));
        providers.push("Tavily");
    }
    if let Some(search_config) = SearchConfig::serper_from_env() {
        crew = crew.with_search(Arc::new(SerperSearch::new(search_config)?));
        providers.push("Serper");
    }
    if providers.is_empty() {
        eprintln!("   Web search: disabled (set TAVILY_API_KEY and/or SERPER_API_KEY)");
    } else {
        eprintln!("   Web search: {}", providers.join(" + "));
    }

    // ── Job core ────────────────────────────────────────────────────────
    let store = ResultStore::new();
    let sink = LogSink::with_capacity(executor_config.log_capacity);
    let executor = JobExecutor::new(&executor_config, Arc::clone(&store), Arc::clone(&sink));

    if let Some(ttl) = executor_config.result_ttl {
        let _eviction_handle = spawn_eviction_task(Arc::clone(&store), ttl);
        eprintln!("   Result TTL: {:?}", ttl);
    }

    let gateway = RequestGateway::new(Arc::clone(&executor), store, sink, Arc::new(crew));

    // ── HTTP ────────────────────────────────────────────────────────────
    let app = job_routes(gateway, server_config.allowed_origin.as_deref());
    let listener = tokio::net::TcpListener::bind(server_config.addr()).await?;
    tracing::info!(addr = %server_config.addr(), "HTTP server started");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Shutdown signal received");
        })
        .await?;

    executor.shutdown().await;
    Ok(())
}
