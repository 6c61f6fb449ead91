//! Entrypoint: loads configuration, initializes logging and the database,
//! wires the core components, and serves the HTTP surface (spec.md §6).
//!
//! Adapted from `plugins/logging.rs`'s tracing setup: a server writes
//! structured logs to stdout under a process supervisor rather than to a
//! rolling file in a desktop log directory.

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use switchboard::agent::handler_registry::ExecutorDeps;
use switchboard::agent::HandlerRegistry;
use switchboard::cache::PermissionCache;
use switchboard::config;
use switchboard::db;
use switchboard::http::{build_router, AppState};
use switchboard::llm::LLMClientManager;
use switchboard::memory::ConversationMemory;
use switchboard::orchestrator::ChatOrchestrator;
use switchboard::tools::ToolRegistry;

#[derive(Parser, Debug)]
#[command(name = "switchboard-server")]
struct Cli {
    /// Path to a TOML configuration file. Falls back to `SWITCHBOARD_CONFIG`
    /// or `./switchboard.toml` when not given.
    #[arg(long)]
    config: Option<String>,
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init()
        .ok();
    tracing_log::LogTracer::init().ok();
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "switchboard starting");
}

#[tokio::main]
async fn main() -> ExitCode {
    init_logging();
    let cli = Cli::parse();

    let config = match cli.config {
        Some(path) => config::load_config(std::path::Path::new(&path)),
        None => config::load_default_config(),
    };
    let config = match config {
        Ok(config) => Arc::new(config),
        Err(e) => {
            tracing::error!(error = %e, "failed to load configuration");
            return ExitCode::from(1);
        }
    };

    let pool = match db::init(&config.store.database_url) {
        Ok(pool) => pool,
        Err(db::DbError::Migration(e)) => {
            tracing::error!(error = %e, "database migration failed");
            return ExitCode::from(2);
        }
        Err(e) => {
            tracing::error!(error = %e, "database initialization failed");
            return ExitCode::from(1);
        }
    };

    let llm_manager = Arc::new(LLMClientManager::new(pool.clone(), config.security.encryption_key.clone()));
    let tool_registry = Arc::new(ToolRegistry::new(
        pool.clone(),
        config.limits.tool_priority_limit,
        config.tools.rag_endpoint.clone(),
    ));
    let memory = Arc::new(ConversationMemory::new(pool.clone()));
    let permission_cache = Arc::new(PermissionCache::new(config.limits.permission_cache_ttl_secs));
    let handler_registry = Arc::new(HandlerRegistry::new());

    let executor_deps = Arc::new(ExecutorDeps {
        llm_manager: llm_manager.clone(),
        tool_registry,
        memory: memory.clone(),
        permission_cache: permission_cache.clone(),
        config: config.clone(),
    });

    let orchestrator = Arc::new(ChatOrchestrator::new(
        pool.clone(),
        config.clone(),
        handler_registry,
        executor_deps,
        memory,
        llm_manager,
    ));

    let state = AppState { orchestrator, config: config.clone(), pool, permission_cache };
    let app = build_router(state);

    let listener = match tokio::net::TcpListener::bind(&config.http.listen_addr).await {
        Ok(l) => l,
        Err(e) => {
            tracing::error!(error = %e, addr = %config.http.listen_addr, "failed to bind listener");
            return ExitCode::from(1);
        }
    };
    tracing::info!(addr = %config.http.listen_addr, "listening");

    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!(error = %e, "server error");
        return ExitCode::from(1);
    }

    ExitCode::SUCCESS
}
