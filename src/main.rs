use std::sync::Arc;

use anyhow::Context as _;
use tracing_subscriber::EnvFilter;

use companion::chat::ChatEngine;
use companion::cli::{Repl, spawn_stdin_reader};
use companion::config::{AppConfig, StorageLocation};
use companion::context::SessionContext;
use companion::llm::create_service;
use companion::store::{LibSqlStore, MemoryStore, Store};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::from_env()?;

    // Stdout belongs to the REPL, so logs go to a daily file.
    std::fs::create_dir_all(&config.log_dir)
        .with_context(|| format!("creating log directory {}", config.log_dir.display()))?;
    let file_appender = tracing_appender::rolling::daily(&config.log_dir, "companion.log");
    let (writer, _guard) = tracing_appender::non_blocking(file_appender);
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_ansi(false)
        .with_writer(writer)
        .init();

    // ── Store ────────────────────────────────────────────────────────────
    let store: Arc<dyn Store> = match &config.storage {
        StorageLocation::Memory => Arc::new(MemoryStore::new()),
        StorageLocation::File(path) => Arc::new(
            LibSqlStore::new_local(path)
                .await
                .with_context(|| format!("opening database at {}", path.display()))?,
        ),
    };
    let context = SessionContext::restore(store).await?;

    // ── Chat engine ──────────────────────────────────────────────────────
    let responder = create_service(&config.responder)?;
    tracing::info!(
        responder = responder.name(),
        sessions = context.sessions().await.len(),
        "Starting companion v{}",
        env!("CARGO_PKG_VERSION")
    );
    let engine = ChatEngine::new(config.chat.clone(), context.clone(), responder);

    eprintln!("Type a message and press Enter. /help for commands, /quit to exit.");
    let mut repl = Repl::new(engine, context, std::io::stdout());
    repl.run(spawn_stdin_reader()).await?;

    tracing::info!("Shutting down");
    Ok(())
}
