//! chatlens application binary - composition root.
//!
//! 1. Load configuration from TOML
//! 2. Open the SQLite record store
//! 3. Build the generation client and the ingestion pipeline
//! 4. Connect the Telegram transport and start polling
//! 5. On Ctrl-C, stop polling, drain in-flight events and close the store

mod cli;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use secrecy::Secret;

use chatlens_core::config::ChatlensConfig;
use chatlens_generation::GeminiClient;
use chatlens_pipeline::{AppContext, ConversationDispatcher, IngestionPipeline};
use chatlens_storage::{Database, RecordStore, SqliteRecordStore};
use chatlens_telegram::TelegramTransport;

use cli::CliArgs;

fn secret_from_env(var: &str) -> anyhow::Result<Secret<String>> {
    let value = std::env::var(var).with_context(|| format!("environment variable {var} is not set"))?;
    if value.trim().is_empty() {
        anyhow::bail!("environment variable {var} is empty");
    }
    Ok(Secret::new(value))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = CliArgs::parse();

    // Config. A missing file means defaults; a malformed one is fatal.
    let config_file = args.resolve_config_path();
    let mut config = if config_file.exists() {
        ChatlensConfig::load(&config_file)
            .with_context(|| format!("invalid config file {}", config_file.display()))?
    } else {
        ChatlensConfig::default()
    };
    if let Some(dir) = args.resolve_data_dir() {
        config.general.data_dir = dir;
    }

    // Tracing.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_new(args.resolve_log_filter(&config.general.log_level))
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    tracing::info!("Starting chatlens v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!(path = %config_file.display(), exists = config_file.exists(), "Configuration resolved");
    config.validate()?;

    // Storage.
    let db_path = config.database_path();
    let db = Database::new(
        &db_path,
        config.storage.pool_size,
        Duration::from_millis(config.storage.busy_timeout_ms),
    )?;
    let store = Arc::new(SqliteRecordStore::new(Arc::new(db)));
    let stats = store.stats().await?;
    tracing::info!(
        path = %db_path.display(),
        users = stats.users,
        turns = stats.turns,
        attachments = stats.attachments,
        size_bytes = stats.db_size_bytes,
        "Record store opened"
    );

    // Generation.
    let api_key = secret_from_env(&config.generation.api_key_env)?;
    let gemini = GeminiClient::from_config(&config.generation, api_key);
    tracing::info!(model = gemini.model(), timeout_secs = config.generation.timeout_secs, "Generation client ready");

    // Transport.
    let token = secret_from_env(&config.telegram.token_env)?;
    let transport = TelegramTransport::connect(token, &config.telegram)
        .await
        .context("failed to connect to Telegram")?;

    // Pipeline.
    let idle = Duration::from_secs(config.pipeline.dispatcher_idle_secs);
    let ctx = Arc::new(AppContext::new(config, store, Arc::new(gemini))?);
    tracing::info!(path = %ctx.analytics.output_path().display(), "Dashboard output");
    let pipeline = Arc::new(IngestionPipeline::new(
        Arc::clone(&ctx),
        Arc::new(transport.media_source()),
    ));
    let dispatcher = Arc::new(ConversationDispatcher::new(
        pipeline,
        Arc::new(transport.outbound()),
        idle,
    ));

    let (cancel, poller) = transport.start_polling(Arc::clone(&dispatcher));
    tracing::info!("chatlens is running, press Ctrl-C to stop");

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for Ctrl-C")?;
    tracing::info!("Shutdown requested");

    cancel.cancel();
    if let Err(e) = poller.await {
        tracing::warn!(error = %e, "Polling task ended abnormally");
    }
    dispatcher.shutdown().await;
    ctx.shutdown().await;
    tracing::info!("chatlens stopped");

    Ok(())
}
