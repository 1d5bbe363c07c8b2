//! sigil-server - HTTP front end for the chat relay

mod config;
mod emit;
mod routes;

use anyhow::Context;
use clap::Parser;
use config::Config;
use routes::AppState;
use sigil_ai::AnthropicBackend;
use sigil_relay::HttpImageResolver;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// sigil - streaming chat relay
#[derive(Parser, Debug)]
#[command(name = "sigil-server")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to a TOML config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Address to bind (overrides config)
    #[arg(long)]
    host: Option<String>,

    /// Port to bind (overrides config)
    #[arg(short, long)]
    port: Option<u16>,

    /// Backend model identifier (overrides config)
    #[arg(short, long)]
    model: Option<String>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let default_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    let mut config = Config::load(args.config.as_deref()).context("failed to load config")?;
    if let Some(host) = args.host {
        config.host = host;
    }
    if let Some(port) = args.port {
        config.port = port;
    }
    if let Some(model) = args.model {
        config.model = model;
    }

    let backend = match &config.api_key {
        Some(key) => AnthropicBackend::new(key),
        None => AnthropicBackend::from_env()
            .context("no api_key in config and ANTHROPIC_API_KEY is unset")?,
    };
    let backend = match &config.base_url {
        Some(base_url) => backend.with_base_url(base_url),
        None => backend,
    };

    let state = AppState {
        backend: Arc::new(backend),
        resolver: Arc::new(HttpImageResolver::new()),
        model: config.model.clone(),
    };

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    tracing::info!(model = %config.model, "listening on {}", addr);

    axum::serve(listener, routes::router(state)).await?;
    Ok(())
}
