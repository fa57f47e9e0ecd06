mod chatwork;
mod command;
mod config;
mod error;
mod image;
mod relay;
mod signature;
mod webhook;

use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;
use crate::relay::Relay;
use crate::signature::WebhookVerifier;
use crate::webhook::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,miaqbot=debug".into()),
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

    let verifier = config
        .chatwork
        .webhook_token
        .as_deref()
        .map(WebhookVerifier::from_token)
        .transpose()
        .context("Invalid [chatwork] webhook_token")?;

    info!("Configuration loaded successfully");
    info!("  Bot account: {}", config.chatwork.bot_account_id);
    info!("  Chatwork API: {}", config.chatwork.api_base);
    info!("  Image service: {}", config.image.endpoint);
    info!(
        "  Signature verification: {}",
        if verifier.is_some() { "enabled" } else { "disabled" }
    );

    let state = AppState::new(Relay::new(&config), verifier);

    info!("Bot is starting...");
    webhook::run(state, &config.listen_addr()).await?;

    Ok(())
}
