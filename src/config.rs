use anyhow::{Context, Result};
use serde::Deserialize;
use std::fmt;
use std::path::Path;

use crate::chatwork::ChatworkId;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub chatwork: ChatworkConfig,
    #[serde(default)]
    pub image: ImageConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Deserialize, Clone)]
pub struct ChatworkConfig {
    #[serde(default)]
    pub api_token: String,
    /// The bot's own account. Messages from it never trigger the relay.
    #[serde(default)]
    pub bot_account_id: ChatworkId,
    #[serde(default = "default_api_base")]
    pub api_base: String,
    /// Base64 token from the webhook settings page. When set, inbound
    /// requests must carry a valid `X-ChatWorkWebhookSignature`.
    #[serde(default)]
    pub webhook_token: Option<String>,
}

impl Default for ChatworkConfig {
    fn default() -> Self {
        Self {
            api_token: String::new(),
            bot_account_id: ChatworkId::default(),
            api_base: default_api_base(),
            webhook_token: None,
        }
    }
}

// Tokens stay out of logs.
impl fmt::Debug for ChatworkConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChatworkConfig")
            .field("api_token", &"[REDACTED]")
            .field("bot_account_id", &self.bot_account_id)
            .field("api_base", &self.api_base)
            .field(
                "webhook_token",
                &self.webhook_token.as_ref().map(|_| "[REDACTED]"),
            )
            .finish()
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ImageConfig {
    #[serde(default = "default_image_endpoint")]
    pub endpoint: String,
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            endpoint: default_image_endpoint(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_api_base() -> String {
    "https://api.chatwork.com/v2".to_string()
}

fn default_image_endpoint() -> String {
    "https://miq-yol8.onrender.com/".to_string()
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

impl Config {
    /// Load from `path` (optional) and then the process environment.
    pub fn load(path: &Path) -> Result<Self> {
        Self::load_with_env(path, |key| std::env::var(key).ok())
    }

    /// Like [`Config::load`], with environment lookups going through `env`.
    pub fn load_with_env<F>(path: &Path, env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let content = if path.exists() {
            std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?
        } else {
            String::new()
        };

        Self::parse(&content, env)
            .with_context(|| format!("Invalid configuration (file: {})", path.display()))
    }

    /// Parse TOML `content`, apply environment overrides and validate.
    pub fn parse<F>(content: &str, env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config: Config =
            toml::from_str(content).context("Failed to parse config file")?;
        config.apply_env(env)?;
        config.validate()?;
        Ok(config)
    }

    fn apply_env<F>(&mut self, env: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| env(key).filter(|v| !v.trim().is_empty());

        if let Some(token) = var("CHATWORK_TOKEN") {
            self.chatwork.api_token = token;
        }
        if let Some(id) = var("BOT_ACCOUNT_ID") {
            self.chatwork.bot_account_id = ChatworkId::from(id);
        }
        if let Some(token) = var("CHATWORK_WEBHOOK_TOKEN") {
            self.chatwork.webhook_token = Some(token);
        }
        if let Some(port) = var("PORT") {
            self.server.port = port
                .trim()
                .parse()
                .with_context(|| format!("PORT is not a valid port number: {}", port))?;
        }

        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.chatwork.api_token.trim().is_empty() {
            anyhow::bail!("Chatwork API token is not set ([chatwork] api_token or CHATWORK_TOKEN)");
        }
        if self.chatwork.bot_account_id.is_empty() {
            anyhow::bail!(
                "Bot account id is not set ([chatwork] bot_account_id or BOT_ACCOUNT_ID)"
            );
        }
        Ok(())
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
