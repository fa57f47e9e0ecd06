//! miaqbot setup wizard.
//!
//! Prompts for the Chatwork credentials and server port in the terminal and
//! writes `config.toml` into `MIAQBOT_ROOT` (default: the current directory).

use anyhow::{Context, Result};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

// ── Config formatting ──────────────────────────────────────────────────────────

struct ConfigParams<'a> {
    api_token: &'a str,
    bot_account_id: &'a str,
    webhook_token: &'a str,
    port: &'a str,
}

/// Produces a valid config.toml string. Extracted so it can be unit-tested.
fn format_config(p: &ConfigParams<'_>) -> String {
    let webhook_line = if p.webhook_token.is_empty() {
        "# webhook_token = \"<token from the webhook settings page>\"".to_owned()
    } else {
        format!("webhook_token = \"{}\"", p.webhook_token)
    };

    let api_token = p.api_token;
    let bot_account_id = p.bot_account_id.trim();
    let port = p.port;

    format!(
        r#"[chatwork]
api_token = "{api_token}"
bot_account_id = "{bot_account_id}"
{webhook_line}

[image]
endpoint = "https://miq-yol8.onrender.com/"

[server]
host = "0.0.0.0"
port = {port}
"#
    )
}

fn validate_port(port: &str) -> Result<()> {
    port.parse::<u16>()
        .map(|_| ())
        .with_context(|| format!("Not a valid port number: {port}"))
}

// ── CLI mode ───────────────────────────────────────────────────────────────────

fn run_cli(project_root: &Path) -> Result<()> {
    println!("=== miaqbot Setup ===\n");

    let read_line = |prompt: &str| -> Result<String> {
        print!("{prompt}");
        io::stdout().flush()?;
        let mut buf = String::new();
        io::stdin().read_line(&mut buf)?;
        Ok(buf.trim().to_owned())
    };

    let or_default = |s: String, default: &str| {
        if s.is_empty() {
            default.to_owned()
        } else {
            s
        }
    };

    let api_token = read_line("Chatwork API token: ")?;
    let bot_account_id = read_line("Bot account ID: ")?;
    let webhook_token = read_line("Webhook token (optional): ")?;
    let port = or_default(read_line("Port [3000]: ")?, "3000");
    validate_port(&port)?;

    let config = format_config(&ConfigParams {
        api_token: &api_token,
        bot_account_id: &bot_account_id,
        webhook_token: &webhook_token,
        port: &port,
    });

    let config_path = project_root.join("config.toml");
    std::fs::write(&config_path, &config)
        .with_context(|| format!("Could not write {}", config_path.display()))?;

    println!("\n✓  config.toml saved to {}", config_path.display());
    println!("   Run the bot with:  cargo run");
    Ok(())
}

// ── Entry point ────────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    // Resolve project root: prefer MIAQBOT_ROOT env, fall back to cwd.
    let project_root =
        PathBuf::from(std::env::var("MIAQBOT_ROOT").unwrap_or_else(|_| ".".to_string()));

    run_cli(&project_root)
}

// ── Tests ──────────────────────────────────────────────────────────────────────
