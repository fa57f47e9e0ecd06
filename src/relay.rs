use tracing::{info, warn};

use crate::chatwork::{ChatworkClient, ChatworkId};
use crate::command::ParsedCommand;
use crate::config::Config;
use crate::error::RelayError;
use crate::image::{ImageClient, ImageRequestParams};
use crate::webhook::WebhookEvent;

/// How a webhook event was handled when no stage failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    SkippedOwnMessage,
    NoCommand,
    MalformedCommand,
    Posted,
}

impl Outcome {
    /// Plain-text body returned to the webhook caller.
    pub fn message(&self) -> &'static str {
        match self {
            Outcome::SkippedOwnMessage => "Message from bot, skipping.",
            Outcome::NoCommand => "No /miaq/ command found.",
            Outcome::MalformedCommand => "Malformed /miaq/ command, ignoring.",
            Outcome::Posted => "Image generated and posted successfully.",
        }
    }
}

/// True when `sender` is the bot itself. Ids are compared in normalised
/// form, so `42` and `"0042"` are the same account.
pub fn is_own_message(sender: &ChatworkId, bot_account_id: &ChatworkId) -> bool {
    sender == bot_account_id
}

/// Fetch → render → upload pipeline for `/miaq/` commands.
///
/// Holds no per-event state: concurrent events share only the HTTP clients.
pub struct Relay {
    bot_account_id: ChatworkId,
    chatwork: ChatworkClient,
    images: ImageClient,
}

impl Relay {
    pub fn new(config: &Config) -> Self {
        let client = reqwest::Client::new();
        Self {
            bot_account_id: config.chatwork.bot_account_id.clone(),
            chatwork: ChatworkClient::new(client.clone(), &config.chatwork),
            images: ImageClient::new(client, &config.image),
        }
    }

    /// True when the event was posted by the bot's own account.
    pub fn is_from_bot(&self, sender: &ChatworkId) -> bool {
        is_own_message(sender, &self.bot_account_id)
    }

    /// Handle one webhook event. Every outbound call is attempted at most
    /// once and the first failure ends the pipeline.
    pub async fn handle(&self, event: &WebhookEvent) -> Result<Outcome, RelayError> {
        if self.is_from_bot(&event.account_id) {
            info!("Received message from the bot itself. Skipping response.");
            return Ok(Outcome::SkippedOwnMessage);
        }

        let target = match ParsedCommand::parse(&event.body) {
            ParsedCommand::Command(target) => target,
            ParsedCommand::NotCommand => return Ok(Outcome::NoCommand),
            ParsedCommand::Malformed => {
                warn!(
                    "Malformed /miaq/ command from account {} in room {}",
                    event.account_id, event.room_id
                );
                return Ok(Outcome::MalformedCommand);
            }
        };

        info!(
            "Command detected. Target message: room={}, message={}",
            target.room_id, target.message_id
        );

        let message = self
            .chatwork
            .get_message(&target.room_id, &target.message_id)
            .await?;

        let params = ImageRequestParams::from(&message);
        let image = self.images.generate(&params).await?;

        self.chatwork
            .upload_image(&event.room_id, &event.account_id, image)
            .await?;

        info!("Image successfully uploaded to room {}", event.room_id);
        Ok(Outcome::Posted)
    }
}
