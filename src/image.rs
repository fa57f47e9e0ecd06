use serde::Serialize;
use tracing::debug;

use crate::chatwork::{ChatMessage, ChatworkId};
use crate::config::ImageConfig;
use crate::error::RelayError;

/// Rendering mode requested from the image service. It is the only mode
/// the relay uses.
pub const RENDER_MODE: &str = "reverseColor";

/// Query parameters understood by the image service.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ImageRequestParams {
    #[serde(rename = "type")]
    pub render_type: &'static str,
    pub name: String,
    pub id: ChatworkId,
    pub content: String,
    pub icon: String,
}

impl From<&ChatMessage> for ImageRequestParams {
    fn from(message: &ChatMessage) -> Self {
        Self {
            render_type: RENDER_MODE,
            name: message.account.name.clone(),
            id: message.account.account_id.clone(),
            content: message.body.clone(),
            icon: message.account.icon_url.clone(),
        }
    }
}

/// Image bytes as returned by the image service.
#[derive(Debug, Clone)]
pub struct GeneratedImage {
    pub bytes: Vec<u8>,
    pub content_type: &'static str,
}

impl GeneratedImage {
    pub fn png(bytes: Vec<u8>) -> Self {
        Self {
            bytes,
            content_type: "image/png",
        }
    }
}

pub struct ImageClient {
    client: reqwest::Client,
    endpoint: String,
}

impl ImageClient {
    pub fn new(client: reqwest::Client, config: &ImageConfig) -> Self {
        Self {
            client,
            endpoint: config.endpoint.clone(),
        }
    }

    pub async fn generate(&self, params: &ImageRequestParams) -> Result<GeneratedImage, RelayError> {
        debug!("Parameters for image generation: {:?}", params);

        let response = self
            .client
            .get(&self.endpoint)
            .query(params)
            .send()
            .await
            .map_err(|e| RelayError::Generation(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(RelayError::Generation(status.to_string()));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| RelayError::Generation(format!("failed to read image body: {}", e)))?;

        Ok(GeneratedImage::png(bytes.to_vec()))
    }
}
