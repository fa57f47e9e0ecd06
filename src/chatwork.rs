use std::fmt;

use reqwest::multipart::{Form, Part};
use serde::{Deserialize, Deserializer, Serialize};
use tracing::debug;

use crate::config::ChatworkConfig;
use crate::error::RelayError;
use crate::image::GeneratedImage;

const TOKEN_HEADER: &str = "X-ChatWorkToken";

/// Filename the rendered image is uploaded under.
pub const UPLOAD_FILENAME: &str = "miaq_generated.png";

/// A Chatwork account or room id.
///
/// Chatwork sends ids as JSON numbers, but config files and hand-written
/// payloads often carry them as strings, so both are accepted. Comparisons
/// go through [`ChatworkId::normalized`].
#[derive(Debug, Clone, Default, Serialize)]
#[serde(transparent)]
pub struct ChatworkId(String);

impl ChatworkId {
    /// Trimmed, without leading zeros. An all-zero id normalises to `"0"`.
    pub fn normalized(&self) -> &str {
        let trimmed = self.0.trim();
        let stripped = trimmed.trim_start_matches('0');
        if stripped.is_empty() && !trimmed.is_empty() {
            "0"
        } else {
            stripped
        }
    }

    pub fn is_empty(&self) -> bool {
        self.normalized().is_empty()
    }
}

impl PartialEq for ChatworkId {
    fn eq(&self, other: &Self) -> bool {
        self.normalized() == other.normalized()
    }
}

impl Eq for ChatworkId {}

// Outbound text and URLs carry the id as received; only comparisons normalise.
impl fmt::Display for ChatworkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0.trim())
    }
}

impl From<&str> for ChatworkId {
    fn from(value: &str) -> Self {
        ChatworkId(value.to_string())
    }
}

impl From<String> for ChatworkId {
    fn from(value: String) -> Self {
        ChatworkId(value)
    }
}

impl From<u64> for ChatworkId {
    fn from(value: u64) -> Self {
        ChatworkId(value.to_string())
    }
}

impl<'de> Deserialize<'de> for ChatworkId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawId {
            Number(u64),
            Text(String),
        }

        Ok(match RawId::deserialize(deserializer)? {
            RawId::Number(n) => ChatworkId::from(n),
            RawId::Text(s) => ChatworkId::from(s),
        })
    }
}

/// Author of a Chatwork message.
#[derive(Debug, Clone, Deserialize)]
pub struct Account {
    pub account_id: ChatworkId,
    pub name: String,
    pub icon_url: String,
}

/// A message as returned by `GET /rooms/{room_id}/messages/{message_id}`.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatMessage {
    pub account: Account,
    pub body: String,
}

/// Text posted alongside the uploaded image, addressed to `to`.
pub fn attribution_message(to: &ChatworkId) -> String {
    format!("[To:{}] あなたの投稿を画像にしました。", to)
}

pub struct ChatworkClient {
    client: reqwest::Client,
    api_base: String,
    api_token: String,
}

impl ChatworkClient {
    pub fn new(client: reqwest::Client, config: &ChatworkConfig) -> Self {
        Self {
            client,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            api_token: config.api_token.clone(),
        }
    }

    /// Read a single message. Any non-success status is reported with the
    /// platform's status text.
    pub async fn get_message(
        &self,
        room_id: &str,
        message_id: &str,
    ) -> Result<ChatMessage, RelayError> {
        let url = format!("{}/rooms/{}/messages/{}", self.api_base, room_id, message_id);

        debug!("Fetching Chatwork message: {}", url);

        let response = self
            .client
            .get(&url)
            .header(TOKEN_HEADER, &self.api_token)
            .send()
            .await
            .map_err(|e| RelayError::Fetch(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(RelayError::Fetch(status.to_string()));
        }

        response
            .json()
            .await
            .map_err(|e| RelayError::Fetch(format!("invalid message payload: {}", e)))
    }

    /// Post `image` into `room_id` as a file, with an attribution note
    /// addressed to `to`.
    pub async fn upload_image(
        &self,
        room_id: &ChatworkId,
        to: &ChatworkId,
        image: GeneratedImage,
    ) -> Result<(), RelayError> {
        let url = format!("{}/rooms/{}/files", self.api_base, room_id);

        let file_part = Part::bytes(image.bytes)
            .file_name(UPLOAD_FILENAME)
            .mime_str(image.content_type)
            .map_err(|e| RelayError::Upload(format!("failed to create file part: {}", e)))?;

        let form = Form::new()
            .part("file", file_part)
            .text("message", attribution_message(to));

        let response = self
            .client
            .post(&url)
            .header(TOKEN_HEADER, &self.api_token)
            .multipart(form)
            .send()
            .await
            .map_err(|e| RelayError::Upload(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(RelayError::Upload(format!(
                "{} {}",
                status.as_u16(),
                error_body
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_string_contains, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> ChatworkClient {
        let config = ChatworkConfig {
            api_token: "cw-test-token".to_string(),
            bot_account_id: ChatworkId::from(1u64),
            api_base: server.uri(),
            webhook_token: None,
        };
        ChatworkClient::new(reqwest::Client::new(), &config)
    }

    #[test]
    fn test_id_accepts_number_and_string() {
        let a: ChatworkId = serde_json::from_str("12345").unwrap();
        let b: ChatworkId = serde_json::from_str("\"12345\"").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_id_normalizes_leading_zeros_and_whitespace() {
        assert_eq!(ChatworkId::from(" 00042 ").normalized(), "42");
        assert_eq!(ChatworkId::from("000").normalized(), "0");
        assert_eq!(ChatworkId::from(42u64), ChatworkId::from("0042"));
        assert_ne!(ChatworkId::from("42"), ChatworkId::from("420"));
    }

    #[test]
    fn test_empty_id() {
        assert!(ChatworkId::from("  ").is_empty());
        assert!(!ChatworkId::from("0").is_empty());
    }

    #[test]
    fn test_attribution_mentions_recipient() {
        let msg = attribution_message(&ChatworkId::from(777u64));
        assert!(msg.starts_with("[To:777] "));
    }

    #[test]
    fn test_attribution_keeps_sender_id_as_received() {
        let msg = attribution_message(&ChatworkId::from("0042"));
        assert!(msg.starts_with("[To:0042] "), "{msg}");
    }

    #[tokio::test]
    async fn test_get_message_success() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/rooms/111/messages/222"))
            .and(header("X-ChatWorkToken", "cw-test-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "message_id": "222",
                "account": {
                    "account_id": 555,
                    "name": "Alice",
                    "avatar_image_url": "ignored",
                    "icon_url": "https://example.com/alice.png"
                },
                "body": "hello world",
                "send_time": 1700000000
            })))
            .expect(1)
            .mount(&server)
            .await;

        let msg = client_for(&server)
            .get_message("111", "222")
            .await
            .unwrap();

        assert_eq!(msg.account.name, "Alice");
        assert_eq!(msg.account.account_id, ChatworkId::from(555u64));
        assert_eq!(msg.account.icon_url, "https://example.com/alice.png");
        assert_eq!(msg.body, "hello world");
    }

    #[tokio::test]
    async fn test_get_message_error_carries_status_text() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/rooms/111/messages/222"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .get_message("111", "222")
            .await
            .unwrap_err();

        assert!(matches!(err, RelayError::Fetch(ref s) if s.contains("Not Found")), "{err:?}");
    }

    #[tokio::test]
    async fn test_get_message_missing_fields_is_fetch_error() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({ "body": "x" })),
            )
            .mount(&server)
            .await;

        let err = client_for(&server)
            .get_message("1", "2")
            .await
            .unwrap_err();

        assert_eq!(err.stage(), "fetch");
    }

    #[tokio::test]
    async fn test_upload_sends_file_and_attribution() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/rooms/999/files"))
            .and(header("X-ChatWorkToken", "cw-test-token"))
            .and(body_string_contains("filename=\"miaq_generated.png\""))
            .and(body_string_contains("image/png"))
            .and(body_string_contains("[To:42]"))
            .and(body_string_contains("PNGDATA"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "file_id": 1
            })))
            .expect(1)
            .mount(&server)
            .await;

        let result = client_for(&server)
            .upload_image(
                &ChatworkId::from(999u64),
                &ChatworkId::from(42u64),
                GeneratedImage::png(b"PNGDATA".to_vec()),
            )
            .await;

        assert!(result.is_ok(), "{result:?}");
    }

    #[tokio::test]
    async fn test_upload_error_carries_status_and_body() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/rooms/999/files"))
            .respond_with(ResponseTemplate::new(403).set_body_string("no permission"))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .upload_image(
                &ChatworkId::from(999u64),
                &ChatworkId::from(42u64),
                GeneratedImage::png(b"PNGDATA".to_vec()),
            )
            .await
            .unwrap_err();

        assert!(
            matches!(err, RelayError::Upload(ref s) if s == "403 no permission"),
            "{err:?}"
        );
    }
}
