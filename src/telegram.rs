//! Telegram provider adapter: webhook envelope types and the outbound
//! sendMessage call.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::warn;

/// A Telegram webhook update. Only `message` updates are handled; everything
/// else (edits, channel posts, callbacks) is acknowledged and dropped.
#[derive(Debug, Deserialize)]
pub struct TelegramUpdate {
    pub message: Option<TelegramMessage>,
}

#[derive(Debug, Deserialize)]
pub struct TelegramMessage {
    pub chat: TelegramChat,
    /// Absent for media-only messages.
    pub text: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TelegramChat {
    pub id: i64,
}

/// Minimal Telegram Bot API client: this bot only ever sends text replies.
pub struct TelegramApi {
    token: String,
    client: reqwest::Client,
}

#[derive(Serialize)]
struct SendMessageRequest<'a> {
    chat_id: i64,
    text: &'a str,
}

impl TelegramApi {
    pub fn new(token: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .expect("Failed to build HTTP client");

        Self { token, client }
    }

    pub async fn send_message(&self, chat_id: i64, text: &str) -> Result<(), String> {
        let url = format!("https://api.telegram.org/bot{}/sendMessage", self.token);

        let response = self
            .client
            .post(&url)
            .json(&SendMessageRequest { chat_id, text })
            .send()
            .await
            .map_err(|e| {
                let msg = format!("Failed to send: {e}");
                warn!("{}", msg);
                msg
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(format!("Telegram API error {status}: {body}"));
        }

        Ok(())
    }
}
