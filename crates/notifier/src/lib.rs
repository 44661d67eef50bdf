// In crates/notifier/src/lib.rs

use async_trait::async_trait;
use serde_json::json;
use tracing::{debug, error};

pub mod format;

use app_config::TelegramSettings;

/// The outbound notification sink.
///
/// Sending is best-effort: the result only says whether the message went out,
/// and a failure never propagates into the decision path.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, message: &str) -> bool;
}

/// Sends HTML-formatted messages through the Telegram bot API.
#[derive(Debug, Clone)]
pub struct TelegramNotifier {
    http_client: reqwest::Client,
    bot_token: String,
    chat_id: String,
}

impl TelegramNotifier {
    pub fn new(settings: &TelegramSettings) -> Self {
        Self {
            http_client: reqwest::Client::new(),
            bot_token: settings.bot_token.clone(),
            chat_id: settings.chat_id.clone(),
        }
    }

    /// Sends a throwaway message to verify token and chat id.
    pub async fn test_connection(&self) -> bool {
        self.send("\u{1F9EA} Test message - configuration works!")
            .await
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn send(&self, message: &str) -> bool {
        let url = format!("https://api.telegram.org/bot{}/sendMessage", self.bot_token);
        let payload = json!({
            "chat_id": self.chat_id,
            "text": message,
            "parse_mode": "HTML",
        });

        let response = match self.http_client.post(&url).json(&payload).send().await {
            Ok(response) => response,
            Err(e) => {
                error!(error = %e, "Telegram request failed");
                return false;
            }
        };

        match response.json::<serde_json::Value>().await {
            Ok(body) if body.get("ok").and_then(serde_json::Value::as_bool) == Some(true) => {
                debug!("Telegram message sent");
                true
            }
            Ok(body) => {
                let description = body
                    .get("description")
                    .and_then(serde_json::Value::as_str)
                    .unwrap_or("unknown error");
                error!(description, "Telegram rejected the message");
                false
            }
            Err(e) => {
                error!(error = %e, "Telegram response was not JSON");
                false
            }
        }
    }
}
