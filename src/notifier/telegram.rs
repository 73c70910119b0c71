//! Telegram Bot API notifier.

use async_trait::async_trait;
use reqwest::Method;
use serde::Serialize;

use crate::client::{CallContext, HttpClient};
use crate::config::TelegramConfig;
use crate::notifier::{Notifier, NotifyError};

pub const TELEGRAM_API_URL: &str = "https://api.telegram.org";

#[derive(Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
}

#[derive(Debug, Clone)]
pub struct TelegramNotifier {
    token: String,
    chat_id: String,
    client: HttpClient,
    base_url: String,
}

impl TelegramNotifier {
    pub fn new(client: HttpClient, token: impl Into<String>, chat_id: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            chat_id: chat_id.into(),
            client,
            base_url: TELEGRAM_API_URL.to_string(),
        }
    }

    pub fn from_config(client: HttpClient, config: &TelegramConfig) -> Self {
        Self::new(client, config.token.clone(), config.chat_id.clone())
    }

    /// Point at another Bot API host (a local mock, a proxy).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn chat_id(&self) -> &str {
        &self.chat_id
    }

    fn send_message_url(&self) -> String {
        format!("{}/bot{}/sendMessage", self.base_url, self.token)
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn send(&self, message: &str) -> Result<(), NotifyError> {
        if self.token.is_empty() || self.chat_id.is_empty() {
            return Err(NotifyError::MissingCredentials);
        }

        let payload = SendMessage {
            chat_id: &self.chat_id,
            text: message,
        };
        self.client
            .request_bytes(
                &CallContext::background(),
                Method::POST,
                &self.send_message_url(),
                &payload,
                Vec::<(&str, &str)>::new(),
            )
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new() {
        let n = TelegramNotifier::new(HttpClient::new(), "bot-token", "chat-123");
        assert_eq!(n.token(), "bot-token");
        assert_eq!(n.chat_id(), "chat-123");
        assert_eq!(
            n.send_message_url(),
            "https://api.telegram.org/botbot-token/sendMessage"
        );
    }

    #[test]
    fn test_base_url_trailing_slash() {
        let n = TelegramNotifier::new(HttpClient::new(), "t", "c").with_base_url("http://127.0.0.1:9/");
        assert_eq!(n.send_message_url(), "http://127.0.0.1:9/bott/sendMessage");
    }

    #[tokio::test]
    async fn test_empty_token() {
        let n = TelegramNotifier::new(HttpClient::new(), "", "chat-123");
        assert!(matches!(n.send("test").await, Err(NotifyError::MissingCredentials)));
    }

    #[tokio::test]
    async fn test_empty_chat_id() {
        let n = TelegramNotifier::new(HttpClient::new(), "token", "");
        assert!(matches!(n.send("test").await, Err(NotifyError::MissingCredentials)));
    }

    #[test]
    fn test_is_object_safe() {
        let n: Box<dyn Notifier> = Box::new(TelegramNotifier::new(HttpClient::new(), "t", "c"));
        drop(n);
    }
}
