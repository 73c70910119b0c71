//! Outbound notifications.

pub mod telegram;

use async_trait::async_trait;
use thiserror::Error;

use crate::client::ClientError;

pub use telegram::TelegramNotifier;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("telegram token or chat id is empty")]
    MissingCredentials,

    #[error("failed to send telegram request: {0}")]
    Request(#[from] ClientError),
}

/// Something that can deliver a text message.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, message: &str) -> Result<(), NotifyError>;
}
