//! Telegram Bot API collaborator.
//!
//! The bridge core talks to Telegram only through the [`Messenger`] trait,
//! so tests substitute a fake and the translation engine never sees HTTP.
//! [`BotApi`] is the real implementation.

mod api;

pub use api::BotApi;

use async_trait::async_trait;
use thiserror::Error;

/// Errors from the remote platform.
#[derive(Debug, Error)]
pub enum TelegramError {
    /// The recipient has not granted the bot permission to message them
    /// (or has blocked it). Callers flip that identity's DM permission off.
    #[error("recipient has not allowed messages from the bot")]
    Unauthorized,

    /// Anything else: network trouble, rate limiting, malformed responses.
    /// Logged and dropped by callers.
    #[error("telegram api: {0}")]
    Transient(String),
}

/// The authenticated bot account, from `getMe`.
#[derive(Debug, Clone)]
pub struct BotProfile {
    pub id: i64,
    pub username: Option<String>,
}

/// One administrator of a group, from `getChatAdministrators`.
///
/// `username` is `None` for @-less accounts; the translator skips those.
#[derive(Debug, Clone)]
pub struct ChatAdmin {
    pub user_id: i64,
    pub username: Option<String>,
}

/// One inbound message, ready for translation.
#[derive(Debug, Clone)]
pub struct MessageEvent {
    /// Conversation id. Equal to `user_id` for a direct message, negative
    /// for a group.
    pub chat_id: i64,
    /// Sending user's id.
    pub user_id: i64,
    /// Sending user's handle, if they have one.
    pub username: Option<String>,
    /// Message text.
    pub text: String,
}

impl MessageEvent {
    /// Whether this event came from a direct conversation with the sender.
    pub fn is_direct(&self) -> bool {
        self.chat_id == self.user_id
    }

    /// Whether this event came from a group.
    pub fn is_group(&self) -> bool {
        self.chat_id < 0
    }
}

/// What the bridge needs from the remote platform.
#[async_trait]
pub trait Messenger: Send + Sync {
    /// Verify the token and identify the bot account (`getMe`).
    async fn authenticate(&self) -> Result<BotProfile, TelegramError>;

    /// Long-poll for message events (`getUpdates`). Returns the next poll
    /// offset alongside the decoded events.
    async fn poll_updates(
        &self,
        offset: i64,
        timeout_secs: u64,
    ) -> Result<(i64, Vec<MessageEvent>), TelegramError>;

    /// Enumerate a group's administrators (`getChatAdministrators`).
    async fn list_group_admins(&self, group_id: i64) -> Result<Vec<ChatAdmin>, TelegramError>;

    /// Send a message (`sendMessage`). `rich` requests MarkdownV2
    /// formatting.
    async fn send_message(&self, chat_id: i64, text: &str, rich: bool)
        -> Result<(), TelegramError>;
}
