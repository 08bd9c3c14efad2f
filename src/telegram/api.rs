//! Bot API client over HTTPS.
//!
//! Thin wrapper around the four methods the bridge uses: `getMe`,
//! `getUpdates` (long poll), `getChatAdministrators`, `sendMessage`.

use super::{BotProfile, ChatAdmin, MessageEvent, Messenger, TelegramError};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::json;
use std::time::Duration;
use tracing::debug;

const API_BASE: &str = "https://api.telegram.org";

/// Extra headroom on the HTTP timeout over the long-poll timeout, so the
/// server side always wins the race.
const POLL_TIMEOUT_SLACK_SECS: u64 = 10;

/// Standard response envelope: `{ok, result, description, error_code}`.
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    error_code: Option<i64>,
    result: Option<T>,
}

#[derive(Debug, Deserialize)]
struct TgUser {
    id: i64,
    #[serde(default)]
    username: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TgChat {
    id: i64,
}

#[derive(Debug, Deserialize)]
struct TgMessage {
    chat: TgChat,
    #[serde(default)]
    from: Option<TgUser>,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TgUpdate {
    update_id: i64,
    #[serde(default)]
    message: Option<TgMessage>,
}

#[derive(Debug, Deserialize)]
struct TgChatMember {
    user: TgUser,
}

/// Reqwest-backed [`Messenger`] implementation.
pub struct BotApi {
    client: Client,
    base: String,
}

impl BotApi {
    /// Create a client for the given bot token.
    pub fn new(token: &str) -> Self {
        Self {
            client: Client::new(),
            base: format!("{API_BASE}/bot{token}"),
        }
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        params: serde_json::Value,
        timeout: Duration,
    ) -> Result<T, TelegramError> {
        let url = format!("{}/{}", self.base, method);
        let response = self
            .client
            .post(&url)
            .timeout(timeout)
            .json(&params)
            .send()
            .await
            .map_err(|e| TelegramError::Transient(format!("{method}: {e}")))?;

        if response.status() == StatusCode::FORBIDDEN {
            return Err(TelegramError::Unauthorized);
        }

        let envelope: Envelope<T> = response
            .json()
            .await
            .map_err(|e| TelegramError::Transient(format!("{method}: {e}")))?;

        if !envelope.ok {
            if envelope.error_code == Some(403) {
                return Err(TelegramError::Unauthorized);
            }
            return Err(TelegramError::Transient(format!(
                "{method}: {}",
                envelope.description.unwrap_or_else(|| "unknown error".to_string())
            )));
        }

        envelope
            .result
            .ok_or_else(|| TelegramError::Transient(format!("{method}: missing result")))
    }
}

#[async_trait]
impl Messenger for BotApi {
    async fn authenticate(&self) -> Result<BotProfile, TelegramError> {
        let me: TgUser = self
            .call("getMe", json!({}), Duration::from_secs(30))
            .await?;
        Ok(BotProfile {
            id: me.id,
            username: me.username,
        })
    }

    async fn poll_updates(
        &self,
        offset: i64,
        timeout_secs: u64,
    ) -> Result<(i64, Vec<MessageEvent>), TelegramError> {
        let updates: Vec<TgUpdate> = self
            .call(
                "getUpdates",
                json!({
                    "offset": offset,
                    "timeout": timeout_secs,
                    "allowed_updates": ["message"],
                }),
                Duration::from_secs(timeout_secs + POLL_TIMEOUT_SLACK_SECS),
            )
            .await?;

        let mut next_offset = offset;
        let mut events = Vec::new();
        for update in updates {
            next_offset = next_offset.max(update.update_id + 1);
            let Some(message) = update.message else {
                continue;
            };
            let Some(from) = message.from else {
                continue;
            };
            let Some(text) = message.text else {
                // Stickers, photos, service messages: nothing to bridge.
                debug!(chat_id = message.chat.id, "Skipping non-text message");
                continue;
            };
            events.push(MessageEvent {
                chat_id: message.chat.id,
                user_id: from.id,
                username: from.username,
                text,
            });
        }
        Ok((next_offset, events))
    }

    async fn list_group_admins(&self, group_id: i64) -> Result<Vec<ChatAdmin>, TelegramError> {
        let members: Vec<TgChatMember> = self
            .call(
                "getChatAdministrators",
                json!({ "chat_id": group_id }),
                Duration::from_secs(30),
            )
            .await?;
        Ok(members
            .into_iter()
            .map(|m| ChatAdmin {
                user_id: m.user.id,
                username: m.user.username,
            })
            .collect())
    }

    async fn send_message(
        &self,
        chat_id: i64,
        text: &str,
        rich: bool,
    ) -> Result<(), TelegramError> {
        let mut params = json!({ "chat_id": chat_id, "text": text });
        if rich {
            params["parse_mode"] = json!("MarkdownV2");
        }
        // The result payload (the sent message) is not needed.
        let _: serde_json::Value = self
            .call("sendMessage", params, Duration::from_secs(30))
            .await?;
        Ok(())
    }
}
