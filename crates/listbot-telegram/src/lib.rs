//! Telegram adapter (teloxide).
//!
//! Implements the `listbot-core` delivery port over the Telegram Bot API and
//! routes incoming messages into `ListService`.

use std::collections::HashMap;

use async_trait::async_trait;

use teloxide::{prelude::*, types::ParseMode};

use tokio::{sync::RwLock, time::sleep};

pub mod handlers;
pub mod router;

use listbot_core::{domain::ChatId, errors::Error, ports::DeliveryPort, Result};

/// Usernames seen by the bot, mapped to their user ids.
///
/// Telegram cannot message a user by handle, so recipients given as handles are
/// resolved here. A user becomes reachable once they have written to the bot
/// (or in a chat the bot reads).
#[derive(Default)]
pub struct UserDirectory {
    by_handle: RwLock<HashMap<String, i64>>,
}

impl UserDirectory {
    pub async fn observe(&self, handle: &str, user_id: i64) {
        let key = normalize_handle(handle);
        let mut map = self.by_handle.write().await;
        if map.insert(key, user_id) != Some(user_id) {
            tracing::debug!(handle, user_id, "learned user");
        }
    }

    pub async fn lookup(&self, handle: &str) -> Option<i64> {
        self.by_handle
            .read()
            .await
            .get(&normalize_handle(handle))
            .copied()
    }
}

/// Telegram handles are case-insensitive; `@` is optional.
fn normalize_handle(handle: &str) -> String {
    handle.trim_start_matches('@').to_lowercase()
}

#[derive(Clone)]
pub struct TelegramMessenger {
    bot: Bot,
    directory: std::sync::Arc<UserDirectory>,
}

impl TelegramMessenger {
    pub fn new(bot: Bot, directory: std::sync::Arc<UserDirectory>) -> Self {
        Self { bot, directory }
    }

    /// Fresh bot client with an empty user directory.
    pub fn from_token(token: &str) -> Self {
        Self::new(Bot::new(token), Default::default())
    }

    pub fn bot(&self) -> Bot {
        self.bot.clone()
    }

    pub fn directory(&self) -> &UserDirectory {
        &self.directory
    }

    fn tg_chat(chat_id: ChatId) -> teloxide::types::ChatId {
        teloxide::types::ChatId(chat_id.0)
    }

    fn map_err(e: teloxide::RequestError) -> Error {
        Error::External(format!("telegram error: {e}"))
    }

    async fn with_retry<T, Fut>(&self, mut op: impl FnMut() -> Fut) -> Result<T>
    where
        Fut: std::future::IntoFuture<Output = std::result::Result<T, teloxide::RequestError>>,
        Fut::IntoFuture: Send,
    {
        const MAX_RETRIES: usize = 1;
        let mut attempts = 0usize;
        loop {
            match op().await {
                Ok(v) => return Ok(v),
                Err(e) => match e {
                    teloxide::RequestError::RetryAfter(d) if attempts < MAX_RETRIES => {
                        attempts += 1;
                        sleep(d).await;
                        continue;
                    }
                    other => return Err(Self::map_err(other)),
                },
            }
        }
    }

    /// Reply into a chat using Telegram's HTML parse mode.
    pub async fn send_html(&self, chat_id: ChatId, html: &str) -> Result<()> {
        self.with_retry(|| {
            self.bot
                .send_message(Self::tg_chat(chat_id), html.to_string())
                .parse_mode(ParseMode::Html)
        })
        .await?;
        Ok(())
    }

    /// Numeric tokens are chat ids; anything else is a handle.
    async fn resolve(&self, recipient: &str) -> Result<ChatId> {
        if let Ok(id) = recipient.parse::<i64>() {
            return Ok(ChatId(id));
        }
        self.directory
            .lookup(recipient)
            .await
            .map(ChatId)
            .ok_or_else(|| Error::External(format!("unknown recipient: {recipient}")))
    }
}

#[async_trait]
impl DeliveryPort for TelegramMessenger {
    async fn notify(&self, recipient: &str, text: &str) -> Result<()> {
        let chat_id = self.resolve(recipient).await?;
        self.with_retry(|| {
            self.bot
                .send_message(Self::tg_chat(chat_id), text.to_string())
        })
        .await?;
        Ok(())
    }
}
