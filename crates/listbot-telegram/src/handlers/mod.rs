//! Telegram update handlers.
//!
//! Each handler is a small adapter: learn who is talking, build a `Caller`, let
//! `ListService` decide, send the replies back to the chat.

use std::sync::Arc;

use teloxide::{prelude::*, types::Message};

use crate::router::AppState;

mod text;

pub async fn handle_message(bot: Bot, msg: Message, state: Arc<AppState>) -> ResponseResult<()> {
    if msg.text().is_some() {
        return text::handle_text(bot, msg, state).await;
    }
    Ok(())
}
