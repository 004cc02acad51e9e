use std::sync::Arc;

use teloxide::prelude::*;

use listbot_core::domain::{Caller, ChatId};

use crate::router::AppState;

pub async fn handle_text(_bot: Bot, msg: Message, state: Arc<AppState>) -> ResponseResult<()> {
    let Some(user) = msg.from() else {
        return Ok(());
    };
    let Some(text) = msg.text() else {
        return Ok(());
    };

    let user_id = user.id.0 as i64;
    if let Some(handle) = user.username.as_deref() {
        state.messenger.directory().observe(handle, user_id).await;
    }

    let caller = Caller {
        id: user_id.to_string(),
        handle: user.username.clone(),
        chat_id: ChatId(msg.chat.id.0),
    };

    for reply in state.service.handle(&caller, text).await {
        if let Err(e) = state.messenger.send_html(caller.chat_id, &reply).await {
            tracing::warn!(chat_id = caller.chat_id.0, "reply failed: {e}");
        }
    }

    Ok(())
}
