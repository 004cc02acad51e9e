use std::sync::Arc;

use teloxide::{dispatching::Dispatcher, dptree, prelude::*};

use listbot_core::{config::Config, service::ListService};

use crate::handlers;
use crate::TelegramMessenger;

#[derive(Clone)]
pub struct AppState {
    pub cfg: Arc<Config>,
    pub service: Arc<ListService>,
    pub messenger: Arc<TelegramMessenger>,
}

/// Long-poll Telegram until Ctrl-C.
pub async fn run_polling(
    cfg: Arc<Config>,
    service: Arc<ListService>,
    messenger: Arc<TelegramMessenger>,
) -> anyhow::Result<()> {
    let bot = messenger.bot();

    match bot.get_me().await {
        Ok(me) => {
            tracing::info!("listbot started: @{}", me.username());
            service.set_bot_username(me.username());
        }
        Err(e) => tracing::warn!("get_me failed: {e}"),
    }
    let lists = service.with_store(|s| s.lists().len()).await;
    tracing::info!(
        lists,
        static_admins = cfg.admins.len(),
        recurse = service.settings().expander.recurse,
        role_shim = cfg.role_shim,
        "list registry ready"
    );

    let state = Arc::new(AppState {
        cfg,
        service,
        messenger,
    });

    let handler = dptree::entry().branch(Update::filter_message().endpoint(handlers::handle_message));

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![state])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    Ok(())
}
