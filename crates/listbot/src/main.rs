use std::sync::Arc;

use listbot_core::{
    config::Config,
    persistence::{Autosaver, JsonFileState},
    ports::StatePort,
    service::{ListService, ListSettings},
    utils::AuditLogger,
};
use listbot_telegram::TelegramMessenger;

#[tokio::main]
async fn main() -> Result<(), listbot_core::Error> {
    listbot_core::logging::init("listbot")?;

    let cfg = Arc::new(Config::load()?);

    // Load before accepting commands; a corrupt file aborts instead of being overwritten.
    let state: Arc<dyn StatePort> = Arc::new(JsonFileState::new(cfg.state_file.clone()));
    let snapshot = state.load()?;
    match &snapshot {
        Some(s) => tracing::info!(
            path = %cfg.state_file.display(),
            lists = s.lists.len(),
            invitations = s.invitations.len(),
            "loaded state"
        ),
        None => tracing::info!(path = %cfg.state_file.display(), "no saved state, starting empty"),
    }

    let messenger = Arc::new(TelegramMessenger::from_token(&cfg.telegram_bot_token));
    let service = Arc::new(
        ListService::new(ListSettings::from(cfg.as_ref()), snapshot, messenger.clone())
            .with_audit(AuditLogger::new(
                cfg.audit_log_path.clone(),
                cfg.audit_log_json,
            )),
    );

    let autosaver = Autosaver::start(service.clone(), state, cfg.save_interval);

    let result = listbot_telegram::router::run_polling(cfg, service, messenger).await;

    autosaver.stop().await;

    result.map_err(|e| listbot_core::Error::External(format!("telegram bot failed: {e}")))?;
    Ok(())
}
