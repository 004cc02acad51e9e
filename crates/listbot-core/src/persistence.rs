//! State file + periodic autosave.

use std::{
    path::PathBuf,
    sync::Arc,
    time::Duration,
};

use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::{
    errors::Error, invites::InvitationMap, ports::StatePort, service::ListService, store::Registry,
    Result,
};

/// Everything the bot persists, saved and loaded as a whole.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub lists: Registry,
    #[serde(default)]
    pub invitations: InvitationMap,
}

/// Pretty-printed JSON file, replaced atomically on save.
#[derive(Clone, Debug)]
pub struct JsonFileState {
    path: PathBuf,
}

impl JsonFileState {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn state_err(&self, reason: impl std::fmt::Display) -> Error {
        Error::State {
            path: self.path.clone(),
            reason: reason.to_string(),
        }
    }
}

impl StatePort for JsonFileState {
    fn load(&self) -> Result<Option<Snapshot>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let txt = std::fs::read_to_string(&self.path)?;
        if txt.trim().is_empty() {
            return Ok(None);
        }
        let snapshot = serde_json::from_str(&txt).map_err(|e| self.state_err(e))?;
        Ok(Some(snapshot))
    }

    fn save(&self, snapshot: &Snapshot) -> Result<()> {
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir)?;
        }
        let txt = serde_json::to_string_pretty(snapshot)?;

        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        std::fs::write(&tmp, txt)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

/// Background task persisting the service's state whenever it changed.
pub struct Autosaver {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

impl Autosaver {
    pub fn start(
        service: Arc<ListService>,
        state: Arc<dyn StatePort>,
        interval: Duration,
    ) -> Self {
        let cancel = CancellationToken::new();
        let tok = cancel.clone();

        let handle = tokio::spawn(async move {
            let mut tick = tokio::time::interval(interval);
            loop {
                tokio::select! {
                    _ = tok.cancelled() => break,
                    _ = tick.tick() => {
                        if let Err(e) = save_if_dirty(&service, state.as_ref()).await {
                            tracing::warn!("autosave failed: {e}");
                        }
                    }
                }
            }

            // Final flush on shutdown.
            if let Err(e) = save_if_dirty(&service, state.as_ref()).await {
                tracing::error!("final save failed: {e}");
            }
        });

        Self { cancel, handle }
    }

    /// Stop the loop and wait for the final flush.
    pub async fn stop(self) {
        self.cancel.cancel();
        if let Err(e) = self.handle.await {
            tracing::error!("autosave task ended abnormally: {e}");
        }
    }
}

/// Returns whether anything was written.
pub async fn save_if_dirty(service: &ListService, state: &dyn StatePort) -> Result<bool> {
    let Some(snapshot) = service.take_dirty_snapshot().await else {
        return Ok(false);
    };
    if let Err(e) = state.save(&snapshot) {
        // Keep the change pending so the next tick retries.
        service.mark_dirty();
        return Err(e);
    }
    tracing::debug!(lists = snapshot.lists.len(), "state saved");
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tmp(name: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("listbot-state-{}", std::process::id()))
            .join(name)
    }

    #[test]
    fn missing_file_loads_none() {
        let st = JsonFileState::new(tmp("missing/state.json"));
        assert!(st.load().unwrap().is_none());
    }

    #[test]
    fn save_then_load() {
        let path = tmp("roundtrip/state.json");
        let _ = std::fs::remove_file(&path);
        let st = JsonFileState::new(&path);

        let mut snap = Snapshot::default();
        snap.lists
            .insert("team".to_string(), vec!["&sub".to_string(), "alice".to_string()]);
        snap.invitations
            .insert("bob".to_string(), vec!["team".to_string()]);
        st.save(&snap).unwrap();

        assert_eq!(st.load().unwrap(), Some(snap));
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn bare_registry_without_invitations_loads() {
        let path = tmp("legacy/state.json");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, r#"{"lists":{"admins":["alice"]}}"#).unwrap();

        let snap = JsonFileState::new(&path).load().unwrap().unwrap();
        assert_eq!(snap.lists["admins"], vec!["alice"]);
        assert!(snap.invitations.is_empty());
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn corrupt_file_is_a_state_error() {
        let path = tmp("corrupt/state.json");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "{not json").unwrap();

        let err = JsonFileState::new(&path).load().unwrap_err();
        assert!(matches!(err, Error::State { .. }));
        let _ = std::fs::remove_file(&path);
    }

    struct NullDelivery;

    #[async_trait::async_trait]
    impl crate::ports::DeliveryPort for NullDelivery {
        async fn notify(&self, _recipient: &str, _text: &str) -> Result<()> {
            Ok(())
        }
    }

    #[derive(Default)]
    struct MemState {
        saved: std::sync::Mutex<Vec<Snapshot>>,
        fail: std::sync::atomic::AtomicBool,
    }

    impl StatePort for MemState {
        fn load(&self) -> Result<Option<Snapshot>> {
            Ok(self.saved.lock().unwrap().last().cloned())
        }

        fn save(&self, snapshot: &Snapshot) -> Result<()> {
            if self.fail.load(std::sync::atomic::Ordering::SeqCst) {
                return Err(Error::External("disk full".to_string()));
            }
            self.saved.lock().unwrap().push(snapshot.clone());
            Ok(())
        }
    }

    fn service() -> Arc<ListService> {
        Arc::new(ListService::new(
            crate::service::ListSettings::default(),
            None,
            Arc::new(NullDelivery),
        ))
    }

    #[tokio::test]
    async fn saves_only_when_dirty() {
        let svc = service();
        let st = MemState::default();

        assert!(save_if_dirty(&svc, &st).await.unwrap());
        assert!(!save_if_dirty(&svc, &st).await.unwrap());
        assert!(st.load().unwrap().unwrap().lists.contains_key("admins"));
    }

    #[tokio::test]
    async fn failed_save_stays_dirty() {
        let svc = service();
        let st = MemState::default();
        st.fail.store(true, std::sync::atomic::Ordering::SeqCst);

        assert!(save_if_dirty(&svc, &st).await.is_err());
        st.fail.store(false, std::sync::atomic::Ordering::SeqCst);
        assert!(save_if_dirty(&svc, &st).await.unwrap());
    }

    #[tokio::test]
    async fn autosaver_flushes_on_stop() {
        let svc = service();
        let st = Arc::new(MemState::default());

        let saver = Autosaver::start(svc.clone(), st.clone(), Duration::from_secs(3600));
        saver.stop().await;

        let saved = st.saved.lock().unwrap().clone();
        assert_eq!(saved.len(), 1);
        assert!(saved[0].lists.contains_key("admins"));
    }
}
