use async_trait::async_trait;

use crate::{persistence::Snapshot, Result};

/// Delivers one notification to one literal recipient.
///
/// How a recipient token maps to a chat (direct message, room, ...) is up to
/// the transport.
#[async_trait]
pub trait DeliveryPort: Send + Sync {
    async fn notify(&self, recipient: &str, text: &str) -> Result<()>;
}

/// Whole-snapshot persistence for the registry and invitations.
pub trait StatePort: Send + Sync {
    /// `Ok(None)` when nothing has been saved yet.
    fn load(&self) -> Result<Option<Snapshot>>;
    fn save(&self, snapshot: &Snapshot) -> Result<()>;
}
