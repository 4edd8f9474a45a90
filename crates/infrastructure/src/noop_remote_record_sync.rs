//! Remote sync for deployments without a backend. Logs changes and succeeds.

use async_trait::async_trait;
use roadwatch_application::{RemoteChange, RemoteChangeKind, RemoteRecordSync};
use roadwatch_core::AppResult;
use tracing::debug;

/// Remote sync adapter that accepts every change without sending it anywhere.
#[derive(Clone)]
pub struct NoopRemoteRecordSync;

impl NoopRemoteRecordSync {
    /// Creates a new no-op sync adapter.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Default for NoopRemoteRecordSync {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RemoteRecordSync for NoopRemoteRecordSync {
    async fn push(&self, change: &RemoteChange) -> AppResult<()> {
        let (operation, record_id) = match &change.kind {
            RemoteChangeKind::Create { record } => ("create", record.id()),
            RemoteChangeKind::Update { id, .. } => ("update", *id),
            RemoteChangeKind::Delete { id } => ("delete", *id),
        };

        debug!(
            resource = %change.resource,
            operation,
            record_id = %record_id,
            "remote sync disabled; change kept local"
        );

        Ok(())
    }
}
