use async_trait::async_trait;
use roadwatch_core::AppResult;
use roadwatch_domain::{Record, RecordId};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Port for durable key-value storage of whole collections.
///
/// Values are opaque encoded collections; a missing key is `Ok(None)`.
#[async_trait]
pub trait RecordCache: Send + Sync {
    /// Reads the encoded collection stored under `key`.
    async fn load(&self, key: &str) -> AppResult<Option<String>>;

    /// Replaces the encoded collection stored under `key`.
    async fn store(&self, key: &str, encoded: String) -> AppResult<()>;
}

/// A committed local mutation mirrored to the remote backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RemoteChangeKind {
    /// A record was created.
    Create {
        /// The record as stored.
        record: Record,
    },
    /// A record was updated.
    Update {
        /// Updated record id.
        id: RecordId,
        /// Normalized fields that changed.
        patch: Map<String, Value>,
    },
    /// A record was deleted.
    Delete {
        /// Deleted record id.
        id: RecordId,
    },
}

/// Change request for one resource collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteChange {
    /// Collection logical name, e.g. `users`.
    pub resource: String,
    /// What happened.
    #[serde(flatten)]
    pub kind: RemoteChangeKind,
}

/// Port for mirroring committed changes to a remote backend.
#[async_trait]
pub trait RemoteRecordSync: Send + Sync {
    /// Pushes one change; implementations own their retry behavior.
    async fn push(&self, change: &RemoteChange) -> AppResult<()>;
}
