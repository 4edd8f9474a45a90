use std::num::NonZeroUsize;
use std::sync::Arc;

use chrono::Utc;
use roadwatch_core::{AppError, AppResult};
use roadwatch_domain::{
    DATE_FORMAT, EntitySchema, OptionCount, Record, RecordId, count_by_option,
};
use serde_json::{Map, Value};
use tokio::sync::Mutex;
use tracing::{error, info, warn};

use crate::form_validation::validate_draft;
use crate::pagination::paginate;
use crate::record_ports::{RecordCache, RemoteChange, RemoteChangeKind, RemoteRecordSync};
use crate::record_query::{FilterState, SortState, derive_records};
use crate::record_store::{RecordStore, StoreChange};

#[cfg(test)]
mod tests;

/// What the service does when the backend rejects a change already applied
/// locally.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SyncFailurePolicy {
    /// Restore the pre-mutation state and fail the operation.
    #[default]
    Rollback,
    /// Keep the local change and report the divergence.
    KeepLocal,
}

impl SyncFailurePolicy {
    /// Parses transport value into a policy.
    pub fn parse_transport(value: &str) -> AppResult<Self> {
        match value {
            "rollback" => Ok(Self::Rollback),
            "keep_local" => Ok(Self::KeepLocal),
            _ => Err(AppError::Validation(format!(
                "unknown sync failure policy '{value}'"
            ))),
        }
    }

    /// Returns the stable transport value.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Rollback => "rollback",
            Self::KeepLocal => "keep_local",
        }
    }
}

/// Result of a committed mutation.
#[derive(Debug, Clone, PartialEq)]
pub struct MutationOutcome<T> {
    /// The mutation's value.
    pub value: T,
    /// Backend error kept under [`SyncFailurePolicy::KeepLocal`].
    pub remote_error: Option<String>,
}

impl<T> MutationOutcome<T> {
    fn synced(value: T) -> Self {
        Self {
            value,
            remote_error: None,
        }
    }
}

/// One page of a derived list.
#[derive(Debug, Clone, PartialEq)]
pub struct ListPage {
    /// Records on the page.
    pub items: Vec<Record>,
    /// Number of pages, at least one.
    pub total_pages: usize,
    /// Page the items came from.
    pub current_page: usize,
    /// Number of records matching the filters.
    pub total_matches: usize,
}

/// Shared owner of one managed collection.
///
/// Create and update are gated on the form validator. Every mutation is applied
/// to the local store first, persisted to the cache, then pushed to the remote
/// backend, with [`SyncFailurePolicy`] deciding what a failed push does. The
/// store lock is not held while the push is in flight.
#[derive(Clone)]
pub struct RecordService {
    schema: Arc<EntitySchema>,
    store: Arc<Mutex<RecordStore>>,
    cache: Arc<dyn RecordCache>,
    remote: Arc<dyn RemoteRecordSync>,
    failure_policy: SyncFailurePolicy,
}

impl RecordService {
    /// Opens a collection, reading the cache once.
    ///
    /// An empty or unreadable cache falls back to `seed`, which is then written
    /// back so later sessions start from the same data.
    pub async fn open(
        schema: EntitySchema,
        seed: Vec<Record>,
        cache: Arc<dyn RecordCache>,
        remote: Arc<dyn RemoteRecordSync>,
        failure_policy: SyncFailurePolicy,
    ) -> AppResult<Self> {
        let schema = Arc::new(schema);
        let key = schema.logical_name().as_str().to_owned();

        let cached = match cache.load(key.as_str()).await {
            Ok(Some(encoded)) => match RecordStore::from_json(schema.clone(), encoded.as_str()) {
                Ok(store) => Some(store),
                Err(error) => {
                    warn!(error = %error, cache_key = %key, "discarding unreadable cached collection");
                    None
                }
            },
            Ok(None) => None,
            Err(error) => {
                warn!(error = %error, cache_key = %key, "record cache read failed");
                None
            }
        };

        let (store, from_cache) = match cached {
            Some(store) => (store, true),
            None => (RecordStore::new(schema.clone(), seed)?, false),
        };

        info!(
            resource = %key,
            records = store.len(),
            from_cache,
            "record collection opened"
        );

        let service = Self {
            schema,
            store: Arc::new(Mutex::new(store)),
            cache,
            remote,
            failure_policy,
        };

        if !from_cache {
            let store = service.store.lock().await;
            service.persist(&store).await;
        }

        Ok(service)
    }

    /// Returns the collection schema.
    #[must_use]
    pub fn schema(&self) -> &Arc<EntitySchema> {
        &self.schema
    }

    /// Returns the configured failure policy.
    #[must_use]
    pub fn failure_policy(&self) -> SyncFailurePolicy {
        self.failure_policy
    }

    /// Returns a copy of every record in collection order.
    pub async fn records(&self) -> Vec<Record> {
        self.store.lock().await.records().to_vec()
    }

    /// Returns the number of records.
    pub async fn len(&self) -> usize {
        self.store.lock().await.len()
    }

    /// Returns whether the collection is empty.
    pub async fn is_empty(&self) -> bool {
        self.store.lock().await.is_empty()
    }

    /// Returns one record.
    pub async fn get(&self, id: RecordId) -> AppResult<Record> {
        self.store
            .lock()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| self.not_found(id))
    }

    /// Derives the filtered and sorted view of the collection.
    pub async fn derive(&self, filter: &FilterState, sort: &SortState) -> Vec<Record> {
        let store = self.store.lock().await;
        derive_records(&self.schema, store.records(), filter, sort)
    }

    /// Derives and paginates the collection.
    ///
    /// A page outside the derived range falls back to page one.
    pub async fn list(
        &self,
        filter: &FilterState,
        sort: &SortState,
        page: usize,
        page_size: NonZeroUsize,
    ) -> ListPage {
        let derived = self.derive(filter, sort).await;
        let total_pages = crate::pagination::total_pages(derived.len(), page_size);
        let current_page = if (1..=total_pages).contains(&page) {
            page
        } else {
            1
        };

        let page = paginate(&derived, page_size, current_page);
        ListPage {
            items: page.items,
            total_pages: page.total_pages,
            current_page: page.current_page,
            total_matches: derived.len(),
        }
    }

    /// Counts records per option of a choice field.
    pub async fn breakdown(&self, field: &str) -> AppResult<Vec<OptionCount>> {
        let store = self.store.lock().await;
        count_by_option(&self.schema, store.records(), field)
    }

    /// Validates a draft and appends it under the next id.
    ///
    /// The created-date field, when the schema declares one and the draft
    /// leaves it empty, is stamped with today's date.
    pub async fn create(&self, mut draft: Map<String, Value>) -> AppResult<MutationOutcome<Record>> {
        if let Some(field) = self.schema.created_date_field() {
            let is_blank = match draft.get(field) {
                None | Some(Value::Null) => true,
                Some(Value::String(text)) => text.trim().is_empty(),
                Some(_) => false,
            };
            if is_blank {
                draft.insert(
                    field.to_owned(),
                    Value::String(Utc::now().date_naive().format(DATE_FORMAT).to_string()),
                );
            }
        }

        let errors = validate_draft(&self.schema, &draft);
        if !errors.is_empty() {
            return Err(AppError::InvalidFields(errors));
        }

        let change = self.apply(|store| store.create(&draft)).await?;
        let StoreChange::Created(record) = &change else {
            return Err(AppError::Internal("store returned a non-create change".to_owned()));
        };
        let record = record.clone();

        let remote_change = self.remote_change(RemoteChangeKind::Create {
            record: record.clone(),
        });
        self.settle(&change, remote_change, record).await
    }

    /// Validates the merge of `patch` over record `id` and applies it.
    pub async fn update(
        &self,
        id: RecordId,
        patch: Map<String, Value>,
    ) -> AppResult<MutationOutcome<Record>> {
        let (change, patch) = self
            .apply(|store| {
                let existing = store.get(id).cloned().ok_or_else(|| self.not_found(id))?;
                let errors = validate_draft(&self.schema, existing.merged(&patch).data());
                if !errors.is_empty() {
                    return Err(AppError::InvalidFields(errors));
                }

                let patch = self.schema.normalize_payload(&patch)?;
                Ok((store.update(id, &patch)?, patch))
            })
            .await?;

        self.commit_update(change, patch).await
    }

    /// Flips the status field of record `id`.
    pub async fn toggle_status(&self, id: RecordId) -> AppResult<MutationOutcome<Record>> {
        let change = self.apply(|store| store.toggle_status(id)).await?;

        let mut patch = Map::new();
        if let (Some(status_field), StoreChange::Updated { current, .. }) =
            (self.schema.status_field(), &change)
            && let Some(value) = current.field(status_field)
        {
            patch.insert(status_field.to_owned(), value.clone());
        }

        self.commit_update(change, patch).await
    }

    /// Removes record `id`.
    pub async fn remove(&self, id: RecordId) -> AppResult<MutationOutcome<Record>> {
        let change = self.apply(|store| store.remove(id)).await?;
        let StoreChange::Removed(record) = &change else {
            return Err(AppError::Internal("store returned a non-remove change".to_owned()));
        };
        let record = record.clone();

        let remote_change = self.remote_change(RemoteChangeKind::Delete { id });
        self.settle(&change, remote_change, record).await
    }

    /// Runs `mutate` against the store and persists the result.
    ///
    /// The store lock is released on return, so the remote push that follows
    /// never blocks readers.
    async fn apply<T, F>(&self, mutate: F) -> AppResult<T>
    where
        F: FnOnce(&mut RecordStore) -> AppResult<T>,
    {
        let mut store = self.store.lock().await;
        let applied = mutate(&mut store)?;
        self.persist(&store).await;

        Ok(applied)
    }

    async fn commit_update(
        &self,
        change: StoreChange,
        patch: Map<String, Value>,
    ) -> AppResult<MutationOutcome<Record>> {
        let StoreChange::Updated { current, .. } = &change else {
            return Err(AppError::Internal("store returned a non-update change".to_owned()));
        };
        let current = current.clone();

        let remote_change = self.remote_change(RemoteChangeKind::Update {
            id: current.id(),
            patch,
        });
        self.settle(&change, remote_change, current).await
    }

    async fn settle<T>(
        &self,
        change: &StoreChange,
        remote_change: RemoteChange,
        value: T,
    ) -> AppResult<MutationOutcome<T>> {
        let Err(push_error) = self.remote.push(&remote_change).await else {
            return Ok(MutationOutcome::synced(value));
        };

        let message = match push_error {
            AppError::RemoteSync(message) => message,
            other => other.to_string(),
        };

        match self.failure_policy {
            SyncFailurePolicy::Rollback => {
                let mut store = self.store.lock().await;
                if let Err(revert_error) = store.revert(change) {
                    error!(
                        target: "remote_sync",
                        resource = %remote_change.resource,
                        record_id = %change.record_id(),
                        error = %revert_error,
                        "local change could not be rolled back"
                    );
                }
                self.persist(&store).await;
                error!(
                    target: "remote_sync",
                    resource = %remote_change.resource,
                    record_id = %change.record_id(),
                    error = %message,
                    "remote write failed; local change rolled back"
                );
                Err(AppError::RemoteSync(message))
            }
            SyncFailurePolicy::KeepLocal => {
                error!(
                    target: "remote_sync",
                    resource = %remote_change.resource,
                    record_id = %change.record_id(),
                    error = %message,
                    "remote write failed; local change kept"
                );
                Ok(MutationOutcome {
                    value,
                    remote_error: Some(message),
                })
            }
        }
    }

    async fn persist(&self, store: &RecordStore) {
        let key = self.schema.logical_name().as_str();
        let result = match store.to_json() {
            Ok(encoded) => self.cache.store(key, encoded).await,
            Err(error) => Err(error),
        };

        if let Err(error) = result {
            warn!(error = %error, cache_key = %key, "record cache write failed");
        }
    }

    fn remote_change(&self, kind: RemoteChangeKind) -> RemoteChange {
        RemoteChange {
            resource: self.schema.logical_name().as_str().to_owned(),
            kind,
        }
    }

    fn not_found(&self, id: RecordId) -> AppError {
        AppError::NotFound(format!(
            "{} record {id} does not exist",
            self.schema.display_name().as_str()
        ))
    }
}
