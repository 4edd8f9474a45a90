use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use roadwatch_core::{AppError, AppResult};
use roadwatch_domain::{
    RecordId, asset_schema, parse_date, road_schema, seed_assets, seed_roads, seed_users,
    user_schema,
};
use serde_json::{Map, Value, json};
use tokio::sync::{Mutex, Notify};

use crate::{
    ChoiceFilter, FilterState, RecordCache, RecordStore, RemoteChange, RemoteChangeKind,
    RemoteRecordSync, SortDirection, SortState,
};

use super::{RecordService, SyncFailurePolicy};

#[derive(Default)]
struct FakeCache {
    entries: Mutex<HashMap<String, String>>,
    fail_reads: bool,
}

#[async_trait]
impl RecordCache for FakeCache {
    async fn load(&self, key: &str) -> AppResult<Option<String>> {
        if self.fail_reads {
            return Err(AppError::Internal("cache offline".to_owned()));
        }
        Ok(self.entries.lock().await.get(key).cloned())
    }

    async fn store(&self, key: &str, encoded: String) -> AppResult<()> {
        self.entries.lock().await.insert(key.to_owned(), encoded);
        Ok(())
    }
}

#[derive(Default)]
struct FakeRemote {
    changes: Mutex<Vec<RemoteChange>>,
    reject: bool,
}

#[async_trait]
impl RemoteRecordSync for FakeRemote {
    async fn push(&self, change: &RemoteChange) -> AppResult<()> {
        if self.reject {
            return Err(AppError::RemoteSync("backend returned 503".to_owned()));
        }
        self.changes.lock().await.push(change.clone());
        Ok(())
    }
}

/// Holds every push until released, then answers like [`FakeRemote`].
#[derive(Default)]
struct GatedRemote {
    entered: Notify,
    release: Notify,
    reject: bool,
}

#[async_trait]
impl RemoteRecordSync for GatedRemote {
    async fn push(&self, _change: &RemoteChange) -> AppResult<()> {
        self.entered.notify_one();
        self.release.notified().await;
        if self.reject {
            return Err(AppError::RemoteSync("backend returned 503".to_owned()));
        }
        Ok(())
    }
}

fn id(value: u64) -> RecordId {
    RecordId::new(value).unwrap_or_else(|_| unreachable!())
}

fn payload(value: Value) -> Map<String, Value> {
    value.as_object().cloned().unwrap_or_default()
}

fn new_user() -> Map<String, Value> {
    payload(json!({
        "name": "Ann Mutua",
        "email": "ann@county.gov",
        "role": "Finance Officer",
        "permissions": ["finance"],
        "status": "active"
    }))
}

async fn user_service(
    cache: Arc<FakeCache>,
    remote: Arc<FakeRemote>,
    policy: SyncFailurePolicy,
) -> RecordService {
    RecordService::open(
        user_schema().unwrap_or_else(|_| unreachable!()),
        seed_users().unwrap_or_default(),
        cache,
        remote,
        policy,
    )
    .await
    .unwrap_or_else(|_| unreachable!())
}

async fn cached_len(cache: &FakeCache, key: &str) -> usize {
    let entries = cache.entries.lock().await;
    entries
        .get(key)
        .and_then(|encoded| serde_json::from_str::<Vec<Value>>(encoded).ok())
        .map(|records| records.len())
        .unwrap_or_default()
}

#[tokio::test]
async fn open_seeds_and_persists_empty_cache() {
    let cache = Arc::new(FakeCache::default());
    let service = user_service(
        cache.clone(),
        Arc::new(FakeRemote::default()),
        SyncFailurePolicy::default(),
    )
    .await;

    assert_eq!(service.len().await, 8);
    assert_eq!(cached_len(&cache, "users").await, 8);
}

#[tokio::test]
async fn open_prefers_cached_collection() {
    let schema = Arc::new(asset_schema().unwrap_or_else(|_| unreachable!()));
    let mut store = RecordStore::new(schema, seed_assets().unwrap_or_default())
        .unwrap_or_else(|_| unreachable!());
    assert!(store.remove(id(2)).is_ok());

    let cache = Arc::new(FakeCache::default());
    cache
        .entries
        .lock()
        .await
        .insert("assets".to_owned(), store.to_json().unwrap_or_default());

    let service = RecordService::open(
        asset_schema().unwrap_or_else(|_| unreachable!()),
        seed_assets().unwrap_or_default(),
        cache,
        Arc::new(FakeRemote::default()),
        SyncFailurePolicy::Rollback,
    )
    .await
    .unwrap_or_else(|_| unreachable!());

    assert_eq!(service.len().await, 4);
    assert!(matches!(service.get(id(2)).await, Err(AppError::NotFound(_))));
}

#[tokio::test]
async fn unreadable_cache_falls_back_to_seed() {
    let cache = Arc::new(FakeCache {
        fail_reads: true,
        ..FakeCache::default()
    });
    let service = user_service(
        cache,
        Arc::new(FakeRemote::default()),
        SyncFailurePolicy::default(),
    )
    .await;

    assert_eq!(service.len().await, 8);
}

#[tokio::test]
async fn create_stamps_date_persists_and_pushes() {
    let cache = Arc::new(FakeCache::default());
    let remote = Arc::new(FakeRemote::default());
    let service = user_service(cache.clone(), remote.clone(), SyncFailurePolicy::Rollback).await;

    let outcome = service.create(new_user()).await;
    let record = outcome
        .map(|outcome| outcome.value)
        .unwrap_or_else(|_| unreachable!());

    assert_eq!(record.id().get(), 9);
    assert!(record.text("lastActive").and_then(parse_date).is_some());
    assert_eq!(cached_len(&cache, "users").await, 9);

    let changes = remote.changes.lock().await;
    assert_eq!(changes.len(), 1);
    assert_eq!(changes[0].resource, "users");
    assert!(matches!(&changes[0].kind, RemoteChangeKind::Create { record: pushed } if pushed == &record));
}

#[tokio::test]
async fn invalid_draft_never_reaches_store() {
    let remote = Arc::new(FakeRemote::default());
    let service = user_service(
        Arc::new(FakeCache::default()),
        remote.clone(),
        SyncFailurePolicy::Rollback,
    )
    .await;

    let mut draft = new_user();
    draft.insert("name".to_owned(), json!(""));

    let result = service.create(draft).await;
    let Err(AppError::InvalidFields(errors)) = result else {
        unreachable!("expected field errors");
    };
    assert_eq!(errors.get("name"), Some("Name is required"));
    assert_eq!(service.len().await, 8);
    assert!(remote.changes.lock().await.is_empty());
}

#[tokio::test]
async fn update_validates_merged_record() {
    let remote = Arc::new(FakeRemote::default());
    let service = user_service(
        Arc::new(FakeCache::default()),
        remote.clone(),
        SyncFailurePolicy::Rollback,
    )
    .await;

    let updated = service
        .update(id(2), payload(json!({"role": "County Engineer"})))
        .await
        .map(|outcome| outcome.value)
        .unwrap_or_else(|_| unreachable!());
    assert_eq!(updated.text("role"), Some("County Engineer"));
    assert_eq!(updated.text("email"), Some("sarah@county.gov"));

    let rejected = service
        .update(id(2), payload(json!({"email": "sarah"})))
        .await;
    assert!(matches!(rejected, Err(AppError::InvalidFields(_))));

    let missing = service.update(id(99), payload(json!({"name": "Ghost"}))).await;
    assert!(matches!(missing, Err(AppError::NotFound(_))));

    let changes = remote.changes.lock().await;
    assert_eq!(changes.len(), 1);
    assert_eq!(
        changes[0].kind,
        RemoteChangeKind::Update {
            id: id(2),
            patch: payload(json!({"role": "County Engineer"})),
        }
    );
}

#[tokio::test]
async fn rollback_policy_restores_state_on_remote_failure() {
    let cache = Arc::new(FakeCache::default());
    let remote = Arc::new(FakeRemote {
        reject: true,
        ..FakeRemote::default()
    });
    let service = user_service(cache.clone(), remote, SyncFailurePolicy::Rollback).await;
    let before = service.records().await;

    assert!(matches!(service.create(new_user()).await, Err(AppError::RemoteSync(_))));
    assert!(matches!(service.remove(id(3)).await, Err(AppError::RemoteSync(_))));
    assert!(matches!(
        service.toggle_status(id(1)).await,
        Err(AppError::RemoteSync(_))
    ));

    assert_eq!(service.records().await, before);
    assert_eq!(cached_len(&cache, "users").await, 8);
}

#[tokio::test]
async fn reads_do_not_wait_for_remote_push() {
    let remote = Arc::new(GatedRemote::default());
    let service = RecordService::open(
        user_schema().unwrap_or_else(|_| unreachable!()),
        seed_users().unwrap_or_default(),
        Arc::new(FakeCache::default()),
        remote.clone(),
        SyncFailurePolicy::Rollback,
    )
    .await
    .unwrap_or_else(|_| unreachable!());

    let toggling = tokio::spawn({
        let service = service.clone();
        async move { service.toggle_status(id(1)).await }
    });
    remote.entered.notified().await;

    let record = tokio::time::timeout(Duration::from_millis(500), service.get(id(1)))
        .await
        .unwrap_or_else(|_| unreachable!("read blocked behind remote push"));
    assert_eq!(
        record.ok().and_then(|record| record.text("status").map(str::to_owned)),
        Some("inactive".to_owned())
    );
    assert!(
        tokio::time::timeout(Duration::from_millis(500), service.len())
            .await
            .is_ok()
    );

    remote.release.notify_one();
    let outcome = toggling.await.unwrap_or_else(|_| unreachable!());
    assert!(outcome.is_ok());
}

#[tokio::test]
async fn rollback_keeps_edits_made_while_push_was_pending() {
    let remote = Arc::new(GatedRemote {
        reject: true,
        ..GatedRemote::default()
    });
    let service = RecordService::open(
        user_schema().unwrap_or_else(|_| unreachable!()),
        seed_users().unwrap_or_default(),
        Arc::new(FakeCache::default()),
        remote.clone(),
        SyncFailurePolicy::Rollback,
    )
    .await
    .unwrap_or_else(|_| unreachable!());

    let toggling = tokio::spawn({
        let service = service.clone();
        async move { service.toggle_status(id(1)).await }
    });
    remote.entered.notified().await;

    let renaming = tokio::spawn({
        let service = service.clone();
        async move {
            service
                .update(id(1), payload(json!({"name": "John M. Mwenda"})))
                .await
        }
    });
    remote.entered.notified().await;

    remote.release.notify_one();
    let toggled = toggling.await.unwrap_or_else(|_| unreachable!());
    assert!(matches!(toggled, Err(AppError::RemoteSync(_))));

    let john = service.get(id(1)).await.unwrap_or_else(|_| unreachable!());
    assert_eq!(john.text("status"), Some("active"));
    assert_eq!(john.text("name"), Some("John M. Mwenda"));

    remote.release.notify_one();
    let renamed = renaming.await.unwrap_or_else(|_| unreachable!());
    assert!(matches!(renamed, Err(AppError::RemoteSync(_))));
    let john = service.get(id(1)).await.unwrap_or_else(|_| unreachable!());
    assert_eq!(john.text("name"), Some("John Mwenda"));
    assert_eq!(john.text("status"), Some("active"));
}

#[tokio::test]
async fn road_numbers_outside_bounds_are_rejected() {
    let service = RecordService::open(
        road_schema().unwrap_or_else(|_| unreachable!()),
        seed_roads().unwrap_or_default(),
        Arc::new(FakeCache::default()),
        Arc::new(FakeRemote::default()),
        SyncFailurePolicy::Rollback,
    )
    .await
    .unwrap_or_else(|_| unreachable!());
    let before = service.records().await;

    let result = service
        .update(id(1), payload(json!({"progress": 250, "budget": -5})))
        .await;
    let Err(AppError::InvalidFields(fields)) = result else {
        unreachable!("expected field errors");
    };
    assert_eq!(fields.get("progress"), Some("Progress must be between 0 and 100"));
    assert_eq!(fields.get("budget"), Some("Budget must be at least 0"));
    assert_eq!(service.records().await, before);

    assert!(
        service
            .update(id(1), payload(json!({"progress": 100})))
            .await
            .is_ok()
    );
}

#[tokio::test]
async fn keep_local_policy_reports_divergence() {
    let remote = Arc::new(FakeRemote {
        reject: true,
        ..FakeRemote::default()
    });
    let service = user_service(
        Arc::new(FakeCache::default()),
        remote,
        SyncFailurePolicy::KeepLocal,
    )
    .await;

    let outcome = service.remove(id(3)).await.unwrap_or_else(|_| unreachable!());
    assert_eq!(outcome.value.id(), id(3));
    assert_eq!(outcome.remote_error.as_deref(), Some("backend returned 503"));
    assert_eq!(service.len().await, 7);
}

#[tokio::test]
async fn toggle_pushes_status_patch() {
    let remote = Arc::new(FakeRemote::default());
    let service = user_service(
        Arc::new(FakeCache::default()),
        remote.clone(),
        SyncFailurePolicy::Rollback,
    )
    .await;

    let toggled = service
        .toggle_status(id(7))
        .await
        .map(|outcome| outcome.value)
        .unwrap_or_else(|_| unreachable!());
    assert_eq!(toggled.text("status"), Some("active"));

    let changes = remote.changes.lock().await;
    assert_eq!(
        changes[0].kind,
        RemoteChangeKind::Update {
            id: id(7),
            patch: payload(json!({"status": "active"})),
        }
    );
}

#[tokio::test]
async fn list_filters_sorts_and_pages() {
    let service = user_service(
        Arc::new(FakeCache::default()),
        Arc::new(FakeRemote::default()),
        SyncFailurePolicy::Rollback,
    )
    .await;
    let schema = service.schema().clone();

    let filter = FilterState {
        status_filter: ChoiceFilter::Only("active".to_owned()),
        ..FilterState::default()
    };
    let sort = SortState::new(&schema, "name", SortDirection::Desc)
        .unwrap_or_else(|_| unreachable!());
    let page_size = NonZeroUsize::new(4).unwrap_or(NonZeroUsize::MIN);

    let first = service.list(&filter, &sort, 1, page_size).await;
    assert_eq!(first.total_matches, 6);
    assert_eq!(first.total_pages, 2);
    assert_eq!(first.items[0].text("name"), Some("Sarah Kimathi"));

    let beyond = service.list(&filter, &sort, 9, page_size).await;
    assert_eq!(beyond.current_page, 1);
    assert_eq!(beyond.items, first.items);
}

#[tokio::test]
async fn breakdown_counts_roles() {
    let service = user_service(
        Arc::new(FakeCache::default()),
        Arc::new(FakeRemote::default()),
        SyncFailurePolicy::Rollback,
    )
    .await;

    let counts = service.breakdown("role").await.unwrap_or_default();
    let supervisors = counts
        .iter()
        .find(|count| count.option == "Field Supervisor")
        .map(|count| count.count);
    assert_eq!(supervisors, Some(2));
    assert!(service.breakdown("name").await.is_err());
}

#[test]
fn failure_policy_transport_values() {
    assert_eq!(
        SyncFailurePolicy::parse_transport("keep_local").ok(),
        Some(SyncFailurePolicy::KeepLocal)
    );
    assert_eq!(SyncFailurePolicy::Rollback.as_str(), "rollback");
    assert!(SyncFailurePolicy::parse_transport("retry").is_err());
}
