use std::num::NonZeroUsize;
use std::sync::Arc;

use roadwatch_application::{RecordCache, RecordService, RemoteRecordSync, SyncFailurePolicy};
use roadwatch_core::{AppError, AppResult};
use roadwatch_domain::{
    EntitySchema, Record, asset_schema, road_schema, seed_assets, seed_roads, seed_users,
    user_schema,
};
use roadwatch_infrastructure::{
    HttpRemoteRecordSync, InMemoryRecordCache, JsonFileRecordCache, NoopRemoteRecordSync,
};
use tracing::info;

use crate::api_config::ApiConfig;
use crate::state::{AppState, CollectionState};

pub async fn build_app_state(config: &ApiConfig) -> AppResult<AppState> {
    let cache = build_record_cache(config);
    let remote = build_remote_sync(config)?;

    Ok(AppState {
        users: open_collection(
            user_schema()?,
            seed_users()?,
            &cache,
            &remote,
            config.sync_failure_policy,
            config.page_size,
        )
        .await?,
        assets: open_collection(
            asset_schema()?,
            seed_assets()?,
            &cache,
            &remote,
            config.sync_failure_policy,
            config.page_size,
        )
        .await?,
        roads: open_collection(
            road_schema()?,
            seed_roads()?,
            &cache,
            &remote,
            config.sync_failure_policy,
            config.page_size,
        )
        .await?,
    })
}

fn build_record_cache(config: &ApiConfig) -> Arc<dyn RecordCache> {
    match &config.cache_dir {
        Some(directory) => {
            info!(cache_dir = %directory.display(), "using JSON file record cache");
            Arc::new(JsonFileRecordCache::new(directory.clone()))
        }
        None => {
            info!("CACHE_DIR not configured; records are kept in memory only");
            Arc::new(InMemoryRecordCache::new())
        }
    }
}

fn build_remote_sync(config: &ApiConfig) -> AppResult<Arc<dyn RemoteRecordSync>> {
    let Some(remote_sync) = &config.remote_sync else {
        info!("remote sync disabled (REMOTE_SYNC_URL not configured)");
        return Ok(Arc::new(NoopRemoteRecordSync::new()));
    };

    let http_client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(10))
        .build()
        .map_err(|error| AppError::Internal(format!("failed to build HTTP client: {error}")))?;

    info!(
        base_url = %remote_sync.base_url,
        max_attempts = remote_sync.max_attempts,
        retry_backoff_ms = remote_sync.retry_backoff_ms,
        failure_policy = config.sync_failure_policy.as_str(),
        "remote sync enabled"
    );

    Ok(Arc::new(HttpRemoteRecordSync::new(
        http_client,
        remote_sync.base_url.clone(),
        remote_sync.max_attempts,
        remote_sync.retry_backoff_ms,
    )?))
}

async fn open_collection(
    schema: EntitySchema,
    seed: Vec<Record>,
    cache: &Arc<dyn RecordCache>,
    remote: &Arc<dyn RemoteRecordSync>,
    failure_policy: SyncFailurePolicy,
    page_size: NonZeroUsize,
) -> AppResult<CollectionState> {
    let service =
        RecordService::open(schema, seed, cache.clone(), remote.clone(), failure_policy).await?;

    Ok(CollectionState { service, page_size })
}
