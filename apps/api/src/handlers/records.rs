use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use roadwatch_application::{ChoiceFilter, FilterState, SortDirection, SortState};
use roadwatch_domain::RecordId;
use serde_json::{Map, Value};
use tracing::warn;

use crate::dto::{BreakdownResponse, OptionCountResponse, RecordListQuery, RecordListResponse};
use crate::error::ApiResult;
use crate::state::CollectionState;


pub async fn list_records_handler(
    State(collection): State<CollectionState>,
    Query(query): Query<RecordListQuery>,
) -> ApiResult<Json<RecordListResponse>> {
    let schema = collection.service.schema();
    let filter = FilterState {
        search_term: query.search.unwrap_or_default(),
        category_filter: ChoiceFilter::parse_transport(query.category.as_deref().unwrap_or_default()),
        status_filter: ChoiceFilter::parse_transport(query.status.as_deref().unwrap_or_default()),
    };

    let direction = query
        .order
        .as_deref()
        .map(SortDirection::parse_transport)
        .transpose()?
        .unwrap_or_default();
    let sort = match query.sort.as_deref() {
        Some(key) => SortState::new(schema, key, direction)?,
        None => SortState {
            direction,
            ..SortState::default_for(schema)
        },
    };

    let page = collection
        .service
        .list(&filter, &sort, query.page.unwrap_or(1), collection.page_size)
        .await;

    Ok(Json(RecordListResponse::from_page(
        page,
        collection.page_size.get(),
    )))
}

pub async fn create_record_handler(
    State(collection): State<CollectionState>,
    Json(payload): Json<Map<String, Value>>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let outcome = collection.service.create(payload).await?;
    if let Some(remote_error) = outcome.remote_error {
        warn!(
            error = %remote_error,
            resource = %collection.service.schema().logical_name().as_str(),
            record_id = %outcome.value.id(),
            "record created locally but not mirrored to backend"
        );
    }

    Ok((StatusCode::CREATED, Json(outcome.value.to_value())))
}

pub async fn get_record_handler(
    State(collection): State<CollectionState>,
    Path(record_id): Path<u64>,
) -> ApiResult<Json<Value>> {
    let record = collection.service.get(RecordId::new(record_id)?).await?;

    Ok(Json(record.to_value()))
}

pub async fn update_record_handler(
    State(collection): State<CollectionState>,
    Path(record_id): Path<u64>,
    Json(patch): Json<Map<String, Value>>,
) -> ApiResult<Json<Value>> {
    let outcome = collection
        .service
        .update(RecordId::new(record_id)?, patch)
        .await?;
    if let Some(remote_error) = outcome.remote_error {
        warn!(
            error = %remote_error,
            resource = %collection.service.schema().logical_name().as_str(),
            record_id = %outcome.value.id(),
            "record updated locally but not mirrored to backend"
        );
    }

    Ok(Json(outcome.value.to_value()))
}

pub async fn delete_record_handler(
    State(collection): State<CollectionState>,
    Path(record_id): Path<u64>,
) -> ApiResult<StatusCode> {
    let outcome = collection.service.remove(RecordId::new(record_id)?).await?;
    if let Some(remote_error) = outcome.remote_error {
        warn!(
            error = %remote_error,
            resource = %collection.service.schema().logical_name().as_str(),
            record_id = %outcome.value.id(),
            "record deleted locally but not mirrored to backend"
        );
    }

    Ok(StatusCode::NO_CONTENT)
}

pub async fn toggle_status_handler(
    State(collection): State<CollectionState>,
    Path(record_id): Path<u64>,
) -> ApiResult<Json<Value>> {
    let outcome = collection
        .service
        .toggle_status(RecordId::new(record_id)?)
        .await?;
    if let Some(remote_error) = outcome.remote_error {
        warn!(
            error = %remote_error,
            resource = %collection.service.schema().logical_name().as_str(),
            record_id = %outcome.value.id(),
            "status toggled locally but not mirrored to backend"
        );
    }

    Ok(Json(outcome.value.to_value()))
}

pub async fn breakdown_handler(
    State(collection): State<CollectionState>,
    Path(field): Path<String>,
) -> ApiResult<Json<BreakdownResponse>> {
    let counts = collection
        .service
        .breakdown(field.as_str())
        .await?
        .into_iter()
        .map(OptionCountResponse::from)
        .collect();

    Ok(Json(BreakdownResponse { field, counts }))
}
