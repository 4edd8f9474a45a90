use axum::Json;
use axum::extract::{Path, State};
use roadwatch_domain::{Coordinate, RecordId, RoadStats, calculate_center};
use serde_json::Value;

use crate::dto::{RoadCenterResponse, RoadFeature, RoadFeatureCollection, RoadStatsResponse};
use crate::error::ApiResult;
use crate::state::CollectionState;

const COORDINATES_FIELD: &str = "mapCoordinates";

pub async fn road_stats_handler(
    State(roads): State<CollectionState>,
) -> Json<RoadStatsResponse> {
    let records = roads.service.records().await;

    Json(RoadStatsResponse::from(RoadStats::from_records(&records)))
}

pub async fn road_center_handler(
    State(roads): State<CollectionState>,
    Path(record_id): Path<u64>,
) -> ApiResult<Json<RoadCenterResponse>> {
    let record = roads.service.get(RecordId::new(record_id)?).await?;
    let points = polyline(record.field(COORDINATES_FIELD))?;

    Ok(Json(RoadCenterResponse::new(
        record.id().get(),
        calculate_center(&points),
    )))
}

pub async fn road_map_handler(
    State(roads): State<CollectionState>,
) -> ApiResult<Json<RoadFeatureCollection>> {
    let records = roads.service.records().await;
    let features = records
        .iter()
        .map(|record| {
            polyline(record.field(COORDINATES_FIELD))
                .map(|points| RoadFeature::new(record, &points))
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Json(RoadFeatureCollection {
        kind: "FeatureCollection",
        features,
    }))
}

fn polyline(value: Option<&Value>) -> Result<Vec<Coordinate>, roadwatch_core::AppError> {
    match value {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(value) => Coordinate::parse_polyline(value),
    }
}
