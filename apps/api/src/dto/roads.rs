use roadwatch_domain::{Coordinate, Record, RoadStats};
use serde::Serialize;
use ts_rs::TS;

/// Road portfolio statistics.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/road-stats-response.ts"
)]
pub struct RoadStatsResponse {
    pub total_roads: usize,
    pub completed_roads: usize,
    pub in_progress_roads: usize,
    pub planned_roads: usize,
    pub budget_allocated: f64,
    pub budget_spent: f64,
}

impl From<RoadStats> for RoadStatsResponse {
    fn from(value: RoadStats) -> Self {
        Self {
            total_roads: value.total_roads,
            completed_roads: value.completed_roads,
            in_progress_roads: value.in_progress_roads,
            planned_roads: value.planned_roads,
            budget_allocated: value.budget_allocated,
            budget_spent: value.budget_spent,
        }
    }
}

/// Map centre of one road as `[lng, lat]`.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/road-center-response.ts"
)]
pub struct RoadCenterResponse {
    pub id: u64,
    pub center: [f64; 2],
}

impl RoadCenterResponse {
    pub fn new(id: u64, center: Coordinate) -> Self {
        Self {
            id,
            center: [center.lng, center.lat],
        }
    }
}

/// GeoJSON `LineString` geometry.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/road-geometry.ts"
)]
pub struct RoadGeometry {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub coordinates: Vec<[f64; 2]>,
}

/// Properties shown on a road's map feature.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/road-feature-properties.ts"
)]
pub struct RoadFeatureProperties {
    pub id: u64,
    pub name: String,
    pub status: String,
    #[ts(type = "number | null")]
    pub progress: Option<f64>,
}

/// GeoJSON feature for one road.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/road-feature.ts"
)]
pub struct RoadFeature {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub properties: RoadFeatureProperties,
    pub geometry: RoadGeometry,
}

impl RoadFeature {
    pub fn new(record: &Record, coordinates: &[Coordinate]) -> Self {
        Self {
            kind: "Feature",
            properties: RoadFeatureProperties {
                id: record.id().get(),
                name: record.text("name").unwrap_or_default().to_owned(),
                status: record.text("status").unwrap_or_default().to_owned(),
                progress: record.field("progress").and_then(serde_json::Value::as_f64),
            },
            geometry: RoadGeometry {
                kind: "LineString",
                coordinates: coordinates.iter().map(|point| [point.lng, point.lat]).collect(),
            },
        }
    }
}

/// GeoJSON collection of every road.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/road-feature-collection.ts"
)]
pub struct RoadFeatureCollection {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub features: Vec<RoadFeature>,
}
