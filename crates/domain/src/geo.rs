use roadwatch_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Map centre used when a road has no coordinates.
pub const DEFAULT_CENTER: Coordinate = Coordinate {
    lng: 37.65,
    lat: 0.05,
};

/// A longitude/latitude pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    /// Longitude in degrees.
    pub lng: f64,
    /// Latitude in degrees.
    pub lat: f64,
}

impl Coordinate {
    /// Parses a JSON `[[lng, lat], ...]` polyline.
    pub fn parse_polyline(value: &Value) -> AppResult<Vec<Self>> {
        let invalid = || {
            AppError::Validation("coordinates must be an array of [lng, lat] pairs".to_owned())
        };

        value
            .as_array()
            .ok_or_else(invalid)?
            .iter()
            .map(|point| match point.as_array().map(Vec::as_slice) {
                Some([lng, lat]) => Ok(Self {
                    lng: lng.as_f64().ok_or_else(invalid)?,
                    lat: lat.as_f64().ok_or_else(invalid)?,
                }),
                _ => Err(invalid()),
            })
            .collect()
    }
}

/// Returns the centroid of `points`: the mean longitude and latitude.
#[must_use]
pub fn calculate_center(points: &[Coordinate]) -> Coordinate {
    if points.is_empty() {
        return DEFAULT_CENTER;
    }

    let (lng, lat) = points
        .iter()
        .fold((0.0, 0.0), |(lng, lat), point| (lng + point.lng, lat + point.lat));
    let count = points.len() as f64;

    Coordinate {
        lng: lng / count,
        lat: lat / count,
    }
}
