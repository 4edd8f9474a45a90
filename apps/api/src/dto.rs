mod common;
mod records;
mod roads;

pub use common::HealthResponse;
pub use records::{BreakdownResponse, OptionCountResponse, RecordListQuery, RecordListResponse};
pub use roads::{
    RoadCenterResponse, RoadFeature, RoadFeatureCollection, RoadFeatureProperties,
    RoadGeometry, RoadStatsResponse,
};

#[cfg(test)]
mod tests {
    use super::{
        BreakdownResponse, HealthResponse, OptionCountResponse, RecordListQuery,
        RecordListResponse, RoadCenterResponse, RoadFeature, RoadFeatureCollection,
        RoadFeatureProperties, RoadGeometry, RoadStatsResponse,
    };

    use crate::error::ErrorResponse;
    use ts_rs::Config;
    use ts_rs::TS;

    #[test]
    fn export_ts_bindings() -> Result<(), ts_rs::ExportError> {
        let config = Config::default();

        HealthResponse::export(&config)?;
        ErrorResponse::export(&config)?;
        RecordListQuery::export(&config)?;
        RecordListResponse::export(&config)?;
        OptionCountResponse::export(&config)?;
        BreakdownResponse::export(&config)?;
        RoadStatsResponse::export(&config)?;
        RoadCenterResponse::export(&config)?;
        RoadGeometry::export(&config)?;
        RoadFeatureProperties::export(&config)?;
        RoadFeature::export(&config)?;
        RoadFeatureCollection::export(&config)?;

        Ok(())
    }
}
