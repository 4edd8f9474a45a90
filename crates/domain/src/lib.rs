//! Domain entities and invariants.

#![forbid(unsafe_code)]

mod geo;
mod presets;
mod record;
mod schema;
mod stats;

pub use geo::{Coordinate, DEFAULT_CENTER, calculate_center};
pub use presets::{
    ASSET_STATUSES, PERMISSIONS, ROAD_STATUSES, ROLES, USER_STATUSES, asset_schema, road_schema,
    seed_assets, seed_roads, seed_users, user_schema,
};
pub use record::{Record, RecordId};
pub use schema::{
    DATE_FORMAT, EntitySchema, FieldDefinition, FieldType, RECORD_ID_FIELD, parse_date,
};
pub use stats::{OptionCount, RoadStats, count_by_option};
