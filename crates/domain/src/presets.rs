//! The dashboard's managed collections and their initial data.

use roadwatch_core::{AppError, AppResult};
use serde_json::{Value, json};

use crate::record::{Record, RecordId};
use crate::schema::{EntitySchema, FieldDefinition, FieldType};

/// Roles a dashboard user can hold.
pub const ROLES: &[&str] = &[
    "County Engineer",
    "Field Supervisor",
    "Contract Manager",
    "Finance Officer",
    "Public Relations",
    "System Administrator",
];

/// Permissions grantable to a dashboard user.
pub const PERMISSIONS: &[&str] = &["view", "edit", "admin", "report", "finance", "audit"];

/// Account states of a dashboard user, in toggle order.
pub const USER_STATUSES: &[&str] = &["active", "inactive"];

/// Operating states of a tracked asset.
pub const ASSET_STATUSES: &[&str] = &["Active", "Maintenance", "Idle"];

/// Lifecycle states of a road project.
pub const ROAD_STATUSES: &[&str] = &["ongoing", "completed", "planned"];

/// Schema for the user management panel.
pub fn user_schema() -> AppResult<EntitySchema> {
    EntitySchema::new(
        "users",
        "Users",
        vec![
            FieldDefinition::new("name", "Name", FieldType::Text, &[])?
                .required()
                .searchable()
                .sortable(),
            FieldDefinition::new("email", "Email", FieldType::Email, &[])?
                .required()
                .searchable()
                .sortable(),
            FieldDefinition::new("phone", "Phone", FieldType::Text, &[])?.searchable(),
            FieldDefinition::new("role", "Role", FieldType::Choice, ROLES)?
                .required()
                .searchable()
                .sortable(),
            FieldDefinition::new("permissions", "Permission", FieldType::MultiChoice, PERMISSIONS)?
                .required()
                .searchable(),
            FieldDefinition::new("status", "Status", FieldType::Choice, USER_STATUSES)?
                .required()
                .sortable(),
            FieldDefinition::new("lastActive", "Last Active", FieldType::Date, &[])?.sortable(),
        ],
        Some("role"),
        Some("status"),
        Some("lastActive"),
        "name",
    )
}

/// Schema for the equipment tracking panel.
pub fn asset_schema() -> AppResult<EntitySchema> {
    EntitySchema::new(
        "assets",
        "Assets",
        vec![
            FieldDefinition::new("name", "Name", FieldType::Text, &[])?
                .required()
                .searchable()
                .sortable(),
            FieldDefinition::new("status", "Status", FieldType::Choice, ASSET_STATUSES)?
                .required()
                .sortable(),
            FieldDefinition::new("location", "Location", FieldType::Text, &[])?
                .required()
                .searchable()
                .sortable(),
            FieldDefinition::new("lastService", "Last Service", FieldType::Date, &[])?.sortable(),
        ],
        None,
        Some("status"),
        None,
        "id",
    )
}

/// Schema for road construction projects.
pub fn road_schema() -> AppResult<EntitySchema> {
    EntitySchema::new(
        "roads",
        "Roads",
        vec![
            FieldDefinition::new("name", "Name", FieldType::Text, &[])?
                .required()
                .searchable()
                .sortable(),
            FieldDefinition::new("length", "Length (km)", FieldType::Number, &[])?
                .at_least(0)
                .required()
                .sortable(),
            FieldDefinition::new("budget", "Budget", FieldType::Number, &[])?
                .at_least(0)
                .required()
                .sortable(),
            FieldDefinition::new("status", "Status", FieldType::Choice, ROAD_STATUSES)?
                .required()
                .searchable()
                .sortable(),
            FieldDefinition::new("progress", "Progress", FieldType::Number, &[])?
                .at_least(0)
                .at_most(100)
                .sortable(),
            FieldDefinition::new("startDate", "Start Date", FieldType::Date, &[])?
                .required()
                .sortable(),
            FieldDefinition::new("endDate", "End Date", FieldType::Date, &[])?
                .required()
                .sortable(),
            FieldDefinition::new("contractor", "Contractor", FieldType::Text, &[])?
                .searchable()
                .sortable(),
            FieldDefinition::new("description", "Description", FieldType::Text, &[])?
                .required()
                .searchable(),
            FieldDefinition::new("mapCoordinates", "Map Coordinates", FieldType::Coordinates, &[])?,
        ],
        None,
        Some("status"),
        None,
        "name",
    )
}

/// Initial users of the management panel.
pub fn seed_users() -> AppResult<Vec<Record>> {
    seed_records(vec![
        json!({"name": "John Mwenda", "role": "County Engineer", "permissions": ["edit", "admin"], "email": "john@county.gov", "phone": "+254 712 345 678", "status": "active", "lastActive": "2023-05-15"}),
        json!({"name": "Sarah Kimathi", "role": "Field Supervisor", "permissions": ["view", "report"], "email": "sarah@county.gov", "phone": "+254 723 456 789", "status": "active", "lastActive": "2023-05-18"}),
        json!({"name": "David Muriuki", "role": "Contract Manager", "permissions": ["view", "edit"], "email": "david@county.gov", "phone": "+254 734 567 890", "status": "inactive", "lastActive": "2023-04-22"}),
        json!({"name": "Grace Karanja", "role": "Finance Officer", "permissions": ["view", "finance"], "email": "grace@county.gov", "phone": "+254 745 678 901", "status": "active", "lastActive": "2023-05-20"}),
        json!({"name": "Peter Gitonga", "role": "Public Relations", "permissions": ["view"], "email": "peter@county.gov", "phone": "+254 756 789 012", "status": "active", "lastActive": "2023-05-19"}),
        json!({"name": "Lucy Wambui", "role": "System Administrator", "permissions": ["edit", "admin", "audit"], "email": "lucy@county.gov", "phone": "+254 767 890 123", "status": "active", "lastActive": "2023-05-21"}),
        json!({"name": "Michael Otieno", "role": "Field Supervisor", "permissions": ["view", "report"], "email": "michael@county.gov", "phone": "+254 778 901 234", "status": "inactive", "lastActive": "2023-03-10"}),
        json!({"name": "Esther Njeri", "role": "Finance Officer", "permissions": ["view", "report", "finance"], "email": "esther@county.gov", "phone": "+254 789 012 345", "status": "active", "lastActive": "2023-05-17"}),
    ])
}

/// Initial equipment of the asset tracker.
pub fn seed_assets() -> AppResult<Vec<Record>> {
    seed_records(vec![
        json!({"name": "Excavator", "status": "Active", "location": "Maua Highway", "lastService": "2023-05-15"}),
        json!({"name": "Bulldozer", "status": "Maintenance", "location": "Nkubu Bypass", "lastService": "2023-06-20"}),
        json!({"name": "Asphalt Paver", "status": "Active", "location": "Makutano Junction", "lastService": "2023-04-30"}),
        json!({"name": "Road Roller", "status": "Idle", "location": "Mikinduri Road", "lastService": "2023-07-10"}),
        json!({"name": "Dump Truck", "status": "Active", "location": "Kianjai Corridor", "lastService": "2023-05-28"}),
    ])
}

/// Initial road projects.
pub fn seed_roads() -> AppResult<Vec<Record>> {
    seed_records(vec![
        json!({
            "name": "Maua Highway",
            "length": 18.5,
            "budget": 2_400_000_000_u64,
            "status": "ongoing",
            "progress": 65,
            "startDate": "2023-01-15",
            "endDate": "2024-10-30",
            "contractor": "Meru Builders Ltd.",
            "description": "Connects Meru County's agricultural heartland to national markets.",
            "mapCoordinates": [[37.60, 0.08], [37.65, 0.06], [37.70, 0.04], [37.75, 0.02]]
        }),
        json!({
            "name": "Nkubu Bypass",
            "length": 7.2,
            "budget": 850_000_000_u64,
            "status": "ongoing",
            "progress": 45,
            "startDate": "2023-03-10",
            "endDate": "2024-05-15",
            "contractor": "Highway Constructors Co.",
            "description": "Relieves traffic congestion in the central business district.",
            "mapCoordinates": [[37.58, 0.00], [37.62, -0.02], [37.65, -0.04]]
        }),
        json!({
            "name": "Makutano Junction",
            "length": 3.8,
            "budget": 420_000_000_u64,
            "status": "completed",
            "progress": 100,
            "startDate": "2022-11-01",
            "endDate": "2023-08-20",
            "contractor": "Urban Roads Ltd.",
            "description": "Junction upgrade improving traffic flow and safety.",
            "mapCoordinates": [[37.67, 0.03], [37.68, 0.02], [37.69, 0.01]]
        }),
    ])
}

fn seed_records(payloads: Vec<Value>) -> AppResult<Vec<Record>> {
    payloads
        .into_iter()
        .zip(1_u64..)
        .map(|(payload, id)| {
            let Value::Object(data) = payload else {
                return Err(AppError::Internal("seed payload must be an object".to_owned()));
            };
            Record::new(RecordId::new(id)?, data)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{
        asset_schema, road_schema, seed_assets, seed_roads, seed_users, user_schema,
    };

    #[test]
    fn schemas_are_valid() {
        assert!(user_schema().is_ok());
        assert!(asset_schema().is_ok());
        assert!(road_schema().is_ok());
    }

    #[test]
    fn seeds_conform_to_their_schemas() {
        let cases = [
            (user_schema(), seed_users(), 8),
            (asset_schema(), seed_assets(), 5),
            (road_schema(), seed_roads(), 3),
        ];

        for (schema, seed, expected_len) in cases {
            let schema = schema.unwrap_or_else(|_| unreachable!());
            let seed = seed.unwrap_or_default();
            assert_eq!(seed.len(), expected_len);
            for record in &seed {
                let normalized = schema.normalize_payload(record.data());
                assert_eq!(normalized.ok().as_ref(), Some(record.data()));
            }
        }
    }

    #[test]
    fn seed_ids_start_at_one() {
        let ids: Vec<u64> = seed_users()
            .unwrap_or_default()
            .iter()
            .map(|record| record.id().get())
            .collect();
        assert_eq!(ids, (1..=8).collect::<Vec<_>>());
    }

    #[test]
    fn only_users_can_toggle_status() {
        let users = user_schema().unwrap_or_else(|_| unreachable!());
        assert_eq!(
            users.status_toggle_values().unwrap_or(("", "")),
            ("active", "inactive")
        );

        let assets = asset_schema().unwrap_or_else(|_| unreachable!());
        assert!(assets.status_toggle_values().is_err());
    }
}
