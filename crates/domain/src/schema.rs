use std::collections::HashSet;
use std::str::FromStr;

use chrono::NaiveDate;
use roadwatch_core::{AppError, AppResult, NonEmptyString};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Logical name reserved for the store-assigned record identifier.
pub const RECORD_ID_FIELD: &str = "id";

/// Storage format for date fields.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Supported managed field types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    /// UTF-8 string field.
    Text,
    /// String field holding a `local@domain.tld` address.
    Email,
    /// One value from a declared option domain.
    Choice,
    /// Set of values from a declared option domain.
    MultiChoice,
    /// Calendar date stored as `YYYY-MM-DD`.
    Date,
    /// Numeric field.
    Number,
    /// Polyline of `[longitude, latitude]` pairs.
    Coordinates,
}

impl FieldType {
    /// Returns a stable storage value for the field type.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Email => "email",
            Self::Choice => "choice",
            Self::MultiChoice => "multi_choice",
            Self::Date => "date",
            Self::Number => "number",
            Self::Coordinates => "coordinates",
        }
    }

    /// Returns whether the type draws its values from an option domain.
    #[must_use]
    pub fn uses_options(&self) -> bool {
        matches!(self, Self::Choice | Self::MultiChoice)
    }

    fn shape_matches(self, value: &Value) -> bool {
        match self {
            Self::Text | Self::Email | Self::Choice => value.is_string(),
            Self::MultiChoice => value
                .as_array()
                .map(|items| items.iter().all(Value::is_string))
                .unwrap_or(false),
            Self::Date => value
                .as_str()
                .map(|text| text.trim().is_empty() || parse_date(text).is_some())
                .unwrap_or(false),
            Self::Number => value.is_number(),
            Self::Coordinates => value
                .as_array()
                .map(|points| {
                    points.iter().all(|point| {
                        point
                            .as_array()
                            .map(|pair| pair.len() == 2 && pair.iter().all(Value::is_number))
                            .unwrap_or(false)
                    })
                })
                .unwrap_or(false),
        }
    }
}

impl FromStr for FieldType {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "text" => Ok(Self::Text),
            "email" => Ok(Self::Email),
            "choice" => Ok(Self::Choice),
            "multi_choice" => Ok(Self::MultiChoice),
            "date" => Ok(Self::Date),
            "number" => Ok(Self::Number),
            "coordinates" => Ok(Self::Coordinates),
            _ => Err(AppError::Validation(format!(
                "unknown field type '{value}'"
            ))),
        }
    }
}

/// Parses a stored date value.
#[must_use]
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT).ok()
}

/// Definition of one field of a managed entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDefinition {
    logical_name: NonEmptyString,
    display_name: NonEmptyString,
    field_type: FieldType,
    is_required: bool,
    is_searchable: bool,
    is_sortable: bool,
    options: Vec<String>,
    minimum: Option<i64>,
    maximum: Option<i64>,
}

impl FieldDefinition {
    /// Creates a validated field definition.
    ///
    /// Choice types need a non-empty, duplicate-free option list; every other
    /// type must be declared without options.
    pub fn new(
        logical_name: impl Into<String>,
        display_name: impl Into<String>,
        field_type: FieldType,
        options: &[&str],
    ) -> AppResult<Self> {
        let logical_name = NonEmptyString::new(logical_name)?;
        if logical_name.as_str() == RECORD_ID_FIELD {
            return Err(AppError::Validation(format!(
                "field name '{RECORD_ID_FIELD}' is reserved for the record identifier"
            )));
        }

        match (field_type.uses_options(), options.is_empty()) {
            (true, true) => {
                return Err(AppError::Validation(format!(
                    "{} field '{}' requires at least one option",
                    field_type.as_str(),
                    logical_name.as_str()
                )));
            }
            (false, false) => {
                return Err(AppError::Validation(format!(
                    "options are only allowed for choice fields, not '{}'",
                    logical_name.as_str()
                )));
            }
            _ => {}
        }

        let mut seen = HashSet::new();
        for option in options {
            if option.trim().is_empty() || !seen.insert(*option) {
                return Err(AppError::Validation(format!(
                    "field '{}' has an empty or duplicate option '{option}'",
                    logical_name.as_str()
                )));
            }
        }

        Ok(Self {
            logical_name,
            display_name: NonEmptyString::new(display_name)?,
            field_type,
            is_required: false,
            is_searchable: false,
            is_sortable: false,
            options: options.iter().map(|option| (*option).to_owned()).collect(),
            minimum: None,
            maximum: None,
        })
    }

    /// Marks the field as required on create and edit.
    #[must_use]
    pub fn required(mut self) -> Self {
        self.is_required = true;
        self
    }

    /// Includes the field in free-text search.
    #[must_use]
    pub fn searchable(mut self) -> Self {
        self.is_searchable = true;
        self
    }

    /// Allows sorting by the field.
    #[must_use]
    pub fn sortable(mut self) -> Self {
        self.is_sortable = true;
        self
    }

    /// Sets the smallest value a number field accepts.
    #[must_use]
    pub fn at_least(mut self, minimum: i64) -> Self {
        self.minimum = Some(minimum);
        self
    }

    /// Sets the largest value a number field accepts.
    #[must_use]
    pub fn at_most(mut self, maximum: i64) -> Self {
        self.maximum = Some(maximum);
        self
    }

    /// Returns the field logical name.
    #[must_use]
    pub fn logical_name(&self) -> &NonEmptyString {
        &self.logical_name
    }

    /// Returns the display name.
    #[must_use]
    pub fn display_name(&self) -> &NonEmptyString {
        &self.display_name
    }

    /// Returns the field type.
    #[must_use]
    pub fn field_type(&self) -> FieldType {
        self.field_type
    }

    /// Returns whether the field is required.
    #[must_use]
    pub fn is_required(&self) -> bool {
        self.is_required
    }

    /// Returns whether the field participates in search.
    #[must_use]
    pub fn is_searchable(&self) -> bool {
        self.is_searchable
    }

    /// Returns whether the field can be used as a sort key.
    #[must_use]
    pub fn is_sortable(&self) -> bool {
        self.is_sortable
    }

    /// Returns the declared option domain.
    #[must_use]
    pub fn options(&self) -> &[String] {
        &self.options
    }

    /// Returns the range message when `value` lies outside the declared
    /// bounds.
    #[must_use]
    pub fn range_error(&self, value: f64) -> Option<String> {
        let below = self.minimum.is_some_and(|minimum| value < minimum as f64);
        let above = self.maximum.is_some_and(|maximum| value > maximum as f64);
        if !below && !above {
            return None;
        }

        let name = self.display_name.as_str();
        Some(match (self.minimum, self.maximum) {
            (Some(minimum), Some(maximum)) => {
                format!("{name} must be between {minimum} and {maximum}")
            }
            (Some(minimum), None) => format!("{name} must be at least {minimum}"),
            (None, Some(maximum)) => format!("{name} must be at most {maximum}"),
            (None, None) => format!("{name} is out of range"),
        })
    }

    /// Returns whether `value` belongs to the option domain.
    #[must_use]
    pub fn allows_option(&self, value: &str) -> bool {
        self.options.iter().any(|option| option == value)
    }

    /// Checks a value against the field type and option domain and returns its
    /// canonical form.
    ///
    /// Multi-valued fields collapse duplicates and follow option declaration
    /// order, so two sets with the same members compare equal.
    pub fn normalize_value(&self, value: &Value) -> AppResult<Value> {
        if value.is_null() {
            return Ok(Value::Null);
        }

        if !self.field_type.shape_matches(value) {
            return Err(AppError::Validation(format!(
                "value for '{}' does not match field type '{}'",
                self.logical_name.as_str(),
                self.field_type.as_str()
            )));
        }

        match self.field_type {
            FieldType::Choice => {
                let selected = value.as_str().unwrap_or_default();
                if !self.allows_option(selected) {
                    return Err(AppError::Validation(format!(
                        "'{selected}' is not a valid option for '{}'",
                        self.logical_name.as_str()
                    )));
                }
                Ok(value.clone())
            }
            FieldType::MultiChoice => {
                let selected: Vec<&str> = value
                    .as_array()
                    .map(|items| items.iter().filter_map(Value::as_str).collect())
                    .unwrap_or_default();

                if let Some(unknown) = selected.iter().find(|item| !self.allows_option(item)) {
                    return Err(AppError::Validation(format!(
                        "'{unknown}' is not a valid option for '{}'",
                        self.logical_name.as_str()
                    )));
                }

                Ok(Value::Array(
                    self.options
                        .iter()
                        .filter(|option| selected.contains(&option.as_str()))
                        .map(|option| Value::String(option.clone()))
                        .collect(),
                ))
            }
            FieldType::Number => match value.as_f64().and_then(|number| self.range_error(number)) {
                Some(message) => Err(AppError::Validation(message)),
                None => Ok(value.clone()),
            },
            _ => Ok(value.clone()),
        }
    }
}

/// Schema of one managed collection: its fields plus the roles some fields
/// play in filtering, status toggling and creation stamping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntitySchema {
    logical_name: NonEmptyString,
    display_name: NonEmptyString,
    fields: Vec<FieldDefinition>,
    category_field: Option<String>,
    status_field: Option<String>,
    created_date_field: Option<String>,
    default_sort_field: String,
}

impl EntitySchema {
    /// Creates a schema with invariant checks.
    ///
    /// Field names must be unique. The category and status fields, when
    /// declared, must be choice fields; the created date field must be a date
    /// field. The default sort field must be sortable or the record id.
    pub fn new(
        logical_name: impl Into<String>,
        display_name: impl Into<String>,
        fields: Vec<FieldDefinition>,
        category_field: Option<&str>,
        status_field: Option<&str>,
        created_date_field: Option<&str>,
        default_sort_field: &str,
    ) -> AppResult<Self> {
        let mut seen = HashSet::new();
        for field in &fields {
            if !seen.insert(field.logical_name().as_str().to_owned()) {
                return Err(AppError::Validation(format!(
                    "duplicate field logical name '{}' in schema",
                    field.logical_name().as_str()
                )));
            }
        }

        let schema = Self {
            logical_name: NonEmptyString::new(logical_name)?,
            display_name: NonEmptyString::new(display_name)?,
            fields,
            category_field: category_field.map(str::to_owned),
            status_field: status_field.map(str::to_owned),
            created_date_field: created_date_field.map(str::to_owned),
            default_sort_field: default_sort_field.to_owned(),
        };

        for (role, name) in [
            ("category", schema.category_field.as_deref()),
            ("status", schema.status_field.as_deref()),
        ] {
            if let Some(name) = name {
                let field = schema.require_field(name)?;
                if field.field_type() != FieldType::Choice {
                    return Err(AppError::Validation(format!(
                        "{role} field '{name}' must be a choice field"
                    )));
                }
            }
        }

        if let Some(name) = schema.created_date_field.as_deref()
            && schema.require_field(name)?.field_type() != FieldType::Date
        {
            return Err(AppError::Validation(format!(
                "created date field '{name}' must be a date field"
            )));
        }

        if !schema.is_sortable(schema.default_sort_field.as_str()) {
            return Err(AppError::Validation(format!(
                "default sort field '{}' is not sortable",
                schema.default_sort_field
            )));
        }

        Ok(schema)
    }

    /// Returns the collection logical name, used as resource and cache key.
    #[must_use]
    pub fn logical_name(&self) -> &NonEmptyString {
        &self.logical_name
    }

    /// Returns the display name.
    #[must_use]
    pub fn display_name(&self) -> &NonEmptyString {
        &self.display_name
    }

    /// Returns all fields in declaration order.
    #[must_use]
    pub fn fields(&self) -> &[FieldDefinition] {
        &self.fields
    }

    /// Finds a field by logical name.
    #[must_use]
    pub fn field(&self, logical_name: &str) -> Option<&FieldDefinition> {
        self.fields
            .iter()
            .find(|field| field.logical_name().as_str() == logical_name)
    }

    /// Finds a field or reports it as unknown.
    pub fn require_field(&self, logical_name: &str) -> AppResult<&FieldDefinition> {
        self.field(logical_name).ok_or_else(|| {
            AppError::Validation(format!(
                "unknown field '{logical_name}' for '{}'",
                self.logical_name.as_str()
            ))
        })
    }

    /// Returns the fields matched by free-text search.
    pub fn searchable_fields(&self) -> impl Iterator<Item = &FieldDefinition> {
        self.fields.iter().filter(|field| field.is_searchable())
    }

    /// Returns whether `logical_name` is a valid sort key.
    #[must_use]
    pub fn is_sortable(&self, logical_name: &str) -> bool {
        logical_name == RECORD_ID_FIELD
            || self
                .field(logical_name)
                .map(FieldDefinition::is_sortable)
                .unwrap_or(false)
    }

    /// Returns the field backing the category ("role") filter.
    #[must_use]
    pub fn category_field(&self) -> Option<&str> {
        self.category_field.as_deref()
    }

    /// Returns the field backing the status filter.
    #[must_use]
    pub fn status_field(&self) -> Option<&str> {
        self.status_field.as_deref()
    }

    /// Returns the date field stamped on create.
    #[must_use]
    pub fn created_date_field(&self) -> Option<&str> {
        self.created_date_field.as_deref()
    }

    /// Returns the initial sort key of a fresh view.
    #[must_use]
    pub fn default_sort_field(&self) -> &str {
        self.default_sort_field.as_str()
    }

    /// Returns the `(first, second)` values a status toggle flips between.
    ///
    /// Only status fields with exactly two options can be toggled.
    pub fn status_toggle_values(&self) -> AppResult<(&str, &str)> {
        let field = self
            .status_field
            .as_deref()
            .and_then(|name| self.field(name))
            .ok_or_else(|| {
                AppError::Validation(format!(
                    "'{}' records have no status field",
                    self.logical_name.as_str()
                ))
            })?;

        match field.options() {
            [first, second] => Ok((first.as_str(), second.as_str())),
            _ => Err(AppError::Validation(format!(
                "status field '{}' has {} options and cannot be toggled",
                field.logical_name().as_str(),
                field.options().len()
            ))),
        }
    }

    /// Checks every present value of a payload and returns its canonical form.
    ///
    /// Unknown fields and the reserved id field are rejected. Absent fields are
    /// left absent.
    pub fn normalize_payload(&self, payload: &Map<String, Value>) -> AppResult<Map<String, Value>> {
        let mut normalized = Map::new();
        for (name, value) in payload {
            if name == RECORD_ID_FIELD {
                return Err(AppError::Validation(
                    "record id is assigned by the store and cannot be written".to_owned(),
                ));
            }

            let field = self.require_field(name)?;
            normalized.insert(name.clone(), field.normalize_value(value)?);
        }

        Ok(normalized)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::{Map, Value, json};

    use super::{EntitySchema, FieldDefinition, FieldType};

    fn role_field() -> FieldDefinition {
        FieldDefinition::new("role", "Role", FieldType::Choice, &["Engineer", "Clerk"])
            .unwrap_or_else(|_| unreachable!())
    }

    fn tags_field() -> FieldDefinition {
        FieldDefinition::new("tags", "Tags", FieldType::MultiChoice, &["a", "b", "c"])
            .unwrap_or_else(|_| unreachable!())
    }

    fn object(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap_or_default()
    }

    #[test]
    fn choice_fields_require_options() {
        assert!(FieldDefinition::new("role", "Role", FieldType::Choice, &[]).is_err());
        assert!(FieldDefinition::new("name", "Name", FieldType::Text, &["x"]).is_err());
        assert!(FieldDefinition::new("role", "Role", FieldType::Choice, &["a", "a"]).is_err());
    }

    #[test]
    fn id_field_name_is_reserved() {
        assert!(FieldDefinition::new("id", "Id", FieldType::Number, &[]).is_err());
    }

    #[test]
    fn schema_rejects_duplicate_fields() {
        let result = EntitySchema::new(
            "things",
            "Things",
            vec![role_field(), role_field()],
            None,
            None,
            None,
            "id",
        );
        assert!(result.is_err());
    }

    #[test]
    fn category_field_must_be_choice() {
        let name = FieldDefinition::new("name", "Name", FieldType::Text, &[])
            .unwrap_or_else(|_| unreachable!());
        let result = EntitySchema::new("things", "Things", vec![name], Some("name"), None, None, "id");
        assert!(result.is_err());
    }

    #[test]
    fn default_sort_must_be_sortable() {
        let result = EntitySchema::new("things", "Things", vec![role_field()], None, None, None, "role");
        assert!(result.is_err());

        let sortable = EntitySchema::new(
            "things",
            "Things",
            vec![role_field().sortable()],
            None,
            None,
            None,
            "role",
        );
        assert!(sortable.is_ok());
    }

    #[test]
    fn multi_choice_values_collapse_and_follow_option_order() {
        let field = tags_field();
        let normalized = field.normalize_value(&json!(["c", "a", "c"]));
        assert_eq!(normalized.unwrap_or_default(), json!(["a", "c"]));

        let reordered = field.normalize_value(&json!(["a", "c"])).unwrap_or_default();
        let shuffled = field.normalize_value(&json!(["c", "a"])).unwrap_or_default();
        assert_eq!(reordered, shuffled);
    }

    #[test]
    fn choice_values_outside_domain_are_rejected() {
        assert!(role_field().normalize_value(&json!("Janitor")).is_err());
        assert!(tags_field().normalize_value(&json!(["a", "z"])).is_err());
    }

    #[test]
    fn empty_choice_is_outside_domain() {
        assert!(role_field().normalize_value(&json!("")).is_err());
        assert!(role_field().normalize_value(&json!("Clerk")).is_ok());
    }

    #[test]
    fn number_bounds_are_enforced() {
        let progress = FieldDefinition::new("progress", "Progress", FieldType::Number, &[])
            .unwrap_or_else(|_| unreachable!())
            .at_least(0)
            .at_most(100);
        assert!(progress.normalize_value(&json!(0)).is_ok());
        assert!(progress.normalize_value(&json!(100.0)).is_ok());
        assert!(progress.normalize_value(&json!(250)).is_err());
        assert_eq!(
            progress.range_error(-1.0).as_deref(),
            Some("Progress must be between 0 and 100")
        );

        let budget = FieldDefinition::new("budget", "Budget", FieldType::Number, &[])
            .unwrap_or_else(|_| unreachable!())
            .at_least(0);
        assert_eq!(budget.range_error(-5.0).as_deref(), Some("Budget must be at least 0"));
        assert_eq!(budget.range_error(2_400_000_000.0), None);
    }

    #[test]
    fn date_and_coordinate_shapes_are_checked() {
        let date = FieldDefinition::new("seen", "Seen", FieldType::Date, &[])
            .unwrap_or_else(|_| unreachable!());
        assert!(date.normalize_value(&json!("2023-05-15")).is_ok());
        assert!(date.normalize_value(&json!("15/05/2023")).is_err());

        let path = FieldDefinition::new("path", "Path", FieldType::Coordinates, &[])
            .unwrap_or_else(|_| unreachable!());
        assert!(path.normalize_value(&json!([[37.6, 0.08], [37.7, 0.04]])).is_ok());
        assert!(path.normalize_value(&json!([[37.6]])).is_err());
    }

    #[test]
    fn payload_normalization_rejects_unknown_and_id_fields() {
        let schema = EntitySchema::new(
            "things",
            "Things",
            vec![role_field(), tags_field()],
            Some("role"),
            None,
            None,
            "id",
        )
        .unwrap_or_else(|_| unreachable!());

        assert!(schema.normalize_payload(&object(json!({"id": 3}))).is_err());
        assert!(schema.normalize_payload(&object(json!({"colour": "red"}))).is_err());
        assert!(
            schema
                .normalize_payload(&object(json!({"role": "Clerk", "tags": ["b", "b"]})))
                .is_ok()
        );
    }

    #[test]
    fn status_toggle_needs_two_options() {
        let binary = FieldDefinition::new("status", "Status", FieldType::Choice, &["on", "off"])
            .unwrap_or_else(|_| unreachable!());
        let schema = EntitySchema::new("things", "Things", vec![binary], None, Some("status"), None, "id")
            .unwrap_or_else(|_| unreachable!());
        assert_eq!(
            schema.status_toggle_values().unwrap_or(("", "")),
            ("on", "off")
        );

        let ternary = FieldDefinition::new("status", "Status", FieldType::Choice, &["a", "b", "c"])
            .unwrap_or_else(|_| unreachable!());
        let schema = EntitySchema::new("things", "Things", vec![ternary], None, Some("status"), None, "id")
            .unwrap_or_else(|_| unreachable!());
        assert!(schema.status_toggle_values().is_err());
    }
}
