use std::cmp::Ordering;

use roadwatch_core::{AppError, AppResult};
use roadwatch_domain::{EntitySchema, FieldType, RECORD_ID_FIELD, Record, parse_date};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Transport value selecting every record in an exact-match filter.
pub const FILTER_ALL: &str = "all";

/// Exact-match filter over a choice field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub enum ChoiceFilter {
    /// No restriction.
    #[default]
    All,
    /// Only records whose field equals the value.
    Only(String),
}

impl ChoiceFilter {
    /// Parses transport value; `"all"` and the empty string mean no restriction.
    #[must_use]
    pub fn parse_transport(value: &str) -> Self {
        match value {
            "" | FILTER_ALL => Self::All,
            other => Self::Only(other.to_owned()),
        }
    }

    /// Returns the stable transport value.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::All => FILTER_ALL,
            Self::Only(value) => value.as_str(),
        }
    }

    fn matches(&self, value: Option<&Value>) -> bool {
        match self {
            Self::All => true,
            Self::Only(expected) => value.and_then(Value::as_str) == Some(expected.as_str()),
        }
    }
}

impl From<String> for ChoiceFilter {
    fn from(value: String) -> Self {
        Self::parse_transport(value.as_str())
    }
}

impl From<ChoiceFilter> for String {
    fn from(value: ChoiceFilter) -> Self {
        value.as_str().to_owned()
    }
}

/// Search and filter inputs of a list view.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterState {
    /// Case-insensitive substring matched against searchable fields.
    pub search_term: String,
    /// Filter on the schema's category field.
    pub category_filter: ChoiceFilter,
    /// Filter on the schema's status field.
    pub status_filter: ChoiceFilter,
}

/// Sort direction of a list view.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    /// Ascending order.
    #[default]
    Asc,
    /// Descending order.
    Desc,
}

impl SortDirection {
    /// Parses transport value into sort direction.
    pub fn parse_transport(value: &str) -> AppResult<Self> {
        match value {
            "asc" => Ok(Self::Asc),
            "desc" => Ok(Self::Desc),
            _ => Err(AppError::Validation(format!(
                "unknown sort direction '{value}'"
            ))),
        }
    }

    /// Returns the stable transport value.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }

    /// Returns the opposite direction.
    #[must_use]
    pub fn flipped(self) -> Self {
        match self {
            Self::Asc => Self::Desc,
            Self::Desc => Self::Asc,
        }
    }
}

/// Sort key and direction of a list view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortState {
    /// Field logical name, or `id`.
    pub key: String,
    /// Sort direction.
    pub direction: SortDirection,
}

impl SortState {
    /// Creates a sort on a key the schema allows.
    pub fn new(schema: &EntitySchema, key: &str, direction: SortDirection) -> AppResult<Self> {
        if !schema.is_sortable(key) {
            return Err(AppError::Validation(format!(
                "'{key}' is not a sortable field of '{}'",
                schema.logical_name().as_str()
            )));
        }

        Ok(Self {
            key: key.to_owned(),
            direction,
        })
    }

    /// Returns the schema's initial sort.
    #[must_use]
    pub fn default_for(schema: &EntitySchema) -> Self {
        Self {
            key: schema.default_sort_field().to_owned(),
            direction: SortDirection::Asc,
        }
    }

    /// Selecting the active key flips direction; a new key starts ascending.
    #[must_use]
    pub fn toggled(&self, key: &str) -> Self {
        if self.key == key {
            Self {
                key: self.key.clone(),
                direction: self.direction.flipped(),
            }
        } else {
            Self {
                key: key.to_owned(),
                direction: SortDirection::Asc,
            }
        }
    }
}

/// Derives the filtered, searched and sorted view of a collection.
///
/// Pure: the same inputs always produce the same sequence. The sort is stable,
/// so records with equal keys keep their collection order in both directions.
#[must_use]
pub fn derive_records(
    schema: &EntitySchema,
    records: &[Record],
    filter: &FilterState,
    sort: &SortState,
) -> Vec<Record> {
    let search_term = filter.search_term.to_lowercase();

    let mut listed: Vec<Record> = records
        .iter()
        .filter(|record| {
            matches_search(schema, record, search_term.as_str())
                && matches_choice(schema.category_field(), &filter.category_filter, record)
                && matches_choice(schema.status_field(), &filter.status_filter, record)
        })
        .cloned()
        .collect();

    let field_type = schema.field(sort.key.as_str()).map(|field| field.field_type());
    listed.sort_by(|left, right| {
        let ordering = compare_for_sort(left, right, sort.key.as_str(), field_type);
        match sort.direction {
            SortDirection::Asc => ordering,
            SortDirection::Desc => ordering.reverse(),
        }
    });

    listed
}

fn matches_search(schema: &EntitySchema, record: &Record, search_term: &str) -> bool {
    if search_term.is_empty() {
        return true;
    }

    schema.searchable_fields().any(|field| {
        match record.field(field.logical_name().as_str()) {
            Some(Value::String(text)) => text.to_lowercase().contains(search_term),
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(Value::as_str)
                .any(|item| item.to_lowercase().contains(search_term)),
            _ => false,
        }
    })
}

fn matches_choice(field: Option<&str>, filter: &ChoiceFilter, record: &Record) -> bool {
    match (field, filter) {
        (_, ChoiceFilter::All) => true,
        (Some(field), filter) => filter.matches(record.field(field)),
        (None, ChoiceFilter::Only(_)) => false,
    }
}

fn compare_for_sort(
    left: &Record,
    right: &Record,
    key: &str,
    field_type: Option<FieldType>,
) -> Ordering {
    if key == RECORD_ID_FIELD {
        return left.id().cmp(&right.id());
    }

    let (left_value, right_value) = match (left.field(key), right.field(key)) {
        (Some(left), Some(right)) if !left.is_null() && !right.is_null() => (left, right),
        (Some(left), _) if !left.is_null() => return Ordering::Less,
        (_, Some(right)) if !right.is_null() => return Ordering::Greater,
        _ => return Ordering::Equal,
    };

    match field_type {
        Some(FieldType::Number) => left_value
            .as_f64()
            .zip(right_value.as_f64())
            .and_then(|(left, right)| left.partial_cmp(&right))
            .unwrap_or(Ordering::Equal),
        Some(FieldType::Date) => {
            let left_date = left_value.as_str().and_then(parse_date);
            let right_date = right_value.as_str().and_then(parse_date);
            match (left_date, right_date) {
                (Some(left), Some(right)) => left.cmp(&right),
                _ => compare_text(left_value, right_value),
            }
        }
        Some(FieldType::MultiChoice | FieldType::Coordinates) | None => Ordering::Equal,
        Some(FieldType::Text | FieldType::Email | FieldType::Choice) => {
            compare_text(left_value, right_value)
        }
    }
}

fn compare_text(left: &Value, right: &Value) -> Ordering {
    left.as_str()
        .zip(right.as_str())
        .map(|(left, right)| left.cmp(right))
        .unwrap_or(Ordering::Equal)
}
