use std::fmt::{Display, Formatter};

use roadwatch_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::schema::RECORD_ID_FIELD;

/// Store-assigned record identifier. Always a positive integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u64", into = "u64")]
pub struct RecordId(u64);

impl RecordId {
    /// Identifier given to the first record of an empty collection.
    pub const FIRST: Self = Self(1);

    /// Creates a validated record identifier.
    pub fn new(value: u64) -> AppResult<Self> {
        if value == 0 {
            return Err(AppError::Validation(
                "record id must be a positive integer".to_owned(),
            ));
        }

        Ok(Self(value))
    }

    /// Returns the identifier following this one.
    #[must_use]
    pub fn next(self) -> Self {
        Self(self.0.saturating_add(1))
    }

    /// Returns the underlying integer.
    #[must_use]
    pub fn get(self) -> u64 {
        self.0
    }
}

impl TryFrom<u64> for RecordId {
    type Error = AppError;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<RecordId> for u64 {
    fn from(value: RecordId) -> Self {
        value.0
    }
}

impl Display for RecordId {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// One entity of a managed collection.
///
/// Serialized flat, with the id beside the payload fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    id: RecordId,
    #[serde(flatten)]
    data: Map<String, Value>,
}

impl Record {
    /// Creates a record; the payload must not carry its own id.
    pub fn new(id: RecordId, data: Map<String, Value>) -> AppResult<Self> {
        if data.contains_key(RECORD_ID_FIELD) {
            return Err(AppError::Validation(
                "record payload must not contain an id field".to_owned(),
            ));
        }

        Ok(Self { id, data })
    }

    /// Returns the record identifier.
    #[must_use]
    pub fn id(&self) -> RecordId {
        self.id
    }

    /// Returns the field payload.
    #[must_use]
    pub fn data(&self) -> &Map<String, Value> {
        &self.data
    }

    /// Returns one field value.
    #[must_use]
    pub fn field(&self, logical_name: &str) -> Option<&Value> {
        self.data.get(logical_name)
    }

    /// Returns one field value when it is a string.
    #[must_use]
    pub fn text(&self, logical_name: &str) -> Option<&str> {
        self.field(logical_name).and_then(Value::as_str)
    }

    /// Returns a copy of this record with `patch` merged over its fields.
    ///
    /// The merge is shallow: a patched multi-valued field replaces the stored
    /// one wholesale.
    #[must_use]
    pub fn merged(&self, patch: &Map<String, Value>) -> Self {
        let mut data = self.data.clone();
        for (name, value) in patch {
            data.insert(name.clone(), value.clone());
        }

        Self { id: self.id, data }
    }

    /// Returns the record as one JSON object including its id.
    #[must_use]
    pub fn to_value(&self) -> Value {
        let mut object = Map::new();
        object.insert(RECORD_ID_FIELD.to_owned(), Value::from(self.id.get()));
        object.extend(self.data.clone());
        Value::Object(object)
    }
}
