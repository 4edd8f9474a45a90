use std::collections::HashSet;
use std::sync::Arc;

use roadwatch_core::{AppError, AppResult};
use roadwatch_domain::{EntitySchema, Record, RecordId};
use serde_json::{Map, Value};

/// A mutation applied to a [`RecordStore`], kept so it can be reverted.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreChange {
    /// A record was appended.
    Created(Record),
    /// A record was replaced; holds both versions.
    Updated {
        /// Record before the mutation.
        previous: Record,
        /// Record after the mutation.
        current: Record,
    },
    /// A record was removed.
    Removed(Record),
}

impl StoreChange {
    /// Returns the id of the affected record.
    #[must_use]
    pub fn record_id(&self) -> RecordId {
        match self {
            Self::Created(record) => record.id(),
            Self::Updated { current, .. } => current.id(),
            Self::Removed(record) => record.id(),
        }
    }
}

/// Authoritative in-memory collection of one managed entity type.
///
/// Ids are assigned as `max(existing) + 1` and never reused while a larger id
/// exists. All mutators are synchronous; validation of drafts happens before
/// they are called.
#[derive(Debug, Clone)]
pub struct RecordStore {
    schema: Arc<EntitySchema>,
    records: Vec<Record>,
}

impl RecordStore {
    /// Creates a store over existing records, checking id uniqueness and field
    /// domains.
    pub fn new(schema: Arc<EntitySchema>, records: Vec<Record>) -> AppResult<Self> {
        let mut seen = HashSet::new();
        let mut normalized = Vec::with_capacity(records.len());
        for record in records {
            if !seen.insert(record.id()) {
                return Err(AppError::Conflict(format!(
                    "duplicate record id {} in '{}'",
                    record.id(),
                    schema.logical_name().as_str()
                )));
            }

            let data = schema.normalize_payload(record.data())?;
            normalized.push(Record::new(record.id(), data)?);
        }

        Ok(Self {
            schema,
            records: normalized,
        })
    }

    /// Decodes a store from its JSON array form.
    pub fn from_json(schema: Arc<EntitySchema>, encoded: &str) -> AppResult<Self> {
        let records: Vec<Record> = serde_json::from_str(encoded).map_err(|error| {
            AppError::Validation(format!(
                "stored '{}' collection is not valid JSON: {error}",
                schema.logical_name().as_str()
            ))
        })?;

        Self::new(schema, records)
    }

    /// Encodes the whole collection as a JSON array.
    pub fn to_json(&self) -> AppResult<String> {
        serde_json::to_string(&self.records)
            .map_err(|error| AppError::Internal(format!("failed to encode records: {error}")))
    }

    /// Returns the schema.
    #[must_use]
    pub fn schema(&self) -> &Arc<EntitySchema> {
        &self.schema
    }

    /// Returns all records in insertion order.
    #[must_use]
    pub fn records(&self) -> &[Record] {
        &self.records
    }

    /// Returns the number of records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns whether the store is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Finds a record by id.
    #[must_use]
    pub fn get(&self, id: RecordId) -> Option<&Record> {
        self.records.iter().find(|record| record.id() == id)
    }

    /// Returns the id the next created record will receive.
    #[must_use]
    pub fn next_id(&self) -> RecordId {
        self.records
            .iter()
            .map(Record::id)
            .max()
            .map(RecordId::next)
            .unwrap_or(RecordId::FIRST)
    }

    /// Appends a record built from `draft` under the next id.
    pub fn create(&mut self, draft: &Map<String, Value>) -> AppResult<StoreChange> {
        let data = self.schema.normalize_payload(draft)?;
        let record = Record::new(self.next_id(), data)?;
        self.records.push(record.clone());

        Ok(StoreChange::Created(record))
    }

    /// Merges `patch` over the fields of record `id`.
    pub fn update(&mut self, id: RecordId, patch: &Map<String, Value>) -> AppResult<StoreChange> {
        let patch = self.schema.normalize_payload(patch)?;
        let position = self.position(id)?;
        let previous = self.records[position].clone();
        let current = previous.merged(&patch);
        self.records[position] = current.clone();

        Ok(StoreChange::Updated { previous, current })
    }

    /// Removes record `id`. There is no soft delete.
    pub fn remove(&mut self, id: RecordId) -> AppResult<StoreChange> {
        let position = self.position(id)?;
        let record = self.records.remove(position);

        Ok(StoreChange::Removed(record))
    }

    /// Flips record `id` between the two values of the status field.
    pub fn toggle_status(&mut self, id: RecordId) -> AppResult<StoreChange> {
        let (first, second) = self.schema.status_toggle_values()?;
        let status_field = self.schema.status_field().unwrap_or_default().to_owned();
        let position = self.position(id)?;

        let next = if self.records[position].text(status_field.as_str()) == Some(first) {
            second
        } else {
            first
        };

        let mut patch = Map::new();
        patch.insert(status_field, Value::String(next.to_owned()));
        self.update(id, &patch)
    }

    /// Undoes a change previously returned by this store.
    ///
    /// Changes are located by record id, so other mutations applied since
    /// `change` survive: an update only restores fields that still hold the
    /// value it wrote, and a removed record is reinserted before the first
    /// record with a larger id. A record that is already gone stays gone.
    pub fn revert(&mut self, change: &StoreChange) -> AppResult<()> {
        match change {
            StoreChange::Created(record) => {
                self.records.retain(|stored| stored.id() != record.id());
            }
            StoreChange::Updated { previous, current } => {
                let Some(stored) = self
                    .records
                    .iter_mut()
                    .find(|stored| stored.id() == current.id())
                else {
                    return Ok(());
                };

                let mut data = stored.data().clone();
                let names: HashSet<&String> =
                    previous.data().keys().chain(current.data().keys()).collect();
                for name in names {
                    let written = current.field(name);
                    if written == previous.field(name) || stored.field(name) != written {
                        continue;
                    }
                    match previous.field(name) {
                        Some(value) => data.insert(name.clone(), value.clone()),
                        None => data.remove(name.as_str()),
                    };
                }
                *stored = Record::new(current.id(), data)?;
            }
            StoreChange::Removed(record) => {
                if self.get(record.id()).is_some() {
                    return Err(AppError::Conflict(format!(
                        "record {} already exists and cannot be restored",
                        record.id()
                    )));
                }
                let position = self
                    .records
                    .iter()
                    .position(|stored| stored.id() > record.id())
                    .unwrap_or(self.records.len());
                self.records.insert(position, record.clone());
            }
        }

        Ok(())
    }

    fn position(&self, id: RecordId) -> AppResult<usize> {
        self.records
            .iter()
            .position(|record| record.id() == id)
            .ok_or_else(|| {
                AppError::NotFound(format!(
                    "{} record {id} does not exist",
                    self.schema.display_name().as_str()
                ))
            })
    }
}
