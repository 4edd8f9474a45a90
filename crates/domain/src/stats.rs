use roadwatch_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::record::Record;
use crate::schema::EntitySchema;

/// Number of records holding one option of a choice field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionCount {
    /// Option value.
    pub option: String,
    /// Records holding the option.
    pub count: usize,
}

/// Counts records per option of a choice or multi-choice field.
///
/// Every declared option is reported, including those with no records, in
/// declaration order.
pub fn count_by_option(
    schema: &EntitySchema,
    records: &[Record],
    field_logical_name: &str,
) -> AppResult<Vec<OptionCount>> {
    let field = schema.require_field(field_logical_name)?;
    if !field.field_type().uses_options() {
        return Err(AppError::Validation(format!(
            "field '{field_logical_name}' has no option domain to count"
        )));
    }

    Ok(field
        .options()
        .iter()
        .map(|option| OptionCount {
            option: option.clone(),
            count: records
                .iter()
                .filter(|record| holds_option(record.field(field_logical_name), option))
                .count(),
        })
        .collect())
}

fn holds_option(value: Option<&Value>, option: &str) -> bool {
    match value {
        Some(Value::String(selected)) => selected == option,
        Some(Value::Array(items)) => items.iter().any(|item| item.as_str() == Some(option)),
        _ => false,
    }
}

/// Portfolio totals across road projects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoadStats {
    /// Number of projects.
    pub total_roads: usize,
    /// Projects with status `completed`.
    pub completed_roads: usize,
    /// Projects with status `ongoing`.
    pub in_progress_roads: usize,
    /// Projects with status `planned`.
    pub planned_roads: usize,
    /// Sum of project budgets.
    pub budget_allocated: f64,
    /// Sum of `budget * progress / 100` over all projects.
    pub budget_spent: f64,
}

impl RoadStats {
    /// Computes statistics from road records. Missing numbers count as zero.
    #[must_use]
    pub fn from_records(records: &[Record]) -> Self {
        let mut stats = Self {
            total_roads: records.len(),
            completed_roads: 0,
            in_progress_roads: 0,
            planned_roads: 0,
            budget_allocated: 0.0,
            budget_spent: 0.0,
        };

        for record in records {
            let budget = number(record, "budget");
            stats.budget_allocated += budget;
            stats.budget_spent += budget * (number(record, "progress") / 100.0);

            match record.text("status") {
                Some("completed") => stats.completed_roads += 1,
                Some("ongoing") => stats.in_progress_roads += 1,
                Some("planned") => stats.planned_roads += 1,
                _ => {}
            }
        }

        stats
    }
}

fn number(record: &Record, field: &str) -> f64 {
    record.field(field).and_then(Value::as_f64).unwrap_or(0.0)
}
