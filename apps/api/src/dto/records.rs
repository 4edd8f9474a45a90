use roadwatch_application::ListPage;
use roadwatch_domain::{OptionCount, Record};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use ts_rs::TS;

/// Query string of a record list request.
#[derive(Debug, Default, Deserialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/record-list-query.ts"
)]
pub struct RecordListQuery {
    pub search: Option<String>,
    /// Category value, or `all`.
    pub category: Option<String>,
    /// Status value, or `all`.
    pub status: Option<String>,
    /// Sort field logical name.
    pub sort: Option<String>,
    /// `asc` or `desc`.
    pub order: Option<String>,
    pub page: Option<usize>,
}

/// One page of records.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/record-list-response.ts"
)]
pub struct RecordListResponse {
    #[ts(type = "Array<Record<string, unknown>>")]
    pub records: Vec<Value>,
    pub total_pages: usize,
    pub current_page: usize,
    pub total_matches: usize,
    pub page_size: usize,
}

impl RecordListResponse {
    pub fn from_page(page: ListPage, page_size: usize) -> Self {
        Self {
            records: page.items.iter().map(Record::to_value).collect(),
            total_pages: page.total_pages,
            current_page: page.current_page,
            total_matches: page.total_matches,
            page_size,
        }
    }
}

/// Records holding one option.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/option-count-response.ts"
)]
pub struct OptionCountResponse {
    pub option: String,
    pub count: usize,
}

impl From<OptionCount> for OptionCountResponse {
    fn from(value: OptionCount) -> Self {
        Self {
            option: value.option,
            count: value.count,
        }
    }
}

/// Per-option counts of one field.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/breakdown-response.ts"
)]
pub struct BreakdownResponse {
    pub field: String,
    pub counts: Vec<OptionCountResponse>,
}
