use roadwatch_core::FieldErrors;
use serde::Serialize;
use ts_rs::TS;

/// API error payload.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/error-response.ts"
)]
pub struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[ts(type = "Record<string, string> | null")]
    fields: Option<FieldErrors>,
}

impl ErrorResponse {
    pub(super) fn new(error: String) -> Self {
        Self {
            error,
            fields: None,
        }
    }

    pub(super) fn with_fields(fields: FieldErrors) -> Self {
        Self {
            error: "Validation failed".to_owned(),
            fields: Some(fields),
        }
    }
}
