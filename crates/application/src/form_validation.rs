use roadwatch_core::FieldErrors;
use roadwatch_domain::{EntitySchema, FieldDefinition, FieldType, RECORD_ID_FIELD, parse_date};
use serde_json::{Map, Value};

/// Validates a pending create or edit payload.
///
/// Total and side-effect free: every problem is reported as a message keyed by
/// field name, and an empty mapping means the draft may be submitted.
#[must_use]
pub fn validate_draft(schema: &EntitySchema, draft: &Map<String, Value>) -> FieldErrors {
    let mut errors = FieldErrors::new();

    for name in draft.keys() {
        if name == RECORD_ID_FIELD {
            errors.insert(name.as_str(), "Id is assigned automatically");
        } else if schema.field(name).is_none() {
            errors.insert(name.as_str(), "Unknown field");
        }
    }

    for field in schema.fields() {
        let name = field.logical_name().as_str();
        match draft.get(name) {
            None | Some(Value::Null) => {
                if field.is_required() {
                    errors.insert(name, required_message(field));
                }
            }
            Some(value) => {
                if let Some(message) = value_error(field, value) {
                    errors.insert(name, message);
                }
            }
        }
    }

    errors
}

fn required_message(field: &FieldDefinition) -> String {
    match field.field_type() {
        FieldType::MultiChoice => format!(
            "At least one {} is required",
            field.display_name().as_str().to_lowercase()
        ),
        _ => format!("{} is required", field.display_name().as_str()),
    }
}

fn value_error(field: &FieldDefinition, value: &Value) -> Option<String> {
    let is_blank = match value {
        Value::String(text) => text.trim().is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    };

    if is_blank {
        return match field.field_type() {
            _ if field.is_required() => Some(required_message(field)),
            FieldType::Choice => Some(invalid_message(field)),
            _ => None,
        };
    }

    match field.field_type() {
        FieldType::Email => match value.as_str() {
            Some(text) if is_simple_email(text) => None,
            _ => Some("Invalid email format".to_owned()),
        },
        FieldType::Date => value
            .as_str()
            .and_then(parse_date)
            .is_none()
            .then(|| "Invalid date, expected YYYY-MM-DD".to_owned()),
        FieldType::Number => match value.as_f64() {
            Some(number) => field.range_error(number),
            None => Some(invalid_message(field)),
        },
        _ => field
            .normalize_value(value)
            .err()
            .map(|_| invalid_message(field)),
    }
}

fn invalid_message(field: &FieldDefinition) -> String {
    format!(
        "Invalid value for {}",
        field.display_name().as_str().to_lowercase()
    )
}

/// Returns whether `value` has the `local@domain.tld` shape: one `@`, no
/// whitespace, and a dot inside the domain with text on both sides.
#[must_use]
pub fn is_simple_email(value: &str) -> bool {
    if value.chars().any(char::is_whitespace) {
        return false;
    }

    let Some((local, domain)) = value.split_once('@') else {
        return false;
    };

    if local.is_empty() || domain.contains('@') {
        return false;
    }

    domain
        .char_indices()
        .any(|(index, character)| character == '.' && index > 0 && index + 1 < domain.len())
}
