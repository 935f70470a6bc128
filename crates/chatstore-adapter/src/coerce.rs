//! Type coercion between caller values and backend storage forms

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};

use chatstore_common::config::AdapterConfig;
use chatstore_common::error::Result;
use chatstore_common::schema::{FieldAttribute, FieldType};
use chatstore_common::types::Value;

/// Storage capabilities of the wrapped backend
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    pub supports_json: bool,
    pub supports_dates: bool,
    pub supports_booleans: bool,
}

impl From<&AdapterConfig> for Capabilities {
    fn from(config: &AdapterConfig) -> Self {
        Self {
            supports_json: config.supports_json,
            supports_dates: config.supports_dates,
            supports_booleans: config.supports_booleans,
        }
    }
}

/// Encode a value into a form the backend can store.
///
/// Without native JSON every non-null value of a structured field is stored
/// as JSON text, whatever its variant, so [`from_storage`] is its exact
/// inverse.
pub fn to_storage(value: Value, attribute: &FieldAttribute, capabilities: Capabilities) -> Result<Value> {
    Ok(match value {
        Value::Null => Value::Null,
        structured if attribute.field_type.is_structured() && !capabilities.supports_json => {
            Value::String(serde_json::to_string(&structured.to_json())?)
        }
        Value::Bool(flag) if !capabilities.supports_booleans => Value::Int(i64::from(flag)),
        Value::Date(date) if !capabilities.supports_dates => {
            Value::String(Value::encode_date(&date))
        }
        Value::Json(json) if !capabilities.supports_json => {
            Value::String(serde_json::to_string(&json)?)
        }
        array @ Value::Array(_) if !capabilities.supports_json => {
            Value::String(serde_json::to_string(&array.to_json())?)
        }
        other => other,
    })
}

/// Restore a stored value to the field's declared type.
///
/// Idempotent: values already in their declared form pass through. Text is
/// only parsed back into structured values when the backend lacks JSON.
pub fn from_storage(value: Value, attribute: &FieldAttribute, capabilities: Capabilities) -> Value {
    match (attribute.field_type, value) {
        (FieldType::Boolean, Value::Int(n)) => Value::Bool(n != 0),
        (FieldType::Boolean, Value::String(text)) => match text.as_str() {
            "1" | "true" | "TRUE" | "t" => Value::Bool(true),
            "0" | "false" | "FALSE" | "f" => Value::Bool(false),
            _ => Value::String(text),
        },
        (FieldType::Date, Value::String(text)) => {
            parse_date(&text).map_or(Value::String(text), Value::Date)
        }
        (FieldType::Date, Value::Int(millis)) => Utc
            .timestamp_millis_opt(millis)
            .single()
            .map_or(Value::Int(millis), Value::Date),
        (field_type, Value::String(text)) if field_type.is_structured() && !capabilities.supports_json => {
            serde_json::from_str::<serde_json::Value>(&text)
                .map_or(Value::String(text), Value::from)
        }
        (_, other) => other,
    }
}

fn parse_date(text: &str) -> Option<DateTime<Utc>> {
    if let Ok(date) = DateTime::parse_from_rfc3339(text) {
        return Some(date.with_timezone(&Utc));
    }
    // SQL `CURRENT_TIMESTAMP` style, assumed UTC
    NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S%.f")
        .ok()
        .map(|naive| Utc.from_utc_datetime(&naive))
}

/// Convert numeric-looking strings (and lists of them) to numbers
pub fn to_numeric_id(value: Value) -> Value {
    match value {
        Value::String(text) => Value::parse_numeric(&text).unwrap_or(Value::String(text)),
        Value::Array(items) => Value::Array(items.into_iter().map(to_numeric_id).collect()),
        other => other,
    }
}

/// Identifiers are surfaced to callers as strings
pub fn to_string_id(value: Value) -> Value {
    match value {
        Value::Int(n) => Value::String(n.to_string()),
        Value::Float(n) => Value::String(n.to_string()),
        other => other,
    }
}
