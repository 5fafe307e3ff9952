use serde::Deserialize;
use serde_json::{Map, Value};

use crate::transform::convert::{to_identifier, to_timestamp};
use crate::transform::types::{json_kind, LegacyCustomer, TransformError, V2Customer};

/// Map one legacy customer record to the v2 shape.
pub fn transform_customer(raw: &Value) -> Result<V2Customer, TransformError> {
    if !raw.is_object() {
        return Err(TransformError::NotAnObject(json_kind(raw)));
    }
    let legacy =
        LegacyCustomer::deserialize(raw).map_err(|e| TransformError::Malformed(e.to_string()))?;

    let first = name_part(&legacy.first_name, "first_name")?;
    let last = name_part(&legacy.last_name, "last_name")?;
    let full_name = format!("{} {}", first, last).trim().to_string();

    let email = match &legacy.email {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => {
            return Err(TransformError::invalid(
                "email",
                format!("unexpected {}", json_kind(other)),
            ))
        }
    };

    let metadata = match legacy.meta {
        Value::Object(map) => map,
        _ => Map::new(),
    };

    Ok(V2Customer {
        id: to_identifier(&legacy.id, "id")?,
        full_name,
        email,
        metadata,
        created_at: to_timestamp(&legacy.created_at, "created_at")?,
        raw: raw.clone(),
    })
}

fn name_part<'a>(value: &'a Value, field: &'static str) -> Result<&'a str, TransformError> {
    match value {
        Value::Null => Ok(""),
        Value::String(s) => Ok(s),
        other => Err(TransformError::invalid(field, format!("unexpected {}", json_kind(other)))),
    }
}
