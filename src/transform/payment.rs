use serde::Deserialize;
use serde_json::Value;

use crate::transform::convert::{normalize_status, to_currency, to_float, to_identifier, to_timestamp};
use crate::transform::types::{json_kind, LegacyPayment, TransformError, V2Payment};

/// Map one legacy payment record to the v2 shape.
pub fn transform_payment(raw: &Value) -> Result<V2Payment, TransformError> {
    if !raw.is_object() {
        return Err(TransformError::NotAnObject(json_kind(raw)));
    }
    let legacy =
        LegacyPayment::deserialize(raw).map_err(|e| TransformError::Malformed(e.to_string()))?;

    let amount = to_float(&legacy.amount);
    if amount < 0.0 {
        return Err(TransformError::invalid("amount", format!("negative amount {}", amount)));
    }

    Ok(V2Payment {
        id: to_identifier(&legacy.id, "id")?,
        // Collapse -0.0 so it serializes as 0.0.
        amount: amount + 0.0,
        currency: to_currency(&legacy.currency)?,
        status: normalize_status(&legacy.status),
        customer_id: to_identifier(&legacy.customer_id, "customer_id")?,
        created_at: to_timestamp(&legacy.created_at, "created_at")?,
        raw: raw.clone(),
    })
}
