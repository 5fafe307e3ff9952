//! Legacy input shapes, v2 contract types and the transform error.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::transform::convert::iso8601_millis;

/// Raw legacy payment. Every field stays untyped until mapped.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LegacyPayment {
    #[serde(default)]
    pub id: Value,
    #[serde(default)]
    pub amount: Value,
    #[serde(default)]
    pub currency: Value,
    #[serde(default)]
    pub status: Value,
    #[serde(default, alias = "customerId")]
    pub customer_id: Value,
    #[serde(default, alias = "createdAt")]
    pub created_at: Value,
}

/// Raw legacy customer.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LegacyCustomer {
    #[serde(default)]
    pub id: Value,
    #[serde(default, alias = "firstName")]
    pub first_name: Value,
    #[serde(default, alias = "lastName")]
    pub last_name: Value,
    #[serde(default)]
    pub email: Value,
    #[serde(default)]
    pub meta: Value,
    #[serde(default, alias = "createdAt")]
    pub created_at: Value,
}

/// Normalized payment status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Completed,
    Failed,
}

/// Stable v2 payment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct V2Payment {
    pub id: String,
    pub amount: f64,
    pub currency: String,
    pub status: PaymentStatus,
    pub customer_id: String,
    #[serde(with = "iso8601_millis")]
    pub created_at: DateTime<Utc>,
    /// Original legacy record, opaque, kept for debugging.
    pub raw: Value,
}

/// Stable v2 customer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct V2Customer {
    pub id: String,
    pub full_name: String,
    pub email: Option<String>,
    pub metadata: Map<String, Value>,
    #[serde(with = "iso8601_millis")]
    pub created_at: DateTime<Utc>,
    pub raw: Value,
}

/// A single legacy record that could not be mapped.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransformError {
    #[error("expected a JSON object, got {0}")]
    NotAnObject(&'static str),

    #[error("expected a list of {0}")]
    NotAList(&'static str),

    #[error("missing field `{0}`")]
    MissingField(&'static str),

    #[error("invalid field `{field}`: {reason}")]
    InvalidField { field: &'static str, reason: String },

    #[error("malformed record: {0}")]
    Malformed(String),
}

impl TransformError {
    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        TransformError::InvalidField {
            field,
            reason: reason.into(),
        }
    }
}

/// JSON type name for error messages.
pub(crate) fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
