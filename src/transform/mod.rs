//! Legacy-to-v2 schema transformation.
//!
//! Pure functions over `serde_json::Value`: no I/O, no shared state. Single
//! records fail with a [`TransformError`]; list transforms skip bad records
//! and report them in [`Batch::skipped`] so the caller can log them.

pub mod convert;
pub mod customer;
pub mod payment;
pub mod types;

use serde_json::Value;

pub use convert::to_iso8601;
pub use customer::transform_customer;
pub use payment::transform_payment;
pub use types::{PaymentStatus, TransformError, V2Customer, V2Payment};

/// Keys a legacy list response may wrap its records in.
const LIST_ENVELOPE_KEYS: &[&str] = &["data", "items", "results"];

/// A legacy record that was left out of a list response.
#[derive(Debug, Clone, PartialEq)]
pub struct Skipped {
    pub index: usize,
    pub error: TransformError,
}

/// Result of transforming a legacy list.
#[derive(Debug, Clone, PartialEq)]
pub struct Batch<T> {
    pub items: Vec<T>,
    pub skipped: Vec<Skipped>,
}

pub fn transform_payments(raw: &Value) -> Result<Batch<V2Payment>, TransformError> {
    transform_list(raw, "payments", transform_payment)
}

pub fn transform_customers(raw: &Value) -> Result<Batch<V2Customer>, TransformError> {
    transform_list(raw, "customers", transform_customer)
}

fn transform_list<T>(
    raw: &Value,
    resource: &'static str,
    transform: fn(&Value) -> Result<T, TransformError>,
) -> Result<Batch<T>, TransformError> {
    let records = list_records(raw, resource)?;
    let mut batch = Batch {
        items: Vec::with_capacity(records.len()),
        skipped: Vec::new(),
    };
    for (index, record) in records.iter().enumerate() {
        match transform(record) {
            Ok(item) => batch.items.push(item),
            Err(error) => batch.skipped.push(Skipped { index, error }),
        }
    }
    Ok(batch)
}

/// Find the record array: top level, or under a known envelope key.
fn list_records<'a>(raw: &'a Value, resource: &'static str) -> Result<&'a [Value], TransformError> {
    match raw {
        Value::Array(records) => Ok(records),
        Value::Object(map) => LIST_ENVELOPE_KEYS
            .iter()
            .chain(std::iter::once(&resource))
            .find_map(|key| map.get(*key).and_then(Value::as_array))
            .map(Vec::as_slice)
            .ok_or(TransformError::NotAList(resource)),
        _ => Err(TransformError::NotAList(resource)),
    }
}
