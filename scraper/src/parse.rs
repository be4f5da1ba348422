use serde_json::Value;

/// Records carried by a search response body.
///
/// Returns `None` when the body is not a JSON array, which callers treat the
/// same as an empty page.
pub fn page_records(body: Value) -> Option<Vec<Value>> {
    match body {
        Value::Array(records) => Some(records),
        _ => None,
    }
}

/// JSON truthiness: null, false, zero, and empty strings, arrays or objects are false.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map_or(true, |n| n != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

/// Dedup key for a record, present only when its `id` is truthy.
///
/// Keys are the JSON encoding of the id, so `1` and `"1"` stay distinct.
pub fn record_id(record: &Value) -> Option<String> {
    record
        .get("id")
        .filter(|id| is_truthy(id))
        .map(Value::to_string)
}

pub fn subject_code(record: &Value) -> Option<&str> {
    record.get("subjectCode").and_then(Value::as_str)
}
