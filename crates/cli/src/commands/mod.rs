pub(crate) mod check_config;
pub(crate) mod invoke;
pub(crate) mod operations;
pub(crate) mod replay;

use serde_json::Value;

/// Render an invocation payload for JSON output: query results as parsed
/// JSON, derived ids as strings, empty payloads as `null`.
pub(crate) fn payload_value(payload: &[u8], is_query: bool) -> Value {
    if payload.is_empty() {
        return Value::Null;
    }
    if is_query {
        if let Ok(v) = serde_json::from_slice(payload) {
            return v;
        }
    }
    Value::String(String::from_utf8_lossy(payload).into_owned())
}

/// Render an invocation payload for text output.
pub(crate) fn payload_text(payload: &[u8], is_query: bool) -> String {
    if is_query {
        if let Ok(v) = serde_json::from_slice::<Value>(payload) {
            return serde_json::to_string_pretty(&v).unwrap_or_else(|_| v.to_string());
        }
    }
    String::from_utf8_lossy(payload).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn numeric_ids_stay_strings() {
        assert_eq!(payload_value(b"1700000000", false), json!("1700000000"));
    }

    #[test]
    fn query_rows_are_parsed() {
        let v = payload_value(br#"[{"Key":"k","Value":{}}]"#, true);
        assert_eq!(v, json!([{"Key": "k", "Value": {}}]));
        assert_eq!(payload_value(b"", false), Value::Null);
    }
}
