use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A rich query selecting committed records by `docType` and `status`.
///
/// Serializes to the ledger's selector document:
/// `{"selector":{"docType":"Bike","status":"AVAILABLE"}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selector {
    pub selector: SelectorFields,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectorFields {
    pub doc_type: String,
    pub status: String,
}

impl Selector {
    pub fn new(doc_type: impl Into<String>, status: impl Into<String>) -> Self {
        Self {
            selector: SelectorFields {
                doc_type: doc_type.into(),
                status: status.into(),
            },
        }
    }

    pub fn doc_type(&self) -> &str {
        &self.selector.doc_type
    }

    pub fn status(&self) -> &str {
        &self.selector.status
    }

    /// Whether a stored JSON document satisfies every selector field.
    pub fn matches(&self, document: &Value) -> bool {
        document.get("docType").and_then(Value::as_str) == Some(self.doc_type())
            && document.get("status").and_then(Value::as_str) == Some(self.status())
    }
}

/// A single `(key, value)` pair returned by a selector query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryRecord {
    pub key: String,
    pub value: Vec<u8>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn selector_serializes_to_ledger_query_document() {
        let selector = Selector::new("Ride", "ONGOING");
        assert_eq!(
            serde_json::to_value(&selector).unwrap(),
            json!({"selector": {"docType": "Ride", "status": "ONGOING"}})
        );
    }

    #[test]
    fn selector_requires_both_fields() {
        let selector = Selector::new("Bike", "AVAILABLE");
        assert!(selector.matches(&json!({"docType": "Bike", "status": "AVAILABLE", "id": "b"})));
        assert!(!selector.matches(&json!({"docType": "Bike", "status": "IN_USE"})));
        assert!(!selector.matches(&json!({"docType": "Ride", "status": "AVAILABLE"})));
        assert!(!selector.matches(&json!({"docType": "Bike"})));
        assert!(!selector.matches(&json!(["Bike", "AVAILABLE"])));
    }
}
