//! Read-only listing of records by status.

use bikeshare_records::{decode, Bike, DocType, Issue, Record, RecordError, Repair, Ride, User};
use bikeshare_storage::{LedgerStore, Selector};
use serde::Serialize;

use crate::error::WorkflowError;

/// One query result, serialized as `{"Key": ..., "Value": ...}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryRow<T> {
    #[serde(rename = "Key")]
    pub key: String,
    #[serde(rename = "Value")]
    pub value: T,
}

/// All committed `T` records whose status is `status`, in store order.
///
/// `status` must belong to `T`'s status domain. Every returned value is
/// strictly decoded.
pub async fn query_by_status<T: Record, S: LedgerStore>(
    store: &S,
    status: &str,
) -> Result<Vec<QueryRow<T>>, WorkflowError> {
    let status = T::DOC_TYPE
        .parse_status(status)
        .map_err(|e| WorkflowError::Validation(format!("Invalid status: {}.", e)))?;
    let selector = Selector::new(T::DOC_TYPE.as_str(), status);
    store
        .query(&selector)
        .await?
        .into_iter()
        .map(|row| -> Result<QueryRow<T>, WorkflowError> {
            Ok(QueryRow {
                value: decode::<T>(&row.value)?,
                key: row.key,
            })
        })
        .collect()
}

/// Run a status query for `doc_type` and render the JSON array payload.
pub async fn status_payload<S: LedgerStore>(
    store: &S,
    doc_type: DocType,
    status: &str,
) -> Result<Vec<u8>, WorkflowError> {
    match doc_type {
        DocType::Bike => render(doc_type, &query_by_status::<Bike, _>(store, status).await?),
        DocType::Ride => render(doc_type, &query_by_status::<Ride, _>(store, status).await?),
        DocType::Issue => render(doc_type, &query_by_status::<Issue, _>(store, status).await?),
        DocType::Repair => render(doc_type, &query_by_status::<Repair, _>(store, status).await?),
        DocType::User => render(doc_type, &query_by_status::<User, _>(store, status).await?),
        DocType::Repairer => Err(WorkflowError::Validation(format!(
            "Invalid status: {}.",
            RecordError::NoStatusDomain { doc_type }
        ))),
    }
}

fn render<T: Serialize>(doc_type: DocType, rows: &[QueryRow<T>]) -> Result<Vec<u8>, WorkflowError> {
    serde_json::to_vec(rows).map_err(|e| {
        WorkflowError::Encoding(RecordError::Encode {
            doc_type,
            message: e.to_string(),
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use bikeshare_records::{derive_key, encode, BikeStatus};
    use bikeshare_storage::MemoryLedger;
    use serde_json::json;

    async fn seed(ledger: &MemoryLedger, pairs: Vec<(String, Vec<u8>)>) {
        let mut snap = ledger.begin_snapshot().await.unwrap();
        for (k, v) in pairs {
            ledger.put_state(&mut snap, &k, v).await.unwrap();
        }
        ledger.commit_snapshot(snap).await.unwrap();
    }

    fn bike(id: &str, status: BikeStatus) -> (String, Vec<u8>) {
        let mut b = Bike::new(id);
        b.status = status;
        (b.key(), encode(&b).unwrap())
    }

    #[tokio::test]
    async fn lists_only_matching_status() {
        let ledger = MemoryLedger::new();
        seed(
            &ledger,
            vec![
                bike("b1", BikeStatus::Available),
                bike("b2", BikeStatus::InUse),
                bike("b3", BikeStatus::Available),
            ],
        )
        .await;
        let rows = query_by_status::<Bike, _>(&ledger, "AVAILABLE").await.unwrap();
        let ids: Vec<&str> = rows.iter().map(|r| r.value.id.as_str()).collect();
        assert_eq!(ids, ["b1", "b3"]);
        assert_eq!(rows[0].key, derive_key(DocType::Bike, "b1"));
    }

    #[tokio::test]
    async fn status_outside_the_domain_is_rejected() {
        let ledger = MemoryLedger::new();
        let err = query_by_status::<Ride, _>(&ledger, "AVAILABLE")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Validation);
        let err = status_payload(&ledger, DocType::Repairer, "FREE")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Validation);
    }

    #[tokio::test]
    async fn malformed_match_is_an_encoding_error() {
        let ledger = MemoryLedger::new();
        seed(
            &ledger,
            vec![(
                derive_key(DocType::Bike, "bad"),
                br#"{"docType":"Bike","id":"bad","status":"AVAILABLE"}"#.to_vec(),
            )],
        )
        .await;
        let err = query_by_status::<Bike, _>(&ledger, "AVAILABLE")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Encoding);
    }

    #[tokio::test]
    async fn payload_uses_key_value_objects() {
        let ledger = MemoryLedger::new();
        seed(&ledger, vec![bike("b1", BikeStatus::Discarded)]).await;
        let payload = status_payload(&ledger, DocType::Bike, "DISCARDED")
            .await
            .unwrap();
        let value: serde_json::Value = serde_json::from_slice(&payload).unwrap();
        assert_eq!(
            value,
            json!([{
                "Key": "\u{0}Bike\u{0}b1\u{0}",
                "Value": {
                    "docType": "Bike",
                    "id": "b1",
                    "location": null,
                    "status": "DISCARDED"
                }
            }])
        );
        let empty = status_payload(&ledger, DocType::Bike, "IN_USE").await.unwrap();
        assert_eq!(empty, b"[]");
    }
}
