//! Typed record access inside an open ledger snapshot.
//!
//! Every read goes through the snapshot, so it lands in the read set and is
//! re-validated at commit. Writes are only staged; nothing is visible until
//! the engine commits.

use bikeshare_records::{decode, derive_key, encode, DocType, Record};
use bikeshare_storage::LedgerStore;

use crate::error::WorkflowError;

pub struct Accessor<'a, S: LedgerStore> {
    store: &'a S,
    snapshot: &'a mut S::Snapshot,
}

impl<'a, S: LedgerStore> Accessor<'a, S> {
    pub fn new(store: &'a S, snapshot: &'a mut S::Snapshot) -> Self {
        Self { store, snapshot }
    }

    /// Raw read. `Ok(None)` when the key is absent.
    pub async fn get(&mut self, key: &str) -> Result<Option<Vec<u8>>, WorkflowError> {
        Ok(self.store.get_state(&mut *self.snapshot, key).await?)
    }

    /// Raw staged write.
    pub async fn put(&mut self, key: &str, value: Vec<u8>) -> Result<(), WorkflowError> {
        Ok(self.store.put_state(&mut *self.snapshot, key, value).await?)
    }

    /// Decode the record `T` with this id, if present.
    pub async fn fetch<T: Record>(&mut self, id: &str) -> Result<Option<T>, WorkflowError> {
        let key = derive_key(T::DOC_TYPE, id);
        match self.get(&key).await? {
            Some(bytes) => Ok(Some(decode::<T>(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Like [`Accessor::fetch`], failing with `"<Type> <id> not found."`.
    pub async fn require<T: Record>(&mut self, id: &str) -> Result<T, WorkflowError> {
        self.fetch::<T>(id)
            .await?
            .ok_or_else(|| not_found(T::DOC_TYPE, id))
    }

    /// Whether any record of type `T` exists under `id`. Does not decode.
    pub async fn exists<T: Record>(&mut self, id: &str) -> Result<bool, WorkflowError> {
        let key = derive_key(T::DOC_TYPE, id);
        Ok(self.get(&key).await?.is_some())
    }

    /// Fail with `conflict` if a record of type `T` already uses `id`.
    pub async fn ensure_absent<T: Record>(
        &mut self,
        id: &str,
        conflict: impl FnOnce() -> String,
    ) -> Result<(), WorkflowError> {
        if self.exists::<T>(id).await? {
            return Err(WorkflowError::Conflict(conflict()));
        }
        Ok(())
    }

    /// Encode `record` and stage it under its own key.
    pub async fn stage<T: Record + Sync>(&mut self, record: &T) -> Result<(), WorkflowError> {
        let bytes = encode(record)?;
        self.put(&record.key(), bytes).await
    }
}

pub fn not_found(doc_type: DocType, id: &str) -> WorkflowError {
    WorkflowError::NotFound(format!("{} {} not found.", doc_type, id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use bikeshare_records::{Bike, BikeStatus, User};
    use bikeshare_storage::MemoryLedger;
    use rust_decimal::Decimal;

    #[tokio::test]
    async fn absent_and_present_records() {
        let ledger = MemoryLedger::new();
        let mut snap = ledger.begin_snapshot().await.unwrap();
        let mut tx = Accessor::new(&ledger, &mut snap);

        assert_eq!(tx.fetch::<Bike>("b1").await.unwrap(), None);
        let err = tx.require::<Bike>("b1").await.unwrap_err();
        assert_eq!(err.to_string(), "Bike b1 not found.");

        tx.stage(&Bike::new("b1")).await.unwrap();
        let bike = tx.require::<Bike>("b1").await.unwrap();
        assert_eq!(bike.status, BikeStatus::Available);
    }

    #[tokio::test]
    async fn same_id_under_other_type_is_absent() {
        let ledger = MemoryLedger::new();
        let mut snap = ledger.begin_snapshot().await.unwrap();
        let mut tx = Accessor::new(&ledger, &mut snap);
        tx.stage(&User::new("x", Decimal::ONE)).await.unwrap();
        assert!(!tx.exists::<Bike>("x").await.unwrap());
        assert!(tx
            .ensure_absent::<User>("x", || "User x already registered.".into())
            .await
            .is_err());
    }

    #[tokio::test]
    async fn malformed_bytes_are_encoding_errors_not_absence() {
        let ledger = MemoryLedger::new();
        let mut snap = ledger.begin_snapshot().await.unwrap();
        let mut tx = Accessor::new(&ledger, &mut snap);
        tx.put(&derive_key(DocType::Bike, "b1"), br#"{"docType":"Bike"}"#.to_vec())
            .await
            .unwrap();
        let err = tx.fetch::<Bike>("b1").await.unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Encoding);
    }
}
