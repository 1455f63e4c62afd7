//! In-memory reference ledger.
//!
//! Committed state is a map from key to `(version, value)`. Each commit that
//! writes anything advances the ledger height by one and stamps every key it
//! writes with the new height, so a key's version strictly increases over
//! its lifetime. Validation and application of a commit happen under one
//! lock, which is what makes a commit atomic with respect to every other.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::StorageError;
use crate::record::{QueryRecord, Selector};
use crate::traits::LedgerStore;

#[derive(Debug, Clone)]
struct Versioned {
    version: u64,
    value: Vec<u8>,
}

#[derive(Debug, Default)]
struct Inner {
    height: u64,
    state: BTreeMap<String, Versioned>,
}

/// A cloneable handle to a shared in-memory ledger.
#[derive(Debug, Clone, Default)]
pub struct MemoryLedger {
    inner: Arc<Mutex<Inner>>,
}

/// An open transaction: the versions it has read and the writes it staged.
#[derive(Debug, Default)]
pub struct MemorySnapshot {
    reads: BTreeMap<String, Option<u64>>,
    writes: BTreeMap<String, Vec<u8>>,
}

impl MemorySnapshot {
    /// Keys read so far with the version observed (`None` for absent).
    pub fn read_set(&self) -> &BTreeMap<String, Option<u64>> {
        &self.reads
    }

    /// Keys staged for write, in key order.
    pub fn write_keys(&self) -> impl Iterator<Item = &str> {
        self.writes.keys().map(String::as_str)
    }
}

/// Serializable image of a ledger, used to persist it between runs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LedgerDump {
    pub height: u64,
    pub entries: Vec<LedgerEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub key: String,
    pub version: u64,
    pub value: serde_json::Value,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a ledger from a dump produced by [`MemoryLedger::dump`].
    pub fn from_dump(dump: LedgerDump) -> Result<Self, StorageError> {
        let mut state = BTreeMap::new();
        for entry in dump.entries {
            if entry.version > dump.height {
                return Err(StorageError::Backend(format!(
                    "entry version {} exceeds ledger height {}",
                    entry.version, dump.height
                )));
            }
            let value = serde_json::to_vec(&entry.value)
                .map_err(|e| StorageError::Backend(format!("encode dump entry: {e}")))?;
            let version = entry.version;
            if state.insert(entry.key, Versioned { version, value }).is_some() {
                return Err(StorageError::Backend("duplicate key in ledger dump".into()));
            }
        }
        Ok(Self {
            inner: Arc::new(Mutex::new(Inner {
                height: dump.height,
                state,
            })),
        })
    }

    /// Capture the committed state. Every stored value must be JSON.
    pub fn dump(&self) -> Result<LedgerDump, StorageError> {
        let inner = self.lock()?;
        let entries = inner
            .state
            .iter()
            .map(|(key, v)| {
                let value = serde_json::from_slice(&v.value).map_err(|e| {
                    StorageError::Backend(format!("value under {key:?} is not JSON: {e}"))
                })?;
                Ok(LedgerEntry {
                    key: key.clone(),
                    version: v.version,
                    value,
                })
            })
            .collect::<Result<Vec<_>, StorageError>>()?;
        Ok(LedgerDump {
            height: inner.height,
            entries,
        })
    }

    /// Committed key/value pairs, for whole-ledger comparisons.
    pub fn entries(&self) -> Result<BTreeMap<String, Vec<u8>>, StorageError> {
        let inner = self.lock()?;
        Ok(inner
            .state
            .iter()
            .map(|(k, v)| (k.clone(), v.value.clone()))
            .collect())
    }

    /// Number of commits that wrote at least one key.
    pub fn height(&self) -> Result<u64, StorageError> {
        Ok(self.lock()?.height)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Inner>, StorageError> {
        self.inner
            .lock()
            .map_err(|_| StorageError::Backend("ledger lock poisoned".into()))
    }
}

#[async_trait]
impl LedgerStore for MemoryLedger {
    type Snapshot = MemorySnapshot;

    async fn begin_snapshot(&self) -> Result<MemorySnapshot, StorageError> {
        Ok(MemorySnapshot::default())
    }

    async fn commit_snapshot(&self, snapshot: MemorySnapshot) -> Result<(), StorageError> {
        let mut inner = self.lock()?;
        for (key, seen) in &snapshot.reads {
            let current = inner.state.get(key).map(|v| v.version);
            if current != *seen {
                return Err(StorageError::ConcurrentConflict { key: key.clone() });
            }
        }
        if snapshot.writes.is_empty() {
            return Ok(());
        }
        inner.height += 1;
        let version = inner.height;
        for (key, value) in snapshot.writes {
            inner.state.insert(key, Versioned { version, value });
        }
        Ok(())
    }

    async fn abort_snapshot(&self, snapshot: MemorySnapshot) -> Result<(), StorageError> {
        drop(snapshot);
        Ok(())
    }

    async fn get_state(
        &self,
        snapshot: &mut MemorySnapshot,
        key: &str,
    ) -> Result<Option<Vec<u8>>, StorageError> {
        if let Some(staged) = snapshot.writes.get(key) {
            return Ok(Some(staged.clone()));
        }
        let inner = self.lock()?;
        let current = inner.state.get(key);
        let version = current.map(|v| v.version);
        // Keep the first observation: a later read must not mask a change
        // that happened between the two.
        snapshot.reads.entry(key.to_string()).or_insert(version);
        Ok(current.map(|v| v.value.clone()))
    }

    async fn put_state(
        &self,
        snapshot: &mut MemorySnapshot,
        key: &str,
        value: Vec<u8>,
    ) -> Result<(), StorageError> {
        if key.is_empty() {
            return Err(StorageError::Backend("empty key".into()));
        }
        snapshot.writes.insert(key.to_string(), value);
        Ok(())
    }

    async fn read_state(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        Ok(self.lock()?.state.get(key).map(|v| v.value.clone()))
    }

    async fn state_version(&self, key: &str) -> Result<Option<u64>, StorageError> {
        Ok(self.lock()?.state.get(key).map(|v| v.version))
    }

    async fn query(&self, selector: &Selector) -> Result<Vec<QueryRecord>, StorageError> {
        let inner = self.lock()?;
        Ok(inner
            .state
            .iter()
            .filter(|(_, v)| {
                serde_json::from_slice::<serde_json::Value>(&v.value)
                    .map(|doc| selector.matches(&doc))
                    .unwrap_or(false)
            })
            .map(|(key, v)| QueryRecord {
                key: key.clone(),
                value: v.value.clone(),
            })
            .collect())
    }
}
