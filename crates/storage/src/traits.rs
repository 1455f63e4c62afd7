use async_trait::async_trait;

use crate::error::StorageError;
use crate::record::{QueryRecord, Selector};

/// The storage trait for bike-share ledger backends.
///
/// A `LedgerStore` is a versioned key-value store with optimistic
/// concurrency control. Workflow operations read and stage writes through a
/// snapshot; nothing becomes visible until the snapshot commits.
///
/// ## Snapshot Semantics
///
/// 1. `begin_snapshot()` starts a transaction and returns a `Snapshot`
/// 2. `get_state` / `put_state` with `&mut snapshot`
/// 3. `commit_snapshot(snapshot)` applies every staged write atomically,
///    OR `abort_snapshot(snapshot)` discards them
///
/// A `Snapshot` dropped without committing MUST leave the ledger untouched.
///
/// ## OCC Conflict Detection
///
/// Every `get_state` records the version of the key it observed, with an
/// absent key recorded as "no version". `commit_snapshot` re-checks the
/// whole read set; if any key changed since it was read, the commit fails
/// with `StorageError::ConcurrentConflict` and no write is applied.
///
/// ## Thread Safety
///
/// Implementations must be `Send + Sync + 'static` so one ledger can be
/// shared across async tasks.
#[async_trait]
pub trait LedgerStore: Send + Sync + 'static {
    /// The snapshot (transaction) type used by this backend.
    type Snapshot: Send;

    // ── Snapshot lifecycle ────────────────────────────────────────────────────

    /// Begin a new snapshot (transaction).
    async fn begin_snapshot(&self) -> Result<Self::Snapshot, StorageError>;

    /// Validate the read set and apply every staged write, or none.
    async fn commit_snapshot(&self, snapshot: Self::Snapshot) -> Result<(), StorageError>;

    /// Abort (roll back) a snapshot, discarding all staged writes.
    async fn abort_snapshot(&self, snapshot: Self::Snapshot) -> Result<(), StorageError>;

    // ── Key operations (within snapshot) ──────────────────────────────────────

    /// Read a key, recording the observed version in the read set.
    ///
    /// Returns `Ok(None)` for an absent key; absence is not an error. A value
    /// staged earlier in the same snapshot is returned as written.
    async fn get_state(
        &self,
        snapshot: &mut Self::Snapshot,
        key: &str,
    ) -> Result<Option<Vec<u8>>, StorageError>;

    /// Stage a write. Later writes to the same key replace earlier ones.
    async fn put_state(
        &self,
        snapshot: &mut Self::Snapshot,
        key: &str,
        value: Vec<u8>,
    ) -> Result<(), StorageError>;

    // ── Query operations (committed state, outside snapshot) ──────────────────

    /// Read a key's committed value without recording it anywhere.
    async fn read_state(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError>;

    /// The commit version of a key's current value, `None` if absent.
    async fn state_version(&self, key: &str) -> Result<Option<u64>, StorageError>;

    /// All committed JSON records matching `selector`, in key order.
    async fn query(&self, selector: &Selector) -> Result<Vec<QueryRecord>, StorageError>;
}
