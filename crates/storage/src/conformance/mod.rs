//! Conformance test suite for `LedgerStore` implementations.
//!
//! A backend-agnostic suite any `LedgerStore` implementation can run to
//! verify correctness. The suite covers:
//!
//! - **Initialization**: absent keys read as `None`, first writes land
//! - **Snapshot isolation**: staged writes invisible until commit, aborts discard
//! - **Atomic commit**: all-or-nothing semantics for multi-key snapshots
//! - **Version validation / OCC**: stale reads fail the commit
//! - **Selector queries**: `{docType, status}` filtering over committed state
//! - **Concurrency**: racing read-modify-write snapshots, exactly one winner
//!
//! # Usage
//!
//! Backend crates call [`run_conformance_suite`] with a factory function that
//! creates a fresh, empty ledger for each test:
//!
//! ```ignore
//! use bikeshare_storage::conformance::run_conformance_suite;
//!
//! #[tokio::test]
//! async fn my_backend_conformance() {
//!     let report = run_conformance_suite(|| async { MyLedger::connect().await }).await;
//!     assert!(report.failed == 0, "{report}");
//! }
//! ```

mod commit;
mod concurrent;
mod init;
mod query;
mod snapshot;
mod version;

use std::fmt;
use std::future::Future;

use crate::LedgerStore;

/// Result of a single conformance test.
#[derive(Debug, Clone)]
pub struct TestResult {
    /// Test category (e.g. "init", "snapshot", "commit").
    pub category: String,
    /// Test name (e.g. "absent_key_reads_none").
    pub name: String,
    pub passed: bool,
    /// Error message if the test failed.
    pub message: Option<String>,
}

impl TestResult {
    fn from_result(category: &str, name: &str, result: Result<(), String>) -> Self {
        let (passed, message) = match result {
            Ok(()) => (true, None),
            Err(msg) => (false, Some(msg)),
        };
        Self {
            category: category.to_string(),
            name: name.to_string(),
            passed,
            message,
        }
    }
}

/// Aggregated report from a full conformance suite run.
#[derive(Debug, Clone)]
pub struct ConformanceReport {
    pub results: Vec<TestResult>,
    pub passed: usize,
    pub failed: usize,
    pub total: usize,
}

impl fmt::Display for ConformanceReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Conformance: {}/{} passed ({} failed)",
            self.passed, self.total, self.failed
        )?;
        for r in self.results.iter().filter(|r| !r.passed) {
            writeln!(
                f,
                "  FAIL [{}/{}]: {}",
                r.category,
                r.name,
                r.message.as_deref().unwrap_or("(no message)")
            )?;
        }
        Ok(())
    }
}

/// Run the full conformance suite against a ledger backend.
///
/// The `factory` function is called once per test to create a fresh, empty
/// ledger, ensuring test isolation.
pub async fn run_conformance_suite<S, F, Fut>(factory: F) -> ConformanceReport
where
    S: LedgerStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let mut results = Vec::new();

    results.extend(init::run_init_tests(&factory).await);
    results.extend(snapshot::run_snapshot_tests(&factory).await);
    results.extend(commit::run_commit_tests(&factory).await);
    results.extend(version::run_version_tests(&factory).await);
    results.extend(query::run_query_tests(&factory).await);
    results.extend(concurrent::run_concurrent_tests(&factory).await);

    let passed = results.iter().filter(|r| r.passed).count();
    let total = results.len();

    ConformanceReport {
        results,
        passed,
        failed: total - passed,
        total,
    }
}

// ── Helpers ──────────────────────────────────────────────────────────────────

/// A JSON record body with the fields selector queries look at.
fn doc(doc_type: &str, id: &str, status: &str) -> Vec<u8> {
    serde_json::json!({ "docType": doc_type, "id": id, "status": status })
        .to_string()
        .into_bytes()
}

/// Write `pairs` in one snapshot and commit it.
async fn seed<S: LedgerStore>(storage: &S, pairs: &[(&str, Vec<u8>)]) -> Result<(), String> {
    let mut snap = storage
        .begin_snapshot()
        .await
        .map_err(|e| format!("begin: {e}"))?;
    for (key, value) in pairs {
        storage
            .put_state(&mut snap, key, value.clone())
            .await
            .map_err(|e| format!("put {key}: {e}"))?;
    }
    storage
        .commit_snapshot(snap)
        .await
        .map_err(|e| format!("commit seed: {e}"))
}

/// Committed value of `key`, mapping storage errors to test failures.
async fn committed<S: LedgerStore>(storage: &S, key: &str) -> Result<Option<Vec<u8>>, String> {
    storage
        .read_state(key)
        .await
        .map_err(|e| format!("read_state {key}: {e}"))
}
