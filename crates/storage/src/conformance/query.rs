//! Selector query conformance tests.

use std::future::Future;

use super::{doc, seed, TestResult};
use crate::{LedgerStore, Selector};

pub(super) async fn run_query_tests<S, F, Fut>(factory: &F) -> Vec<TestResult>
where
    S: LedgerStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let mut results = Vec::new();

    results.push(TestResult::from_result(
        "query",
        "empty_ledger_returns_no_rows",
        empty_ledger_returns_no_rows(factory).await,
    ));
    results.push(TestResult::from_result(
        "query",
        "filters_by_doc_type_and_status",
        filters_by_doc_type_and_status(factory).await,
    ));
    results.push(TestResult::from_result(
        "query",
        "returns_key_with_stored_bytes",
        returns_key_with_stored_bytes(factory).await,
    ));
    results.push(TestResult::from_result(
        "query",
        "reflects_latest_commit",
        reflects_latest_commit(factory).await,
    ));
    results.push(TestResult::from_result(
        "query",
        "skips_non_json_values",
        skips_non_json_values(factory).await,
    ));

    results
}

// ── Test implementations ──────────────────────────────────────────────────────

async fn empty_ledger_returns_no_rows<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: LedgerStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let rows = s
        .query(&Selector::new("Bike", "AVAILABLE"))
        .await
        .map_err(|e| e.to_string())?;
    if !rows.is_empty() {
        return Err(format!("expected no rows, got {}", rows.len()));
    }
    Ok(())
}

async fn filters_by_doc_type_and_status<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: LedgerStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    seed(
        &s,
        &[
            ("b1", doc("Bike", "b1", "AVAILABLE")),
            ("b2", doc("Bike", "b2", "IN_USE")),
            ("b3", doc("Bike", "b3", "AVAILABLE")),
            ("r1", doc("Repair", "r1", "AVAILABLE")),
        ],
    )
    .await?;
    let rows = s
        .query(&Selector::new("Bike", "AVAILABLE"))
        .await
        .map_err(|e| e.to_string())?;
    let mut keys: Vec<&str> = rows.iter().map(|r| r.key.as_str()).collect();
    keys.sort_unstable();
    if keys != ["b1", "b3"] {
        return Err(format!("expected [b1, b3], got {keys:?}"));
    }
    Ok(())
}

async fn returns_key_with_stored_bytes<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: LedgerStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let value = doc("Issue", "i1", "OPEN");
    seed(&s, &[("i1", value.clone())]).await?;
    let rows = s
        .query(&Selector::new("Issue", "OPEN"))
        .await
        .map_err(|e| e.to_string())?;
    match rows.as_slice() {
        [row] if row.key == "i1" && row.value == value => Ok(()),
        other => Err(format!("unexpected rows {other:?}")),
    }
}

async fn reflects_latest_commit<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: LedgerStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    seed(&s, &[("r", doc("Ride", "r", "ONGOING"))]).await?;
    seed(&s, &[("r", doc("Ride", "r", "COMPLETED"))]).await?;
    let ongoing = s
        .query(&Selector::new("Ride", "ONGOING"))
        .await
        .map_err(|e| e.to_string())?;
    let completed = s
        .query(&Selector::new("Ride", "COMPLETED"))
        .await
        .map_err(|e| e.to_string())?;
    if !ongoing.is_empty() || completed.len() != 1 {
        return Err(format!(
            "expected 0 ongoing / 1 completed, got {} / {}",
            ongoing.len(),
            completed.len()
        ));
    }
    Ok(())
}

async fn skips_non_json_values<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: LedgerStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    seed(
        &s,
        &[
            ("raw", b"not json".to_vec()),
            ("b", doc("Bike", "b", "AVAILABLE")),
        ],
    )
    .await?;
    let rows = s
        .query(&Selector::new("Bike", "AVAILABLE"))
        .await
        .map_err(|e| format!("query failed on a non-JSON value: {e}"))?;
    if rows.len() != 1 {
        return Err(format!("expected 1 row, got {}", rows.len()));
    }
    Ok(())
}
