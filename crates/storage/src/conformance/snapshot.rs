//! Snapshot isolation conformance tests.
//!
//! Verifies that staged writes are invisible outside their snapshot,
//! committed writes are visible, and aborted or dropped snapshots leave no
//! trace.

use std::future::Future;

use super::{committed, doc, seed, TestResult};
use crate::{LedgerStore, Selector};

pub(super) async fn run_snapshot_tests<S, F, Fut>(factory: &F) -> Vec<TestResult>
where
    S: LedgerStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let mut results = Vec::new();

    results.push(TestResult::from_result(
        "snapshot",
        "staged_write_invisible_to_read_state",
        staged_write_invisible_to_read_state(factory).await,
    ));
    results.push(TestResult::from_result(
        "snapshot",
        "staged_write_invisible_to_query",
        staged_write_invisible_to_query(factory).await,
    ));
    results.push(TestResult::from_result(
        "snapshot",
        "staged_write_invisible_to_other_snapshot",
        staged_write_invisible_to_other_snapshot(factory).await,
    ));
    results.push(TestResult::from_result(
        "snapshot",
        "snapshot_reads_its_own_writes",
        snapshot_reads_its_own_writes(factory).await,
    ));
    results.push(TestResult::from_result(
        "snapshot",
        "abort_discards_writes",
        abort_discards_writes(factory).await,
    ));
    results.push(TestResult::from_result(
        "snapshot",
        "dropped_snapshot_discards_writes",
        dropped_snapshot_discards_writes(factory).await,
    ));
    results.push(TestResult::from_result(
        "snapshot",
        "later_put_replaces_earlier_put",
        later_put_replaces_earlier_put(factory).await,
    ));
    results.push(TestResult::from_result(
        "snapshot",
        "sequential_snapshots_see_prior_commits",
        sequential_snapshots_see_prior_commits(factory).await,
    ));

    results
}

// ── Test implementations ──────────────────────────────────────────────────────

async fn staged_write_invisible_to_read_state<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: LedgerStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let mut snap = s.begin_snapshot().await.map_err(|e| e.to_string())?;
    s.put_state(&mut snap, "k", doc("Bike", "k", "AVAILABLE"))
        .await
        .map_err(|e| e.to_string())?;
    let visible = committed(&s, "k").await?;
    s.abort_snapshot(snap).await.map_err(|e| e.to_string())?;
    if visible.is_some() {
        return Err("uncommitted write visible through read_state".into());
    }
    Ok(())
}

async fn staged_write_invisible_to_query<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: LedgerStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let mut snap = s.begin_snapshot().await.map_err(|e| e.to_string())?;
    s.put_state(&mut snap, "k", doc("Bike", "k", "AVAILABLE"))
        .await
        .map_err(|e| e.to_string())?;
    let rows = s
        .query(&Selector::new("Bike", "AVAILABLE"))
        .await
        .map_err(|e| e.to_string())?;
    s.abort_snapshot(snap).await.map_err(|e| e.to_string())?;
    if !rows.is_empty() {
        return Err(format!("query returned {} uncommitted rows", rows.len()));
    }
    Ok(())
}

async fn staged_write_invisible_to_other_snapshot<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: LedgerStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let mut writer = s.begin_snapshot().await.map_err(|e| e.to_string())?;
    let mut reader = s.begin_snapshot().await.map_err(|e| e.to_string())?;
    s.put_state(&mut writer, "k", doc("User", "k", "FREE"))
        .await
        .map_err(|e| e.to_string())?;
    let seen = s
        .get_state(&mut reader, "k")
        .await
        .map_err(|e| e.to_string())?;
    s.abort_snapshot(writer).await.map_err(|e| e.to_string())?;
    s.abort_snapshot(reader).await.map_err(|e| e.to_string())?;
    if seen.is_some() {
        return Err("one snapshot observed another's staged write".into());
    }
    Ok(())
}

async fn snapshot_reads_its_own_writes<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: LedgerStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let value = doc("Repair", "p", "REQUESTED");
    let mut snap = s.begin_snapshot().await.map_err(|e| e.to_string())?;
    s.put_state(&mut snap, "p", value.clone())
        .await
        .map_err(|e| e.to_string())?;
    let got = s.get_state(&mut snap, "p").await.map_err(|e| e.to_string())?;
    s.abort_snapshot(snap).await.map_err(|e| e.to_string())?;
    if got != Some(value) {
        return Err(format!("expected staged value, got {got:?}"));
    }
    Ok(())
}

async fn abort_discards_writes<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: LedgerStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    seed(&s, &[("k", doc("Bike", "k", "AVAILABLE"))]).await?;
    let mut snap = s.begin_snapshot().await.map_err(|e| e.to_string())?;
    s.put_state(&mut snap, "k", doc("Bike", "k", "DISCARDED"))
        .await
        .map_err(|e| e.to_string())?;
    s.put_state(&mut snap, "new", doc("Bike", "new", "AVAILABLE"))
        .await
        .map_err(|e| e.to_string())?;
    s.abort_snapshot(snap).await.map_err(|e| e.to_string())?;

    if committed(&s, "k").await? != Some(doc("Bike", "k", "AVAILABLE")) {
        return Err("aborted update became visible".into());
    }
    if committed(&s, "new").await?.is_some() {
        return Err("aborted insert became visible".into());
    }
    Ok(())
}

async fn dropped_snapshot_discards_writes<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: LedgerStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    {
        let mut snap = s.begin_snapshot().await.map_err(|e| e.to_string())?;
        s.put_state(&mut snap, "k", doc("Bike", "k", "AVAILABLE"))
            .await
            .map_err(|e| e.to_string())?;
    }
    if committed(&s, "k").await?.is_some() {
        return Err("write from dropped snapshot became visible".into());
    }
    Ok(())
}

async fn later_put_replaces_earlier_put<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: LedgerStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    seed(
        &s,
        &[
            ("k", doc("Bike", "k", "AVAILABLE")),
            ("k", doc("Bike", "k", "IN_USE")),
        ],
    )
    .await?;
    if committed(&s, "k").await? != Some(doc("Bike", "k", "IN_USE")) {
        return Err("last staged write did not win".into());
    }
    Ok(())
}

async fn sequential_snapshots_see_prior_commits<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: LedgerStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    seed(&s, &[("k", doc("Ride", "k", "ONGOING"))]).await?;
    let mut snap = s.begin_snapshot().await.map_err(|e| e.to_string())?;
    let got = s.get_state(&mut snap, "k").await.map_err(|e| e.to_string())?;
    s.abort_snapshot(snap).await.map_err(|e| e.to_string())?;
    if got != Some(doc("Ride", "k", "ONGOING")) {
        return Err(format!("new snapshot missed prior commit: {got:?}"));
    }
    Ok(())
}
