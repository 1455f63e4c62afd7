//! Version validation (OCC) conformance tests.

use std::future::Future;

use super::{committed, doc, seed, TestResult};
use crate::{LedgerStore, StorageError};

pub(super) async fn run_version_tests<S, F, Fut>(factory: &F) -> Vec<TestResult>
where
    S: LedgerStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let mut results = Vec::new();

    results.push(TestResult::from_result(
        "version",
        "version_increases_on_every_write",
        version_increases_on_every_write(factory).await,
    ));
    results.push(TestResult::from_result(
        "version",
        "untouched_key_keeps_version",
        untouched_key_keeps_version(factory).await,
    ));
    results.push(TestResult::from_result(
        "version",
        "stale_read_conflicts",
        stale_read_conflicts(factory).await,
    ));
    results.push(TestResult::from_result(
        "version",
        "absent_read_conflicts_with_creation",
        absent_read_conflicts_with_creation(factory).await,
    ));
    results.push(TestResult::from_result(
        "version",
        "rewrite_with_same_bytes_still_conflicts",
        rewrite_with_same_bytes_still_conflicts(factory).await,
    ));
    results.push(TestResult::from_result(
        "version",
        "retry_after_conflict_succeeds",
        retry_after_conflict_succeeds(factory).await,
    ));

    results
}

// ── Test implementations ──────────────────────────────────────────────────────

async fn version_increases_on_every_write<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: LedgerStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let mut last = None;
    for status in ["AVAILABLE", "IN_USE", "AVAILABLE"] {
        seed(&s, &[("k", doc("Bike", "k", status))]).await?;
        let v = s.state_version("k").await.map_err(|e| e.to_string())?;
        if v.is_none() || v <= last {
            return Err(format!("version did not increase: {last:?} -> {v:?}"));
        }
        last = v;
    }
    Ok(())
}

async fn untouched_key_keeps_version<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: LedgerStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    seed(&s, &[("a", doc("Bike", "a", "AVAILABLE"))]).await?;
    let before = s.state_version("a").await.map_err(|e| e.to_string())?;
    seed(&s, &[("b", doc("Bike", "b", "AVAILABLE"))]).await?;
    let after = s.state_version("a").await.map_err(|e| e.to_string())?;
    if before != after {
        return Err(format!("unrelated commit changed version {before:?} -> {after:?}"));
    }
    Ok(())
}

async fn stale_read_conflicts<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: LedgerStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    seed(&s, &[("k", doc("User", "u", "FREE"))]).await?;
    let mut snap = s.begin_snapshot().await.map_err(|e| e.to_string())?;
    s.get_state(&mut snap, "k").await.map_err(|e| e.to_string())?;
    seed(&s, &[("k", doc("User", "u", "IN_RIDE"))]).await?;
    s.put_state(&mut snap, "k", doc("User", "u", "FREE"))
        .await
        .map_err(|e| e.to_string())?;
    match s.commit_snapshot(snap).await {
        Err(StorageError::ConcurrentConflict { key }) if key == "k" => Ok(()),
        Err(e) => Err(format!("expected ConcurrentConflict on k, got {e}")),
        Ok(()) => Err("commit over a stale read succeeded".into()),
    }
}

/// Reading a key as absent and then seeing it created is a conflict; this
/// is what guards duplicate registration under races.
async fn absent_read_conflicts_with_creation<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: LedgerStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let mut snap = s.begin_snapshot().await.map_err(|e| e.to_string())?;
    if s.get_state(&mut snap, "k").await.map_err(|e| e.to_string())?.is_some() {
        return Err("fresh key not absent".into());
    }
    seed(&s, &[("k", doc("User", "first", "FREE"))]).await?;
    s.put_state(&mut snap, "k", doc("User", "second", "FREE"))
        .await
        .map_err(|e| e.to_string())?;
    match s.commit_snapshot(snap).await {
        Err(StorageError::ConcurrentConflict { .. }) => {}
        Err(e) => return Err(format!("expected ConcurrentConflict, got {e}")),
        Ok(()) => return Err("second creation succeeded".into()),
    }
    if committed(&s, "k").await? != Some(doc("User", "first", "FREE")) {
        return Err("first creation was overwritten".into());
    }
    Ok(())
}

/// Versions track commits, not content.
async fn rewrite_with_same_bytes_still_conflicts<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: LedgerStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let value = doc("Bike", "k", "AVAILABLE");
    seed(&s, &[("k", value.clone())]).await?;
    let mut snap = s.begin_snapshot().await.map_err(|e| e.to_string())?;
    s.get_state(&mut snap, "k").await.map_err(|e| e.to_string())?;
    seed(&s, &[("k", value)]).await?;
    match s.commit_snapshot(snap).await {
        Err(StorageError::ConcurrentConflict { .. }) => Ok(()),
        Err(e) => Err(format!("expected ConcurrentConflict, got {e}")),
        Ok(()) => Err("read of an overwritten key passed validation".into()),
    }
}

async fn retry_after_conflict_succeeds<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: LedgerStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    seed(&s, &[("k", doc("Bike", "k", "AVAILABLE"))]).await?;
    let mut stale = s.begin_snapshot().await.map_err(|e| e.to_string())?;
    s.get_state(&mut stale, "k").await.map_err(|e| e.to_string())?;
    seed(&s, &[("k", doc("Bike", "k", "TO_REPAIR"))]).await?;
    if s.commit_snapshot(stale).await.is_ok() {
        return Err("stale commit succeeded".into());
    }

    let mut fresh = s.begin_snapshot().await.map_err(|e| e.to_string())?;
    s.get_state(&mut fresh, "k").await.map_err(|e| e.to_string())?;
    s.put_state(&mut fresh, "k", doc("Bike", "k", "AVAILABLE"))
        .await
        .map_err(|e| e.to_string())?;
    s.commit_snapshot(fresh)
        .await
        .map_err(|e| format!("fresh snapshot failed: {e}"))?;
    if committed(&s, "k").await? != Some(doc("Bike", "k", "AVAILABLE")) {
        return Err("retried write not visible".into());
    }
    Ok(())
}
