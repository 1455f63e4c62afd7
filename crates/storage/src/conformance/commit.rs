//! Atomic commit conformance tests.
//!
//! A multi-key snapshot either lands completely or not at all.

use std::future::Future;

use super::{committed, doc, seed, TestResult};
use crate::{LedgerStore, StorageError};

pub(super) async fn run_commit_tests<S, F, Fut>(factory: &F) -> Vec<TestResult>
where
    S: LedgerStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let mut results = Vec::new();

    results.push(TestResult::from_result(
        "commit",
        "multi_key_commit_applies_all",
        multi_key_commit_applies_all(factory).await,
    ));
    results.push(TestResult::from_result(
        "commit",
        "conflicting_commit_applies_nothing",
        conflicting_commit_applies_nothing(factory).await,
    ));
    results.push(TestResult::from_result(
        "commit",
        "read_only_commit_succeeds",
        read_only_commit_succeeds(factory).await,
    ));
    results.push(TestResult::from_result(
        "commit",
        "blind_write_needs_no_read",
        blind_write_needs_no_read(factory).await,
    ));

    results
}

// ── Test implementations ──────────────────────────────────────────────────────

/// The shape of a ride start: user, bike and a new ride written together.
async fn multi_key_commit_applies_all<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: LedgerStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    seed(
        &s,
        &[
            ("user", doc("User", "u", "FREE")),
            ("bike", doc("Bike", "b", "AVAILABLE")),
        ],
    )
    .await?;

    let mut snap = s.begin_snapshot().await.map_err(|e| e.to_string())?;
    for key in ["user", "bike", "ride"] {
        s.get_state(&mut snap, key).await.map_err(|e| e.to_string())?;
    }
    s.put_state(&mut snap, "user", doc("User", "u", "IN_RIDE"))
        .await
        .map_err(|e| e.to_string())?;
    s.put_state(&mut snap, "bike", doc("Bike", "b", "IN_USE"))
        .await
        .map_err(|e| e.to_string())?;
    s.put_state(&mut snap, "ride", doc("Ride", "r", "ONGOING"))
        .await
        .map_err(|e| e.to_string())?;
    s.commit_snapshot(snap).await.map_err(|e| e.to_string())?;

    let expected = [
        ("user", doc("User", "u", "IN_RIDE")),
        ("bike", doc("Bike", "b", "IN_USE")),
        ("ride", doc("Ride", "r", "ONGOING")),
    ];
    for (key, value) in expected {
        if committed(&s, key).await? != Some(value) {
            return Err(format!("{key} not updated by the commit"));
        }
    }
    Ok(())
}

/// A conflict on any one read key rejects every staged write.
async fn conflicting_commit_applies_nothing<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: LedgerStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    seed(
        &s,
        &[
            ("user", doc("User", "u", "FREE")),
            ("bike", doc("Bike", "b", "AVAILABLE")),
        ],
    )
    .await?;

    let mut snap = s.begin_snapshot().await.map_err(|e| e.to_string())?;
    s.get_state(&mut snap, "user").await.map_err(|e| e.to_string())?;
    s.get_state(&mut snap, "bike").await.map_err(|e| e.to_string())?;

    // Someone else takes the bike first.
    seed(&s, &[("bike", doc("Bike", "b", "DISCARDED"))]).await?;

    s.put_state(&mut snap, "user", doc("User", "u", "IN_RIDE"))
        .await
        .map_err(|e| e.to_string())?;
    s.put_state(&mut snap, "bike", doc("Bike", "b", "IN_USE"))
        .await
        .map_err(|e| e.to_string())?;
    s.put_state(&mut snap, "ride", doc("Ride", "r", "ONGOING"))
        .await
        .map_err(|e| e.to_string())?;

    match s.commit_snapshot(snap).await {
        Err(StorageError::ConcurrentConflict { key }) if key == "bike" => {}
        Err(e) => return Err(format!("expected conflict on bike, got {e}")),
        Ok(()) => return Err("stale commit succeeded".into()),
    }

    if committed(&s, "user").await? != Some(doc("User", "u", "FREE")) {
        return Err("user changed by a rejected commit".into());
    }
    if committed(&s, "bike").await? != Some(doc("Bike", "b", "DISCARDED")) {
        return Err("bike changed by a rejected commit".into());
    }
    if committed(&s, "ride").await?.is_some() {
        return Err("ride created by a rejected commit".into());
    }
    Ok(())
}

async fn read_only_commit_succeeds<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: LedgerStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    seed(&s, &[("k", doc("Issue", "i", "OPEN"))]).await?;
    let before = s.state_version("k").await.map_err(|e| e.to_string())?;
    let mut snap = s.begin_snapshot().await.map_err(|e| e.to_string())?;
    s.get_state(&mut snap, "k").await.map_err(|e| e.to_string())?;
    s.commit_snapshot(snap).await.map_err(|e| e.to_string())?;
    let after = s.state_version("k").await.map_err(|e| e.to_string())?;
    if before != after {
        return Err(format!("read-only commit moved version {before:?} -> {after:?}"));
    }
    Ok(())
}

/// Writes to keys never read are not version-checked.
async fn blind_write_needs_no_read<S, F, Fut>(factory: &F) -> Result<(), String>
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
    seed(&s, &[("k", doc("Bike", "k", "IN_USE"))]).await?;
    s.commit_snapshot(snap).await.map_err(|e| e.to_string())?;
    if committed(&s, "k").await? != Some(doc("Bike", "k", "AVAILABLE")) {
        return Err("blind write did not land".into());
    }
    Ok(())
}
