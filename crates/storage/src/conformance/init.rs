use std::future::Future;

use super::{committed, doc, seed, TestResult};
use crate::LedgerStore;

pub(super) async fn run_init_tests<S, F, Fut>(factory: &F) -> Vec<TestResult>
where
    S: LedgerStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let mut results = Vec::new();

    results.push(TestResult::from_result(
        "init",
        "absent_key_reads_none",
        absent_key_reads_none(factory).await,
    ));
    results.push(TestResult::from_result(
        "init",
        "absent_key_has_no_version",
        absent_key_has_no_version(factory).await,
    ));
    results.push(TestResult::from_result(
        "init",
        "first_write_visible_after_commit",
        first_write_visible_after_commit(factory).await,
    ));
    results.push(TestResult::from_result(
        "init",
        "first_write_receives_version",
        first_write_receives_version(factory).await,
    ));
    results.push(TestResult::from_result(
        "init",
        "different_keys_are_independent",
        different_keys_are_independent(factory).await,
    ));
    results.push(TestResult::from_result(
        "init",
        "composite_keys_round_trip",
        composite_keys_round_trip(factory).await,
    ));

    results
}

// ── Test implementations ──────────────────────────────────────────────────────

/// A fresh ledger has nothing under any key, inside or outside a snapshot.
async fn absent_key_reads_none<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: LedgerStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    if committed(&s, "missing").await?.is_some() {
        return Err("read_state returned a value for an absent key".into());
    }
    let mut snap = s.begin_snapshot().await.map_err(|e| e.to_string())?;
    let got = s
        .get_state(&mut snap, "missing")
        .await
        .map_err(|e| e.to_string())?;
    s.abort_snapshot(snap).await.map_err(|e| e.to_string())?;
    if got.is_some() {
        return Err("get_state returned a value for an absent key".into());
    }
    Ok(())
}

async fn absent_key_has_no_version<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: LedgerStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let version = s.state_version("missing").await.map_err(|e| e.to_string())?;
    if version.is_some() {
        return Err(format!("expected no version, got {version:?}"));
    }
    Ok(())
}

async fn first_write_visible_after_commit<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: LedgerStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let value = doc("Bike", "b1", "AVAILABLE");
    seed(&s, &[("bike-b1", value.clone())]).await?;
    match committed(&s, "bike-b1").await? {
        Some(got) if got == value => Ok(()),
        Some(_) => Err("committed value differs from the written bytes".into()),
        None => Err("committed write not visible".into()),
    }
}

async fn first_write_receives_version<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: LedgerStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    seed(&s, &[("k", doc("User", "u1", "FREE"))]).await?;
    match s.state_version("k").await.map_err(|e| e.to_string())? {
        Some(_) => Ok(()),
        None => Err("written key has no version".into()),
    }
}

/// Writing one key leaves every other key absent.
async fn different_keys_are_independent<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: LedgerStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    seed(&s, &[("a", doc("Bike", "a", "AVAILABLE"))]).await?;
    seed(&s, &[("b", doc("Bike", "b", "IN_USE"))]).await?;
    let a = committed(&s, "a").await?;
    let b = committed(&s, "b").await?;
    if a != Some(doc("Bike", "a", "AVAILABLE")) {
        return Err(format!("key a: unexpected value {a:?}"));
    }
    if b != Some(doc("Bike", "b", "IN_USE")) {
        return Err(format!("key b: unexpected value {b:?}"));
    }
    if committed(&s, "c").await?.is_some() {
        return Err("unwritten key c became visible".into());
    }
    Ok(())
}

/// Keys containing NUL delimiters are stored and read back verbatim.
async fn composite_keys_round_trip<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: LedgerStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let bike = "\u{0}Bike\u{0}x\u{0}";
    let user = "\u{0}User\u{0}x\u{0}";
    seed(
        &s,
        &[(bike, doc("Bike", "x", "AVAILABLE")), (user, doc("User", "x", "FREE"))],
    )
    .await?;
    if committed(&s, bike).await? != Some(doc("Bike", "x", "AVAILABLE")) {
        return Err("bike composite key did not round trip".into());
    }
    if committed(&s, user).await? != Some(doc("User", "x", "FREE")) {
        return Err("user composite key did not round trip".into());
    }
    Ok(())
}
