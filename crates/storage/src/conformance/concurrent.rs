use std::future::Future;
use std::sync::Arc;

use super::{committed, doc, seed, TestResult};
use crate::{LedgerStore, StorageError};

/// Number of concurrent tasks to spawn in each test.
const N: usize = 10;

pub(super) async fn run_concurrent_tests<S, F, Fut>(factory: &F) -> Vec<TestResult>
where
    S: LedgerStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let mut results = Vec::new();

    results.push(TestResult::from_result(
        "concurrent",
        "racing_updates_exactly_one_wins",
        racing_updates_exactly_one_wins(factory).await,
    ));
    results.push(TestResult::from_result(
        "concurrent",
        "racing_creations_exactly_one_wins",
        racing_creations_exactly_one_wins(factory).await,
    ));
    results.push(TestResult::from_result(
        "concurrent",
        "disjoint_updates_all_succeed",
        disjoint_updates_all_succeed(factory).await,
    ));

    results
}

/// Open a snapshot, read `key`, stage `value` under it, then commit.
/// Returns whether the commit won.
async fn read_then_write<S: LedgerStore>(
    s: Arc<S>,
    key: String,
    value: Vec<u8>,
    barrier: Arc<tokio::sync::Barrier>,
) -> Result<bool, StorageError> {
    let mut snap = s.begin_snapshot().await?;
    s.get_state(&mut snap, &key).await?;
    // Every task holds its read before anyone commits.
    barrier.wait().await;
    s.put_state(&mut snap, &key, value).await?;
    match s.commit_snapshot(snap).await {
        Ok(()) => Ok(true),
        Err(StorageError::ConcurrentConflict { .. }) => Ok(false),
        Err(e) => Err(e),
    }
}

async fn count_winners(
    handles: Vec<tokio::task::JoinHandle<Result<bool, StorageError>>>,
) -> Result<(usize, usize), String> {
    let mut winners = 0usize;
    let mut losers = 0usize;
    for handle in handles {
        let won = handle
            .await
            .map_err(|e| format!("task panic: {e}"))?
            .map_err(|e| format!("storage error: {e}"))?;
        if won {
            winners += 1;
        } else {
            losers += 1;
        }
    }
    Ok((winners, losers))
}

// ── Racing update: exactly one wins ──────────────────────────────────────────

/// N tasks read the same bike and try to take it. Exactly one commit
/// succeeds; the rest must get ConcurrentConflict.
async fn racing_updates_exactly_one_wins<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: LedgerStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let storage = Arc::new(factory().await);
    seed(storage.as_ref(), &[("bike", doc("Bike", "b", "AVAILABLE"))]).await?;

    let barrier = Arc::new(tokio::sync::Barrier::new(N));
    let handles = (0..N)
        .map(|i| {
            tokio::spawn(read_then_write(
                storage.clone(),
                "bike".to_string(),
                doc("Bike", &format!("taken-by-{i}"), "IN_USE"),
                barrier.clone(),
            ))
        })
        .collect();

    let (winners, losers) = count_winners(handles).await?;
    if winners != 1 {
        return Err(format!("expected exactly 1 winner, got {winners}"));
    }
    if losers != N - 1 {
        return Err(format!("expected {} losers, got {losers}", N - 1));
    }
    Ok(())
}

// ── Racing creation: exactly one wins ────────────────────────────────────────

/// N tasks each see the key absent and try to create it.
async fn racing_creations_exactly_one_wins<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: LedgerStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let storage = Arc::new(factory().await);
    let barrier = Arc::new(tokio::sync::Barrier::new(N));
    let handles = (0..N)
        .map(|i| {
            tokio::spawn(read_then_write(
                storage.clone(),
                "user".to_string(),
                doc("User", &format!("u{i}"), "FREE"),
                barrier.clone(),
            ))
        })
        .collect();

    let (winners, _) = count_winners(handles).await?;
    if winners != 1 {
        return Err(format!("expected exactly 1 creator, got {winners}"));
    }
    if committed(storage.as_ref(), "user").await?.is_none() {
        return Err("winning creation not visible".into());
    }
    Ok(())
}

// ── Disjoint updates: no interference ────────────────────────────────────────

async fn disjoint_updates_all_succeed<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: LedgerStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let storage = Arc::new(factory().await);
    let barrier = Arc::new(tokio::sync::Barrier::new(N));
    let handles = (0..N)
        .map(|i| {
            tokio::spawn(read_then_write(
                storage.clone(),
                format!("bike-{i}"),
                doc("Bike", &format!("b{i}"), "AVAILABLE"),
                barrier.clone(),
            ))
        })
        .collect();

    let (winners, losers) = count_winners(handles).await?;
    if winners != N || losers != 0 {
        return Err(format!("expected {N} winners, got {winners} ({losers} conflicts)"));
    }
    Ok(())
}
