//! Concurrent ingestion and sweeping against one account.

use futures::future::join_all;

use wager_ledger::engine::{IngestionService, Sweeper};
use wager_ledger::types::{IngestOutcome, LedgerError};

use crate::common::{submission, TestDb, IDENTITY};

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_distinct_bets_all_apply() {
    let db = TestDb::new().await;
    let service = IngestionService::new(db.pool.clone(), IDENTITY);

    let tasks = (0..40).map(|i| {
        let service = service.clone();
        tokio::spawn(async move { service.ingest(&submission(&format!("bet-{i}"), "win", "1")).await })
    });
    let results = join_all(tasks).await;

    for result in results {
        assert!(matches!(result.unwrap(), Ok(IngestOutcome::Recorded { .. })));
    }
    // No lost updates.
    assert_eq!(db.balance().await, 40_000);
    assert_eq!(db.bet_count().await, 40);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_duplicates_apply_once() {
    let db = TestDb::new().await;
    let service = IngestionService::new(db.pool.clone(), IDENTITY);

    let tasks = (0..20).map(|_| {
        let service = service.clone();
        tokio::spawn(async move { service.ingest(&submission("same", "win", "15.5")).await })
    });
    let outcomes: Vec<IngestOutcome> = join_all(tasks)
        .await
        .into_iter()
        .map(|r| r.unwrap().unwrap())
        .collect();

    let recorded = outcomes
        .iter()
        .filter(|o| matches!(o, IngestOutcome::Recorded { .. }))
        .count();
    assert_eq!(recorded, 1);
    assert_eq!(outcomes.len(), 20);
    assert_eq!(db.balance().await, 15_500);
    assert_eq!(db.bet_count().await, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_losses_never_overdraw() {
    let db = TestDb::new().await;
    let service = IngestionService::new(db.pool.clone(), IDENTITY);
    service.ingest(&submission("seed", "win", "5")).await.unwrap();

    let tasks = (0..20).map(|i| {
        let service = service.clone();
        tokio::spawn(async move { service.ingest(&submission(&format!("loss-{i}"), "lost", "1")).await })
    });
    let results: Vec<_> = join_all(tasks).await.into_iter().map(|r| r.unwrap()).collect();

    let accepted = results.iter().filter(|r| r.is_ok()).count();
    let overdrawn = results
        .iter()
        .filter(|r| matches!(r, Err(LedgerError::InsufficientBalance { .. })))
        .count();
    assert_eq!(accepted, 5);
    assert_eq!(overdrawn, 15);
    assert_eq!(db.balance().await, 0);
    // Rejected losses left no rows behind.
    assert_eq!(db.bet_count().await, 6);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn sweeper_and_ingestion_interleave_consistently() {
    let db = TestDb::new().await;
    let service = IngestionService::new(db.pool.clone(), IDENTITY);
    let sweeper = Sweeper::new(db.pool.clone(), IDENTITY, 10);

    let ingest = {
        let service = service.clone();
        tokio::spawn(async move {
            for i in 0..30 {
                service.ingest(&submission(&format!("bet-{i}"), "win", "2")).await.unwrap();
            }
        })
    };
    let sweep = {
        let sweeper = sweeper.clone();
        tokio::spawn(async move {
            for _ in 0..10 {
                sweeper.sweep().await.unwrap();
                tokio::task::yield_now().await;
            }
        })
    };
    ingest.await.unwrap();
    sweep.await.unwrap();

    while sweeper.sweep().await.unwrap().processed > 0 {}

    // Every win credited at ingestion has been reversed exactly once.
    assert_eq!(db.unprocessed_count().await, 0);
    assert_eq!(db.balance().await, 0);
    assert_eq!(db.bet_count().await, 30);
}
