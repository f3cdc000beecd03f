mod common;

use assert_matches::assert_matches;
use chrono::Utc;
use common::TestLedger;
use sea_orm::{ActiveModelTrait, EntityTrait, Set};
use std::sync::{
    atomic::{AtomicU32, Ordering},
    Arc,
};
use std::time::Duration;
use stockledger::{
    db::{run_serializable, TransactionSettings},
    entities::warehouse::{self, Entity as Warehouse},
    ServiceError,
};
use uuid::Uuid;

fn settings(max_attempts: u32) -> TransactionSettings {
    TransactionSettings::new(Duration::from_secs(5), max_attempts, Duration::from_millis(1))
}

fn conflict() -> ServiceError {
    ServiceError::SerializationFailure("could not serialize access".to_string())
}

#[tokio::test]
async fn serialization_conflicts_are_retried() {
    let ledger = TestLedger::new().await;
    let calls = Arc::new(AtomicU32::new(0));

    let counter = calls.clone();
    let result = run_serializable(ledger.db.as_ref(), &settings(3), move |_txn| {
        let counter = counter.clone();
        Box::pin(async move {
            if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                Err(conflict())
            } else {
                Ok(42)
            }
        })
    })
    .await;

    assert_eq!(result.expect("third attempt succeeds"), 42);
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn retries_stop_at_max_attempts() {
    let ledger = TestLedger::new().await;
    let calls = Arc::new(AtomicU32::new(0));

    let counter = calls.clone();
    let result: Result<(), _> = run_serializable(ledger.db.as_ref(), &settings(2), move |_txn| {
        let counter = counter.clone();
        Box::pin(async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Err(conflict())
        })
    })
    .await;

    assert_matches!(result, Err(ServiceError::Conflict(msg)) if msg.contains("2 attempts"));
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn business_errors_are_not_retried() {
    let ledger = TestLedger::new().await;
    let calls = Arc::new(AtomicU32::new(0));

    let counter = calls.clone();
    let result: Result<(), _> = run_serializable(ledger.db.as_ref(), &settings(5), move |_txn| {
        let counter = counter.clone();
        Box::pin(async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Err(ServiceError::Conflict(
                "concurrent modification, retry: duplicate record".to_string(),
            ))
        })
    })
    .await;

    assert_matches!(result, Err(ServiceError::Conflict(_)));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn failed_attempt_rolls_back_its_writes() {
    let ledger = TestLedger::new().await;
    let company_id = ledger.company_id;
    let id = Uuid::new_v4();

    let result: Result<(), _> = run_serializable(ledger.db.as_ref(), &settings(1), move |txn| {
        Box::pin(async move {
            warehouse::ActiveModel {
                id: Set(id),
                company_id: Set(company_id),
                name: Set("Scratch".to_string()),
                created_at: Set(Utc::now()),
            }
            .insert(txn)
            .await?;
            Err(ServiceError::ValidationError("abort".to_string()))
        })
    })
    .await;

    assert_matches!(result, Err(ServiceError::ValidationError(_)));
    let stored = Warehouse::find_by_id(id)
        .one(ledger.db.as_ref())
        .await
        .expect("query warehouse");
    assert!(stored.is_none());
}

#[tokio::test]
async fn slow_transactions_time_out() {
    let ledger = TestLedger::new().await;
    let settings = TransactionSettings::new(Duration::from_millis(20), 3, Duration::ZERO);

    let result: Result<(), _> = run_serializable(ledger.db.as_ref(), &settings, move |_txn| {
        Box::pin(async move {
            tokio::time::sleep(Duration::from_millis(500)).await;
            Ok(())
        })
    })
    .await;

    assert_matches!(result, Err(ServiceError::Timeout(d)) if d == Duration::from_millis(20));
}
