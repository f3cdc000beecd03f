mod common;

use assert_matches::assert_matches;
use async_trait::async_trait;
use chrono::Utc;
use common::TestLedger;
use rust_decimal_macros::dec;
use sea_orm::{DatabaseTransaction, TransactionTrait};
use std::sync::{
    atomic::{AtomicU32, Ordering},
    Arc,
};
use stockledger::{
    events::Event,
    models::ReceiveBatch,
    services::batch_number::{candidate, BatchNumberGenerator, BatchSequencer},
    ServiceError,
};
use uuid::Uuid;

/// Always proposes the same code, counting how often it was asked.
struct FixedSequencer {
    code: &'static str,
    calls: AtomicU32,
}

#[async_trait]
impl BatchSequencer for FixedSequencer {
    async fn next_code(
        &self,
        _txn: &DatabaseTransaction,
        _company_id: Uuid,
        _candidate: &str,
    ) -> Result<String, ServiceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.code.to_string())
    }
}

#[tokio::test]
async fn received_batches_get_sequential_numbers() {
    let mut ledger = TestLedger::new().await;
    let warehouse = ledger.warehouse("Main").await;
    let product = ledger.product("Widget", dec!(1), dec!(0)).await;
    let request = ReceiveBatch {
        company_id: ledger.company_id,
        product_id: product.id,
        warehouse_id: warehouse.id,
        quantity: dec!(25),
        cost_price: Some(dec!(3)),
    };

    let first = ledger
        .services
        .stock
        .receive_batch(request.clone())
        .await
        .expect("first receipt");
    let second = ledger
        .services
        .stock
        .receive_batch(ReceiveBatch {
            cost_price: None,
            ..request
        })
        .await
        .expect("second receipt");

    let prefix = candidate("Main", Utc::now().date_naive());
    assert_eq!(first.batch_number, format!("{}-0001", prefix));
    assert_eq!(second.batch_number, format!("{}-0002", prefix));
    assert_eq!(first.available_quantity, dec!(25));
    assert_eq!(first.initial_quantity, Some(dec!(25)));
    assert_eq!(first.cost_price, dec!(3));
    // Falls back to the product's default cost.
    assert_eq!(second.cost_price, product.cost_price);

    assert_eq!(ledger.reload_product(product.id).await.total_stock, dec!(50));
    let events = ledger.drain_events();
    assert_eq!(events.len(), 2);
    assert_matches!(&events[0], Event::BatchReceived { quantity, .. } if *quantity == dec!(25));
}

#[tokio::test]
async fn colliding_sequencer_exhausts_generation() {
    let sequencer = Arc::new(FixedSequencer {
        code: "MAI-TAKEN",
        calls: AtomicU32::new(0),
    });
    let ledger = TestLedger::with_sequencer(sequencer.clone()).await;
    let warehouse = ledger.warehouse("Main").await;
    let product = ledger.product("Widget", dec!(1), dec!(5)).await;
    ledger.batch(&product, &warehouse, "MAI-TAKEN", dec!(5), dec!(1), 0).await;

    let result = ledger
        .services
        .stock
        .receive_batch(ReceiveBatch {
            company_id: ledger.company_id,
            product_id: product.id,
            warehouse_id: warehouse.id,
            quantity: dec!(5),
            cost_price: None,
        })
        .await;

    assert_matches!(result, Err(ServiceError::GenerationExhausted { attempts: 10 }));
    assert_eq!(sequencer.calls.load(Ordering::SeqCst), 10);
    assert_eq!(ledger.company_batches().await.len(), 1);
    assert_eq!(ledger.reload_product(product.id).await.total_stock, dec!(5));
}

#[tokio::test]
async fn generator_respects_its_attempt_bound() {
    let ledger = TestLedger::new().await;
    let warehouse = ledger.warehouse("Main").await;
    let product = ledger.product("Widget", dec!(1), dec!(1)).await;
    ledger.batch(&product, &warehouse, "TAKEN", dec!(1), dec!(1), 0).await;

    let sequencer = Arc::new(FixedSequencer {
        code: "TAKEN",
        calls: AtomicU32::new(0),
    });
    let generator = BatchNumberGenerator::new(sequencer.clone(), 3);

    let txn = ledger.db.begin().await.expect("begin transaction");
    let result = generator
        .generate(&txn, ledger.company_id, "Main", Utc::now().date_naive())
        .await;
    txn.rollback().await.expect("rollback");

    assert_matches!(result, Err(ServiceError::GenerationExhausted { attempts: 3 }));
    assert_eq!(sequencer.calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn batch_numbers_are_scoped_per_company() {
    let ledger = TestLedger::new().await;
    let warehouse = ledger.warehouse("Main").await;
    let product = ledger.product("Widget", dec!(1), dec!(1)).await;
    ledger.batch(&product, &warehouse, "TAKEN", dec!(1), dec!(1), 0).await;

    let generator = BatchNumberGenerator::new(
        Arc::new(FixedSequencer {
            code: "TAKEN",
            calls: AtomicU32::new(0),
        }),
        1,
    );

    let txn = ledger.db.begin().await.expect("begin transaction");
    let other_company = Uuid::new_v4();
    let code = generator
        .generate(&txn, other_company, "Main", Utc::now().date_naive())
        .await
        .expect("free in another company");
    txn.rollback().await.expect("rollback");

    assert_eq!(code, "TAKEN");
}

#[tokio::test]
async fn receiving_into_unknown_warehouse_fails() {
    let ledger = TestLedger::new().await;
    let product = ledger.product("Widget", dec!(1), dec!(0)).await;

    let result = ledger
        .services
        .stock
        .receive_batch(ReceiveBatch {
            company_id: ledger.company_id,
            product_id: product.id,
            warehouse_id: Uuid::new_v4(),
            quantity: dec!(1),
            cost_price: None,
        })
        .await;
    assert_matches!(result, Err(ServiceError::NotFound(_)));

    let result = ledger
        .services
        .stock
        .receive_batch(ReceiveBatch {
            company_id: ledger.company_id,
            product_id: product.id,
            warehouse_id: Uuid::new_v4(),
            quantity: dec!(0),
            cost_price: None,
        })
        .await;
    assert_matches!(result, Err(ServiceError::ValidationError(_)));
}

#[tokio::test]
async fn reconcile_resets_drifted_product_total() {
    let ledger = TestLedger::new().await;
    let warehouse = ledger.warehouse("Main").await;
    let product = ledger.product("Widget", dec!(1), dec!(99)).await;
    ledger.batch(&product, &warehouse, "A-1", dec!(4), dec!(1), 0).await;
    ledger.batch(&product, &warehouse, "B-1", dec!(6), dec!(1), 10).await;

    let (previous, reconciled) = ledger
        .services
        .stock
        .reconcile_product_total(ledger.company_id, product.id)
        .await
        .expect("reconcile succeeds");

    assert_eq!(previous, dec!(99));
    assert_eq!(reconciled, dec!(10));
    assert_eq!(ledger.reload_product(product.id).await.total_stock, dec!(10));

    let fifo = ledger
        .services
        .stock
        .batches_fifo(ledger.company_id, product.id, warehouse.id)
        .await
        .expect("list batches");
    let numbers: Vec<&str> = fifo.iter().map(|b| b.batch_number.as_str()).collect();
    assert_eq!(numbers, vec!["A-1", "B-1"]);
}
