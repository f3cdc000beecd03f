mod common;

use common::TestLedger;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use stockledger::{
    entities::batch_log::SaleUnit,
    models::{ReleaseLine, SaleLine, TransactionRef},
    ServiceError,
};
use uuid::Uuid;

fn sale_line(product_id: Uuid, quantity: Decimal) -> SaleLine {
    SaleLine {
        product_id,
        warehouse_name: "Main".to_string(),
        quantity,
        line_amount: quantity * dec!(10),
        unit: SaleUnit::Piece,
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_allocations_never_overdraw_a_batch() {
    let ledger = TestLedger::new().await;
    let warehouse = ledger.warehouse("Main").await;
    let product = ledger.product("Widget", dec!(1), dec!(6)).await;
    let batch = ledger.batch(&product, &warehouse, "A-1", dec!(6), dec!(1), 0).await;

    // Twelve orders of one unit race for six units on the same batch.
    let mut tasks = vec![];
    for _ in 0..12 {
        let services = ledger.services.clone();
        let reference = TransactionRef::sale_order(ledger.company_id, Uuid::new_v4(), None);
        let line = sale_line(product.id, dec!(1));
        tasks.push(tokio::spawn(async move {
            services.allocation.allocate(reference, vec![line]).await
        }));
    }

    let mut successes = 0;
    for task in tasks {
        match task.await.expect("allocation task panicked") {
            Ok(entries) => {
                assert_eq!(entries.len(), 1);
                successes += 1;
            }
            Err(ServiceError::InsufficientStock { .. }) | Err(ServiceError::Conflict(_)) => {}
            Err(other) => panic!("unexpected allocation error: {other}"),
        }
    }
    assert_eq!(successes, 6, "exactly 6 allocations should succeed; got {successes}");

    let batch = ledger.reload_batch(batch.id).await;
    assert_eq!(batch.available_quantity, dec!(0));
    assert_eq!(batch.committed_quantity, dec!(6));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_allocations_and_releases_conserve_stock() {
    let ledger = TestLedger::new().await;
    let warehouse = ledger.warehouse("Main").await;
    let product = ledger.product("Widget", dec!(1), dec!(20)).await;
    let a = ledger.batch(&product, &warehouse, "A-1", dec!(8), dec!(1), 0).await;
    let b = ledger.batch(&product, &warehouse, "B-1", dec!(12), dec!(1), 60).await;

    // Orders that will be cancelled while new ones are being allocated.
    let mut cancelled = vec![];
    for _ in 0..3 {
        let reference = TransactionRef::sale_order(ledger.company_id, Uuid::new_v4(), None);
        ledger
            .services
            .allocation
            .allocate(reference, vec![sale_line(product.id, dec!(3))])
            .await
            .expect("initial allocation succeeds");
        cancelled.push(reference);
    }

    let mut tasks = vec![];
    for reference in cancelled.iter().copied() {
        let services = ledger.services.clone();
        let line = ReleaseLine::from(&sale_line(product.id, dec!(3)));
        tasks.push(tokio::spawn(async move {
            services.returns.release(reference, vec![line]).await.map(|_| ())
        }));
    }
    let mut kept = vec![];
    for _ in 0..4 {
        let services = ledger.services.clone();
        let reference = TransactionRef::sale_order(ledger.company_id, Uuid::new_v4(), None);
        kept.push(reference);
        let line = sale_line(product.id, dec!(2));
        tasks.push(tokio::spawn(async move {
            services.allocation.allocate(reference, vec![line]).await.map(|_| ())
        }));
    }
    for task in tasks {
        task.await
            .expect("ledger task panicked")
            .expect("every release and allocation fits the stock");
    }

    let a = ledger.reload_batch(a.id).await;
    let b = ledger.reload_batch(b.id).await;
    for batch in [&a, &b] {
        assert!(batch.available_quantity >= Decimal::ZERO);
        assert!(batch.committed_quantity >= Decimal::ZERO);
    }
    assert_eq!(a.available_quantity + a.committed_quantity, dec!(8));
    assert_eq!(b.available_quantity + b.committed_quantity, dec!(12));
    assert_eq!(a.committed_quantity + b.committed_quantity, dec!(8));

    for reference in cancelled {
        assert!(ledger.batch_logs(reference.reference_id).await.is_empty());
    }
    // Each surviving order can still realize exactly what it reserved.
    for reference in kept {
        let fulfilment = ledger
            .services
            .allocation
            .fulfil(reference)
            .await
            .expect("kept order is fulfillable");
        assert_eq!(fulfilment.quantity, dec!(2));
    }
    let a = ledger.reload_batch(a.id).await;
    let b = ledger.reload_batch(b.id).await;
    assert_eq!(a.committed_quantity + b.committed_quantity, dec!(0));
    assert_eq!(ledger.reload_product(product.id).await.total_stock, dec!(12));
}
