mod common;

use assert_matches::assert_matches;
use common::TestLedger;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use stockledger::{
    entities::{inventory_adjustment::AdjustmentType, inventory_adjustment_line::ChangeType},
    events::Event,
    models::{AdjustmentLine, NewAdjustment},
    ServiceError,
};
use uuid::Uuid;

fn adjustment(
    ledger: &TestLedger,
    warehouse_id: Uuid,
    adjustment_type: AdjustmentType,
    lines: Vec<AdjustmentLine>,
) -> NewAdjustment {
    NewAdjustment {
        company_id: ledger.company_id,
        warehouse_id,
        adjustment_type,
        created_by: ledger.user_id,
        reason: Some("cycle count".to_string()),
        lines,
    }
}

#[tokio::test]
async fn quantity_decrease_lowers_batch_and_product_total() {
    let mut ledger = TestLedger::new().await;
    let warehouse = ledger.warehouse("Main").await;
    let product = ledger.product("Widget", dec!(1), dec!(8)).await;
    let batch = ledger.batch(&product, &warehouse, "A-1", dec!(8), dec!(2), 0).await;

    let record = ledger
        .services
        .adjustments
        .adjust(adjustment(
            &ledger,
            warehouse.id,
            AdjustmentType::Quantity,
            vec![AdjustmentLine::quantity(batch.id, dec!(3))],
        ))
        .await
        .expect("adjustment succeeds");

    assert_eq!(record.lines.len(), 1);
    let line = &record.lines[0];
    assert_eq!(line.previous_quantity, dec!(8));
    assert_eq!(line.new_quantity, dec!(3));
    assert_eq!(line.delta, dec!(-5));
    assert_eq!(line.change_type, ChangeType::Decrease);
    assert_eq!(line.product_id, product.id);

    assert_eq!(ledger.reload_batch(batch.id).await.available_quantity, dec!(3));
    assert_eq!(ledger.reload_product(product.id).await.total_stock, dec!(3));

    let events = ledger.drain_events();
    assert_matches!(events.as_slice(), [Event::InventoryAdjusted { lines: 1, .. }]);
}

#[tokio::test]
async fn quantity_increase_raises_product_total() {
    let ledger = TestLedger::new().await;
    let warehouse = ledger.warehouse("Main").await;
    let product = ledger.product("Widget", dec!(1), dec!(8)).await;
    let batch = ledger.batch(&product, &warehouse, "A-1", dec!(8), dec!(2), 0).await;

    let record = ledger
        .services
        .adjustments
        .adjust(adjustment(
            &ledger,
            warehouse.id,
            AdjustmentType::Quantity,
            vec![AdjustmentLine::quantity(batch.id, dec!(10))],
        ))
        .await
        .expect("adjustment succeeds");

    assert_eq!(record.lines[0].delta, dec!(2));
    assert_eq!(record.lines[0].change_type, ChangeType::Increase);
    assert_eq!(ledger.reload_product(product.id).await.total_stock, dec!(10));
}

#[tokio::test]
async fn product_total_never_goes_negative() {
    let ledger = TestLedger::new().await;
    let warehouse = ledger.warehouse("Main").await;
    // Total has drifted below what the batch holds.
    let product = ledger.product("Widget", dec!(1), dec!(2)).await;
    let batch = ledger.batch(&product, &warehouse, "A-1", dec!(8), dec!(2), 0).await;

    ledger
        .services
        .adjustments
        .adjust(adjustment(
            &ledger,
            warehouse.id,
            AdjustmentType::Quantity,
            vec![AdjustmentLine::quantity(batch.id, dec!(3))],
        ))
        .await
        .expect("adjustment succeeds");

    assert_eq!(ledger.reload_product(product.id).await.total_stock, Decimal::ZERO);
}

#[tokio::test]
async fn value_adjustment_is_audit_only() {
    let ledger = TestLedger::new().await;
    let warehouse = ledger.warehouse("Main").await;
    let product = ledger.product("Widget", dec!(1), dec!(8)).await;
    let batch = ledger.batch(&product, &warehouse, "A-1", dec!(8), dec!(4), 0).await;

    let record = ledger
        .services
        .adjustments
        .adjust(adjustment(
            &ledger,
            warehouse.id,
            AdjustmentType::Value,
            vec![AdjustmentLine::value(batch.id, dec!(6))],
        ))
        .await
        .expect("adjustment succeeds");

    let line = &record.lines[0];
    assert_eq!(line.previous_value, Some(dec!(4)));
    assert_eq!(line.new_value, Some(dec!(6)));
    assert_eq!(line.delta, Decimal::ZERO);
    assert_eq!(line.change_type, ChangeType::Unchanged);

    let batch = ledger.reload_batch(batch.id).await;
    assert_eq!(batch.available_quantity, dec!(8));
    assert_eq!(batch.cost_price, dec!(4));
    assert_eq!(ledger.reload_product(product.id).await.total_stock, dec!(8));
}

#[tokio::test]
async fn invalid_adjustments_change_nothing() {
    let ledger = TestLedger::new().await;
    let main = ledger.warehouse("Main").await;
    let other = ledger.warehouse("Other").await;
    let product = ledger.product("Widget", dec!(1), dec!(13)).await;
    let batch = ledger.batch(&product, &main, "A-1", dec!(8), dec!(2), 0).await;
    let elsewhere = ledger.batch(&product, &other, "O-1", dec!(5), dec!(2), 0).await;

    // Second line names a batch from another warehouse; the first must roll back.
    let result = ledger
        .services
        .adjustments
        .adjust(adjustment(
            &ledger,
            main.id,
            AdjustmentType::Quantity,
            vec![
                AdjustmentLine::quantity(batch.id, dec!(1)),
                AdjustmentLine::quantity(elsewhere.id, dec!(1)),
            ],
        ))
        .await;
    assert_matches!(result, Err(ServiceError::NotFound(_)));
    assert_eq!(ledger.reload_batch(batch.id).await.available_quantity, dec!(8));

    let result = ledger
        .services
        .adjustments
        .adjust(adjustment(
            &ledger,
            main.id,
            AdjustmentType::Quantity,
            vec![
                AdjustmentLine::quantity(batch.id, dec!(1)),
                AdjustmentLine::quantity(batch.id, dec!(2)),
            ],
        ))
        .await;
    assert_matches!(result, Err(ServiceError::Conflict(_)));

    let result = ledger
        .services
        .adjustments
        .adjust(adjustment(
            &ledger,
            main.id,
            AdjustmentType::Quantity,
            vec![AdjustmentLine::value(batch.id, dec!(1))],
        ))
        .await;
    assert_matches!(result, Err(ServiceError::ValidationError(_)));

    assert_eq!(ledger.reload_product(product.id).await.total_stock, dec!(13));
}
