use crate::{
    db::{run_serializable, DbPool, TransactionSettings},
    entities::{
        inventory_adjustment::{self, AdjustmentType},
        inventory_adjustment_line::{self, ChangeType},
    },
    errors::ServiceError,
    events::{Event, EventSender},
    models::{ensure_unique, validate_lines, AdjustmentLine, NewAdjustment},
    services::stock_ledger::{adjust_product_total, find_batch, find_warehouse, set_quantities},
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, ConnectionTrait, Set};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;
use validator::Validate;

/// Persisted adjustment with its per-batch lines.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdjustmentRecord {
    pub adjustment: inventory_adjustment::Model,
    pub lines: Vec<inventory_adjustment_line::Model>,
}

async fn apply_line<C: ConnectionTrait>(
    conn: &C,
    adjustment: &inventory_adjustment::Model,
    line: &AdjustmentLine,
) -> Result<inventory_adjustment_line::Model, ServiceError> {
    let batch = find_batch(conn, adjustment.company_id, line.stock_id).await?;
    if batch.warehouse_id != adjustment.warehouse_id {
        return Err(ServiceError::NotFound(format!(
            "batch {} not found in warehouse {}",
            line.stock_id, adjustment.warehouse_id
        )));
    }

    let previous_quantity = batch.available_quantity;
    let product_id = batch.product_id;
    let (new_quantity, previous_value, new_value) = match adjustment.adjustment_type {
        AdjustmentType::Quantity => {
            let new_quantity = line.new_quantity.unwrap_or(previous_quantity);
            let delta = new_quantity - previous_quantity;
            let committed = batch.committed_quantity;
            set_quantities(conn, batch, new_quantity, committed).await?;
            adjust_product_total(conn, adjustment.company_id, product_id, delta).await?;
            (new_quantity, None, None)
        }
        // Audit-only: no quantity field changes.
        AdjustmentType::Value => (previous_quantity, Some(batch.cost_price), line.new_value),
    };

    let delta = new_quantity - previous_quantity;
    let record = inventory_adjustment_line::ActiveModel {
        id: Set(Uuid::new_v4()),
        adjustment_id: Set(adjustment.id),
        stock_id: Set(line.stock_id),
        product_id: Set(product_id),
        previous_quantity: Set(previous_quantity),
        new_quantity: Set(new_quantity),
        delta: Set(delta),
        change_type: Set(ChangeType::classify(delta)),
        previous_value: Set(previous_value),
        new_value: Set(new_value),
    }
    .insert(conn)
    .await?;
    Ok(record)
}

pub struct AdjustmentService {
    db_pool: Arc<DbPool>,
    event_sender: Arc<EventSender>,
    settings: TransactionSettings,
}

impl AdjustmentService {
    pub fn new(
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
        settings: TransactionSettings,
    ) -> Self {
        Self {
            db_pool,
            event_sender,
            settings,
        }
    }

    /// Overrides named batches directly, bypassing FIFO.
    #[instrument(skip(self, request), fields(warehouse_id = %request.warehouse_id, adjustment_type = %request.adjustment_type))]
    pub async fn adjust(&self, request: NewAdjustment) -> Result<AdjustmentRecord, ServiceError> {
        request.validate()?;
        validate_lines(&request.lines)?;
        request.check_lines()?;
        ensure_unique(&request.lines, |l| l.stock_id, "batch line")?;

        let record = run_serializable(self.db_pool.as_ref(), &self.settings, move |txn| {
            let request = request.clone();
            Box::pin(async move {
                find_warehouse(txn, request.company_id, request.warehouse_id).await?;

                let adjustment = inventory_adjustment::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    company_id: Set(request.company_id),
                    warehouse_id: Set(request.warehouse_id),
                    adjustment_type: Set(request.adjustment_type),
                    created_by: Set(request.created_by),
                    reason: Set(request.reason.clone()),
                    created_at: Set(Utc::now()),
                }
                .insert(txn)
                .await?;

                let mut lines = Vec::with_capacity(request.lines.len());
                for line in &request.lines {
                    lines.push(apply_line(txn, &adjustment, line).await?);
                }
                Ok(AdjustmentRecord { adjustment, lines })
            })
        })
        .await?;

        let net: Decimal = record.lines.iter().map(|l| l.delta).sum();
        info!(adjustment_id = %record.adjustment.id, lines = record.lines.len(), %net, "Inventory adjusted");
        self.event_sender.send_or_log(Event::InventoryAdjusted {
            adjustment_id: record.adjustment.id,
            warehouse_id: record.adjustment.warehouse_id,
            adjustment_type: record.adjustment.adjustment_type.to_string(),
            lines: record.lines.len(),
        });
        Ok(record)
    }
}
