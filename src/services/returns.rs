use crate::{
    db::{run_serializable, DbPool, TransactionSettings},
    entities::batch_log::{self, BatchLogStatus, Entity as BatchLog},
    errors::ServiceError,
    events::{Event, EventSender},
    models::{ensure_unique, validate_lines, ReleaseLine, TransactionRef},
    services::{
        fifo::{plan_draws, prorate},
        stock_ledger::{find_batch, find_warehouse_by_name, set_quantities},
    },
};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, ModelTrait, QueryFilter,
    QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error, info, instrument};
use uuid::Uuid;

/// Outcome of handing back part of one reference's reservation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Credit {
    pub quantity: Decimal,
    pub entries_removed: u64,
    pub entries_reduced: u64,
}

/// Moves `quantity` of a product from committed back to available, drawing
/// on the reference's own pending entries oldest first.
///
/// Each draw credits the batch its entry was taken from. An entry drawn in
/// full is deleted; one drawn in part keeps the remainder, with its selling
/// price prorated down. Other references' reservations are never touched.
///
/// Fails with `InconsistentState` when the entries hold less than requested.
pub async fn credit_entries<C: ConnectionTrait>(
    conn: &C,
    reference: &TransactionRef,
    product_id: Uuid,
    warehouse_id: Uuid,
    quantity: Decimal,
) -> Result<Credit, ServiceError> {
    let entries = BatchLog::find()
        .filter(batch_log::Column::CompanyId.eq(reference.company_id))
        .filter(batch_log::Column::ReferenceType.eq(reference.reference_type))
        .filter(batch_log::Column::ReferenceId.eq(reference.reference_id))
        .filter(batch_log::Column::Status.eq(BatchLogStatus::Pending))
        .filter(batch_log::Column::ProductId.eq(product_id))
        .filter(batch_log::Column::WarehouseId.eq(warehouse_id))
        .order_by_asc(batch_log::Column::CreatedAt)
        .order_by_asc(batch_log::Column::StockId)
        .all(conn)
        .await?;

    let reserved: Vec<Decimal> = entries.iter().map(|e| e.quantity).collect();
    let draws = plan_draws(&reserved, quantity).map_err(|shortfall| {
        error!(
            reference_id = %reference.reference_id,
            %product_id,
            requested = %quantity,
            %shortfall,
            "Pending reservation is short of the return"
        );
        ServiceError::InconsistentState(format!(
            "{} {} has {} of product {} reserved, cannot return {}",
            reference.reference_type,
            reference.reference_id,
            quantity - shortfall,
            product_id,
            quantity
        ))
    })?;

    let mut credit = Credit {
        quantity,
        ..Credit::default()
    };
    for draw in draws {
        let entry = entries[draw.index].clone();
        let batch = find_batch(conn, reference.company_id, entry.stock_id).await?;
        let available = batch.available_quantity + draw.quantity;
        let committed = batch.committed_quantity - draw.quantity;
        let batch = set_quantities(conn, batch, available, committed).await?;
        debug!(stock_id = batch.id, entry_id = %entry.id, credited = %draw.quantity, "Credited batch");

        if draw.quantity == entry.quantity {
            entry.delete(conn).await?;
            credit.entries_removed += 1;
        } else {
            let remaining = entry.quantity - draw.quantity;
            let selling_price = prorate(entry.selling_price, remaining, entry.quantity);
            let mut active: batch_log::ActiveModel = entry.into();
            active.quantity = Set(remaining);
            active.selling_price = Set(selling_price);
            active.update(conn).await?;
            credit.entries_reduced += 1;
        }
    }
    Ok(credit)
}

/// Deletes the pending batch log entries of a transaction.
pub async fn delete_pending_entries<C: ConnectionTrait>(
    conn: &C,
    reference: &TransactionRef,
) -> Result<u64, ServiceError> {
    let result = BatchLog::delete_many()
        .filter(batch_log::Column::CompanyId.eq(reference.company_id))
        .filter(batch_log::Column::ReferenceType.eq(reference.reference_type))
        .filter(batch_log::Column::ReferenceId.eq(reference.reference_id))
        .filter(batch_log::Column::Status.eq(BatchLogStatus::Pending))
        .exec(conn)
        .await?;
    Ok(result.rows_affected)
}

/// Hands back every line's reservation through the transaction's own
/// pending entries.
pub async fn release_lines<C: ConnectionTrait>(
    conn: &C,
    reference: &TransactionRef,
    lines: &[ReleaseLine],
) -> Result<Release, ServiceError> {
    let mut quantity = Decimal::ZERO;
    let mut entries_removed = 0;
    for line in lines {
        let warehouse =
            find_warehouse_by_name(conn, reference.company_id, &line.warehouse_name).await?;
        let credit =
            credit_entries(conn, reference, line.product_id, warehouse.id, line.quantity).await?;
        quantity += credit.quantity;
        entries_removed += credit.entries_removed;
    }

    Ok(Release {
        reference_id: reference.reference_id,
        quantity,
        entries_removed,
    })
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Release {
    pub reference_id: Uuid,
    pub quantity: Decimal,
    pub entries_removed: u64,
}

pub struct ReturnService {
    db_pool: Arc<DbPool>,
    event_sender: Arc<EventSender>,
    settings: TransactionSettings,
}

impl ReturnService {
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

    /// Cancels a transaction's reservations in full.
    #[instrument(skip(self, lines), fields(reference_id = %reference.reference_id, lines = lines.len()))]
    pub async fn release(
        &self,
        reference: TransactionRef,
        lines: Vec<ReleaseLine>,
    ) -> Result<Release, ServiceError> {
        validate_lines(&lines)?;
        ensure_unique(&lines, |l| l.product_id, "product line")?;

        let release = run_serializable(self.db_pool.as_ref(), &self.settings, move |txn| {
            let lines = lines.clone();
            Box::pin(async move { release_lines(txn, &reference, &lines).await })
        })
        .await?;

        info!(
            quantity = %release.quantity,
            entries_removed = release.entries_removed,
            "Inventory released"
        );
        self.event_sender.send_or_log(Event::InventoryReleased {
            reference_id: release.reference_id,
            quantity: release.quantity,
            entries_removed: release.entries_removed,
        });
        Ok(release)
    }
}
