use crate::{
    db::{run_serializable, DbPool, TransactionSettings},
    entities::batch_log::{self, BatchLogStatus, Entity as BatchLog, ReferenceType},
    errors::ServiceError,
    events::{Event, EventSender},
    models::{ensure_unique, validate_lines, SaleLine, TransactionRef},
    services::{
        fifo::{plan_draws, prorate, CostBasis},
        stock_ledger::{
            adjust_product_total, batches_fifo, find_batch, find_product,
            find_warehouse_by_name, set_quantities,
        },
    },
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

/// Reserves stock for every line, oldest batch first.
///
/// Either every line is fully covered or the call fails with
/// `InsufficientStock` and nothing is written.
pub async fn allocate_lines<C: ConnectionTrait>(
    conn: &C,
    reference: &TransactionRef,
    lines: &[SaleLine],
) -> Result<Vec<batch_log::Model>, ServiceError> {
    let mut entries = Vec::new();

    for line in lines {
        let warehouse = find_warehouse_by_name(conn, reference.company_id, &line.warehouse_name).await?;
        let product = find_product(conn, reference.company_id, line.product_id).await?;
        let batches = batches_fifo(conn, reference.company_id, product.id, warehouse.id).await?;

        let available: Vec<Decimal> = batches.iter().map(|b| b.available_quantity).collect();
        let draws = plan_draws(&available, line.quantity).map_err(|shortfall| {
            warn!(
                product_id = %product.id,
                warehouse = %warehouse.name,
                requested = %line.quantity,
                %shortfall,
                "Insufficient stock for allocation"
            );
            ServiceError::InsufficientStock {
                product_id: product.id,
                requested: line.quantity,
                shortfall,
            }
        })?;

        for draw in draws {
            let batch = batches[draw.index].clone();
            let cost = CostBasis::new(batch.cost_price, product.pieces_per_pack, line.unit);
            let available = batch.available_quantity - draw.quantity;
            let committed = batch.committed_quantity + draw.quantity;
            let batch = set_quantities(conn, batch, available, committed).await?;

            let entry = batch_log::ActiveModel {
                id: Set(Uuid::new_v4()),
                company_id: Set(reference.company_id),
                stock_id: Set(batch.id),
                product_id: Set(product.id),
                warehouse_id: Set(warehouse.id),
                quantity: Set(draw.quantity),
                selling_price: Set(prorate(line.line_amount, draw.quantity, line.quantity)),
                cost_price_piece: Set(cost.piece),
                cost_price_pack: Set(cost.pack),
                unit_cost: Set(cost.unit_cost),
                unit: Set(line.unit),
                reference_type: Set(reference.reference_type),
                reference_id: Set(reference.reference_id),
                counterpart_type: Set(reference.counterpart.map(|c| c.kind)),
                counterpart_id: Set(reference.counterpart.map(|c| c.id)),
                status: Set(Some(BatchLogStatus::Pending)),
                created_at: Set(Utc::now()),
            }
            .insert(conn)
            .await?;

            debug!(
                stock_id = batch.id,
                batch_number = %batch.batch_number,
                drawn = %draw.quantity,
                "Drew from batch"
            );
            entries.push(entry);
        }
    }

    Ok(entries)
}

/// Pending batch log entries of one transaction, oldest first.
pub async fn pending_entries<C: ConnectionTrait>(
    conn: &C,
    reference: &TransactionRef,
) -> Result<Vec<batch_log::Model>, ServiceError> {
    let entries = BatchLog::find()
        .filter(batch_log::Column::CompanyId.eq(reference.company_id))
        .filter(batch_log::Column::ReferenceType.eq(reference.reference_type))
        .filter(batch_log::Column::ReferenceId.eq(reference.reference_id))
        .filter(batch_log::Column::Status.eq(BatchLogStatus::Pending))
        .order_by_asc(batch_log::Column::CreatedAt)
        .all(conn)
        .await?;
    Ok(entries)
}

/// Outcome of realizing a sale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fulfilment {
    pub reference_id: Uuid,
    pub entries: usize,
    pub quantity: Decimal,
}

pub struct AllocationService {
    db_pool: Arc<DbPool>,
    event_sender: Arc<EventSender>,
    settings: TransactionSettings,
}

impl AllocationService {
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

    /// Reserves stock for a transaction and returns the batch log entries written.
    #[instrument(skip(self, lines), fields(reference_id = %reference.reference_id, lines = lines.len()))]
    pub async fn allocate(
        &self,
        reference: TransactionRef,
        lines: Vec<SaleLine>,
    ) -> Result<Vec<batch_log::Model>, ServiceError> {
        validate_lines(&lines)?;
        ensure_unique(&lines, |l| l.product_id, "product line")?;

        let entries = run_serializable(self.db_pool.as_ref(), &self.settings, move |txn| {
            let lines = lines.clone();
            Box::pin(async move { allocate_lines(txn, &reference, &lines).await })
        })
        .await?;

        let quantity: Decimal = entries.iter().map(|e| e.quantity).sum();
        info!(entries = entries.len(), %quantity, "Inventory allocated");
        self.event_sender.send_or_log(Event::InventoryAllocated {
            reference_type: reference.reference_type.to_string(),
            reference_id: reference.reference_id,
            entries: entries.len(),
            quantity,
        });
        Ok(entries)
    }

    /// Realizes every pending draw of a sale: committed stock leaves the
    /// ledger and the product total drops accordingly. Loans are settled
    /// through returns and cannot be fulfilled.
    #[instrument(skip(self), fields(reference_id = %reference.reference_id))]
    pub async fn fulfil(&self, reference: TransactionRef) -> Result<Fulfilment, ServiceError> {
        if reference.reference_type != ReferenceType::SaleOrder {
            warn!(reference_type = %reference.reference_type, "Refusing to fulfil a non-sale reference");
            return Err(ServiceError::ValidationError(format!(
                "only sale orders can be fulfilled, got {}",
                reference.reference_type
            )));
        }

        let fulfilment = run_serializable(self.db_pool.as_ref(), &self.settings, move |txn| {
            Box::pin(async move {
                let entries = pending_entries(txn, &reference).await?;
                if entries.is_empty() {
                    return Err(ServiceError::NotFound(format!(
                        "No pending reservations for {} {}",
                        reference.reference_type, reference.reference_id
                    )));
                }

                let mut quantity = Decimal::ZERO;
                for entry in &entries {
                    let batch = find_batch(txn, reference.company_id, entry.stock_id).await?;
                    if batch.committed_quantity < entry.quantity {
                        return Err(ServiceError::InconsistentState(format!(
                            "batch {} has committed {} but entry {} realizes {}",
                            batch.id, batch.committed_quantity, entry.id, entry.quantity
                        )));
                    }
                    let available = batch.available_quantity;
                    let committed = batch.committed_quantity - entry.quantity;
                    set_quantities(txn, batch, available, committed).await?;
                    adjust_product_total(txn, reference.company_id, entry.product_id, -entry.quantity)
                        .await?;

                    let mut active: batch_log::ActiveModel = entry.clone().into();
                    active.status = Set(None);
                    active.update(txn).await?;
                    quantity += entry.quantity;
                }

                Ok(Fulfilment {
                    reference_id: reference.reference_id,
                    entries: entries.len(),
                    quantity,
                })
            })
        })
        .await?;

        info!(entries = fulfilment.entries, quantity = %fulfilment.quantity, "Sale fulfilled");
        self.event_sender.send_or_log(Event::SaleFulfilled {
            reference_id: fulfilment.reference_id,
            quantity: fulfilment.quantity,
        });
        Ok(fulfilment)
    }
}
