use crate::{
    db::{run_serializable, DbPool, TransactionSettings},
    entities::{
        stock,
        transfer_request::{self, Entity as TransferRequest, TransferStatus},
        transfer_request_item::{self, Entity as TransferRequestItem},
    },
    errors::ServiceError,
    events::{Event, EventSender},
    models::{
        ensure_unique, validate_lines, EditTransfer, ReceivedLine, SubmitTransfer, TransferLine,
    },
    services::{
        batch_number::BatchNumberGenerator,
        stock_ledger::{find_batch, find_warehouse, insert_batch, set_quantities, NewBatch},
    },
};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransferDetails {
    pub request: transfer_request::Model,
    pub items: Vec<transfer_request_item::Model>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransferConfirmation {
    pub transfer: TransferDetails,
    pub new_batches: Vec<stock::Model>,
}

async fn find_transfer<C: ConnectionTrait>(
    conn: &C,
    company_id: Uuid,
    transfer_id: Uuid,
) -> Result<transfer_request::Model, ServiceError> {
    TransferRequest::find_by_id(transfer_id)
        .filter(transfer_request::Column::CompanyId.eq(company_id))
        .one(conn)
        .await?
        .ok_or_else(|| ServiceError::not_found("Transfer request", transfer_id))
}

async fn transfer_items<C: ConnectionTrait>(
    conn: &C,
    transfer_id: Uuid,
) -> Result<Vec<transfer_request_item::Model>, ServiceError> {
    let items = TransferRequestItem::find()
        .filter(transfer_request_item::Column::TransferRequestId.eq(transfer_id))
        .order_by_asc(transfer_request_item::Column::SendingStockId)
        .all(conn)
        .await?;
    Ok(items)
}

fn ensure_status(
    transfer: &transfer_request::Model,
    allowed: impl Fn(&TransferStatus) -> bool,
    action: &str,
) -> Result<(), ServiceError> {
    if allowed(&transfer.status) {
        Ok(())
    } else {
        Err(ServiceError::InvalidStatus(format!(
            "cannot {} transfer {} in status {}",
            action, transfer.request_number, transfer.status
        )))
    }
}

fn check_lines(lines: &[TransferLine]) -> Result<(), ServiceError> {
    validate_lines(lines)?;
    ensure_unique(lines, |l| l.sending_stock_id, "source batch")
}

/// Inserts one item per line after checking each source batch belongs to the
/// sending warehouse and carries the line's product.
async fn insert_items<C: ConnectionTrait>(
    conn: &C,
    transfer: &transfer_request::Model,
    lines: &[TransferLine],
) -> Result<Vec<transfer_request_item::Model>, ServiceError> {
    let mut items = Vec::with_capacity(lines.len());
    for line in lines {
        let batch = find_batch(conn, transfer.company_id, line.sending_stock_id).await?;
        if batch.warehouse_id != transfer.sending_warehouse_id || batch.product_id != line.product_id {
            return Err(ServiceError::NotFound(format!(
                "batch {} of product {} not found in sending warehouse",
                line.sending_stock_id, line.product_id
            )));
        }

        let item = transfer_request_item::ActiveModel {
            id: Set(Uuid::new_v4()),
            transfer_request_id: Set(transfer.id),
            product_id: Set(line.product_id),
            sending_stock_id: Set(batch.id),
            quantity_transferred: Set(line.quantity),
            quantity_received: Set(None),
            cost_price: Set(line.cost_price.unwrap_or(batch.cost_price)),
            received_stock_id: Set(None),
        }
        .insert(conn)
        .await?;
        items.push(item);
    }
    Ok(items)
}

async fn set_status<C: ConnectionTrait>(
    conn: &C,
    transfer: transfer_request::Model,
    status: TransferStatus,
    approver: Option<Uuid>,
) -> Result<transfer_request::Model, ServiceError> {
    let mut active: transfer_request::ActiveModel = transfer.into();
    active.status = Set(status);
    if approver.is_some() {
        active.approved_by = Set(approver);
    }
    active.updated_at = Set(Utc::now());
    Ok(active.update(conn).await?)
}

/// Received lines must name every item exactly once with the transferred quantity.
fn match_received(
    items: &[transfer_request_item::Model],
    received: &[ReceivedLine],
) -> Result<HashMap<Uuid, ReceivedLine>, ServiceError> {
    let by_item: HashMap<Uuid, ReceivedLine> =
        received.iter().map(|r| (r.item_id, r.clone())).collect();

    if by_item.len() != items.len() {
        return Err(ServiceError::ValidationError(format!(
            "expected {} received lines, got {}",
            items.len(),
            received.len()
        )));
    }
    for item in items {
        let line = by_item.get(&item.id).ok_or_else(|| {
            ServiceError::ValidationError(format!("transfer item {} was not received", item.id))
        })?;
        if line.quantity_received != item.quantity_transferred {
            return Err(ServiceError::ValidationError(format!(
                "transfer item {} received {} but {} was sent",
                item.id, line.quantity_received, item.quantity_transferred
            )));
        }
    }
    Ok(by_item)
}

pub struct TransferService {
    db_pool: Arc<DbPool>,
    event_sender: Arc<EventSender>,
    settings: TransactionSettings,
    batch_numbers: Arc<BatchNumberGenerator>,
}

impl TransferService {
    pub fn new(
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
        settings: TransactionSettings,
        batch_numbers: Arc<BatchNumberGenerator>,
    ) -> Self {
        Self {
            db_pool,
            event_sender,
            settings,
            batch_numbers,
        }
    }

    #[instrument(skip(self, request), fields(request_number = %request.request_number))]
    pub async fn submit(&self, request: SubmitTransfer) -> Result<TransferDetails, ServiceError> {
        request.validate()?;
        request.check_warehouses()?;
        check_lines(&request.lines)?;

        let details = run_serializable(self.db_pool.as_ref(), &self.settings, move |txn| {
            let request = request.clone();
            Box::pin(async move {
                let existing = TransferRequest::find()
                    .filter(transfer_request::Column::CompanyId.eq(request.company_id))
                    .filter(
                        transfer_request::Column::RequestNumber.eq(request.request_number.as_str()),
                    )
                    .one(txn)
                    .await?;
                if existing.is_some() {
                    return Err(ServiceError::Conflict(format!(
                        "transfer request number {} already exists",
                        request.request_number
                    )));
                }

                find_warehouse(txn, request.company_id, request.sending_warehouse_id).await?;
                find_warehouse(txn, request.company_id, request.receiving_warehouse_id).await?;

                let now = Utc::now();
                let transfer = transfer_request::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    company_id: Set(request.company_id),
                    request_number: Set(request.request_number.clone()),
                    sending_warehouse_id: Set(request.sending_warehouse_id),
                    receiving_warehouse_id: Set(request.receiving_warehouse_id),
                    status: Set(TransferStatus::Pending),
                    requested_by: Set(request.requested_by),
                    approved_by: Set(None),
                    note: Set(request.note.clone()),
                    created_at: Set(now),
                    updated_at: Set(now),
                }
                .insert(txn)
                .await?;

                let items = insert_items(txn, &transfer, &request.lines).await?;
                Ok(TransferDetails {
                    request: transfer,
                    items,
                })
            })
        })
        .await?;

        info!(transfer_id = %details.request.id, items = details.items.len(), "Transfer submitted");
        self.event_sender.send_or_log(Event::TransferSubmitted {
            transfer_id: details.request.id,
            request_number: details.request.request_number.clone(),
        });
        Ok(details)
    }

    #[instrument(skip(self))]
    pub async fn approve(
        &self,
        company_id: Uuid,
        transfer_id: Uuid,
        approved_by: Uuid,
    ) -> Result<transfer_request::Model, ServiceError> {
        let transfer = run_serializable(self.db_pool.as_ref(), &self.settings, move |txn| {
            Box::pin(async move {
                let transfer = find_transfer(txn, company_id, transfer_id).await?;
                ensure_status(&transfer, TransferStatus::can_approve, "approve")?;
                set_status(txn, transfer, TransferStatus::Approved, Some(approved_by)).await
            })
        })
        .await?;

        info!(%transfer_id, "Transfer approved");
        self.event_sender.send_or_log(Event::TransferApproved {
            transfer_id,
            approved_by,
        });
        Ok(transfer)
    }

    #[instrument(skip(self))]
    pub async fn reject(
        &self,
        company_id: Uuid,
        transfer_id: Uuid,
        rejected_by: Uuid,
    ) -> Result<transfer_request::Model, ServiceError> {
        let transfer = run_serializable(self.db_pool.as_ref(), &self.settings, move |txn| {
            Box::pin(async move {
                let transfer = find_transfer(txn, company_id, transfer_id).await?;
                ensure_status(&transfer, TransferStatus::can_reject, "reject")?;
                set_status(txn, transfer, TransferStatus::Reject, Some(rejected_by)).await
            })
        })
        .await?;

        info!(%transfer_id, "Transfer rejected");
        self.event_sender.send_or_log(Event::TransferRejected {
            transfer_id,
            rejected_by,
        });
        Ok(transfer)
    }

    /// Replaces the lines of a non-confirmed transfer and sends it back for approval.
    #[instrument(skip(self, request), fields(transfer_id = %request.transfer_id))]
    pub async fn edit(&self, request: EditTransfer) -> Result<TransferDetails, ServiceError> {
        request.validate()?;
        check_lines(&request.lines)?;

        let details = run_serializable(self.db_pool.as_ref(), &self.settings, move |txn| {
            let request = request.clone();
            Box::pin(async move {
                let transfer = find_transfer(txn, request.company_id, request.transfer_id).await?;
                ensure_status(&transfer, TransferStatus::can_edit, "edit")?;

                TransferRequestItem::delete_many()
                    .filter(transfer_request_item::Column::TransferRequestId.eq(transfer.id))
                    .exec(txn)
                    .await?;

                let mut active: transfer_request::ActiveModel = transfer.into();
                active.status = Set(TransferStatus::Pending);
                active.approved_by = Set(None);
                if request.note.is_some() {
                    active.note = Set(request.note.clone());
                }
                active.updated_at = Set(Utc::now());
                let transfer = active.update(txn).await?;

                let items = insert_items(txn, &transfer, &request.lines).await?;
                Ok(TransferDetails {
                    request: transfer,
                    items,
                })
            })
        })
        .await?;

        info!(items = details.items.len(), "Transfer edited and reset to pending");
        self.event_sender.send_or_log(Event::TransferEdited {
            transfer_id: details.request.id,
        });
        Ok(details)
    }

    /// Moves each item's quantity out of its source batch into a new batch at
    /// the receiving warehouse.
    #[instrument(skip(self, received))]
    pub async fn confirm(
        &self,
        company_id: Uuid,
        transfer_id: Uuid,
        received: Vec<ReceivedLine>,
    ) -> Result<TransferConfirmation, ServiceError> {
        validate_lines(&received)?;
        ensure_unique(&received, |r| r.item_id, "received item")?;

        let batch_numbers = self.batch_numbers.clone();
        let confirmation = run_serializable(self.db_pool.as_ref(), &self.settings, move |txn| {
            let received = received.clone();
            let batch_numbers = batch_numbers.clone();
            Box::pin(async move {
                let transfer = find_transfer(txn, company_id, transfer_id).await?;
                ensure_status(&transfer, TransferStatus::can_confirm, "confirm")?;

                let items = transfer_items(txn, transfer.id).await?;
                let by_item = match_received(&items, &received)?;
                let receiving =
                    find_warehouse(txn, company_id, transfer.receiving_warehouse_id).await?;
                let today = Utc::now().date_naive();

                let mut new_batches = Vec::with_capacity(items.len());
                let mut confirmed_items = Vec::with_capacity(items.len());
                for item in items {
                    let quantity = item.quantity_transferred;
                    let source = find_batch(txn, company_id, item.sending_stock_id).await?;
                    if source.available_quantity < quantity {
                        warn!(
                            stock_id = source.id,
                            available = %source.available_quantity,
                            requested = %quantity,
                            "Source batch cannot cover transfer"
                        );
                        return Err(ServiceError::InsufficientStock {
                            product_id: item.product_id,
                            requested: quantity,
                            shortfall: quantity - source.available_quantity,
                        });
                    }
                    let available = source.available_quantity - quantity;
                    let committed = source.committed_quantity;
                    set_quantities(txn, source, available, committed).await?;

                    let batch_number = batch_numbers
                        .generate(txn, company_id, &receiving.name, today)
                        .await?;
                    let batch = insert_batch(
                        txn,
                        NewBatch {
                            company_id,
                            product_id: item.product_id,
                            warehouse_id: receiving.id,
                            batch_number,
                            quantity,
                            cost_price: item.cost_price,
                        },
                    )
                    .await?;

                    let received_quantity = by_item
                        .get(&item.id)
                        .map(|r| r.quantity_received)
                        .unwrap_or(quantity);
                    let mut active: transfer_request_item::ActiveModel = item.into();
                    active.quantity_received = Set(Some(received_quantity));
                    active.received_stock_id = Set(Some(batch.id));
                    confirmed_items.push(active.update(txn).await?);
                    new_batches.push(batch);
                }

                let transfer = set_status(txn, transfer, TransferStatus::Confirm, None).await?;
                Ok(TransferConfirmation {
                    transfer: TransferDetails {
                        request: transfer,
                        items: confirmed_items,
                    },
                    new_batches,
                })
            })
        })
        .await?;

        info!(
            new_batches = confirmation.new_batches.len(),
            "Transfer confirmed"
        );
        self.event_sender.send_or_log(Event::TransferConfirmed {
            transfer_id,
            new_stock_ids: confirmation.new_batches.iter().map(|b| b.id).collect(),
        });
        Ok(confirmation)
    }

    pub async fn get(
        &self,
        company_id: Uuid,
        transfer_id: Uuid,
    ) -> Result<TransferDetails, ServiceError> {
        let db = self.db_pool.as_ref();
        let request = find_transfer(db, company_id, transfer_id).await?;
        let items = transfer_items(db, transfer_id).await?;
        Ok(TransferDetails { request, items })
    }
}
