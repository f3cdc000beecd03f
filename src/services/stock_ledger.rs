use crate::{
    db::{run_serializable, DbPool, TransactionSettings},
    entities::{
        product::{self, Entity as Product},
        stock::{self, Entity as Stock},
        warehouse::{self, Entity as Warehouse},
    },
    errors::ServiceError,
    events::{Event, EventSender},
    models::ReceiveBatch,
    services::batch_number::BatchNumberGenerator,
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder, Set,
};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

pub async fn find_warehouse<C: ConnectionTrait>(
    conn: &C,
    company_id: Uuid,
    warehouse_id: Uuid,
) -> Result<warehouse::Model, ServiceError> {
    Warehouse::find_by_id(warehouse_id)
        .filter(warehouse::Column::CompanyId.eq(company_id))
        .one(conn)
        .await?
        .ok_or_else(|| ServiceError::not_found("Warehouse", warehouse_id))
}

pub async fn find_warehouse_by_name<C: ConnectionTrait>(
    conn: &C,
    company_id: Uuid,
    name: &str,
) -> Result<warehouse::Model, ServiceError> {
    Warehouse::find()
        .filter(warehouse::Column::CompanyId.eq(company_id))
        .filter(warehouse::Column::Name.eq(name))
        .one(conn)
        .await?
        .ok_or_else(|| ServiceError::not_found("Warehouse", name))
}

pub async fn find_product<C: ConnectionTrait>(
    conn: &C,
    company_id: Uuid,
    product_id: Uuid,
) -> Result<product::Model, ServiceError> {
    Product::find_by_id(product_id)
        .filter(product::Column::CompanyId.eq(company_id))
        .one(conn)
        .await?
        .ok_or_else(|| ServiceError::not_found("Product", product_id))
}

pub async fn find_batch<C: ConnectionTrait>(
    conn: &C,
    company_id: Uuid,
    stock_id: i64,
) -> Result<stock::Model, ServiceError> {
    Stock::find_by_id(stock_id)
        .filter(stock::Column::CompanyId.eq(company_id))
        .one(conn)
        .await?
        .ok_or_else(|| ServiceError::not_found("Batch", stock_id))
}

/// Batches of one product in one warehouse, oldest first.
pub async fn batches_fifo<C: ConnectionTrait>(
    conn: &C,
    company_id: Uuid,
    product_id: Uuid,
    warehouse_id: Uuid,
) -> Result<Vec<stock::Model>, ServiceError> {
    let batches = Stock::find()
        .filter(stock::Column::CompanyId.eq(company_id))
        .filter(stock::Column::ProductId.eq(product_id))
        .filter(stock::Column::WarehouseId.eq(warehouse_id))
        .order_by_asc(stock::Column::CreatedAt)
        .order_by_asc(stock::Column::Id)
        .all(conn)
        .await?;
    Ok(batches)
}

pub async fn batch_number_exists<C: ConnectionTrait>(
    conn: &C,
    company_id: Uuid,
    batch_number: &str,
) -> Result<bool, ServiceError> {
    let existing = Stock::find()
        .filter(stock::Column::CompanyId.eq(company_id))
        .filter(stock::Column::BatchNumber.eq(batch_number))
        .one(conn)
        .await?;
    Ok(existing.is_some())
}

/// Writes new available/committed quantities for a batch.
///
/// Both must stay non-negative; a negative value means the caller's
/// arithmetic is wrong and the transaction is aborted.
pub async fn set_quantities<C: ConnectionTrait>(
    conn: &C,
    batch: stock::Model,
    available: Decimal,
    committed: Decimal,
) -> Result<stock::Model, ServiceError> {
    if available < Decimal::ZERO || committed < Decimal::ZERO {
        return Err(ServiceError::InconsistentState(format!(
            "batch {} would become available={} committed={}",
            batch.id, available, committed
        )));
    }
    let mut active: stock::ActiveModel = batch.into();
    active.available_quantity = Set(available);
    active.committed_quantity = Set(committed);
    active.updated_at = Set(Utc::now());
    Ok(active.update(conn).await?)
}

/// Applies `delta` to the product's aggregate total, never going below zero.
pub async fn adjust_product_total<C: ConnectionTrait>(
    conn: &C,
    company_id: Uuid,
    product_id: Uuid,
    delta: Decimal,
) -> Result<product::Model, ServiceError> {
    let product = find_product(conn, company_id, product_id).await?;
    let next = (product.total_stock + delta).max(Decimal::ZERO);
    if product.total_stock + delta < Decimal::ZERO {
        warn!(
            product_id = %product_id,
            total_stock = %product.total_stock,
            delta = %delta,
            "Product total would go negative, flooring at zero"
        );
    }
    let mut active: product::ActiveModel = product.into();
    active.total_stock = Set(next);
    active.updated_at = Set(Utc::now());
    Ok(active.update(conn).await?)
}

/// Fields for a batch entering a warehouse.
#[derive(Debug, Clone)]
pub struct NewBatch {
    pub company_id: Uuid,
    pub product_id: Uuid,
    pub warehouse_id: Uuid,
    pub batch_number: String,
    pub quantity: Decimal,
    pub cost_price: Decimal,
}

pub async fn insert_batch<C: ConnectionTrait>(
    conn: &C,
    new: NewBatch,
) -> Result<stock::Model, ServiceError> {
    let now = Utc::now();
    let batch = stock::ActiveModel {
        company_id: Set(new.company_id),
        product_id: Set(new.product_id),
        warehouse_id: Set(new.warehouse_id),
        batch_number: Set(new.batch_number),
        available_quantity: Set(new.quantity),
        committed_quantity: Set(Decimal::ZERO),
        cost_price: Set(new.cost_price),
        initial_quantity: Set(Some(new.quantity)),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };
    Ok(batch.insert(conn).await?)
}

/// Entry point for stock entering the ledger and for read-side lookups.
pub struct StockLedgerService {
    db_pool: Arc<DbPool>,
    event_sender: Arc<EventSender>,
    settings: TransactionSettings,
    batch_numbers: Arc<BatchNumberGenerator>,
}

impl StockLedgerService {
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

    /// Creates a batch with a generated batch number and raises the product total.
    #[instrument(skip(self), fields(product_id = %request.product_id, warehouse_id = %request.warehouse_id))]
    pub async fn receive_batch(&self, request: ReceiveBatch) -> Result<stock::Model, ServiceError> {
        request.validate()?;

        let batch_numbers = self.batch_numbers.clone();
        let batch = run_serializable(self.db_pool.as_ref(), &self.settings, move |txn| {
            let request = request.clone();
            let batch_numbers = batch_numbers.clone();
            Box::pin(async move {
                let warehouse =
                    find_warehouse(txn, request.company_id, request.warehouse_id).await?;
                let product = find_product(txn, request.company_id, request.product_id).await?;
                let batch_number = batch_numbers
                    .generate(txn, request.company_id, &warehouse.name, Utc::now().date_naive())
                    .await?;

                let batch = insert_batch(
                    txn,
                    NewBatch {
                        company_id: request.company_id,
                        product_id: product.id,
                        warehouse_id: warehouse.id,
                        batch_number,
                        quantity: request.quantity,
                        cost_price: request.cost_price.unwrap_or(product.cost_price),
                    },
                )
                .await?;
                adjust_product_total(txn, request.company_id, product.id, request.quantity)
                    .await?;
                Ok(batch)
            })
        })
        .await?;

        info!(stock_id = batch.id, batch_number = %batch.batch_number, "Batch received");
        self.event_sender.send_or_log(Event::BatchReceived {
            stock_id: batch.id,
            product_id: batch.product_id,
            warehouse_id: batch.warehouse_id,
            batch_number: batch.batch_number.clone(),
            quantity: batch.available_quantity,
        });
        Ok(batch)
    }

    pub async fn find_batch(&self, company_id: Uuid, stock_id: i64) -> Result<stock::Model, ServiceError> {
        find_batch(self.db_pool.as_ref(), company_id, stock_id).await
    }

    pub async fn find_warehouse_by_name(
        &self,
        company_id: Uuid,
        name: &str,
    ) -> Result<warehouse::Model, ServiceError> {
        find_warehouse_by_name(self.db_pool.as_ref(), company_id, name).await
    }

    pub async fn find_product(
        &self,
        company_id: Uuid,
        product_id: Uuid,
    ) -> Result<product::Model, ServiceError> {
        find_product(self.db_pool.as_ref(), company_id, product_id).await
    }

    pub async fn batches_fifo(
        &self,
        company_id: Uuid,
        product_id: Uuid,
        warehouse_id: Uuid,
    ) -> Result<Vec<stock::Model>, ServiceError> {
        batches_fifo(self.db_pool.as_ref(), company_id, product_id, warehouse_id).await
    }

    /// Recomputes the product total from its batches and stores it.
    ///
    /// Returns the previous and the reconciled total.
    #[instrument(skip(self))]
    pub async fn reconcile_product_total(
        &self,
        company_id: Uuid,
        product_id: Uuid,
    ) -> Result<(Decimal, Decimal), ServiceError> {
        run_serializable(self.db_pool.as_ref(), &self.settings, move |txn| {
            Box::pin(async move {
                let product = find_product(txn, company_id, product_id).await?;
                let on_hand: Decimal = Stock::find()
                    .filter(stock::Column::CompanyId.eq(company_id))
                    .filter(stock::Column::ProductId.eq(product_id))
                    .all(txn)
                    .await?
                    .iter()
                    .map(stock::Model::on_hand)
                    .sum();

                let previous = product.total_stock;
                if previous != on_hand {
                    warn!(%product_id, %previous, %on_hand, "Product total drifted from batches");
                    let mut active: product::ActiveModel = product.into();
                    active.total_stock = Set(on_hand);
                    active.updated_at = Set(Utc::now());
                    active.update(txn).await?;
                }
                Ok((previous, on_hand))
            })
        })
        .await
    }
}
