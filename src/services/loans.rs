use crate::{
    db::{run_serializable, DbPool, TransactionSettings},
    entities::{
        batch_log,
        loan_request::{self, Entity as LoanRequest, LoanStatus},
        loan_request_item::{self, Entity as LoanRequestItem},
        loan_return, loan_return_line,
    },
    errors::ServiceError,
    events::{Event, EventSender},
    models::{ensure_unique, validate_lines, IssueLoan, ReleaseLine, ReturnLoanItem, TransactionRef},
    services::{
        allocation::allocate_lines,
        returns::{credit_entries, delete_pending_entries, release_lines},
        stock_ledger::{find_warehouse, find_warehouse_by_name},
    },
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanDetails {
    pub request: loan_request::Model,
    pub items: Vec<loan_request_item::Model>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IssuedLoan {
    pub loan: LoanDetails,
    pub entries: Vec<batch_log::Model>,
}

/// State of a loan after one return event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanReturnOutcome {
    pub status: LoanStatus,
    pub item: loan_request_item::Model,
    pub record: loan_return::Model,
    pub lines: Vec<loan_return_line::Model>,
}

async fn find_loan<C: ConnectionTrait>(
    conn: &C,
    company_id: Uuid,
    loan_id: Uuid,
) -> Result<loan_request::Model, ServiceError> {
    LoanRequest::find_by_id(loan_id)
        .filter(loan_request::Column::CompanyId.eq(company_id))
        .one(conn)
        .await?
        .ok_or_else(|| ServiceError::not_found("Loan request", loan_id))
}

async fn loan_items<C: ConnectionTrait>(
    conn: &C,
    loan_id: Uuid,
) -> Result<Vec<loan_request_item::Model>, ServiceError> {
    let items = LoanRequestItem::find()
        .filter(loan_request_item::Column::LoanRequestId.eq(loan_id))
        .order_by_asc(loan_request_item::Column::ProductId)
        .all(conn)
        .await?;
    Ok(items)
}

fn ensure_status(
    loan: &loan_request::Model,
    allowed: impl Fn(&LoanStatus) -> bool,
    action: &str,
) -> Result<(), ServiceError> {
    if allowed(&loan.status) {
        Ok(())
    } else {
        Err(ServiceError::InvalidStatus(format!(
            "cannot {} loan {} in status {}",
            action, loan.request_number, loan.status
        )))
    }
}

async fn set_status<C: ConnectionTrait>(
    conn: &C,
    loan: loan_request::Model,
    status: LoanStatus,
    actor: Option<Uuid>,
) -> Result<loan_request::Model, ServiceError> {
    let mut active: loan_request::ActiveModel = loan.into();
    active.status = Set(status);
    if let Some(actor) = actor {
        active.approved_by = Set(Some(actor));
    }
    active.updated_at = Set(Utc::now());
    Ok(active.update(conn).await?)
}

fn reference_for(loan: &loan_request::Model) -> TransactionRef {
    TransactionRef::loan_request(loan.company_id, loan.id, loan.customer_id)
}

pub struct LoanService {
    db_pool: Arc<DbPool>,
    event_sender: Arc<EventSender>,
    allocation_settings: TransactionSettings,
    settings: TransactionSettings,
}

impl LoanService {
    pub fn new(
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
        allocation_settings: TransactionSettings,
        settings: TransactionSettings,
    ) -> Self {
        Self {
            db_pool,
            event_sender,
            allocation_settings,
            settings,
        }
    }

    /// Records a loan request and reserves its stock in one transaction.
    #[instrument(skip(self, request), fields(request_number = %request.request_number))]
    pub async fn issue(&self, request: IssueLoan) -> Result<IssuedLoan, ServiceError> {
        request.validate()?;
        validate_lines(&request.lines)?;
        ensure_unique(&request.lines, |l| l.product_id, "product line")?;

        let issued = run_serializable(self.db_pool.as_ref(), &self.allocation_settings, move |txn| {
            let request = request.clone();
            Box::pin(async move {
                let existing = LoanRequest::find()
                    .filter(loan_request::Column::CompanyId.eq(request.company_id))
                    .filter(loan_request::Column::RequestNumber.eq(request.request_number.as_str()))
                    .one(txn)
                    .await?;
                if existing.is_some() {
                    return Err(ServiceError::Conflict(format!(
                        "loan request number {} already exists",
                        request.request_number
                    )));
                }

                let warehouse =
                    find_warehouse_by_name(txn, request.company_id, &request.warehouse_name).await?;
                let now = Utc::now();
                let loan = loan_request::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    company_id: Set(request.company_id),
                    request_number: Set(request.request_number.clone()),
                    customer_id: Set(request.customer_id),
                    warehouse_id: Set(warehouse.id),
                    status: Set(LoanStatus::Pending),
                    created_by: Set(request.created_by),
                    approved_by: Set(None),
                    created_at: Set(now),
                    updated_at: Set(now),
                }
                .insert(txn)
                .await?;

                let mut items = Vec::with_capacity(request.lines.len());
                for line in &request.lines {
                    let item = loan_request_item::ActiveModel {
                        id: Set(Uuid::new_v4()),
                        loan_request_id: Set(loan.id),
                        product_id: Set(line.product_id),
                        unit: Set(line.unit),
                        quantity_transferred: Set(line.quantity),
                        quantity_returned: Set(Decimal::ZERO),
                        quantity_remaining_to_return: Set(line.quantity),
                        balance_quantity: Set(line.quantity),
                        amount: Set(line.amount),
                    }
                    .insert(txn)
                    .await?;
                    items.push(item);
                }

                let entries =
                    allocate_lines(txn, &reference_for(&loan), &request.sale_lines()).await?;

                Ok(IssuedLoan {
                    loan: LoanDetails {
                        request: loan,
                        items,
                    },
                    entries,
                })
            })
        })
        .await?;

        info!(loan_id = %issued.loan.request.id, entries = issued.entries.len(), "Loan issued");
        self.event_sender.send_or_log(Event::LoanIssued {
            loan_id: issued.loan.request.id,
            request_number: issued.loan.request.request_number.clone(),
            customer_id: issued.loan.request.customer_id,
        });
        Ok(issued)
    }

    #[instrument(skip(self))]
    pub async fn approve(
        &self,
        company_id: Uuid,
        loan_id: Uuid,
        approved_by: Uuid,
    ) -> Result<loan_request::Model, ServiceError> {
        let loan = run_serializable(self.db_pool.as_ref(), &self.settings, move |txn| {
            Box::pin(async move {
                let loan = find_loan(txn, company_id, loan_id).await?;
                ensure_status(&loan, |s| *s == LoanStatus::Pending, "approve")?;
                set_status(txn, loan, LoanStatus::Approved, Some(approved_by)).await
            })
        })
        .await?;

        info!(%loan_id, "Loan approved");
        self.event_sender
            .send_or_log(Event::LoanApproved { loan_id, approved_by });
        Ok(loan)
    }

    /// Rejects a pending loan and hands its reservations back.
    #[instrument(skip(self))]
    pub async fn reject(
        &self,
        company_id: Uuid,
        loan_id: Uuid,
        rejected_by: Uuid,
    ) -> Result<loan_request::Model, ServiceError> {
        let loan = run_serializable(self.db_pool.as_ref(), &self.settings, move |txn| {
            Box::pin(async move {
                let loan = find_loan(txn, company_id, loan_id).await?;
                ensure_status(&loan, |s| *s == LoanStatus::Pending, "reject")?;

                let warehouse = find_warehouse(txn, company_id, loan.warehouse_id).await?;
                let lines: Vec<ReleaseLine> = loan_items(txn, loan.id)
                    .await?
                    .into_iter()
                    .map(|item| ReleaseLine {
                        product_id: item.product_id,
                        warehouse_name: warehouse.name.clone(),
                        quantity: item.quantity_transferred,
                    })
                    .collect();
                release_lines(txn, &reference_for(&loan), &lines).await?;

                set_status(txn, loan, LoanStatus::Reject, Some(rejected_by)).await
            })
        })
        .await?;

        info!(%loan_id, "Loan rejected");
        self.event_sender
            .send_or_log(Event::LoanRejected { loan_id, rejected_by });
        Ok(loan)
    }

    /// Takes back part or all of one loan line.
    #[instrument(skip(self, request), fields(loan_id = %request.loan_id, product_id = %request.product_id))]
    pub async fn partial_return(
        &self,
        request: ReturnLoanItem,
    ) -> Result<LoanReturnOutcome, ServiceError> {
        request.validate()?;

        let outcome = run_serializable(self.db_pool.as_ref(), &self.settings, move |txn| {
            let request = request.clone();
            Box::pin(async move {
                let loan = find_loan(txn, request.company_id, request.loan_id).await?;
                ensure_status(&loan, LoanStatus::accepts_returns, "return goods on")?;

                let items = loan_items(txn, loan.id).await?;
                let item = items
                    .iter()
                    .find(|i| i.product_id == request.product_id)
                    .cloned()
                    .ok_or_else(|| {
                        ServiceError::NotFound(format!(
                            "product {} is not on loan {}",
                            request.product_id, loan.request_number
                        ))
                    })?;

                if request.quantity_returned > item.quantity_remaining_to_return {
                    warn!(
                        requested = %request.quantity_returned,
                        remaining = %item.quantity_remaining_to_return,
                        "Return exceeds remaining loan quantity"
                    );
                    return Err(ServiceError::OverReturn {
                        loan_id: loan.id,
                        requested: request.quantity_returned,
                        remaining: item.quantity_remaining_to_return,
                    });
                }

                credit_entries(
                    txn,
                    &reference_for(&loan),
                    item.product_id,
                    loan.warehouse_id,
                    request.quantity_returned,
                )
                .await?;

                let returned = item.quantity_returned + request.quantity_returned;
                let balance = item.quantity_transferred - returned;
                let mut active: loan_request_item::ActiveModel = item.into();
                active.quantity_returned = Set(returned);
                active.balance_quantity = Set(balance);
                active.quantity_remaining_to_return = Set(balance);
                let item = active.update(txn).await?;

                let record = loan_return::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    loan_request_id: Set(loan.id),
                    note: Set(request.note.clone()),
                    created_by: Set(request.returned_by),
                    created_at: Set(Utc::now()),
                }
                .insert(txn)
                .await?;

                let line = loan_return_line::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    loan_return_id: Set(record.id),
                    loan_request_item_id: Set(item.id),
                    product_id: Set(item.product_id),
                    quantity: Set(request.quantity_returned),
                    quantity_transferred: Set(item.quantity_transferred),
                    quantity_returned: Set(item.quantity_returned),
                    quantity_remaining_to_return: Set(item.quantity_remaining_to_return),
                    balance_quantity: Set(item.balance_quantity),
                }
                .insert(txn)
                .await?;

                let all_returned = items
                    .iter()
                    .filter(|i| i.id != item.id)
                    .all(loan_request_item::Model::is_fully_returned)
                    && item.is_fully_returned();
                let status = if all_returned {
                    LoanStatus::Returned
                } else {
                    LoanStatus::PartReturned
                };
                set_status(txn, loan, status, None).await?;

                Ok(LoanReturnOutcome {
                    status,
                    item,
                    record,
                    lines: vec![line],
                })
            })
        })
        .await?;

        info!(status = %outcome.status, returned = %outcome.item.quantity_returned, "Loan return recorded");
        self.event_sender.send_or_log(Event::LoanReturned {
            loan_id: outcome.record.loan_request_id,
            return_id: outcome.record.id,
            status: outcome.status.to_string(),
        });
        Ok(outcome)
    }

    /// Closes a fully returned loan; its reservations never became sales.
    #[instrument(skip(self))]
    pub async fn close(
        &self,
        company_id: Uuid,
        loan_id: Uuid,
    ) -> Result<loan_request::Model, ServiceError> {
        let loan = run_serializable(self.db_pool.as_ref(), &self.settings, move |txn| {
            Box::pin(async move {
                let loan = find_loan(txn, company_id, loan_id).await?;
                ensure_status(&loan, |s| *s == LoanStatus::Returned, "close")?;
                delete_pending_entries(txn, &reference_for(&loan)).await?;
                set_status(txn, loan, LoanStatus::Closed, None).await
            })
        })
        .await?;

        info!(%loan_id, "Loan closed");
        self.event_sender.send_or_log(Event::LoanClosed { loan_id });
        Ok(loan)
    }

    pub async fn get(&self, company_id: Uuid, loan_id: Uuid) -> Result<LoanDetails, ServiceError> {
        let db = self.db_pool.as_ref();
        let request = find_loan(db, company_id, loan_id).await?;
        let items = loan_items(db, loan_id).await?;
        Ok(LoanDetails { request, items })
    }
}
