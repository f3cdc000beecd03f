//! Ledger services.
//!
//! Each service owns one kind of stock movement and runs every mutation in a
//! single serializable transaction. The free functions in the submodules take
//! any `ConnectionTrait` so workflows can compose them inside one transaction.

pub mod adjustments;
pub mod allocation;
pub mod batch_number;
pub mod fifo;
pub mod loans;
pub mod returns;
pub mod stock_ledger;
pub mod transfers;

use crate::{
    config::AppConfig,
    db::{DbPool, TransactionSettings},
    events::EventSender,
};
use std::sync::Arc;

use adjustments::AdjustmentService;
use allocation::AllocationService;
use batch_number::{BatchNumberGenerator, BatchSequencer, DbBatchSequencer};
use loans::LoanService;
use returns::ReturnService;
use stock_ledger::StockLedgerService;
use transfers::TransferService;

/// Service container holding all ledger services
#[derive(Clone)]
pub struct LedgerServices {
    pub stock: Arc<StockLedgerService>,
    pub allocation: Arc<AllocationService>,
    pub returns: Arc<ReturnService>,
    pub transfers: Arc<TransferService>,
    pub loans: Arc<LoanService>,
    pub adjustments: Arc<AdjustmentService>,
}

impl LedgerServices {
    /// Builds every service with the database-backed batch sequencer.
    pub fn new(db_pool: Arc<DbPool>, event_sender: Arc<EventSender>, config: &AppConfig) -> Self {
        Self::with_sequencer(db_pool, event_sender, config, Arc::new(DbBatchSequencer))
    }

    pub fn with_sequencer(
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
        config: &AppConfig,
        sequencer: Arc<dyn BatchSequencer>,
    ) -> Self {
        let allocation_settings = TransactionSettings::allocation(config);
        let settings = TransactionSettings::operation(config);
        let batch_numbers = Arc::new(BatchNumberGenerator::new(
            sequencer,
            config.batch_number_max_attempts,
        ));

        Self {
            stock: Arc::new(StockLedgerService::new(
                db_pool.clone(),
                event_sender.clone(),
                settings,
                batch_numbers.clone(),
            )),
            allocation: Arc::new(AllocationService::new(
                db_pool.clone(),
                event_sender.clone(),
                allocation_settings,
            )),
            returns: Arc::new(ReturnService::new(
                db_pool.clone(),
                event_sender.clone(),
                settings,
            )),
            transfers: Arc::new(TransferService::new(
                db_pool.clone(),
                event_sender.clone(),
                settings,
                batch_numbers,
            )),
            loans: Arc::new(LoanService::new(
                db_pool.clone(),
                event_sender.clone(),
                allocation_settings,
                settings,
            )),
            adjustments: Arc::new(AdjustmentService::new(db_pool, event_sender, settings)),
        }
    }
}
