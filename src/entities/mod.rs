//! Ledger persistence entities.

pub mod batch_log;
pub mod batch_sequence;
pub mod inventory_adjustment;
pub mod inventory_adjustment_line;
pub mod loan_request;
pub mod loan_request_item;
pub mod loan_return;
pub mod loan_return_line;
pub mod product;
pub mod stock;
pub mod transfer_request;
pub mod transfer_request_item;
pub mod warehouse;
