//! Stock ledger
//!
//! Per-batch inventory tracking with FIFO allocation and release, loan
//! issuance and returns, inter-warehouse transfers, manual adjustments, and
//! an append-only batch log recording cost and price for every draw.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod events;
pub mod migrator;
pub mod models;
pub mod services;

pub use errors::ServiceError;
pub use services::LedgerServices;
