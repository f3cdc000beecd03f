//! Batch number generation.
//!
//! A candidate is built from the warehouse name and the date, a per-company
//! sequencer disambiguates it, and the result is checked against existing
//! batches. Collisions are retried in a bounded loop.

use crate::{
    entities::batch_sequence::{self, Entity as BatchSequence},
    errors::ServiceError,
    services::stock_ledger::batch_number_exists,
};
use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, DatabaseTransaction, EntityTrait, QueryFilter,
    Set,
};
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

pub const DEFAULT_MAX_ATTEMPTS: u32 = 10;

/// Turns a candidate into a company-unique code.
#[async_trait]
pub trait BatchSequencer: Send + Sync {
    async fn next_code(
        &self,
        txn: &DatabaseTransaction,
        company_id: Uuid,
        candidate: &str,
    ) -> Result<String, ServiceError>;
}

/// Atomic per-company counter stored in `batch_sequences`, incremented in the
/// caller's transaction.
#[derive(Debug, Default, Clone, Copy)]
pub struct DbBatchSequencer;

#[async_trait]
impl BatchSequencer for DbBatchSequencer {
    async fn next_code(
        &self,
        txn: &DatabaseTransaction,
        company_id: Uuid,
        candidate: &str,
    ) -> Result<String, ServiceError> {
        let now = Utc::now();
        let updated = BatchSequence::update_many()
            .col_expr(
                batch_sequence::Column::LastValue,
                Expr::col(batch_sequence::Column::LastValue).add(1),
            )
            .col_expr(batch_sequence::Column::UpdatedAt, Expr::value(now))
            .filter(batch_sequence::Column::CompanyId.eq(company_id))
            .exec(txn)
            .await?;

        let value = if updated.rows_affected == 0 {
            batch_sequence::ActiveModel {
                company_id: Set(company_id),
                last_value: Set(1),
                updated_at: Set(now),
            }
            .insert(txn)
            .await?
            .last_value
        } else {
            BatchSequence::find_by_id(company_id)
                .one(txn)
                .await?
                .ok_or_else(|| {
                    ServiceError::InconsistentState(format!(
                        "batch sequence for company {} vanished mid-transaction",
                        company_id
                    ))
                })?
                .last_value
        };

        Ok(format!("{}-{:04}", candidate, value))
    }
}

/// First three letters of the warehouse name, upper-cased and padded with `X`,
/// followed by `YYMMDD`.
pub fn candidate(warehouse_name: &str, date: NaiveDate) -> String {
    let mut prefix: String = warehouse_name
        .chars()
        .filter(|c| c.is_ascii_alphabetic())
        .take(3)
        .map(|c| c.to_ascii_uppercase())
        .collect();
    while prefix.len() < 3 {
        prefix.push('X');
    }
    format!("{}{}", prefix, date.format("%y%m%d"))
}

pub struct BatchNumberGenerator {
    sequencer: Arc<dyn BatchSequencer>,
    max_attempts: u32,
}

impl BatchNumberGenerator {
    pub fn new(sequencer: Arc<dyn BatchSequencer>, max_attempts: u32) -> Self {
        Self {
            sequencer,
            max_attempts: max_attempts.max(1),
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Returns a batch number unused within the company.
    pub async fn generate(
        &self,
        txn: &DatabaseTransaction,
        company_id: Uuid,
        warehouse_name: &str,
        date: NaiveDate,
    ) -> Result<String, ServiceError> {
        let candidate = candidate(warehouse_name, date);

        for attempt in 1..=self.max_attempts {
            let code = self.sequencer.next_code(txn, company_id, &candidate).await?;
            if !batch_number_exists(txn, company_id, &code).await? {
                debug!(%company_id, batch_number = %code, attempt, "Generated batch number");
                return Ok(code);
            }
            debug!(%company_id, batch_number = %code, attempt, "Batch number collision");
        }

        warn!(%company_id, %candidate, attempts = self.max_attempts, "Batch number generation exhausted");
        Err(ServiceError::GenerationExhausted {
            attempts: self.max_attempts,
        })
    }
}

impl Default for BatchNumberGenerator {
    fn default() -> Self {
        Self::new(Arc::new(DbBatchSequencer), DEFAULT_MAX_ATTEMPTS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 7).unwrap()
    }

    #[test]
    fn candidate_uses_warehouse_prefix_and_date() {
        assert_eq!(candidate("main store", date()), "MAI240307");
    }

    #[test]
    fn candidate_pads_short_names() {
        assert_eq!(candidate("A1", date()), "AXX240307");
        assert_eq!(candidate("", date()), "XXX240307");
    }

    #[test]
    fn candidate_ignores_non_letters() {
        assert_eq!(candidate("9-north", date()), "NOR240307");
    }
}
