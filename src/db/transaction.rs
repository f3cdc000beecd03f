/*!
 * Serializable transaction runner
 *
 * Every multi-step ledger mutation runs through `run_serializable`: one
 * SERIALIZABLE transaction per attempt, bounded by a timeout, retried with
 * exponential backoff only when the database reports a serialization
 * conflict. A conflict that outlasts the attempts surfaces as `Conflict`.
 * There are no in-process locks.
 */

use crate::config::AppConfig;
use crate::errors::ServiceError;
use futures::future::BoxFuture;
use sea_orm::{DatabaseConnection, DatabaseTransaction, IsolationLevel, TransactionTrait};
use std::time::Duration;
use tracing::{debug, warn};
use uuid::Uuid;

/// Timeout and retry policy applied to one logical operation.
#[derive(Debug, Clone, Copy)]
pub struct TransactionSettings {
    pub timeout: Duration,
    pub max_attempts: u32,
    pub backoff: Duration,
}

impl TransactionSettings {
    pub fn new(timeout: Duration, max_attempts: u32, backoff: Duration) -> Self {
        Self {
            timeout,
            max_attempts: max_attempts.max(1),
            backoff,
        }
    }

    /// Settings for order and loan allocation.
    pub fn allocation(cfg: &AppConfig) -> Self {
        Self::new(
            cfg.allocation_timeout(),
            cfg.transaction_max_attempts,
            cfg.retry_backoff(),
        )
    }

    /// Settings for releases, returns, transfers and adjustments.
    pub fn operation(cfg: &AppConfig) -> Self {
        Self::new(
            cfg.operation_timeout(),
            cfg.transaction_max_attempts,
            cfg.retry_backoff(),
        )
    }

    fn backoff_for(&self, attempt: u32) -> Duration {
        self.backoff * 2u32.saturating_pow(attempt.saturating_sub(1))
    }
}

/// Execute `f` inside a SERIALIZABLE transaction.
///
/// `f` may be invoked more than once; it must not capture state that a
/// failed attempt could have consumed.
///
/// # Example
///
/// ```rust,ignore
/// let entries = run_serializable(&db, &settings, move |txn| {
///     let lines = lines.clone();
///     Box::pin(async move { allocate_lines(txn, &lines).await })
/// })
/// .await?;
/// ```
pub async fn run_serializable<F, T>(
    db: &DatabaseConnection,
    settings: &TransactionSettings,
    f: F,
) -> Result<T, ServiceError>
where
    F: for<'c> Fn(&'c DatabaseTransaction) -> BoxFuture<'c, Result<T, ServiceError>>,
{
    let mut attempt = 1;
    loop {
        let transaction_id = Uuid::new_v4();
        debug!(transaction_id = %transaction_id, attempt, "Starting serializable transaction");

        let outcome = tokio::time::timeout(settings.timeout, run_once(db, &f)).await;

        match outcome {
            Err(_) => {
                warn!(transaction_id = %transaction_id, timeout = ?settings.timeout, "Transaction timed out and was rolled back");
                return Err(ServiceError::Timeout(settings.timeout));
            }
            Ok(Err(err)) if err.is_retryable() && attempt < settings.max_attempts => {
                let delay = settings.backoff_for(attempt);
                warn!(
                    transaction_id = %transaction_id,
                    attempt,
                    delay = ?delay,
                    error = %err,
                    "Serialization conflict, retrying transaction"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Ok(Err(err)) if err.is_retryable() => {
                warn!(
                    transaction_id = %transaction_id,
                    attempts = attempt,
                    error = %err,
                    "Serialization conflict persisted, giving up"
                );
                return Err(ServiceError::Conflict(format!(
                    "still conflicting after {} attempts: {}",
                    attempt, err
                )));
            }
            Ok(result) => {
                match &result {
                    Ok(_) => debug!(transaction_id = %transaction_id, "Transaction committed"),
                    Err(e) => debug!(transaction_id = %transaction_id, error = %e, "Transaction rolled back"),
                }
                return result;
            }
        }
    }
}

async fn run_once<F, T>(db: &DatabaseConnection, f: &F) -> Result<T, ServiceError>
where
    F: for<'c> Fn(&'c DatabaseTransaction) -> BoxFuture<'c, Result<T, ServiceError>>,
{
    let txn = db
        .begin_with_config(Some(IsolationLevel::Serializable), None)
        .await?;

    let result = f(&txn).await;

    match result {
        Ok(value) => {
            txn.commit().await?;
            Ok(value)
        }
        Err(err) => {
            if let Err(rollback_err) = txn.rollback().await {
                warn!(error = %rollback_err, "Rollback failed");
            }
            Err(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles_per_attempt() {
        let settings = TransactionSettings::new(
            Duration::from_secs(5),
            4,
            Duration::from_millis(50),
        );
        assert_eq!(settings.backoff_for(1), Duration::from_millis(50));
        assert_eq!(settings.backoff_for(2), Duration::from_millis(100));
        assert_eq!(settings.backoff_for(3), Duration::from_millis(200));
    }

    #[test]
    fn at_least_one_attempt() {
        let settings = TransactionSettings::new(Duration::from_secs(1), 0, Duration::ZERO);
        assert_eq!(settings.max_attempts, 1);
    }
}
