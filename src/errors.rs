use rust_decimal::Decimal;
use sea_orm::error::{DbErr, SqlErr};
use serde::Serialize;
use uuid::Uuid;

/// Errors surfaced by the ledger services.
///
/// Every variant aborts the enclosing transaction; the ledger is never left
/// mid-mutation.
#[derive(Debug, thiserror::Error, Serialize)]
pub enum ServiceError {
    #[error("Database error: {0}")]
    DatabaseError(
        #[serde(skip)]
        DbErr,
    ),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    /// The database aborted the transaction because a concurrent one touched
    /// the same rows. The transaction runner retries these and surfaces a
    /// `Conflict` once its attempts run out.
    #[error("Concurrent modification: {0}")]
    SerializationFailure(String),

    #[error("Insufficient stock for product {product_id}: requested {requested}, short by {shortfall}")]
    InsufficientStock {
        product_id: Uuid,
        requested: Decimal,
        shortfall: Decimal,
    },

    #[error("Over return on loan {loan_id}: requested {requested}, remaining {remaining}")]
    OverReturn {
        loan_id: Uuid,
        requested: Decimal,
        remaining: Decimal,
    },

    #[error("Inconsistent ledger state: {0}")]
    InconsistentState(String),

    #[error("Batch number generation exhausted after {attempts} attempts")]
    GenerationExhausted { attempts: u32 },

    #[error("Invalid status: {0}")]
    InvalidStatus(String),

    #[error("Operation timed out after {0:?}")]
    Timeout(std::time::Duration),
}

impl From<DbErr> for ServiceError {
    fn from(err: DbErr) -> Self {
        if is_serialization_failure(&err) {
            return ServiceError::SerializationFailure(err.to_string());
        }
        match err.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(detail)) => {
                ServiceError::Conflict(format!("duplicate record: {}", detail))
            }
            _ => ServiceError::DatabaseError(err),
        }
    }
}

impl From<validator::ValidationErrors> for ServiceError {
    fn from(err: validator::ValidationErrors) -> Self {
        ServiceError::ValidationError(err.to_string())
    }
}

impl ServiceError {
    pub fn not_found(kind: &str, id: impl std::fmt::Display) -> Self {
        ServiceError::NotFound(format!("{} {} not found", kind, id))
    }

    /// Whether the transaction runner may transparently retry this error.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ServiceError::SerializationFailure(_))
    }

    /// Stable, machine-readable code for callers mapping errors onto their own surface.
    pub fn code(&self) -> &'static str {
        match self {
            ServiceError::DatabaseError(_) => "database_error",
            ServiceError::NotFound(_) => "not_found",
            ServiceError::ValidationError(_) => "validation_error",
            ServiceError::Conflict(_) | ServiceError::SerializationFailure(_) => "conflict",
            ServiceError::InsufficientStock { .. } => "insufficient_stock",
            ServiceError::OverReturn { .. } => "over_return",
            ServiceError::InconsistentState(_) => "inconsistent_state",
            ServiceError::GenerationExhausted { .. } => "generation_exhausted",
            ServiceError::InvalidStatus(_) => "invalid_status",
            ServiceError::Timeout(_) => "timeout",
        }
    }
}

// Postgres reports SQLSTATE 40001/40P01; SQLite reports busy/locked.
fn is_serialization_failure(err: &DbErr) -> bool {
    let msg = err.to_string().to_lowercase();
    msg.contains("40001")
        || msg.contains("40p01")
        || msg.contains("could not serialize")
        || msg.contains("deadlock detected")
        || msg.contains("database is locked")
        || msg.contains("database table is locked")
}
