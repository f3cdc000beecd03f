//! Typed line items accepted by the ledger services.
//!
//! Each movement kind has its own line type, validated before any database
//! work starts.

use crate::entities::batch_log::{CounterpartType, ReferenceType, SaleUnit};
use crate::entities::inventory_adjustment::AdjustmentType;
use crate::errors::ServiceError;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::hash::Hash;
use uuid::Uuid;
use validator::{Validate, ValidationError};

fn validate_positive_decimal(value: &Decimal) -> Result<(), ValidationError> {
    if *value > Decimal::ZERO {
        Ok(())
    } else {
        let mut err = ValidationError::new("range");
        err.message = Some("Quantity must be greater than 0".into());
        Err(err)
    }
}

fn validate_decimal_non_negative(value: &Decimal) -> Result<(), ValidationError> {
    if *value < Decimal::ZERO {
        return Err(ValidationError::new("Amount must be non-negative"));
    }
    Ok(())
}

/// Who the stock moved to or from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Counterpart {
    pub kind: CounterpartType,
    pub id: Uuid,
}

impl Counterpart {
    pub fn customer(id: Uuid) -> Self {
        Self {
            kind: CounterpartType::Customer,
            id,
        }
    }

    pub fn supplier(id: Uuid) -> Self {
        Self {
            kind: CounterpartType::Supplier,
            id,
        }
    }
}

/// The originating transaction a set of batch draws belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRef {
    pub company_id: Uuid,
    pub reference_type: ReferenceType,
    pub reference_id: Uuid,
    pub counterpart: Option<Counterpart>,
}

impl TransactionRef {
    pub fn sale_order(company_id: Uuid, order_id: Uuid, customer_id: Option<Uuid>) -> Self {
        Self {
            company_id,
            reference_type: ReferenceType::SaleOrder,
            reference_id: order_id,
            counterpart: customer_id.map(Counterpart::customer),
        }
    }

    pub fn loan_request(company_id: Uuid, loan_id: Uuid, customer_id: Uuid) -> Self {
        Self {
            company_id,
            reference_type: ReferenceType::LoanRequest,
            reference_id: loan_id,
            counterpart: Some(Counterpart::customer(customer_id)),
        }
    }
}

/// One product line of a sale order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct SaleLine {
    pub product_id: Uuid,
    #[validate(length(min = 1, max = 128))]
    pub warehouse_name: String,
    #[validate(custom = "validate_positive_decimal")]
    pub quantity: Decimal,
    #[validate(custom = "validate_decimal_non_negative")]
    pub line_amount: Decimal,
    pub unit: SaleUnit,
}

/// One product line whose reservation is handed back on cancellation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct ReleaseLine {
    pub product_id: Uuid,
    #[validate(length(min = 1, max = 128))]
    pub warehouse_name: String,
    #[validate(custom = "validate_positive_decimal")]
    pub quantity: Decimal,
}

impl From<&SaleLine> for ReleaseLine {
    fn from(line: &SaleLine) -> Self {
        Self {
            product_id: line.product_id,
            warehouse_name: line.warehouse_name.clone(),
            quantity: line.quantity,
        }
    }
}

/// One line of a transfer request, pinned to an exact source batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct TransferLine {
    pub product_id: Uuid,
    pub sending_stock_id: i64,
    #[validate(custom = "validate_positive_decimal")]
    pub quantity: Decimal,
    /// Overrides the source batch's cost snapshot when set.
    #[validate(custom = "validate_decimal_non_negative")]
    pub cost_price: Option<Decimal>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct SubmitTransfer {
    pub company_id: Uuid,
    #[validate(length(min = 1, max = 64))]
    pub request_number: String,
    pub sending_warehouse_id: Uuid,
    pub receiving_warehouse_id: Uuid,
    pub requested_by: Uuid,
    #[validate(length(max = 500))]
    pub note: Option<String>,
    pub lines: Vec<TransferLine>,
}

impl SubmitTransfer {
    pub fn check_warehouses(&self) -> Result<(), ServiceError> {
        if self.sending_warehouse_id == self.receiving_warehouse_id {
            return Err(ServiceError::ValidationError(
                "sending and receiving warehouse must differ".to_string(),
            ));
        }
        Ok(())
    }
}

/// Replacement lines for a transfer that has not been confirmed yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct EditTransfer {
    pub company_id: Uuid,
    pub transfer_id: Uuid,
    pub edited_by: Uuid,
    #[validate(length(max = 500))]
    pub note: Option<String>,
    pub lines: Vec<TransferLine>,
}

/// Quantity the receiving warehouse acknowledges for one transfer item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct ReceivedLine {
    pub item_id: Uuid,
    #[validate(custom = "validate_positive_decimal")]
    pub quantity_received: Decimal,
}

/// One product line of a loan request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct LoanLine {
    pub product_id: Uuid,
    #[validate(custom = "validate_positive_decimal")]
    pub quantity: Decimal,
    #[validate(custom = "validate_decimal_non_negative")]
    pub amount: Decimal,
    pub unit: SaleUnit,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct IssueLoan {
    pub company_id: Uuid,
    #[validate(length(min = 1, max = 64))]
    pub request_number: String,
    pub customer_id: Uuid,
    #[validate(length(min = 1, max = 128))]
    pub warehouse_name: String,
    pub created_by: Uuid,
    pub lines: Vec<LoanLine>,
}

impl IssueLoan {
    /// Loan lines expressed as sale lines against the loan's warehouse.
    pub fn sale_lines(&self) -> Vec<SaleLine> {
        self.lines
            .iter()
            .map(|line| SaleLine {
                product_id: line.product_id,
                warehouse_name: self.warehouse_name.clone(),
                quantity: line.quantity,
                line_amount: line.amount,
                unit: line.unit,
            })
            .collect()
    }
}

/// Quantity of one loan line coming back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct ReturnLoanItem {
    pub company_id: Uuid,
    pub loan_id: Uuid,
    pub product_id: Uuid,
    #[validate(custom = "validate_positive_decimal")]
    pub quantity_returned: Decimal,
    pub returned_by: Uuid,
    #[validate(length(max = 500))]
    pub note: Option<String>,
}

/// Override for one batch. QUANTITY adjustments read `new_quantity`,
/// VALUE adjustments read `new_value`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct AdjustmentLine {
    pub stock_id: i64,
    #[validate(custom = "validate_decimal_non_negative")]
    pub new_quantity: Option<Decimal>,
    #[validate(custom = "validate_decimal_non_negative")]
    pub new_value: Option<Decimal>,
}

impl AdjustmentLine {
    pub fn quantity(stock_id: i64, new_quantity: Decimal) -> Self {
        Self {
            stock_id,
            new_quantity: Some(new_quantity),
            new_value: None,
        }
    }

    pub fn value(stock_id: i64, new_value: Decimal) -> Self {
        Self {
            stock_id,
            new_quantity: None,
            new_value: Some(new_value),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct NewAdjustment {
    pub company_id: Uuid,
    pub warehouse_id: Uuid,
    pub adjustment_type: AdjustmentType,
    pub created_by: Uuid,
    #[validate(length(max = 500))]
    pub reason: Option<String>,
    pub lines: Vec<AdjustmentLine>,
}

impl NewAdjustment {
    /// Checks that every line carries the field its adjustment type needs.
    pub fn check_lines(&self) -> Result<(), ServiceError> {
        for line in &self.lines {
            let present = match self.adjustment_type {
                AdjustmentType::Quantity => line.new_quantity.is_some(),
                AdjustmentType::Value => line.new_value.is_some(),
            };
            if !present {
                return Err(ServiceError::ValidationError(format!(
                    "{} adjustment line for stock {} is missing its new value",
                    self.adjustment_type, line.stock_id
                )));
            }
        }
        Ok(())
    }
}

/// Stock entering a warehouse from outside the ledger (purchase receipt).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct ReceiveBatch {
    pub company_id: Uuid,
    pub product_id: Uuid,
    pub warehouse_id: Uuid,
    #[validate(custom = "validate_positive_decimal")]
    pub quantity: Decimal,
    /// Per-piece cost; the product's default cost is used when absent.
    #[validate(custom = "validate_decimal_non_negative")]
    pub cost_price: Option<Decimal>,
}

/// Validates a non-empty list of lines, each on its own.
pub fn validate_lines<T: Validate>(lines: &[T]) -> Result<(), ServiceError> {
    if lines.is_empty() {
        return Err(ServiceError::ValidationError(
            "At least one line is required".to_string(),
        ));
    }
    for line in lines {
        line.validate()?;
    }
    Ok(())
}

/// Rejects a call naming the same key twice.
pub fn ensure_unique<K, T, F>(lines: &[T], key: F, what: &str) -> Result<(), ServiceError>
where
    K: Eq + Hash + std::fmt::Display,
    F: Fn(&T) -> K,
{
    let mut seen = HashSet::with_capacity(lines.len());
    for line in lines {
        let k = key(line);
        if seen.contains(&k) {
            return Err(ServiceError::Conflict(format!("duplicate {} {}", what, k)));
        }
        seen.insert(k);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use rust_decimal_macros::dec;

    fn sale(product_id: Uuid, quantity: Decimal) -> SaleLine {
        SaleLine {
            product_id,
            warehouse_name: "Main".to_string(),
            quantity,
            line_amount: dec!(10),
            unit: SaleUnit::Piece,
        }
    }

    #[test]
    fn zero_quantity_is_rejected() {
        let lines = vec![sale(Uuid::new_v4(), Decimal::ZERO)];
        assert_matches!(validate_lines(&lines), Err(ServiceError::ValidationError(_)));
    }

    #[test]
    fn empty_lines_are_rejected() {
        let lines: Vec<SaleLine> = Vec::new();
        assert_matches!(validate_lines(&lines), Err(ServiceError::ValidationError(_)));
    }

    #[test]
    fn duplicate_products_conflict() {
        let product = Uuid::new_v4();
        let lines = vec![sale(product, dec!(1)), sale(product, dec!(2))];
        assert_matches!(
            ensure_unique(&lines, |l| l.product_id, "product"),
            Err(ServiceError::Conflict(_))
        );
    }

    #[test]
    fn references_carry_their_counterpart() {
        let company = Uuid::new_v4();
        assert_eq!(TransactionRef::sale_order(company, Uuid::new_v4(), None).counterpart, None);

        let customer = Uuid::new_v4();
        let loan = TransactionRef::loan_request(company, Uuid::new_v4(), customer);
        assert_eq!(loan.counterpart, Some(Counterpart::customer(customer)));
        assert_ne!(loan.counterpart, Some(Counterpart::supplier(customer)));
    }

    #[test]
    fn value_adjustment_requires_new_value() {
        let adjustment = NewAdjustment {
            company_id: Uuid::new_v4(),
            warehouse_id: Uuid::new_v4(),
            adjustment_type: AdjustmentType::Value,
            created_by: Uuid::new_v4(),
            reason: None,
            lines: vec![AdjustmentLine::quantity(1, dec!(3))],
        };
        assert_matches!(adjustment.check_lines(), Err(ServiceError::ValidationError(_)));
    }
}
