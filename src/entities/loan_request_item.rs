use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::batch_log::SaleUnit;

/// One loaned product line.
///
/// Invariants: `quantity_returned <= quantity_transferred` and
/// `balance_quantity == quantity_remaining_to_return ==
/// quantity_transferred - quantity_returned`.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "loan_request_items")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub loan_request_id: Uuid,
    pub product_id: Uuid,
    pub unit: SaleUnit,
    #[sea_orm(column_type = "Decimal(Some((16, 4)))")]
    pub quantity_transferred: Decimal,
    #[sea_orm(column_type = "Decimal(Some((16, 4)))")]
    pub quantity_returned: Decimal,
    #[sea_orm(column_type = "Decimal(Some((16, 4)))")]
    pub quantity_remaining_to_return: Decimal,
    #[sea_orm(column_type = "Decimal(Some((16, 4)))")]
    pub balance_quantity: Decimal,
    #[sea_orm(column_type = "Decimal(Some((16, 4)))")]
    pub amount: Decimal,
}

impl Model {
    pub fn is_fully_returned(&self) -> bool {
        self.quantity_returned >= self.quantity_transferred
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::loan_request::Entity",
        from = "Column::LoanRequestId",
        to = "super::loan_request::Column::Id"
    )]
    LoanRequest,
}

impl Related<super::loan_request::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::LoanRequest.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
