use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Snapshot of a loan line right after a return event.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "loan_return_lines")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub loan_return_id: Uuid,
    pub loan_request_item_id: Uuid,
    pub product_id: Uuid,
    /// Quantity returned by this event.
    #[sea_orm(column_type = "Decimal(Some((16, 4)))")]
    pub quantity: Decimal,
    #[sea_orm(column_type = "Decimal(Some((16, 4)))")]
    pub quantity_transferred: Decimal,
    #[sea_orm(column_type = "Decimal(Some((16, 4)))")]
    pub quantity_returned: Decimal,
    #[sea_orm(column_type = "Decimal(Some((16, 4)))")]
    pub quantity_remaining_to_return: Decimal,
    #[sea_orm(column_type = "Decimal(Some((16, 4)))")]
    pub balance_quantity: Decimal,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::loan_return::Entity",
        from = "Column::LoanReturnId",
        to = "super::loan_return::Column::Id"
    )]
    LoanReturn,
}

impl Related<super::loan_return::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::LoanReturn.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
