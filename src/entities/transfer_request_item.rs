use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// One transfer line, pinned to an exact source batch.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "transfer_request_items")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub transfer_request_id: Uuid,
    pub product_id: Uuid,
    pub sending_stock_id: i64,
    #[sea_orm(column_type = "Decimal(Some((16, 4)))")]
    pub quantity_transferred: Decimal,
    #[sea_orm(column_type = "Decimal(Some((16, 4)))", nullable)]
    pub quantity_received: Option<Decimal>,
    #[sea_orm(column_type = "Decimal(Some((16, 4)))")]
    pub cost_price: Decimal,
    /// Batch created at the receiving warehouse on confirmation.
    pub received_stock_id: Option<i64>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::transfer_request::Entity",
        from = "Column::TransferRequestId",
        to = "super::transfer_request::Column::Id"
    )]
    TransferRequest,
}

impl Related<super::transfer_request::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::TransferRequest.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
