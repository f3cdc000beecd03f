use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Kind of transaction a batch was drawn for.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize, strum::Display,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
pub enum ReferenceType {
    #[sea_orm(string_value = "SALE_ORDER")]
    #[strum(serialize = "SALE_ORDER")]
    SaleOrder,
    #[sea_orm(string_value = "LOAN_REQUEST")]
    #[strum(serialize = "LOAN_REQUEST")]
    LoanRequest,
}

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize, strum::Display,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
pub enum CounterpartType {
    #[sea_orm(string_value = "CUSTOMER")]
    #[strum(serialize = "CUSTOMER")]
    Customer,
    #[sea_orm(string_value = "SUPPLIER")]
    #[strum(serialize = "SUPPLIER")]
    Supplier,
}

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize, strum::Display,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
pub enum BatchLogStatus {
    /// Reserved against an in-flight transaction.
    #[sea_orm(string_value = "PENDING")]
    #[strum(serialize = "PENDING")]
    Pending,
}

/// Unit a line was sold or loaned in.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize, strum::Display,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(8))")]
pub enum SaleUnit {
    #[sea_orm(string_value = "PIECE")]
    #[strum(serialize = "PIECE")]
    Piece,
    #[sea_orm(string_value = "PACK")]
    #[strum(serialize = "PACK")]
    Pack,
}

/// Audit entry written each time a batch is drawn from.
///
/// Immutable apart from `status`, and `quantity` while a pending
/// reservation is handed back in part.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "batch_logs")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub company_id: Uuid,
    pub stock_id: i64,
    pub product_id: Uuid,
    pub warehouse_id: Uuid,
    #[sea_orm(column_type = "Decimal(Some((16, 4)))")]
    pub quantity: Decimal,
    /// Share of the line amount attributed to this draw, rounded to 2 places.
    #[sea_orm(column_type = "Decimal(Some((16, 4)))")]
    pub selling_price: Decimal,
    #[sea_orm(column_type = "Decimal(Some((16, 4)))")]
    pub cost_price_piece: Decimal,
    #[sea_orm(column_type = "Decimal(Some((16, 4)))")]
    pub cost_price_pack: Decimal,
    /// Cost per unit in the line's sale unit.
    #[sea_orm(column_type = "Decimal(Some((16, 4)))")]
    pub unit_cost: Decimal,
    pub unit: SaleUnit,
    pub reference_type: ReferenceType,
    pub reference_id: Uuid,
    pub counterpart_type: Option<CounterpartType>,
    pub counterpart_id: Option<Uuid>,
    pub status: Option<BatchLogStatus>,
    pub created_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::stock::Entity",
        from = "Column::StockId",
        to = "super::stock::Column::Id"
    )]
    Stock,
}

impl Related<super::stock::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Stock.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
