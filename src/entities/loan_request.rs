use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize, strum::Display,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
pub enum LoanStatus {
    #[sea_orm(string_value = "PENDING")]
    #[strum(serialize = "PENDING")]
    Pending,
    #[sea_orm(string_value = "APPROVED")]
    #[strum(serialize = "APPROVED")]
    Approved,
    #[sea_orm(string_value = "REJECT")]
    #[strum(serialize = "REJECT")]
    Reject,
    #[sea_orm(string_value = "RETURNED")]
    #[strum(serialize = "RETURNED")]
    Returned,
    #[sea_orm(string_value = "PART_RETURNED")]
    #[strum(serialize = "PART_RETURNED")]
    PartReturned,
    #[sea_orm(string_value = "CLOSED")]
    #[strum(serialize = "CLOSED")]
    Closed,
}

impl LoanStatus {
    /// Whether goods may still come back against this loan.
    pub fn accepts_returns(&self) -> bool {
        matches!(self, LoanStatus::Approved | LoanStatus::PartReturned)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "loan_requests")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub company_id: Uuid,
    pub request_number: String,
    pub customer_id: Uuid,
    pub warehouse_id: Uuid,
    pub status: LoanStatus,
    pub created_by: Uuid,
    pub approved_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::loan_request_item::Entity")]
    Items,
    #[sea_orm(has_many = "super::loan_return::Entity")]
    Returns,
}

impl Related<super::loan_request_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Items.def()
    }
}

impl Related<super::loan_return::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Returns.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
