use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Transfer request status.
///
/// `PENDING → APPROVED → CONFIRM` or `PENDING → REJECT`. Editing any
/// non-confirmed request returns it to `PENDING`.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize, strum::Display,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
pub enum TransferStatus {
    #[sea_orm(string_value = "PENDING")]
    #[strum(serialize = "PENDING")]
    Pending,
    #[sea_orm(string_value = "APPROVED")]
    #[strum(serialize = "APPROVED")]
    Approved,
    #[sea_orm(string_value = "REJECT")]
    #[strum(serialize = "REJECT")]
    Reject,
    #[sea_orm(string_value = "CONFIRM")]
    #[strum(serialize = "CONFIRM")]
    Confirm,
}

impl TransferStatus {
    pub fn can_approve(&self) -> bool {
        matches!(self, TransferStatus::Pending)
    }

    pub fn can_reject(&self) -> bool {
        matches!(self, TransferStatus::Pending)
    }

    pub fn can_confirm(&self) -> bool {
        matches!(self, TransferStatus::Approved)
    }

    pub fn can_edit(&self) -> bool {
        !matches!(self, TransferStatus::Confirm)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "transfer_requests")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub company_id: Uuid,
    pub request_number: String,
    pub sending_warehouse_id: Uuid,
    pub receiving_warehouse_id: Uuid,
    pub status: TransferStatus,
    pub requested_by: Uuid,
    pub approved_by: Option<Uuid>,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::transfer_request_item::Entity")]
    Items,
}

impl Related<super::transfer_request_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Items.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
