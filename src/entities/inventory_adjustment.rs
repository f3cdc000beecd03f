use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize, strum::Display,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
pub enum AdjustmentType {
    #[sea_orm(string_value = "QUANTITY")]
    #[strum(serialize = "QUANTITY")]
    Quantity,
    /// Audit-only: recorded without touching any quantity field.
    #[sea_orm(string_value = "VALUE")]
    #[strum(serialize = "VALUE")]
    Value,
}

/// Immutable audit of a manual stock override.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "inventory_adjustments")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub company_id: Uuid,
    pub warehouse_id: Uuid,
    pub adjustment_type: AdjustmentType,
    pub created_by: Uuid,
    pub reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::inventory_adjustment_line::Entity")]
    Lines,
}

impl Related<super::inventory_adjustment_line::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Lines.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
