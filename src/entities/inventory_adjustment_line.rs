use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize, strum::Display,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
pub enum ChangeType {
    #[sea_orm(string_value = "increase")]
    #[strum(serialize = "increase")]
    Increase,
    #[sea_orm(string_value = "decrease")]
    #[strum(serialize = "decrease")]
    Decrease,
    #[sea_orm(string_value = "unchanged")]
    #[strum(serialize = "unchanged")]
    Unchanged,
}

impl ChangeType {
    pub fn classify(delta: Decimal) -> Self {
        if delta > Decimal::ZERO {
            ChangeType::Increase
        } else if delta < Decimal::ZERO {
            ChangeType::Decrease
        } else {
            ChangeType::Unchanged
        }
    }
}

/// Before/after context for one adjusted batch.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "inventory_adjustment_lines")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub adjustment_id: Uuid,
    pub stock_id: i64,
    pub product_id: Uuid,
    #[sea_orm(column_type = "Decimal(Some((16, 4)))")]
    pub previous_quantity: Decimal,
    #[sea_orm(column_type = "Decimal(Some((16, 4)))")]
    pub new_quantity: Decimal,
    #[sea_orm(column_type = "Decimal(Some((16, 4)))")]
    pub delta: Decimal,
    pub change_type: ChangeType,
    #[sea_orm(column_type = "Decimal(Some((16, 4)))", nullable)]
    pub previous_value: Option<Decimal>,
    #[sea_orm(column_type = "Decimal(Some((16, 4)))", nullable)]
    pub new_value: Option<Decimal>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::inventory_adjustment::Entity",
        from = "Column::AdjustmentId",
        to = "super::inventory_adjustment::Column::Id"
    )]
    Adjustment,
}

impl Related<super::inventory_adjustment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Adjustment.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn classifies_by_sign() {
        assert_eq!(ChangeType::classify(dec!(-5)), ChangeType::Decrease);
        assert_eq!(ChangeType::classify(dec!(2.5)), ChangeType::Increase);
        assert_eq!(ChangeType::classify(Decimal::ZERO), ChangeType::Unchanged);
    }
}
