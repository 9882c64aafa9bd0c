use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display, strum::EnumString,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TaxAppliesTo {
    All,
    Products,
    Services,
    Categories,
}

/// Tax rule. `category_ids`/`product_ids` are JSON arrays of UUIDs; when
/// non-empty they override the coarse `applies_to` predicate.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "tax_rules")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub rate: Decimal,
    pub label: String,
    pub applies_to: String,
    pub category_ids: Json,
    pub product_ids: Json,
    pub priority: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl Model {
    pub fn category_ids(&self) -> Vec<Uuid> {
        serde_json::from_value(self.category_ids.clone()).unwrap_or_default()
    }

    pub fn product_ids(&self) -> Vec<Uuid> {
        serde_json::from_value(self.product_ids.clone()).unwrap_or_default()
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
