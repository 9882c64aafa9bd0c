use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Entity kinds a branch can report changes for.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display, strum::EnumString,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum SyncEntityType {
    Product,
    Customer,
    Discount,
}

/// A change a branch reported since its last sync: the dirty queue the
/// multi-branch sync job drains. `payload` is the branch's full copy of the
/// document; `branch_updated_at` is the branch-side modification time used
/// for last-write-wins comparison.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "branch_changes")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub branch_id: Uuid,
    pub entity_type: String,
    pub entity_id: Uuid,
    pub payload: Json,
    pub branch_updated_at: DateTime<Utc>,
    pub applied: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
