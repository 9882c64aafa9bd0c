use crate::{
    db::DbPool,
    entities::audit_log::{self, Entity as AuditLog},
    errors::ServiceError,
};
use chrono::Utc;
use sea_orm::{ActiveModelTrait, Set};
use std::sync::Arc;
use uuid::Uuid;

/// Well-known audit actions written by the core. The log also carries
/// actions recorded by the surrounding application (e.g. `failed_login`,
/// `discount_applied`) that the suspicious-activity sweep reads back.
pub mod actions {
    pub const STOCK_ADJUSTED: &str = "stock_adjusted";
    pub const PRICE_CHANGED: &str = "price_changed";
    pub const AUTO_CLOCK_OUT: &str = "auto_clock_out";
    pub const BRANCH_MERGE: &str = "branch_merge";
    pub const DISCOUNT_APPLIED: &str = "discount_applied";
    pub const FAILED_LOGIN: &str = "failed_login";
}

/// Append-only audit trail. Rows are write-once; there is no update path.
#[derive(Clone)]
pub struct AuditTrail {
    db: Arc<DbPool>,
}

impl AuditTrail {
    pub fn new(db: Arc<DbPool>) -> Self {
        Self { db }
    }

    pub async fn record(
        &self,
        tenant_id: Uuid,
        action: &str,
        entity_type: &str,
        entity_id: Uuid,
        changes: serde_json::Value,
        actor: Option<Uuid>,
    ) -> Result<audit_log::Model, ServiceError> {
        let entry = audit_log::ActiveModel {
            id: Set(Uuid::new_v4()),
            tenant_id: Set(tenant_id),
            action: Set(action.to_string()),
            entity_type: Set(entity_type.to_string()),
            entity_id: Set(entity_id),
            changes: Set(changes),
            actor: Set(actor),
            created_at: Set(Utc::now()),
        };

        entry
            .insert(self.db.as_ref())
            .await
            .map_err(ServiceError::db_error)
    }
}
