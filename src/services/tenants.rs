use crate::{
    db::DbPool,
    entities::tenant::{self, Entity as Tenant},
    errors::ServiceError,
};
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QueryOrder};
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

/// Tenant lookups shared by every automation job. Tenant scoping is a
/// logical partition: every query the core runs is keyed by a tenant id
/// resolved here.
#[derive(Clone)]
pub struct TenantDirectory {
    db: Arc<DbPool>,
}

impl TenantDirectory {
    pub fn new(db: Arc<DbPool>) -> Self {
        Self { db }
    }

    /// All active tenants, in stable id order.
    #[instrument(skip(self))]
    pub async fn active_tenants(&self) -> Result<Vec<tenant::Model>, ServiceError> {
        Tenant::find()
            .filter(tenant::Column::IsActive.eq(true))
            .order_by_asc(tenant::Column::Id)
            .all(self.db.as_ref())
            .await
            .map_err(ServiceError::db_error)
    }

    /// A single tenant, which must exist and be active.
    #[instrument(skip(self))]
    pub async fn get_active(&self, tenant_id: Uuid) -> Result<tenant::Model, ServiceError> {
        let tenant = Tenant::find_by_id(tenant_id)
            .one(self.db.as_ref())
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::NotFound(format!("Tenant {} not found", tenant_id)))?;

        if !tenant.is_active {
            return Err(ServiceError::TenantInactive(tenant_id));
        }
        Ok(tenant)
    }

    /// Resolves a job's target set: a named tenant (must be active) or every
    /// active tenant when omitted.
    pub async fn resolve(
        &self,
        tenant_id: Option<Uuid>,
    ) -> Result<Vec<tenant::Model>, ServiceError> {
        match tenant_id {
            Some(id) => Ok(vec![self.get_active(id).await?]),
            None => self.active_tenants().await,
        }
    }
}
