use crate::{
    entities::{
        branch_change::{self, Entity as BranchChange, SyncEntityType},
        customer::{self, Entity as Customer},
        discount_rule::{self, Entity as DiscountRule},
        product::{self, Entity as Product},
        sync_conflict::{self, ConflictStatus},
        tenant,
    },
    errors::ServiceError,
    events::Event,
    jobs::{JobContext, JobRunResult, TenantReport},
    services::audit::actions,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use tracing::instrument;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "kebab-case")]
pub enum SyncPolicy {
    LastWriteWins,
    Manual,
}

#[derive(Debug, Clone, Deserialize, IntoParams, ToSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct BranchSyncParams {
    pub tenant_id: Option<Uuid>,
    pub secret: Option<String>,
    /// `last-write-wins` merges automatically; `manual` leaves conflicts
    pub policy: SyncPolicy,
}

impl Default for BranchSyncParams {
    fn default() -> Self {
        Self {
            tenant_id: None,
            secret: None,
            policy: SyncPolicy::LastWriteWins,
        }
    }
}

/// What to do with one reported branch change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeDecision {
    /// Branch copy wins; merge its payload into the central document
    Apply,
    /// Central copy wins; consume the change without merging
    Discard,
    /// Leave a conflict record for human resolution
    Conflict,
}

/// Deterministic merge decision. On an exact timestamp tie the central copy
/// wins, so replaying the same change set always converges to the same
/// state. Under `manual`, an identical timestamp means the versions do not
/// diverge and there is nothing to resolve.
pub fn decide(
    policy: SyncPolicy,
    branch_updated_at: DateTime<Utc>,
    central_updated_at: DateTime<Utc>,
) -> MergeDecision {
    match policy {
        SyncPolicy::LastWriteWins => {
            if branch_updated_at > central_updated_at {
                MergeDecision::Apply
            } else {
                MergeDecision::Discard
            }
        }
        SyncPolicy::Manual => {
            if branch_updated_at == central_updated_at {
                MergeDecision::Discard
            } else {
                MergeDecision::Conflict
            }
        }
    }
}

// Branch payloads are partial documents; absent fields leave the central
// copy untouched. Stock never syncs this way: it only moves through the
// ledger.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct ProductPatch {
    name: Option<String>,
    sku: Option<String>,
    price: Option<Decimal>,
    base_price: Option<Decimal>,
    is_active: Option<bool>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct CustomerPatch {
    name: Option<String>,
    email: Option<String>,
    phone: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct DiscountPatch {
    value: Option<Decimal>,
    min_purchase_amount: Option<Decimal>,
    max_discount_amount: Option<Decimal>,
    usage_limit: Option<i32>,
    valid_from: Option<DateTime<Utc>>,
    valid_until: Option<DateTime<Utc>>,
    is_active: Option<bool>,
}

/// Drains the unapplied branch-change queue in deterministic order
/// (ascending branch timestamp, then branch id) and merges or flags each
/// change per the configured policy. The `applied` flag is the idempotence
/// guard: a consumed change never replays.
pub struct BranchSyncJob {
    ctx: JobContext,
}

impl BranchSyncJob {
    pub const NAME: &'static str = "branch_sync";

    pub fn new(ctx: JobContext) -> Self {
        Self { ctx }
    }

    #[instrument(skip(self, params))]
    pub async fn run(&self, params: BranchSyncParams) -> Result<JobRunResult, ServiceError> {
        self.ctx
            .run_job(Self::NAME, params.tenant_id, |tenant| {
                self.run_tenant(tenant, &params)
            })
            .await
    }

    async fn run_tenant(
        &self,
        tenant: tenant::Model,
        params: &BranchSyncParams,
    ) -> Result<TenantReport, ServiceError> {
        let pending = BranchChange::find()
            .filter(branch_change::Column::TenantId.eq(tenant.id))
            .filter(branch_change::Column::Applied.eq(false))
            .order_by_asc(branch_change::Column::BranchUpdatedAt)
            .order_by_asc(branch_change::Column::BranchId)
            .all(self.ctx.db.as_ref())
            .await
            .map_err(ServiceError::db_error)?;

        let mut report = TenantReport::default();
        for change in pending {
            let change_id = change.id;
            match self.sync_change(&tenant, change, params.policy).await {
                Ok(counted) => {
                    if counted {
                        report.success();
                    }
                }
                Err(err) => report.failure(format!("change {}", change_id), &err),
            }
        }
        Ok(report)
    }

    /// Returns whether the change counted as a processed unit (merges and
    /// flagged conflicts do; quiet discards do not).
    async fn sync_change(
        &self,
        tenant: &tenant::Model,
        change: branch_change::Model,
        policy: SyncPolicy,
    ) -> Result<bool, ServiceError> {
        let entity_type = SyncEntityType::from_str(&change.entity_type).map_err(|_| {
            ServiceError::ValidationError(format!("unknown entity type {}", change.entity_type))
        })?;

        let central_updated_at = self.central_updated_at(tenant, entity_type, change.entity_id).await?;

        match decide(policy, change.branch_updated_at, central_updated_at) {
            MergeDecision::Apply => {
                self.apply_payload(tenant, entity_type, &change).await?;
                self.ctx
                    .audit
                    .record(
                        tenant.id,
                        actions::BRANCH_MERGE,
                        &change.entity_type,
                        change.entity_id,
                        serde_json::json!({
                            "branch_id": change.branch_id,
                            "branch_updated_at": change.branch_updated_at,
                            "payload": change.payload,
                        }),
                        None,
                    )
                    .await?;
                self.ctx
                    .event_sender
                    .send(Event::BranchChangeMerged {
                        tenant_id: tenant.id,
                        entity_type: change.entity_type.clone(),
                        entity_id: change.entity_id,
                    })
                    .await
                    .map_err(ServiceError::EventError)?;
                self.mark_applied(change).await?;
                Ok(true)
            }
            MergeDecision::Discard => {
                self.mark_applied(change).await?;
                Ok(false)
            }
            MergeDecision::Conflict => {
                let conflict = sync_conflict::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    tenant_id: Set(tenant.id),
                    branch_id: Set(change.branch_id),
                    entity_type: Set(change.entity_type.clone()),
                    entity_id: Set(change.entity_id),
                    branch_payload: Set(change.payload.clone()),
                    branch_updated_at: Set(change.branch_updated_at),
                    central_updated_at: Set(central_updated_at),
                    status: Set(ConflictStatus::Open.to_string()),
                    created_at: Set(Utc::now()),
                };
                conflict
                    .insert(self.ctx.db.as_ref())
                    .await
                    .map_err(ServiceError::db_error)?;

                self.ctx
                    .event_sender
                    .send(Event::SyncConflictDetected {
                        tenant_id: tenant.id,
                        entity_type: change.entity_type.clone(),
                        entity_id: change.entity_id,
                    })
                    .await
                    .map_err(ServiceError::EventError)?;
                self.mark_applied(change).await?;
                Ok(true)
            }
        }
    }

    async fn central_updated_at(
        &self,
        tenant: &tenant::Model,
        entity_type: SyncEntityType,
        entity_id: Uuid,
    ) -> Result<DateTime<Utc>, ServiceError> {
        let db = self.ctx.db.as_ref();
        let updated_at = match entity_type {
            SyncEntityType::Product => Product::find_by_id(entity_id)
                .filter(product::Column::TenantId.eq(tenant.id))
                .one(db)
                .await
                .map_err(ServiceError::db_error)?
                .map(|m| m.updated_at),
            SyncEntityType::Customer => Customer::find_by_id(entity_id)
                .filter(customer::Column::TenantId.eq(tenant.id))
                .one(db)
                .await
                .map_err(ServiceError::db_error)?
                .map(|m| m.updated_at),
            SyncEntityType::Discount => DiscountRule::find_by_id(entity_id)
                .filter(discount_rule::Column::TenantId.eq(tenant.id))
                .one(db)
                .await
                .map_err(ServiceError::db_error)?
                .map(|m| m.updated_at),
        };

        updated_at.ok_or_else(|| {
            ServiceError::NotFound(format!(
                "{} {} not found for tenant {}",
                entity_type, entity_id, tenant.id
            ))
        })
    }

    async fn apply_payload(
        &self,
        tenant: &tenant::Model,
        entity_type: SyncEntityType,
        change: &branch_change::Model,
    ) -> Result<(), ServiceError> {
        let db = self.ctx.db.as_ref();

        match entity_type {
            SyncEntityType::Product => {
                let patch: ProductPatch = serde_json::from_value(change.payload.clone())
                    .map_err(|e| ServiceError::ValidationError(format!("bad payload: {}", e)))?;
                let model = Product::find_by_id(change.entity_id)
                    .filter(product::Column::TenantId.eq(tenant.id))
                    .one(db)
                    .await
                    .map_err(ServiceError::db_error)?
                    .ok_or_else(|| {
                        ServiceError::NotFound(format!("product {} not found", change.entity_id))
                    })?;

                let mut active: product::ActiveModel = model.into();
                if let Some(name) = patch.name {
                    active.name = Set(name);
                }
                if let Some(sku) = patch.sku {
                    active.sku = Set(sku);
                }
                if let Some(price) = patch.price {
                    active.price = Set(price);
                }
                if let Some(base_price) = patch.base_price {
                    active.base_price = Set(base_price);
                }
                if let Some(is_active) = patch.is_active {
                    active.is_active = Set(is_active);
                }
                active.needs_sync = Set(false);
                active.updated_at = Set(change.branch_updated_at);
                active.update(db).await.map_err(ServiceError::db_error)?;
            }
            SyncEntityType::Customer => {
                let patch: CustomerPatch = serde_json::from_value(change.payload.clone())
                    .map_err(|e| ServiceError::ValidationError(format!("bad payload: {}", e)))?;
                let model = Customer::find_by_id(change.entity_id)
                    .filter(customer::Column::TenantId.eq(tenant.id))
                    .one(db)
                    .await
                    .map_err(ServiceError::db_error)?
                    .ok_or_else(|| {
                        ServiceError::NotFound(format!("customer {} not found", change.entity_id))
                    })?;

                let mut active: customer::ActiveModel = model.into();
                if let Some(name) = patch.name {
                    active.name = Set(name);
                }
                if let Some(email) = patch.email {
                    active.email = Set(Some(email));
                }
                if let Some(phone) = patch.phone {
                    active.phone = Set(Some(phone));
                }
                active.needs_sync = Set(false);
                active.updated_at = Set(change.branch_updated_at);
                active.update(db).await.map_err(ServiceError::db_error)?;
            }
            SyncEntityType::Discount => {
                let patch: DiscountPatch = serde_json::from_value(change.payload.clone())
                    .map_err(|e| ServiceError::ValidationError(format!("bad payload: {}", e)))?;
                let model = DiscountRule::find_by_id(change.entity_id)
                    .filter(discount_rule::Column::TenantId.eq(tenant.id))
                    .one(db)
                    .await
                    .map_err(ServiceError::db_error)?
                    .ok_or_else(|| {
                        ServiceError::NotFound(format!("discount {} not found", change.entity_id))
                    })?;

                let mut active: discount_rule::ActiveModel = model.into();
                if let Some(value) = patch.value {
                    active.value = Set(value);
                }
                if let Some(min) = patch.min_purchase_amount {
                    active.min_purchase_amount = Set(Some(min));
                }
                if let Some(max) = patch.max_discount_amount {
                    active.max_discount_amount = Set(Some(max));
                }
                if let Some(limit) = patch.usage_limit {
                    active.usage_limit = Set(Some(limit));
                }
                if let Some(from) = patch.valid_from {
                    active.valid_from = Set(from);
                }
                if let Some(until) = patch.valid_until {
                    active.valid_until = Set(until);
                }
                if let Some(is_active) = patch.is_active {
                    active.is_active = Set(is_active);
                }
                active.needs_sync = Set(false);
                active.updated_at = Set(change.branch_updated_at);
                active.update(db).await.map_err(ServiceError::db_error)?;
            }
        }

        Ok(())
    }

    async fn mark_applied(&self, change: branch_change::Model) -> Result<(), ServiceError> {
        let mut active: branch_change::ActiveModel = change.into();
        active.applied = Set(true);
        active
            .update(self.ctx.db.as_ref())
            .await
            .map_err(ServiceError::db_error)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn last_write_wins_picks_latest() {
        let central = Utc::now();
        let newer = central + Duration::seconds(1);
        let older = central - Duration::seconds(1);

        assert_eq!(
            decide(SyncPolicy::LastWriteWins, newer, central),
            MergeDecision::Apply
        );
        assert_eq!(
            decide(SyncPolicy::LastWriteWins, older, central),
            MergeDecision::Discard
        );
    }

    #[test]
    fn equal_timestamps_keep_the_central_copy() {
        let t = Utc::now();
        assert_eq!(
            decide(SyncPolicy::LastWriteWins, t, t),
            MergeDecision::Discard
        );
    }

    #[test]
    fn manual_flags_any_divergence() {
        let central = Utc::now();
        let newer = central + Duration::seconds(1);
        let older = central - Duration::seconds(1);

        assert_eq!(
            decide(SyncPolicy::Manual, newer, central),
            MergeDecision::Conflict
        );
        assert_eq!(
            decide(SyncPolicy::Manual, older, central),
            MergeDecision::Conflict
        );
        // Identical versions have nothing to resolve
        assert_eq!(
            decide(SyncPolicy::Manual, central, central),
            MergeDecision::Discard
        );
    }
}
