use crate::{
    entities::{
        cart::{self, CartStatus, Entity as Cart},
        tenant,
    },
    errors::ServiceError,
    events::Event,
    jobs::{ensure_range, JobContext, JobRunResult, TenantReport},
    services::notifications::{notify_with_retry, Notification, NotificationKind},
};
use chrono::{Duration, Utc};
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set};
use serde::Deserialize;
use tracing::instrument;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

#[derive(Debug, Clone, Deserialize, IntoParams, ToSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct AbandonedCartParams {
    pub tenant_id: Option<Uuid>,
    pub secret: Option<String>,
    /// Saved carts untouched for this many hours count as abandoned
    pub hours_ago: i64,
}

impl Default for AbandonedCartParams {
    fn default() -> Self {
        Self {
            tenant_id: None,
            secret: None,
            hours_ago: 24,
        }
    }
}

/// Reminds customers about saved carts that never became a transaction.
/// One reminder per cart, guarded by the persisted `reminder_sent` flag.
pub struct AbandonedCartJob {
    ctx: JobContext,
}

impl AbandonedCartJob {
    pub const NAME: &'static str = "abandoned_cart";

    pub fn new(ctx: JobContext) -> Self {
        Self { ctx }
    }

    #[instrument(skip(self, params))]
    pub async fn run(&self, params: AbandonedCartParams) -> Result<JobRunResult, ServiceError> {
        ensure_range("hoursAgo", params.hours_ago, 1, 720)?;

        self.ctx
            .run_job(Self::NAME, params.tenant_id, |tenant| {
                self.run_tenant(tenant, &params)
            })
            .await
    }

    async fn run_tenant(
        &self,
        tenant: tenant::Model,
        params: &AbandonedCartParams,
    ) -> Result<TenantReport, ServiceError> {
        let cutoff = Utc::now() - Duration::hours(params.hours_ago);

        let stale = Cart::find()
            .filter(cart::Column::TenantId.eq(tenant.id))
            .filter(cart::Column::Status.eq(CartStatus::Saved.to_string()))
            .filter(cart::Column::ReminderSent.eq(false))
            .filter(cart::Column::UpdatedAt.lt(cutoff))
            .all(self.ctx.db.as_ref())
            .await
            .map_err(ServiceError::db_error)?;

        let mut report = TenantReport::default();
        for row in stale {
            let row_id = row.id;
            match self.remind(&tenant, row).await {
                Ok(()) => report.success(),
                Err(err) => report.failure(format!("cart {}", row_id), &err),
            }
        }
        Ok(report)
    }

    async fn remind(&self, tenant: &tenant::Model, row: cart::Model) -> Result<(), ServiceError> {
        let notification = Notification {
            tenant_id: tenant.id,
            kind: NotificationKind::CartReminder,
            subject: "You left items in your cart".to_string(),
            body: serde_json::json!({
                "cart_id": row.id,
                "customer_id": row.customer_id,
                "subtotal": row.subtotal,
                "saved_at": row.updated_at,
            }),
        };
        notify_with_retry(self.ctx.notifier.as_ref(), &notification).await?;

        let row_id = row.id;
        let mut active: cart::ActiveModel = row.into();
        active.reminder_sent = Set(true);
        active
            .update(self.ctx.db.as_ref())
            .await
            .map_err(ServiceError::db_error)?;

        self.ctx
            .event_sender
            .send(Event::CartReminderSent(row_id))
            .await
            .map_err(ServiceError::EventError)?;

        Ok(())
    }
}
