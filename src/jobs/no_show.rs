use crate::{
    entities::{
        booking::{self, BookingStatus, Entity as Booking},
        tenant,
    },
    errors::ServiceError,
    events::Event,
    jobs::{ensure_range, JobContext, JobRunResult, TenantReport},
};
use chrono::{Duration, Utc};
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set};
use serde::Deserialize;
use tracing::instrument;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

#[derive(Debug, Clone, Deserialize, IntoParams, ToSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct NoShowParams {
    pub tenant_id: Option<Uuid>,
    pub secret: Option<String>,
    /// Minutes past the booking start before it counts as a no-show
    pub grace_period_minutes: i64,
}

impl Default for NoShowParams {
    fn default() -> Self {
        Self {
            tenant_id: None,
            secret: None,
            grace_period_minutes: 15,
        }
    }
}

/// Marks bookings whose start time passed without a check-in as `no_show`.
/// The status transition is the idempotence guard: a second run over the
/// same window selects nothing.
pub struct NoShowJob {
    ctx: JobContext,
}

impl NoShowJob {
    pub const NAME: &'static str = "no_show";

    pub fn new(ctx: JobContext) -> Self {
        Self { ctx }
    }

    #[instrument(skip(self, params))]
    pub async fn run(&self, params: NoShowParams) -> Result<JobRunResult, ServiceError> {
        ensure_range("gracePeriodMinutes", params.grace_period_minutes, 1, 1440)?;

        self.ctx
            .run_job(Self::NAME, params.tenant_id, |tenant| {
                self.run_tenant(tenant, &params)
            })
            .await
    }

    async fn run_tenant(
        &self,
        tenant: tenant::Model,
        params: &NoShowParams,
    ) -> Result<TenantReport, ServiceError> {
        let cutoff = Utc::now() - Duration::minutes(params.grace_period_minutes);

        let overdue = Booking::find()
            .filter(booking::Column::TenantId.eq(tenant.id))
            .filter(booking::Column::Status.is_in([
                BookingStatus::Pending.to_string(),
                BookingStatus::Confirmed.to_string(),
            ]))
            .filter(booking::Column::StartTime.lt(cutoff))
            .all(self.ctx.db.as_ref())
            .await
            .map_err(ServiceError::db_error)?;

        let mut report = TenantReport::default();
        for row in overdue {
            let row_id = row.id;
            match self.mark_no_show(row).await {
                Ok(()) => report.success(),
                Err(err) => report.failure(format!("booking {}", row_id), &err),
            }
        }
        Ok(report)
    }

    async fn mark_no_show(&self, row: booking::Model) -> Result<(), ServiceError> {
        let row_id = row.id;

        let mut active: booking::ActiveModel = row.into();
        active.status = Set(BookingStatus::NoShow.to_string());
        active.updated_at = Set(Utc::now());
        active
            .update(self.ctx.db.as_ref())
            .await
            .map_err(ServiceError::db_error)?;

        self.ctx
            .event_sender
            .send(Event::BookingMarkedNoShow(row_id))
            .await
            .map_err(ServiceError::EventError)?;

        Ok(())
    }
}
