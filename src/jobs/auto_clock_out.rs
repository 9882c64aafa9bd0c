use crate::{
    entities::{
        attendance::{self, Entity as Attendance},
        tenant,
    },
    errors::ServiceError,
    events::Event,
    jobs::{ensure_range, JobContext, JobRunResult, TenantReport},
    services::audit::actions,
};
use chrono::{Duration, Utc};
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set};
use serde::Deserialize;
use tracing::instrument;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

#[derive(Debug, Clone, Deserialize, IntoParams, ToSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct AutoClockOutParams {
    /// Target tenant; all active tenants when omitted
    pub tenant_id: Option<Uuid>,
    /// Shared trigger secret (consumed by the gateway, not the job)
    pub secret: Option<String>,
    /// Sessions older than this many hours count as forgotten
    pub grace_period_hours: i64,
}

impl Default for AutoClockOutParams {
    fn default() -> Self {
        Self {
            tenant_id: None,
            secret: None,
            grace_period_hours: 12,
        }
    }
}

/// Closes attendance sessions whose owner forgot to clock out: open rows
/// whose clock-in is older than the grace period get `clock_out = now` and
/// the `auto_clock_out` marker. Already-closed rows never match the
/// selection, so re-runs are no-ops.
pub struct AutoClockOutJob {
    ctx: JobContext,
}

impl AutoClockOutJob {
    pub const NAME: &'static str = "auto_clock_out";

    pub fn new(ctx: JobContext) -> Self {
        Self { ctx }
    }

    #[instrument(skip(self, params))]
    pub async fn run(&self, params: AutoClockOutParams) -> Result<JobRunResult, ServiceError> {
        ensure_range("gracePeriodHours", params.grace_period_hours, 1, 72)?;

        self.ctx
            .run_job(Self::NAME, params.tenant_id, |tenant| {
                self.run_tenant(tenant, &params)
            })
            .await
    }

    async fn run_tenant(
        &self,
        tenant: tenant::Model,
        params: &AutoClockOutParams,
    ) -> Result<TenantReport, ServiceError> {
        let cutoff = Utc::now() - Duration::hours(params.grace_period_hours);

        let forgotten = Attendance::find()
            .filter(attendance::Column::TenantId.eq(tenant.id))
            .filter(attendance::Column::ClockOut.is_null())
            .filter(attendance::Column::ClockIn.lt(cutoff))
            .all(self.ctx.db.as_ref())
            .await
            .map_err(ServiceError::db_error)?;

        let mut report = TenantReport::default();
        for row in forgotten {
            let row_id = row.id;
            match self.close_session(&tenant, row).await {
                Ok(()) => report.success(),
                Err(err) => report.failure(format!("attendance {}", row_id), &err),
            }
        }
        Ok(report)
    }

    async fn close_session(
        &self,
        tenant: &tenant::Model,
        row: attendance::Model,
    ) -> Result<(), ServiceError> {
        let now = Utc::now();
        let employee_id = row.employee_id;
        let row_id = row.id;
        let clock_in = row.clock_in;

        let mut active: attendance::ActiveModel = row.into();
        active.clock_out = Set(Some(now));
        active.auto_clock_out = Set(true);
        active
            .update(self.ctx.db.as_ref())
            .await
            .map_err(ServiceError::db_error)?;

        self.ctx
            .audit
            .record(
                tenant.id,
                actions::AUTO_CLOCK_OUT,
                "attendance",
                row_id,
                serde_json::json!({
                    "clock_in": clock_in,
                    "clock_out": now,
                    "employee_id": employee_id,
                }),
                None,
            )
            .await?;

        self.ctx
            .event_sender
            .send(Event::AttendanceAutoClosed(row_id))
            .await
            .map_err(ServiceError::EventError)?;

        Ok(())
    }
}
