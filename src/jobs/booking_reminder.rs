use crate::{
    entities::{
        booking::{self, BookingStatus, Entity as Booking},
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
pub struct BookingReminderParams {
    pub tenant_id: Option<Uuid>,
    pub secret: Option<String>,
    /// Fixed lookahead: bookings starting this many hours from now (within
    /// a one-hour slice) get a reminder
    pub hours_before: i64,
}

impl Default for BookingReminderParams {
    fn default() -> Self {
        Self {
            tenant_id: None,
            secret: None,
            hours_before: 24,
        }
    }
}

/// Sends one reminder per upcoming booking inside the lookahead slice
/// `[now + hoursBefore, now + hoursBefore + 1h)`. The persisted
/// `reminder_sent` flag is the idempotence guard and is only written after
/// the notification collaborator accepted the send.
pub struct BookingReminderJob {
    ctx: JobContext,
}

impl BookingReminderJob {
    pub const NAME: &'static str = "booking_reminder";

    pub fn new(ctx: JobContext) -> Self {
        Self { ctx }
    }

    #[instrument(skip(self, params))]
    pub async fn run(&self, params: BookingReminderParams) -> Result<JobRunResult, ServiceError> {
        ensure_range("hoursBefore", params.hours_before, 1, 168)?;

        self.ctx
            .run_job(Self::NAME, params.tenant_id, |tenant| {
                self.run_tenant(tenant, &params)
            })
            .await
    }

    async fn run_tenant(
        &self,
        tenant: tenant::Model,
        params: &BookingReminderParams,
    ) -> Result<TenantReport, ServiceError> {
        let window_start = Utc::now() + Duration::hours(params.hours_before);
        let window_end = window_start + Duration::hours(1);

        let upcoming = Booking::find()
            .filter(booking::Column::TenantId.eq(tenant.id))
            .filter(booking::Column::Status.is_in([
                BookingStatus::Pending.to_string(),
                BookingStatus::Confirmed.to_string(),
            ]))
            .filter(booking::Column::ReminderSent.eq(false))
            .filter(booking::Column::StartTime.gte(window_start))
            .filter(booking::Column::StartTime.lt(window_end))
            .all(self.ctx.db.as_ref())
            .await
            .map_err(ServiceError::db_error)?;

        let mut report = TenantReport::default();
        for row in upcoming {
            let row_id = row.id;
            match self.remind(&tenant, row).await {
                Ok(()) => report.success(),
                Err(err) => report.failure(format!("booking {}", row_id), &err),
            }
        }
        Ok(report)
    }

    async fn remind(
        &self,
        tenant: &tenant::Model,
        row: booking::Model,
    ) -> Result<(), ServiceError> {
        let notification = Notification {
            tenant_id: tenant.id,
            kind: NotificationKind::BookingReminder,
            subject: format!("Reminder: {}", row.service_name),
            body: serde_json::json!({
                "booking_id": row.id,
                "customer_id": row.customer_id,
                "service_name": row.service_name,
                "start_time": row.start_time,
            }),
        };
        notify_with_retry(self.ctx.notifier.as_ref(), &notification).await?;

        // Flag only after a successful send; a crashed run re-sends rather
        // than silently dropping the reminder.
        let row_id = row.id;
        let mut active: booking::ActiveModel = row.into();
        active.reminder_sent = Set(true);
        active.updated_at = Set(Utc::now());
        active
            .update(self.ctx.db.as_ref())
            .await
            .map_err(ServiceError::db_error)?;

        self.ctx
            .event_sender
            .send(Event::BookingReminderSent(row_id))
            .await
            .map_err(ServiceError::EventError)?;

        Ok(())
    }
}
