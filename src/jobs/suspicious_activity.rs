use crate::{
    entities::{
        audit_log::{self, Entity as AuditLog},
        cash_drawer_session::{self, DrawerStatus, Entity as CashDrawerSession},
        pos_transaction::{self, Entity as PosTransaction, TransactionStatus},
        security_alert::{self, Entity as SecurityAlert},
        tenant,
    },
    errors::ServiceError,
    events::Event,
    jobs::{ensure_range, JobContext, JobRunResult, TenantReport},
    services::audit::actions,
    services::notifications::{notify_with_retry, Notification, NotificationKind},
};
use chrono::{DateTime, Duration, Utc};
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set};
use serde::Deserialize;
use std::collections::HashMap;
use tracing::instrument;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

#[derive(Debug, Clone, Deserialize, IntoParams, ToSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct SuspiciousActivityParams {
    pub tenant_id: Option<Uuid>,
    pub secret: Option<String>,
    /// Trailing window the counters run over
    pub window_hours: i64,
}

impl Default for SuspiciousActivityParams {
    fn default() -> Self {
        Self {
            tenant_id: None,
            secret: None,
            window_hours: 24,
        }
    }
}

/// Alert categories the sweep can raise.
pub mod alert_types {
    pub const EXCESSIVE_REFUNDS: &str = "excessive_refunds";
    pub const EXCESSIVE_VOIDS: &str = "excessive_voids";
    pub const EXCESSIVE_DISCOUNTS: &str = "excessive_discounts";
    pub const FAILED_LOGINS: &str = "failed_logins";
    pub const CASH_VARIANCE: &str = "cash_variance";
}

/// Counts refunds, voids, applied discounts and failed logins per actor in
/// the trailing window, plus closed drawer sessions with an out-of-band
/// cash variance. Breaches become insert-only security alerts; business
/// data is never mutated. An existing alert of the same type for the actor
/// inside the window suppresses a duplicate.
pub struct SuspiciousActivityJob {
    ctx: JobContext,
}

impl SuspiciousActivityJob {
    pub const NAME: &'static str = "suspicious_activity";

    pub fn new(ctx: JobContext) -> Self {
        Self { ctx }
    }

    #[instrument(skip(self, params))]
    pub async fn run(&self, params: SuspiciousActivityParams) -> Result<JobRunResult, ServiceError> {
        ensure_range("windowHours", params.window_hours, 1, 168)?;

        self.ctx
            .run_job(Self::NAME, params.tenant_id, |tenant| {
                self.run_tenant(tenant, &params)
            })
            .await
    }

    async fn run_tenant(
        &self,
        tenant: tenant::Model,
        params: &SuspiciousActivityParams,
    ) -> Result<TenantReport, ServiceError> {
        let db = self.ctx.db.as_ref();
        let fraud = &self.ctx.config.fraud;
        let window_end = Utc::now();
        let window_start = window_end - Duration::hours(params.window_hours);

        // Refunds and voids come from finalized transactions.
        let transactions = PosTransaction::find()
            .filter(pos_transaction::Column::TenantId.eq(tenant.id))
            .filter(pos_transaction::Column::CreatedAt.gte(window_start))
            .filter(pos_transaction::Column::Status.is_in([
                TransactionStatus::Refunded.to_string(),
                TransactionStatus::Voided.to_string(),
            ]))
            .all(db)
            .await
            .map_err(ServiceError::db_error)?;

        let mut refunds: HashMap<Uuid, u64> = HashMap::new();
        let mut voids: HashMap<Uuid, u64> = HashMap::new();
        for txn in &transactions {
            if txn.status == TransactionStatus::Refunded.to_string() {
                *refunds.entry(txn.cashier_id).or_default() += 1;
            } else {
                *voids.entry(txn.cashier_id).or_default() += 1;
            }
        }

        // Discounts applied and failed logins come from the audit trail.
        let audit_rows = AuditLog::find()
            .filter(audit_log::Column::TenantId.eq(tenant.id))
            .filter(audit_log::Column::CreatedAt.gte(window_start))
            .filter(
                audit_log::Column::Action
                    .is_in([actions::DISCOUNT_APPLIED, actions::FAILED_LOGIN]),
            )
            .all(db)
            .await
            .map_err(ServiceError::db_error)?;

        let mut discounts: HashMap<Uuid, u64> = HashMap::new();
        let mut failed_logins: HashMap<Uuid, u64> = HashMap::new();
        for row in &audit_rows {
            let Some(actor) = row.actor else { continue };
            if row.action == actions::DISCOUNT_APPLIED {
                *discounts.entry(actor).or_default() += 1;
            } else {
                *failed_logins.entry(actor).or_default() += 1;
            }
        }

        let mut report = TenantReport::default();

        let checks: [(&str, &HashMap<Uuid, u64>, u64); 4] = [
            (alert_types::EXCESSIVE_REFUNDS, &refunds, fraud.max_refunds),
            (alert_types::EXCESSIVE_VOIDS, &voids, fraud.max_voids),
            (
                alert_types::EXCESSIVE_DISCOUNTS,
                &discounts,
                fraud.max_discounts,
            ),
            (
                alert_types::FAILED_LOGINS,
                &failed_logins,
                fraud.max_failed_logins,
            ),
        ];

        for (alert_type, counts, threshold) in checks {
            for (&actor, &count) in counts {
                if count <= threshold {
                    continue;
                }
                let details = serde_json::json!({
                    "count": count,
                    "threshold": threshold,
                });
                match self
                    .raise_alert(&tenant, actor, alert_type, details, window_start, window_end)
                    .await
                {
                    Ok(true) => report.success(),
                    Ok(false) => {} // duplicate suppressed
                    Err(err) => {
                        report.failure(format!("{} for actor {}", alert_type, actor), &err)
                    }
                }
            }
        }

        // Cash drawer variance over the same window.
        let sessions = CashDrawerSession::find()
            .filter(cash_drawer_session::Column::TenantId.eq(tenant.id))
            .filter(cash_drawer_session::Column::Status.eq(DrawerStatus::Closed.to_string()))
            .filter(cash_drawer_session::Column::ClosedAt.gte(window_start))
            .all(db)
            .await
            .map_err(ServiceError::db_error)?;

        for session in sessions {
            let Some(closing) = session.closing_amount else {
                continue;
            };
            let variance = (closing - session.expected_amount).abs();
            if variance <= fraud.cash_variance_threshold {
                continue;
            }
            let details = serde_json::json!({
                "session_id": session.id,
                "expected_amount": session.expected_amount,
                "closing_amount": closing,
                "variance": variance,
                "threshold": fraud.cash_variance_threshold,
            });
            match self
                .raise_alert(
                    &tenant,
                    session.cashier_id,
                    alert_types::CASH_VARIANCE,
                    details,
                    window_start,
                    window_end,
                )
                .await
            {
                Ok(true) => report.success(),
                Ok(false) => {}
                Err(err) => report.failure(format!("drawer session {}", session.id), &err),
            }
        }

        Ok(report)
    }

    /// Writes one alert unless an equivalent one already covers this actor
    /// and window. Returns whether a new alert was written.
    async fn raise_alert(
        &self,
        tenant: &tenant::Model,
        actor_id: Uuid,
        alert_type: &str,
        details: serde_json::Value,
        window_start: DateTime<Utc>,
        window_end: DateTime<Utc>,
    ) -> Result<bool, ServiceError> {
        let db = self.ctx.db.as_ref();

        let existing = SecurityAlert::find()
            .filter(security_alert::Column::TenantId.eq(tenant.id))
            .filter(security_alert::Column::ActorId.eq(actor_id))
            .filter(security_alert::Column::AlertType.eq(alert_type))
            .filter(security_alert::Column::WindowEnd.gte(window_start))
            .one(db)
            .await
            .map_err(ServiceError::db_error)?;
        if existing.is_some() {
            return Ok(false);
        }

        let alert = security_alert::ActiveModel {
            id: Set(Uuid::new_v4()),
            tenant_id: Set(tenant.id),
            actor_id: Set(actor_id),
            alert_type: Set(alert_type.to_string()),
            details: Set(details.clone()),
            window_start: Set(window_start),
            window_end: Set(window_end),
            created_at: Set(Utc::now()),
        };
        alert.insert(db).await.map_err(ServiceError::db_error)?;

        let notification = Notification {
            tenant_id: tenant.id,
            kind: NotificationKind::SecurityAlert,
            subject: format!("Security alert: {}", alert_type),
            body: serde_json::json!({
                "actor_id": actor_id,
                "alert_type": alert_type,
                "details": details,
            }),
        };
        if let Err(err) = notify_with_retry(self.ctx.notifier.as_ref(), &notification).await {
            // The alert row is already persisted; delivery failure is logged
            // by the notifier and must not undo the detection.
            tracing::warn!(error = %err, alert_type, "security alert notification failed");
        }

        self.ctx
            .event_sender
            .send(Event::SuspiciousActivityFlagged {
                tenant_id: tenant.id,
                actor_id,
                alert_type: alert_type.to_string(),
            })
            .await
            .map_err(ServiceError::EventError)?;

        Ok(true)
    }
}
