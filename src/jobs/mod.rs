//! The shared execution contract every automation job implements.
//!
//! A job invocation is a stateless unit of work: resolve the target tenant
//! set, iterate it sequentially, and fold every per-tenant and per-entity
//! outcome into one [`JobRunResult`]. One tenant's failure never blocks the
//! remaining tenants; malformed parameters are rejected before any entity
//! loop starts.

pub mod abandoned_cart;
pub mod auto_clock_out;
pub mod booking_reminder;
pub mod branch_sync;
pub mod dynamic_pricing;
pub mod no_show;
pub mod replenishment;
pub mod suspicious_activity;

use crate::{
    config::AppConfig,
    db::DbPool,
    entities::tenant,
    errors::ServiceError,
    events::{Event, EventSender},
    services::{
        audit::AuditTrail, notifications::Notifier, rule_resolver::RuleResolver,
        stock_ledger::StockLedger, tenants::TenantDirectory,
    },
};
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;
use tracing::{info, warn};
use utoipa::ToSchema;
use uuid::Uuid;

/// The uniform result contract every job returns to its trigger.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct JobRunResult {
    pub success: bool,
    pub message: String,
    pub processed: u64,
    pub failed: u64,
    pub errors: Vec<String>,
}

impl JobRunResult {
    pub fn completed(job: &str, processed: u64, failed: u64, errors: Vec<String>) -> Self {
        Self {
            success: failed == 0 && errors.is_empty(),
            message: format!("{} completed: {} processed, {} failed", job, processed, failed),
            processed,
            failed,
            errors,
        }
    }
}

/// Per-tenant accumulator. `processed` counts entities acted upon, `failed`
/// counts entities that errored.
#[derive(Debug, Default)]
pub struct TenantReport {
    pub processed: u64,
    pub failed: u64,
    pub errors: Vec<String>,
}

impl TenantReport {
    pub fn success(&mut self) {
        self.processed += 1;
    }

    /// Records a per-entity failure without stopping the loop. The stored
    /// message goes straight into the HTTP response, so it uses the
    /// sanitized form of the error.
    pub fn failure(&mut self, context: impl Display, err: &ServiceError) {
        self.failed += 1;
        self.errors.push(format!("{}: {}", context, err.response_message()));
    }
}

/// Explicit dependency container passed to every job at construction.
/// Configuration is injected here once; jobs never read global state.
#[derive(Clone)]
pub struct JobContext {
    pub db: Arc<DbPool>,
    pub config: AppConfig,
    pub event_sender: EventSender,
    pub notifier: Arc<dyn Notifier>,
    pub audit: AuditTrail,
    pub tenants: TenantDirectory,
    pub ledger: StockLedger,
    pub rules: RuleResolver,
}

impl JobContext {
    /// Resolves the tenant set and runs `per_tenant` over it sequentially.
    ///
    /// A tenant whose closure errors is counted as one failed unit and the
    /// loop continues: this is the failure-isolation invariant. Setup
    /// errors (unknown/inactive tenant) propagate and fail the whole
    /// invocation before any work happens.
    pub async fn run_job<F, Fut>(
        &self,
        job: &str,
        tenant_id: Option<Uuid>,
        mut per_tenant: F,
    ) -> Result<JobRunResult, ServiceError>
    where
        F: FnMut(tenant::Model) -> Fut,
        Fut: Future<Output = Result<TenantReport, ServiceError>>,
    {
        let tenants = self.tenants.resolve(tenant_id).await?;
        info!(job, tenant_count = tenants.len(), "job starting");

        let mut processed = 0u64;
        let mut failed = 0u64;
        let mut errors = Vec::new();

        for tenant in tenants {
            let tenant_id = tenant.id;
            match per_tenant(tenant).await {
                Ok(report) => {
                    processed += report.processed;
                    failed += report.failed;
                    errors.extend(report.errors);
                }
                Err(err) => {
                    warn!(job, %tenant_id, error = %err, "tenant failed; continuing");
                    failed += 1;
                    errors.push(format!("tenant {}: {}", tenant_id, err.response_message()));
                }
            }
        }

        if let Err(err) = self
            .event_sender
            .send(Event::JobCompleted {
                job: job.to_string(),
                processed,
                failed,
            })
            .await
        {
            warn!(job, error = %err, "failed to emit job-completed event");
        }

        Ok(JobRunResult::completed(job, processed, failed, errors))
    }
}

/// Parameter guard used by every job before its entity loop starts.
pub fn ensure_range(name: &str, value: i64, min: i64, max: i64) -> Result<(), ServiceError> {
    if value < min || value > max {
        return Err(ServiceError::ValidationError(format!(
            "{} must be between {} and {}, got {}",
            name, min, max, value
        )));
    }
    Ok(())
}
