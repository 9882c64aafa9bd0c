use crate::{
    entities::{
        product::{self, Entity as Product},
        purchase_order::{self, Entity as PurchaseOrder, PurchaseOrderStatus},
        stock_movement::{self, Entity as StockMovement, MovementType},
        tenant,
    },
    errors::ServiceError,
    events::Event,
    jobs::{ensure_range, JobContext, JobRunResult, TenantReport},
    services::notifications::{notify_with_retry, Notification, NotificationKind},
};
use chrono::{Duration, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set};
use serde::Deserialize;
use std::collections::HashMap;
use tracing::instrument;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

#[derive(Debug, Clone, Deserialize, IntoParams, ToSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct ReplenishmentParams {
    pub tenant_id: Option<Uuid>,
    pub secret: Option<String>,
    /// Trailing sales window the consumption rate is derived from
    pub analysis_days: i64,
    /// How far ahead the projected need looks
    pub prediction_days: i64,
    /// Create `suggested` purchase orders instead of only notifying
    pub auto_create: bool,
}

impl Default for ReplenishmentParams {
    fn default() -> Self {
        Self {
            tenant_id: None,
            secret: None,
            analysis_days: 30,
            prediction_days: 14,
            auto_create: false,
        }
    }
}

/// A reorder the sweep recommends: projected consumption outruns current
/// stock plus incoming supply.
#[derive(Debug, Clone)]
pub struct ReorderSuggestion {
    pub product_id: Uuid,
    pub quantity: i32,
    pub consumption_rate: Decimal,
    pub projected_need: Decimal,
}

/// Consumption-rate arithmetic, separated for testing: units sold over the
/// analysis window projected forward, against stock plus in-transit supply.
pub fn suggest_reorder(
    item: &product::Model,
    units_sold: i64,
    incoming: i32,
    analysis_days: i64,
    prediction_days: i64,
) -> Option<ReorderSuggestion> {
    if units_sold <= 0 {
        return None;
    }

    let rate = Decimal::from(units_sold) / Decimal::from(analysis_days);
    let projected_need = rate * Decimal::from(prediction_days);
    let available = Decimal::from(item.stock) + Decimal::from(incoming);
    let deficit = projected_need - available;

    if deficit <= Decimal::ZERO {
        return None;
    }

    let quantity = deficit.ceil().to_i32()?;
    Some(ReorderSuggestion {
        product_id: item.id,
        quantity,
        consumption_rate: rate,
        projected_need,
    })
}

/// Predictive stock replenishment: derives a consumption rate from trailing
/// sales and emits purchase-order suggestions where the projection outruns
/// supply. A still-open `suggested` order for the product suppresses a new
/// suggestion, which makes re-runs idempotent.
pub struct ReplenishmentJob {
    ctx: JobContext,
}

impl ReplenishmentJob {
    pub const NAME: &'static str = "replenishment";

    pub fn new(ctx: JobContext) -> Self {
        Self { ctx }
    }

    #[instrument(skip(self, params))]
    pub async fn run(&self, params: ReplenishmentParams) -> Result<JobRunResult, ServiceError> {
        ensure_range("analysisDays", params.analysis_days, 1, 365)?;
        ensure_range("predictionDays", params.prediction_days, 1, 365)?;

        self.ctx
            .run_job(Self::NAME, params.tenant_id, |tenant| {
                self.run_tenant(tenant, &params)
            })
            .await
    }

    async fn run_tenant(
        &self,
        tenant: tenant::Model,
        params: &ReplenishmentParams,
    ) -> Result<TenantReport, ServiceError> {
        let db = self.ctx.db.as_ref();

        let products = Product::find()
            .filter(product::Column::TenantId.eq(tenant.id))
            .filter(product::Column::IsActive.eq(true))
            .filter(product::Column::IsService.eq(false))
            .filter(product::Column::TrackInventory.eq(true))
            .all(db)
            .await
            .map_err(ServiceError::db_error)?;

        let since = Utc::now() - Duration::days(params.analysis_days);
        let sales = StockMovement::find()
            .filter(stock_movement::Column::TenantId.eq(tenant.id))
            .filter(stock_movement::Column::MovementType.eq(MovementType::Sale.to_string()))
            .filter(stock_movement::Column::CreatedAt.gte(since))
            .all(db)
            .await
            .map_err(ServiceError::db_error)?;

        let mut sold: HashMap<Uuid, i64> = HashMap::new();
        for movement in sales {
            *sold.entry(movement.product_id).or_default() += i64::from(-movement.quantity).max(0);
        }

        let open_orders = PurchaseOrder::find()
            .filter(purchase_order::Column::TenantId.eq(tenant.id))
            .filter(purchase_order::Column::Status.is_in([
                PurchaseOrderStatus::Suggested.to_string(),
                PurchaseOrderStatus::Pending.to_string(),
                PurchaseOrderStatus::InTransit.to_string(),
            ]))
            .all(db)
            .await
            .map_err(ServiceError::db_error)?;

        let mut incoming: HashMap<Uuid, i32> = HashMap::new();
        let mut already_suggested: HashMap<Uuid, bool> = HashMap::new();
        for order in open_orders {
            if order.status == PurchaseOrderStatus::Suggested.to_string() {
                already_suggested.insert(order.product_id, true);
            }
            *incoming.entry(order.product_id).or_default() += order.quantity;
        }

        let mut report = TenantReport::default();
        for item in products {
            if already_suggested.contains_key(&item.id) {
                continue;
            }

            let units_sold = sold.get(&item.id).copied().unwrap_or(0);
            let supply = incoming.get(&item.id).copied().unwrap_or(0);
            let Some(suggestion) = suggest_reorder(
                &item,
                units_sold,
                supply,
                params.analysis_days,
                params.prediction_days,
            ) else {
                continue;
            };

            let item_id = item.id;
            match self.emit_suggestion(&tenant, &item, suggestion, params.auto_create).await {
                Ok(()) => report.success(),
                Err(err) => report.failure(format!("product {}", item_id), &err),
            }
        }
        Ok(report)
    }

    async fn emit_suggestion(
        &self,
        tenant: &tenant::Model,
        item: &product::Model,
        suggestion: ReorderSuggestion,
        auto_create: bool,
    ) -> Result<(), ServiceError> {
        if auto_create {
            let now = Utc::now();
            let order = purchase_order::ActiveModel {
                id: Set(Uuid::new_v4()),
                tenant_id: Set(tenant.id),
                product_id: Set(item.id),
                quantity: Set(suggestion.quantity),
                status: Set(PurchaseOrderStatus::Suggested.to_string()),
                auto_created: Set(true),
                created_at: Set(now),
                updated_at: Set(now),
            };
            order
                .insert(self.ctx.db.as_ref())
                .await
                .map_err(ServiceError::db_error)?;
        }

        let notification = Notification {
            tenant_id: tenant.id,
            kind: NotificationKind::ReorderSuggestion,
            subject: format!("Reorder suggested: {}", item.name),
            body: serde_json::json!({
                "product_id": item.id,
                "sku": item.sku,
                "quantity": suggestion.quantity,
                "current_stock": item.stock,
                "consumption_rate_per_day": suggestion.consumption_rate,
                "projected_need": suggestion.projected_need,
                "auto_created": auto_create,
            }),
        };
        notify_with_retry(self.ctx.notifier.as_ref(), &notification).await?;

        self.ctx
            .event_sender
            .send(Event::ReorderSuggested {
                tenant_id: tenant.id,
                product_id: item.id,
                quantity: suggestion.quantity,
                auto_created: auto_create,
            })
            .await
            .map_err(ServiceError::EventError)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn product_fixture(stock: i32) -> product::Model {
        let now = Utc::now();
        product::Model {
            id: Uuid::new_v4(),
            tenant_id: Uuid::new_v4(),
            name: "Beans".into(),
            sku: "BEANS-1".into(),
            category_id: None,
            is_service: false,
            base_price: dec!(4.50),
            price: dec!(4.50),
            stock,
            track_inventory: true,
            reorder_point: Some(10),
            is_active: true,
            needs_sync: false,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn suggests_when_projection_outruns_supply() {
        // 60 sold over 30 days = 2/day; 14-day need = 28 against 10 on hand
        let item = product_fixture(10);
        let suggestion = suggest_reorder(&item, 60, 0, 30, 14).expect("deficit expected");
        assert_eq!(suggestion.quantity, 18);
        assert_eq!(suggestion.consumption_rate, dec!(2));
        assert_eq!(suggestion.projected_need, dec!(28));
    }

    #[test]
    fn incoming_supply_reduces_the_deficit() {
        let item = product_fixture(10);
        // Same projection, but 18 already on order: nothing to suggest
        assert!(suggest_reorder(&item, 60, 18, 30, 14).is_none());
        // Partial cover still leaves a rump
        let suggestion = suggest_reorder(&item, 60, 10, 30, 14).expect("deficit expected");
        assert_eq!(suggestion.quantity, 8);
    }

    #[test]
    fn no_sales_no_suggestion() {
        let item = product_fixture(0);
        assert!(suggest_reorder(&item, 0, 0, 30, 14).is_none());
    }

    #[test]
    fn fractional_deficit_rounds_up() {
        // 10 sold over 30 days, 7-day projection = 2.33..; stock 1 => 1.33.. => 2
        let item = product_fixture(1);
        let suggestion = suggest_reorder(&item, 10, 0, 30, 7).expect("deficit expected");
        assert_eq!(suggestion.quantity, 2);
    }
}
