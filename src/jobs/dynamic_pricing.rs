use crate::{
    config::PricingConfig,
    entities::{
        product::{self, Entity as Product},
        stock_movement::{self, Entity as StockMovement, MovementType},
        tenant,
    },
    errors::ServiceError,
    events::Event,
    jobs::{JobContext, JobRunResult, TenantReport},
    services::audit::actions,
    services::rule_resolver::round2,
};
use chrono::{Duration, Timelike, Utc};
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set};
use serde::Deserialize;
use std::collections::HashMap;
use tracing::instrument;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

#[derive(Debug, Clone, Deserialize, IntoParams, ToSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct DynamicPricingParams {
    pub tenant_id: Option<Uuid>,
    pub secret: Option<String>,
    /// Gate for the time-of-day factor
    pub enable_time_based: bool,
    /// Gate for the sale-velocity factor
    pub enable_demand_based: bool,
    /// Gate for the remaining-stock factor
    pub enable_stock_based: bool,
}

impl Default for DynamicPricingParams {
    fn default() -> Self {
        Self {
            tenant_id: None,
            secret: None,
            enable_time_based: true,
            enable_demand_based: true,
            enable_stock_based: true,
        }
    }
}

/// Inputs the multiplier composition reads for one product.
#[derive(Debug, Clone, Copy)]
pub struct PricingInputs {
    /// Current UTC hour (0..24)
    pub hour: u32,
    /// Units sold inside the trailing demand window
    pub units_sold: i64,
    pub stock: i32,
    pub reorder_point: Option<i32>,
    pub track_inventory: bool,
}

pub fn time_factor(cfg: &PricingConfig, hour: u32) -> Decimal {
    if hour >= cfg.peak_start_hour && hour < cfg.peak_end_hour {
        cfg.peak_multiplier
    } else {
        Decimal::ONE
    }
}

pub fn demand_factor(cfg: &PricingConfig, units_sold: i64) -> Decimal {
    if units_sold >= cfg.demand_surge_units {
        cfg.demand_surge_multiplier
    } else if units_sold == 0 {
        cfg.demand_idle_multiplier
    } else {
        Decimal::ONE
    }
}

pub fn stock_factor(
    cfg: &PricingConfig,
    stock: i32,
    reorder_point: Option<i32>,
    track_inventory: bool,
) -> Decimal {
    let Some(reorder_point) = reorder_point.filter(|rp| *rp > 0 && track_inventory) else {
        return Decimal::ONE;
    };
    if stock <= reorder_point {
        cfg.scarcity_multiplier
    } else if stock >= reorder_point.saturating_mul(cfg.surplus_ratio) {
        cfg.surplus_multiplier
    } else {
        Decimal::ONE
    }
}

/// Composes the enabled factors multiplicatively, then clamps the composite
/// into the configured band. Clamping the composite (not each factor)
/// guarantees the output multiplier never leaves the band for any input.
pub fn compose_multiplier(
    cfg: &PricingConfig,
    params: &DynamicPricingParams,
    inputs: &PricingInputs,
) -> Decimal {
    let mut multiplier = Decimal::ONE;
    if params.enable_time_based {
        multiplier *= time_factor(cfg, inputs.hour);
    }
    if params.enable_demand_based {
        multiplier *= demand_factor(cfg, inputs.units_sold);
    }
    if params.enable_stock_based {
        multiplier *= stock_factor(cfg, inputs.stock, inputs.reorder_point, inputs.track_inventory);
    }
    multiplier.clamp(cfg.min_multiplier, cfg.max_multiplier)
}

pub fn effective_price(base_price: Decimal, multiplier: Decimal) -> Decimal {
    round2(base_price * multiplier)
}

/// Recomputes effective prices from `base_price` for every active,
/// non-service product. A changed price is persisted with a price-change
/// audit entry; the movement ledger is never touched.
pub struct DynamicPricingJob {
    ctx: JobContext,
}

impl DynamicPricingJob {
    pub const NAME: &'static str = "dynamic_pricing";

    pub fn new(ctx: JobContext) -> Self {
        Self { ctx }
    }

    #[instrument(skip(self, params))]
    pub async fn run(&self, params: DynamicPricingParams) -> Result<JobRunResult, ServiceError> {
        self.ctx
            .run_job(Self::NAME, params.tenant_id, |tenant| {
                self.run_tenant(tenant, &params)
            })
            .await
    }

    async fn run_tenant(
        &self,
        tenant: tenant::Model,
        params: &DynamicPricingParams,
    ) -> Result<TenantReport, ServiceError> {
        let cfg = &self.ctx.config.pricing;
        let now = Utc::now();

        let products = Product::find()
            .filter(product::Column::TenantId.eq(tenant.id))
            .filter(product::Column::IsActive.eq(true))
            .filter(product::Column::IsService.eq(false))
            .all(self.ctx.db.as_ref())
            .await
            .map_err(ServiceError::db_error)?;

        let sold = if params.enable_demand_based {
            self.units_sold_per_product(tenant.id, cfg.demand_window_hours)
                .await?
        } else {
            HashMap::new()
        };

        let mut report = TenantReport::default();
        for item in products {
            let inputs = PricingInputs {
                hour: now.hour(),
                units_sold: sold.get(&item.id).copied().unwrap_or(0),
                stock: item.stock,
                reorder_point: item.reorder_point,
                track_inventory: item.track_inventory,
            };
            let multiplier = compose_multiplier(cfg, params, &inputs);
            let new_price = effective_price(item.base_price, multiplier);

            if new_price == item.price {
                continue;
            }

            let item_id = item.id;
            match self.reprice(&tenant, item, new_price).await {
                Ok(()) => report.success(),
                Err(err) => report.failure(format!("product {}", item_id), &err),
            }
        }
        Ok(report)
    }

    async fn units_sold_per_product(
        &self,
        tenant_id: Uuid,
        window_hours: i64,
    ) -> Result<HashMap<Uuid, i64>, ServiceError> {
        let since = Utc::now() - Duration::hours(window_hours);

        let sales = StockMovement::find()
            .filter(stock_movement::Column::TenantId.eq(tenant_id))
            .filter(stock_movement::Column::MovementType.eq(MovementType::Sale.to_string()))
            .filter(stock_movement::Column::CreatedAt.gte(since))
            .all(self.ctx.db.as_ref())
            .await
            .map_err(ServiceError::db_error)?;

        let mut sold: HashMap<Uuid, i64> = HashMap::new();
        for movement in sales {
            // Sale deltas are negative; count the magnitude.
            let units = i64::from(-movement.quantity).max(0);
            *sold.entry(movement.product_id).or_default() += units;
        }
        Ok(sold)
    }

    async fn reprice(
        &self,
        tenant: &tenant::Model,
        item: product::Model,
        new_price: Decimal,
    ) -> Result<(), ServiceError> {
        let item_id = item.id;
        let old_price = item.price;

        let mut active: product::ActiveModel = item.into();
        active.price = Set(new_price);
        active.updated_at = Set(Utc::now());
        active
            .update(self.ctx.db.as_ref())
            .await
            .map_err(ServiceError::db_error)?;

        self.ctx
            .audit
            .record(
                tenant.id,
                actions::PRICE_CHANGED,
                "product",
                item_id,
                serde_json::json!({
                    "old_price": old_price,
                    "new_price": new_price,
                }),
                None,
            )
            .await?;

        self.ctx
            .event_sender
            .send(Event::PriceChanged {
                tenant_id: tenant.id,
                product_id: item_id,
                old_price,
                new_price,
            })
            .await
            .map_err(ServiceError::EventError)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    fn cfg() -> PricingConfig {
        PricingConfig::default()
    }

    fn all_enabled() -> DynamicPricingParams {
        DynamicPricingParams::default()
    }

    #[test]
    fn peak_hour_raises_price() {
        let cfg = cfg();
        assert_eq!(time_factor(&cfg, 18), cfg.peak_multiplier);
        assert_eq!(time_factor(&cfg, 3), Decimal::ONE);
    }

    #[test]
    fn demand_tiers() {
        let cfg = cfg();
        assert_eq!(demand_factor(&cfg, 0), cfg.demand_idle_multiplier);
        assert_eq!(demand_factor(&cfg, 5), Decimal::ONE);
        assert_eq!(
            demand_factor(&cfg, cfg.demand_surge_units),
            cfg.demand_surge_multiplier
        );
    }

    #[test]
    fn stock_tiers() {
        let cfg = cfg();
        // At or below the reorder point: scarcity
        assert_eq!(stock_factor(&cfg, 5, Some(10), true), cfg.scarcity_multiplier);
        // Comfortable middle: neutral
        assert_eq!(stock_factor(&cfg, 20, Some(10), true), Decimal::ONE);
        // Surplus: discount
        assert_eq!(
            stock_factor(&cfg, 10 * cfg.surplus_ratio, Some(10), true),
            cfg.surplus_multiplier
        );
        // Untracked or no reorder point: neutral
        assert_eq!(stock_factor(&cfg, 0, None, true), Decimal::ONE);
        assert_eq!(stock_factor(&cfg, 0, Some(10), false), Decimal::ONE);
    }

    #[test]
    fn disabled_factors_do_not_contribute() {
        let cfg = cfg();
        let params = DynamicPricingParams {
            enable_time_based: false,
            enable_demand_based: false,
            enable_stock_based: false,
            ..DynamicPricingParams::default()
        };
        let inputs = PricingInputs {
            hour: 18,
            units_sold: 0,
            stock: 1,
            reorder_point: Some(10),
            track_inventory: true,
        };
        assert_eq!(compose_multiplier(&cfg, &params, &inputs), Decimal::ONE);
    }

    #[test]
    fn composite_is_multiplicative() {
        let cfg = cfg();
        let inputs = PricingInputs {
            hour: 18,       // peak: 1.10
            units_sold: 0,  // idle: 0.95
            stock: 100,
            reorder_point: None, // neutral
            track_inventory: true,
        };
        let multiplier = compose_multiplier(&cfg, &all_enabled(), &inputs);
        assert_eq!(multiplier, dec!(1.0450)); // 1.10 * 0.95, inside the band
        assert_eq!(effective_price(dec!(10.00), multiplier), dec!(10.45));
    }

    #[test]
    fn composite_clamps_to_band() {
        let cfg = cfg();
        let inputs = PricingInputs {
            hour: 18,       // peak: 1.10
            units_sold: 50, // surge: 1.15
            stock: 1,
            reorder_point: Some(10), // scarcity: 1.10
            track_inventory: true,
        };
        // 1.10 * 1.15 * 1.10 = 1.39150 clamps to the band ceiling
        let multiplier = compose_multiplier(&cfg, &all_enabled(), &inputs);
        assert_eq!(multiplier, cfg.max_multiplier);
        assert_eq!(effective_price(dec!(10.00), multiplier), dec!(12.50));
    }

    proptest! {
        /// The output multiplier stays inside the configured band for all inputs.
        #[test]
        fn multiplier_stays_in_band(
            hour in 0u32..24,
            units_sold in 0i64..100_000,
            stock in 0i32..1_000_000,
            reorder_point in proptest::option::of(0i32..10_000),
            track_inventory in any::<bool>(),
            enable_time in any::<bool>(),
            enable_demand in any::<bool>(),
            enable_stock in any::<bool>(),
        ) {
            let cfg = PricingConfig::default();
            let params = DynamicPricingParams {
                tenant_id: None,
                secret: None,
                enable_time_based: enable_time,
                enable_demand_based: enable_demand,
                enable_stock_based: enable_stock,
            };
            let inputs = PricingInputs { hour, units_sold, stock, reorder_point, track_inventory };
            let multiplier = compose_multiplier(&cfg, &params, &inputs);
            prop_assert!(multiplier >= cfg.min_multiplier);
            prop_assert!(multiplier <= cfg.max_multiplier);
        }
    }
}
