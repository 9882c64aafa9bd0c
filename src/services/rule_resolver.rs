use crate::{
    db::DbPool,
    entities::{
        discount_rule::{self, DiscountType, Entity as DiscountRule},
        tax_rule::{self, Entity as TaxRule, TaxAppliesTo},
        tenant::{self, Entity as Tenant},
    },
    errors::{DiscountRejection, ServiceError},
    events::{Event, EventSender},
};
use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use sea_orm::sea_query::{BinOper, Expr};
use sea_orm::{ColumnTrait, Condition, EntityTrait, QueryFilter, QueryOrder};
use std::str::FromStr;
use std::sync::Arc;
use tracing::{instrument, warn};
use uuid::Uuid;

/// One line of a cart/transaction snapshot, as much as tax rules care about.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, utoipa::ToSchema)]
pub struct TaxableItem {
    pub product_id: Option<Uuid>,
    pub category_id: Option<Uuid>,
    #[serde(default)]
    pub is_service: bool,
}

/// Resolved tax for a transaction snapshot.
#[derive(Debug, Clone, PartialEq, serde::Serialize, utoipa::ToSchema)]
pub struct TaxLine {
    pub rate: Decimal,
    pub label: String,
    pub tax_amount: Decimal,
}

/// A validated (not yet redeemed) discount.
#[derive(Debug, Clone, PartialEq, serde::Serialize, utoipa::ToSchema)]
pub struct DiscountQuote {
    pub code: String,
    pub discount_amount: Decimal,
    pub final_total: Decimal,
}

pub fn round2(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Picks the first applicable rule (callers pass rules sorted by priority
/// descending) and computes the tax on `subtotal`. Falls back to the
/// tenant's flat tax settings, then to zero. Pure: same inputs, same line.
pub fn resolve_tax(
    rules: &[tax_rule::Model],
    fallback: &tenant::Model,
    subtotal: Decimal,
    items: &[TaxableItem],
) -> TaxLine {
    for rule in rules {
        if rule_matches(rule, items) {
            return TaxLine {
                rate: rule.rate,
                label: rule.label.clone(),
                tax_amount: round2(subtotal * rule.rate / Decimal::from(100)),
            };
        }
    }

    if fallback.tax_enabled {
        return TaxLine {
            rate: fallback.tax_rate,
            label: fallback.tax_label.clone(),
            tax_amount: round2(subtotal * fallback.tax_rate / Decimal::from(100)),
        };
    }

    TaxLine {
        rate: Decimal::ZERO,
        label: "No Tax".to_string(),
        tax_amount: Decimal::ZERO,
    }
}

/// An explicit product/category list on the rule overrides the coarse
/// `applies_to` predicate.
fn rule_matches(rule: &tax_rule::Model, items: &[TaxableItem]) -> bool {
    let product_ids = rule.product_ids();
    if !product_ids.is_empty() {
        return items
            .iter()
            .any(|item| item.product_id.is_some_and(|id| product_ids.contains(&id)));
    }

    let category_ids = rule.category_ids();
    if !category_ids.is_empty() {
        return items
            .iter()
            .any(|item| item.category_id.is_some_and(|id| category_ids.contains(&id)));
    }

    match TaxAppliesTo::from_str(&rule.applies_to) {
        Ok(TaxAppliesTo::All) => true,
        Ok(TaxAppliesTo::Products) => items.iter().any(|item| !item.is_service),
        Ok(TaxAppliesTo::Services) => items.iter().any(|item| item.is_service),
        Ok(TaxAppliesTo::Categories) => items.iter().any(|item| item.category_id.is_some()),
        Err(_) => {
            warn!(rule_id = %rule.id, applies_to = %rule.applies_to, "unknown applies_to on tax rule");
            false
        }
    }
}

/// Validates a discount rule against a subtotal. Pure and side-effect-free;
/// incrementing the usage counter is a separate explicit step so repeated
/// validation never double-counts.
pub fn evaluate_discount(
    rule: &discount_rule::Model,
    subtotal: Decimal,
    now: DateTime<Utc>,
) -> Result<DiscountQuote, DiscountRejection> {
    if now < rule.valid_from {
        return Err(DiscountRejection::NotYetValid);
    }
    if now > rule.valid_until {
        return Err(DiscountRejection::Expired);
    }
    if rule.usage_limit.is_some_and(|limit| rule.usage_count >= limit) {
        return Err(DiscountRejection::LimitReached);
    }
    if rule
        .min_purchase_amount
        .is_some_and(|minimum| subtotal < minimum)
    {
        return Err(DiscountRejection::BelowMinimum);
    }

    let discount_amount = match DiscountType::from_str(&rule.discount_type) {
        Ok(DiscountType::Percentage) => {
            let raw = round2(subtotal * rule.value / Decimal::from(100));
            match rule.max_discount_amount {
                Some(cap) => raw.min(cap),
                None => raw,
            }
        }
        Ok(DiscountType::Fixed) => rule.value.min(subtotal),
        Err(_) => return Err(DiscountRejection::InvalidCode),
    };

    let final_total = (subtotal - discount_amount).max(Decimal::ZERO);

    Ok(DiscountQuote {
        code: rule.code.clone(),
        discount_amount,
        final_total,
    })
}

/// Loads rule sets and evaluates them. Tax resolution and discount
/// validation are reads; only [`redeem_discount`] writes.
#[derive(Clone)]
pub struct RuleResolver {
    db: Arc<DbPool>,
    event_sender: EventSender,
}

impl RuleResolver {
    pub fn new(db: Arc<DbPool>, event_sender: EventSender) -> Self {
        Self { db, event_sender }
    }

    /// Deterministic tax resolution for a tenant: active rules sorted by
    /// priority descending (id ascending as tie-break), first match wins.
    #[instrument(skip(self, items))]
    pub async fn resolve_tax_for(
        &self,
        tenant_id: Uuid,
        subtotal: Decimal,
        items: &[TaxableItem],
    ) -> Result<TaxLine, ServiceError> {
        let db = self.db.as_ref();

        let tenant = Tenant::find_by_id(tenant_id)
            .one(db)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::NotFound(format!("Tenant {} not found", tenant_id)))?;

        let rules = TaxRule::find()
            .filter(tax_rule::Column::TenantId.eq(tenant_id))
            .filter(tax_rule::Column::IsActive.eq(true))
            .order_by_desc(tax_rule::Column::Priority)
            .order_by_asc(tax_rule::Column::Id)
            .all(db)
            .await
            .map_err(ServiceError::db_error)?;

        Ok(resolve_tax(&rules, &tenant, subtotal, items))
    }

    /// Case-insensitive lookup + pure evaluation. Does not touch
    /// `usage_count`.
    #[instrument(skip(self))]
    pub async fn validate_discount(
        &self,
        tenant_id: Uuid,
        code: &str,
        subtotal: Decimal,
    ) -> Result<DiscountQuote, ServiceError> {
        let rule = self
            .find_active_rule(tenant_id, code)
            .await?
            .ok_or(DiscountRejection::InvalidCode)?;

        evaluate_discount(&rule, subtotal, Utc::now()).map_err(ServiceError::from)
    }

    /// Consumes one use of the code once a sale is finalized. The increment
    /// is conditional on `usage_count < usage_limit` in the same statement,
    /// so concurrent redemptions of a near-exhausted code cannot both pass
    /// the limit.
    #[instrument(skip(self))]
    pub async fn redeem_discount(&self, tenant_id: Uuid, code: &str) -> Result<i32, ServiceError> {
        let db = self.db.as_ref();

        let rule = self
            .find_active_rule(tenant_id, code)
            .await?
            .ok_or(DiscountRejection::InvalidCode)?;

        let result = DiscountRule::update_many()
            .col_expr(
                discount_rule::Column::UsageCount,
                Expr::col(discount_rule::Column::UsageCount).add(1),
            )
            .col_expr(discount_rule::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(discount_rule::Column::Id.eq(rule.id))
            .filter(
                Condition::any()
                    .add(discount_rule::Column::UsageLimit.is_null())
                    .add(Expr::col(discount_rule::Column::UsageCount).binary(
                        BinOper::SmallerThan,
                        Expr::col(discount_rule::Column::UsageLimit),
                    )),
            )
            .exec(db)
            .await
            .map_err(ServiceError::db_error)?;

        if result.rows_affected == 0 {
            return Err(DiscountRejection::LimitReached.into());
        }

        let usage_count = rule.usage_count + 1;
        self.event_sender
            .send(Event::DiscountRedeemed {
                tenant_id,
                code: rule.code.clone(),
                usage_count,
            })
            .await
            .map_err(ServiceError::EventError)?;

        Ok(usage_count)
    }

    async fn find_active_rule(
        &self,
        tenant_id: Uuid,
        code: &str,
    ) -> Result<Option<discount_rule::Model>, ServiceError> {
        let rules = DiscountRule::find()
            .filter(discount_rule::Column::TenantId.eq(tenant_id))
            .filter(discount_rule::Column::IsActive.eq(true))
            .all(self.db.as_ref())
            .await
            .map_err(ServiceError::db_error)?;

        Ok(rules
            .into_iter()
            .find(|rule| rule.code.eq_ignore_ascii_case(code)))
    }
}
