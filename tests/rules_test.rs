mod common;

use common::{seed_discount, seed_tax_rule, seed_tenant, setup};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sea_orm::EntityTrait;
use storefront_api::{
    entities::discount_rule::{self, DiscountType},
    errors::{DiscountRejection, ServiceError},
    services::rule_resolver::TaxableItem,
};

fn product_item() -> TaxableItem {
    TaxableItem {
        product_id: None,
        category_id: None,
        is_service: false,
    }
}

#[tokio::test]
async fn save10_scenario_validate_then_redeem_then_limit() {
    let app = setup().await;
    let tenant = seed_tenant(&app.db, false).await;
    seed_discount(
        &app.db,
        tenant.id,
        "SAVE10",
        DiscountType::Percentage,
        dec!(10),
        Some(1),
    )
    .await;

    let quote = app
        .jobs
        .rules
        .validate_discount(tenant.id, "SAVE10", dec!(100))
        .await
        .expect("first validation passes");
    assert_eq!(quote.discount_amount, dec!(10.00));
    assert_eq!(quote.final_total, dec!(90.00));

    // Validation is pure: calling it twice consumes nothing
    app.jobs
        .rules
        .validate_discount(tenant.id, "SAVE10", dec!(100))
        .await
        .expect("repeat validation still passes");

    let usage = app
        .jobs
        .rules
        .redeem_discount(tenant.id, "SAVE10")
        .await
        .expect("redemption consumes the single use");
    assert_eq!(usage, 1);

    let err = app
        .jobs
        .rules
        .validate_discount(tenant.id, "SAVE10", dec!(100))
        .await
        .expect_err("limit reached after redemption");
    assert!(matches!(
        err,
        ServiceError::DiscountRejected(DiscountRejection::LimitReached)
    ));

    let err = app
        .jobs
        .rules
        .redeem_discount(tenant.id, "SAVE10")
        .await
        .expect_err("second redemption refused");
    assert!(matches!(
        err,
        ServiceError::DiscountRejected(DiscountRejection::LimitReached)
    ));
}

#[tokio::test]
async fn code_lookup_is_case_insensitive() {
    let app = setup().await;
    let tenant = seed_tenant(&app.db, false).await;
    seed_discount(
        &app.db,
        tenant.id,
        "Save10",
        DiscountType::Fixed,
        dec!(5),
        None,
    )
    .await;

    let quote = app
        .jobs
        .rules
        .validate_discount(tenant.id, "sAvE10", dec!(20))
        .await
        .expect("case-insensitive match");
    assert_eq!(quote.discount_amount, dec!(5));

    let err = app
        .jobs
        .rules
        .validate_discount(tenant.id, "NOPE", dec!(20))
        .await
        .expect_err("unknown code");
    assert!(matches!(
        err,
        ServiceError::DiscountRejected(DiscountRejection::InvalidCode)
    ));
}

#[tokio::test]
async fn usage_count_never_exceeds_limit_under_concurrent_redemption() {
    let app = setup().await;
    let tenant = seed_tenant(&app.db, false).await;
    let rule = seed_discount(
        &app.db,
        tenant.id,
        "ALMOST-GONE",
        DiscountType::Percentage,
        dec!(10),
        Some(5),
    )
    .await;

    let mut tasks = Vec::new();
    for _ in 0..12 {
        let rules = app.jobs.rules.clone();
        let tenant_id = tenant.id;
        tasks.push(tokio::spawn(async move {
            rules.redeem_discount(tenant_id, "ALMOST-GONE").await.is_ok()
        }));
    }

    let mut successes = 0;
    for task in tasks {
        if task.await.unwrap() {
            successes += 1;
        }
    }
    assert_eq!(successes, 5, "exactly usage_limit redemptions succeed");

    let reloaded = discount_rule::Entity::find_by_id(rule.id)
        .one(app.db.as_ref())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(reloaded.usage_count, 5);
    assert_eq!(reloaded.usage_limit, Some(5));
}

#[tokio::test]
async fn tax_priority_and_fallback() {
    let app = setup().await;
    let tenant = seed_tenant(&app.db, false).await;
    seed_tax_rule(&app.db, tenant.id, dec!(4), "Reduced", "all", 1).await;
    seed_tax_rule(&app.db, tenant.id, dec!(21), "Standard", "all", 10).await;
    seed_tax_rule(&app.db, tenant.id, dec!(10), "Service", "services", 99).await;

    // The highest-priority rule matching a product item is "Standard":
    // the services rule outranks it but does not match.
    let line = app
        .jobs
        .rules
        .resolve_tax_for(tenant.id, dec!(100), &[product_item()])
        .await
        .unwrap();
    assert_eq!(line.label, "Standard");
    assert_eq!(line.rate, dec!(21));
    assert_eq!(line.tax_amount, dec!(21.00));

    // Repeated resolution returns the identical line
    for _ in 0..5 {
        let again = app
            .jobs
            .rules
            .resolve_tax_for(tenant.id, dec!(100), &[product_item()])
            .await
            .unwrap();
        assert_eq!(again, line);
    }
}

#[tokio::test]
async fn tax_falls_back_to_zero_without_rules_or_flat_settings() {
    let app = setup().await;
    let tenant = seed_tenant(&app.db, false).await; // tax_enabled = false

    let line = app
        .jobs
        .rules
        .resolve_tax_for(tenant.id, dec!(100), &[product_item()])
        .await
        .unwrap();
    assert_eq!(line.rate, Decimal::ZERO);
    assert_eq!(line.tax_amount, Decimal::ZERO);
}
