mod common;

use common::{seed_product, seed_tenant, setup};
use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter};
use storefront_api::{
    entities::{product, stock_movement, stock_movement::MovementType},
    errors::ServiceError,
    services::stock_ledger::AdjustStockCommand,
};
use uuid::Uuid;

fn sale(product_id: Uuid, tenant_id: Uuid, quantity: i32) -> AdjustStockCommand {
    AdjustStockCommand {
        product_id,
        tenant_id,
        quantity,
        movement_type: MovementType::Sale,
        branch_id: None,
        transaction_id: None,
        user_id: None,
        reason: None,
        notes: None,
    }
}

#[tokio::test]
async fn sale_decrements_stock_and_appends_one_movement() {
    let app = setup().await;
    let tenant = seed_tenant(&app.db, false).await;
    let item = seed_product(&app.db, tenant.id, 10).await;

    let adjustment = app
        .jobs
        .ledger
        .adjust_stock(sale(item.id, tenant.id, -3))
        .await
        .expect("adjustment should succeed");

    assert_eq!(adjustment.previous_stock, 10);
    assert_eq!(adjustment.new_stock, 7);

    let reloaded = product::Entity::find_by_id(item.id)
        .one(app.db.as_ref())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(reloaded.stock, 7);

    let movements = stock_movement::Entity::find()
        .filter(stock_movement::Column::ProductId.eq(item.id))
        .all(app.db.as_ref())
        .await
        .unwrap();
    assert_eq!(movements.len(), 1);
    assert_eq!(movements[0].previous_stock, 10);
    assert_eq!(movements[0].new_stock, 7);
    assert_eq!(movements[0].quantity, -3);
    assert_eq!(movements[0].movement_type, "sale");
}

#[tokio::test]
async fn insufficient_stock_aborts_without_movement() {
    let app = setup().await;
    let tenant = seed_tenant(&app.db, false).await;
    let item = seed_product(&app.db, tenant.id, 7).await;

    let err = app
        .jobs
        .ledger
        .adjust_stock(sale(item.id, tenant.id, -10))
        .await
        .expect_err("oversell must fail");
    assert!(matches!(err, ServiceError::InsufficientStock { .. }));

    // Neither write committed: stock untouched, ledger empty
    let reloaded = product::Entity::find_by_id(item.id)
        .one(app.db.as_ref())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(reloaded.stock, 7);

    let movement_count = stock_movement::Entity::find()
        .filter(stock_movement::Column::ProductId.eq(item.id))
        .count(app.db.as_ref())
        .await
        .unwrap();
    assert_eq!(movement_count, 0);
}

#[tokio::test]
async fn out_of_stock_sales_allowed_when_tenant_opts_in() {
    let app = setup().await;
    let tenant = seed_tenant(&app.db, true).await;
    let item = seed_product(&app.db, tenant.id, 2).await;

    let adjustment = app
        .jobs
        .ledger
        .adjust_stock(sale(item.id, tenant.id, -5))
        .await
        .expect("oversell allowed for this tenant");
    assert_eq!(adjustment.new_stock, -3);
}

#[tokio::test]
async fn unknown_product_and_foreign_tenant_are_not_found() {
    let app = setup().await;
    let tenant = seed_tenant(&app.db, false).await;
    let other_tenant = seed_tenant(&app.db, false).await;
    let item = seed_product(&app.db, tenant.id, 10).await;

    let err = app
        .jobs
        .ledger
        .adjust_stock(sale(Uuid::new_v4(), tenant.id, -1))
        .await
        .expect_err("unknown product");
    assert!(matches!(err, ServiceError::NotFound(_)));

    // A product id from another tenant must not be visible
    let err = app
        .jobs
        .ledger
        .adjust_stock(sale(item.id, other_tenant.id, -1))
        .await
        .expect_err("cross-tenant access");
    assert!(matches!(err, ServiceError::NotFound(_)));
}

#[tokio::test]
async fn zero_quantity_is_rejected() {
    let app = setup().await;
    let tenant = seed_tenant(&app.db, false).await;
    let item = seed_product(&app.db, tenant.id, 10).await;

    let err = app
        .jobs
        .ledger
        .adjust_stock(sale(item.id, tenant.id, 0))
        .await
        .expect_err("zero delta");
    assert!(matches!(err, ServiceError::ValidationError(_)));
}

#[tokio::test]
async fn final_stock_equals_sum_of_committed_movement_deltas() {
    let app = setup().await;
    let tenant = seed_tenant(&app.db, false).await;
    let item = seed_product(&app.db, tenant.id, 0).await;

    let deltas: [(i32, MovementType); 7] = [
        (20, MovementType::Purchase),
        (-3, MovementType::Sale),
        (-5, MovementType::Sale),
        (4, MovementType::Return),
        (-40, MovementType::Sale), // fails: would go negative
        (-2, MovementType::Damage),
        (6, MovementType::Adjustment),
    ];

    for (quantity, movement_type) in deltas {
        let _ = app
            .jobs
            .ledger
            .adjust_stock(AdjustStockCommand {
                movement_type,
                ..sale(item.id, tenant.id, quantity)
            })
            .await;
    }

    let reloaded = product::Entity::find_by_id(item.id)
        .one(app.db.as_ref())
        .await
        .unwrap()
        .unwrap();

    let movements = stock_movement::Entity::find()
        .filter(stock_movement::Column::ProductId.eq(item.id))
        .all(app.db.as_ref())
        .await
        .unwrap();
    let ledger_sum: i32 = movements.iter().map(|m| m.quantity).sum();

    assert_eq!(reloaded.stock, ledger_sum);
    assert_eq!(reloaded.stock, 20);
    // The failed oversell left no row behind
    assert_eq!(movements.len(), 6);
}

#[tokio::test]
async fn branch_adjustments_track_branch_rows_and_aggregate() {
    let app = setup().await;
    let tenant = seed_tenant(&app.db, false).await;
    let item = seed_product(&app.db, tenant.id, 0).await;
    let branch = Uuid::new_v4();

    // First receipt creates the branch row
    app.jobs
        .ledger
        .adjust_stock(AdjustStockCommand {
            movement_type: MovementType::Purchase,
            branch_id: Some(branch),
            ..sale(item.id, tenant.id, 8)
        })
        .await
        .expect("receipt into branch");

    // Branch-scoped sale
    app.jobs
        .ledger
        .adjust_stock(AdjustStockCommand {
            branch_id: Some(branch),
            ..sale(item.id, tenant.id, -3)
        })
        .await
        .expect("branch sale");

    // Selling more than the branch holds fails even if aggregate would allow it
    let err = app
        .jobs
        .ledger
        .adjust_stock(AdjustStockCommand {
            branch_id: Some(branch),
            ..sale(item.id, tenant.id, -6)
        })
        .await
        .expect_err("branch oversell");
    assert!(matches!(err, ServiceError::InsufficientStock { .. }));

    let rows = app
        .jobs
        .ledger
        .get_low_stock(tenant.id, Some(branch), Some(100))
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].effective_stock, 5);

    let reloaded = product::Entity::find_by_id(item.id)
        .one(app.db.as_ref())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(reloaded.stock, 5);
}

#[tokio::test]
async fn low_stock_uses_tenant_default_threshold() {
    let app = setup().await;
    let tenant = seed_tenant(&app.db, false).await; // threshold 10
    let low = seed_product(&app.db, tenant.id, 3).await;
    let _ok = seed_product(&app.db, tenant.id, 50).await;

    let rows = app
        .jobs
        .ledger
        .get_low_stock(tenant.id, None, None)
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].product.id, low.id);
    assert_eq!(rows[0].threshold, 10);

    // Explicit threshold overrides the tenant default
    let rows = app
        .jobs
        .ledger
        .get_low_stock(tenant.id, None, Some(60))
        .await
        .unwrap();
    assert_eq!(rows.len(), 2);
}

#[tokio::test]
async fn movements_list_newest_first() {
    let app = setup().await;
    let tenant = seed_tenant(&app.db, false).await;
    let item = seed_product(&app.db, tenant.id, 0).await;

    for quantity in [5, -1, -2] {
        let movement_type = if quantity > 0 {
            MovementType::Purchase
        } else {
            MovementType::Sale
        };
        app.jobs
            .ledger
            .adjust_stock(AdjustStockCommand {
                movement_type,
                ..sale(item.id, tenant.id, quantity)
            })
            .await
            .unwrap();
    }

    let movements = app
        .jobs
        .ledger
        .list_movements(tenant.id, item.id, 2)
        .await
        .unwrap();
    assert_eq!(movements.len(), 2);
    // Chain invariant holds on every row
    for m in &movements {
        assert_eq!(m.new_stock, m.previous_stock + m.quantity);
    }
}
