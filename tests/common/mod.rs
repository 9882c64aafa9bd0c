#![allow(dead_code)]

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sea_orm::{ActiveModelTrait, Set};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration as StdDuration;
use storefront_api::{
    config::AppConfig,
    db::{establish_connection_with_config, DbConfig, DbPool},
    entities::{
        attendance, booking,
        booking::BookingStatus,
        branch_change, cart,
        cart::CartStatus,
        cash_drawer_session,
        cash_drawer_session::DrawerStatus,
        discount_rule,
        discount_rule::DiscountType,
        pos_transaction,
        pos_transaction::TransactionStatus,
        product, stock_movement, tax_rule, tenant,
    },
    errors::ServiceError,
    events::{process_events, EventSender},
    jobs::JobContext,
    migrator::Migrator,
    services::{
        audit::AuditTrail,
        notifications::{Notification, Notifier},
        rule_resolver::RuleResolver,
        stock_ledger::StockLedger,
        tenants::TenantDirectory,
    },
};
use sea_orm_migration::MigratorTrait;
use tokio::sync::mpsc;
use uuid::Uuid;

/// In-memory SQLite app wiring for integration tests. A single pooled
/// connection keeps every query on the same in-memory database.
pub struct TestApp {
    pub db: Arc<DbPool>,
    pub jobs: JobContext,
    pub notifier: Arc<CountingNotifier>,
}

pub async fn setup() -> TestApp {
    let db_config = DbConfig {
        url: "sqlite::memory:".to_string(),
        max_connections: 1,
        min_connections: 1,
        connect_timeout: StdDuration::from_secs(5),
        idle_timeout: StdDuration::from_secs(600),
        acquire_timeout: StdDuration::from_secs(5),
    };
    let db = establish_connection_with_config(&db_config)
        .await
        .expect("connect to in-memory sqlite");
    Migrator::up(&db, None).await.expect("run migrations");
    let db = Arc::new(db);

    let (event_tx, event_rx) = mpsc::channel(256);
    let event_sender = EventSender::new(event_tx);
    tokio::spawn(process_events(event_rx));

    let notifier = Arc::new(CountingNotifier::default());

    let config = AppConfig::new(
        "sqlite::memory:".to_string(),
        "127.0.0.1".to_string(),
        0,
        "test".to_string(),
    );

    let jobs = JobContext {
        db: db.clone(),
        config,
        event_sender: event_sender.clone(),
        notifier: notifier.clone(),
        audit: AuditTrail::new(db.clone()),
        tenants: TenantDirectory::new(db.clone()),
        ledger: StockLedger::new(db.clone(), event_sender.clone()),
        rules: RuleResolver::new(db.clone(), event_sender),
    };

    TestApp {
        db,
        jobs,
        notifier,
    }
}

/// Notifier that counts deliveries and can be told to fail the next N sends.
#[derive(Default)]
pub struct CountingNotifier {
    sent: AtomicUsize,
    failures_remaining: AtomicUsize,
}

impl CountingNotifier {
    pub fn sent_count(&self) -> usize {
        self.sent.load(Ordering::SeqCst)
    }

    pub fn fail_next(&self, n: usize) {
        self.failures_remaining.store(n, Ordering::SeqCst);
    }
}

#[async_trait::async_trait]
impl Notifier for CountingNotifier {
    async fn notify(&self, _notification: &Notification) -> Result<(), ServiceError> {
        let remaining = self.failures_remaining.load(Ordering::SeqCst);
        if remaining > 0 {
            self.failures_remaining.store(remaining - 1, Ordering::SeqCst);
            return Err(ServiceError::ExternalServiceError(
                "simulated delivery failure".into(),
            ));
        }
        self.sent.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

pub async fn seed_tenant(db: &DbPool, allow_out_of_stock_sales: bool) -> tenant::Model {
    let now = Utc::now();
    tenant::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set("Test Store".to_string()),
        is_active: Set(true),
        tax_enabled: Set(false),
        tax_rate: Set(Decimal::ZERO),
        tax_label: Set("Tax".to_string()),
        low_stock_threshold: Set(10),
        allow_out_of_stock_sales: Set(allow_out_of_stock_sales),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(db)
    .await
    .expect("seed tenant")
}

pub async fn seed_inactive_tenant(db: &DbPool) -> tenant::Model {
    let now = Utc::now();
    tenant::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set("Closed Store".to_string()),
        is_active: Set(false),
        tax_enabled: Set(false),
        tax_rate: Set(Decimal::ZERO),
        tax_label: Set("Tax".to_string()),
        low_stock_threshold: Set(10),
        allow_out_of_stock_sales: Set(false),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(db)
    .await
    .expect("seed inactive tenant")
}

pub async fn seed_product(db: &DbPool, tenant_id: Uuid, stock: i32) -> product::Model {
    seed_product_with(db, tenant_id, stock, dec!(10.00), None).await
}

pub async fn seed_product_with(
    db: &DbPool,
    tenant_id: Uuid,
    stock: i32,
    base_price: Decimal,
    reorder_point: Option<i32>,
) -> product::Model {
    let now = Utc::now();
    product::ActiveModel {
        id: Set(Uuid::new_v4()),
        tenant_id: Set(tenant_id),
        name: Set("Widget".to_string()),
        sku: Set(format!("SKU-{}", &Uuid::new_v4().to_string()[..8])),
        category_id: Set(None),
        is_service: Set(false),
        base_price: Set(base_price),
        price: Set(base_price),
        stock: Set(stock),
        track_inventory: Set(true),
        reorder_point: Set(reorder_point),
        is_active: Set(true),
        needs_sync: Set(false),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(db)
    .await
    .expect("seed product")
}

pub async fn seed_discount(
    db: &DbPool,
    tenant_id: Uuid,
    code: &str,
    discount_type: DiscountType,
    value: Decimal,
    usage_limit: Option<i32>,
) -> discount_rule::Model {
    let now = Utc::now();
    discount_rule::ActiveModel {
        id: Set(Uuid::new_v4()),
        tenant_id: Set(tenant_id),
        code: Set(code.to_string()),
        discount_type: Set(discount_type.to_string()),
        value: Set(value),
        min_purchase_amount: Set(None),
        max_discount_amount: Set(None),
        usage_limit: Set(usage_limit),
        usage_count: Set(0),
        valid_from: Set(now - Duration::days(1)),
        valid_until: Set(now + Duration::days(30)),
        is_active: Set(true),
        needs_sync: Set(false),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(db)
    .await
    .expect("seed discount")
}

pub async fn seed_tax_rule(
    db: &DbPool,
    tenant_id: Uuid,
    rate: Decimal,
    label: &str,
    applies_to: &str,
    priority: i32,
) -> tax_rule::Model {
    tax_rule::ActiveModel {
        id: Set(Uuid::new_v4()),
        tenant_id: Set(tenant_id),
        rate: Set(rate),
        label: Set(label.to_string()),
        applies_to: Set(applies_to.to_string()),
        category_ids: Set(serde_json::json!([])),
        product_ids: Set(serde_json::json!([])),
        priority: Set(priority),
        is_active: Set(true),
        created_at: Set(Utc::now()),
    }
    .insert(db)
    .await
    .expect("seed tax rule")
}

pub async fn seed_booking(
    db: &DbPool,
    tenant_id: Uuid,
    start_time: DateTime<Utc>,
    status: BookingStatus,
) -> booking::Model {
    let now = Utc::now();
    booking::ActiveModel {
        id: Set(Uuid::new_v4()),
        tenant_id: Set(tenant_id),
        customer_id: Set(None),
        service_name: Set("Haircut".to_string()),
        start_time: Set(start_time),
        status: Set(status.to_string()),
        reminder_sent: Set(false),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(db)
    .await
    .expect("seed booking")
}

pub async fn seed_attendance(
    db: &DbPool,
    tenant_id: Uuid,
    clock_in: DateTime<Utc>,
    clock_out: Option<DateTime<Utc>>,
) -> attendance::Model {
    attendance::ActiveModel {
        id: Set(Uuid::new_v4()),
        tenant_id: Set(tenant_id),
        employee_id: Set(Uuid::new_v4()),
        clock_in: Set(clock_in),
        clock_out: Set(clock_out),
        auto_clock_out: Set(false),
        created_at: Set(clock_in),
    }
    .insert(db)
    .await
    .expect("seed attendance")
}

pub async fn seed_cart(
    db: &DbPool,
    tenant_id: Uuid,
    status: CartStatus,
    updated_at: DateTime<Utc>,
) -> cart::Model {
    cart::ActiveModel {
        id: Set(Uuid::new_v4()),
        tenant_id: Set(tenant_id),
        customer_id: Set(None),
        items: Set(serde_json::json!([{"sku": "SKU-1", "quantity": 2}])),
        subtotal: Set(dec!(42.00)),
        status: Set(status.to_string()),
        reminder_sent: Set(false),
        created_at: Set(updated_at),
        updated_at: Set(updated_at),
    }
    .insert(db)
    .await
    .expect("seed cart")
}

pub async fn seed_sale_movement(
    db: &DbPool,
    tenant_id: Uuid,
    product_id: Uuid,
    units: i32,
    created_at: DateTime<Utc>,
) -> stock_movement::Model {
    stock_movement::ActiveModel {
        id: Set(Uuid::new_v4()),
        tenant_id: Set(tenant_id),
        product_id: Set(product_id),
        branch_id: Set(None),
        movement_type: Set("sale".to_string()),
        quantity: Set(-units),
        previous_stock: Set(0),
        new_stock: Set(0),
        transaction_id: Set(None),
        user_id: Set(None),
        reason: Set(None),
        notes: Set(None),
        created_at: Set(created_at),
    }
    .insert(db)
    .await
    .expect("seed sale movement")
}

pub async fn seed_transaction(
    db: &DbPool,
    tenant_id: Uuid,
    cashier_id: Uuid,
    status: TransactionStatus,
) -> pos_transaction::Model {
    pos_transaction::ActiveModel {
        id: Set(Uuid::new_v4()),
        tenant_id: Set(tenant_id),
        branch_id: Set(None),
        cashier_id: Set(cashier_id),
        total: Set(dec!(25.00)),
        discount_code: Set(None),
        discount_amount: Set(Decimal::ZERO),
        tax_amount: Set(Decimal::ZERO),
        status: Set(status.to_string()),
        created_at: Set(Utc::now()),
    }
    .insert(db)
    .await
    .expect("seed transaction")
}

pub async fn seed_drawer_session(
    db: &DbPool,
    tenant_id: Uuid,
    cashier_id: Uuid,
    expected: Decimal,
    closing: Decimal,
) -> cash_drawer_session::Model {
    let now = Utc::now();
    cash_drawer_session::ActiveModel {
        id: Set(Uuid::new_v4()),
        tenant_id: Set(tenant_id),
        cashier_id: Set(cashier_id),
        opened_at: Set(now - Duration::hours(8)),
        closed_at: Set(Some(now)),
        opening_amount: Set(dec!(100.00)),
        expected_amount: Set(expected),
        closing_amount: Set(Some(closing)),
        status: Set(DrawerStatus::Closed.to_string()),
    }
    .insert(db)
    .await
    .expect("seed drawer session")
}

pub async fn seed_branch_change(
    db: &DbPool,
    tenant_id: Uuid,
    entity_type: &str,
    entity_id: Uuid,
    payload: serde_json::Value,
    branch_updated_at: DateTime<Utc>,
) -> branch_change::Model {
    branch_change::ActiveModel {
        id: Set(Uuid::new_v4()),
        tenant_id: Set(tenant_id),
        branch_id: Set(Uuid::new_v4()),
        entity_type: Set(entity_type.to_string()),
        entity_id: Set(entity_id),
        payload: Set(payload),
        branch_updated_at: Set(branch_updated_at),
        applied: Set(false),
        created_at: Set(Utc::now()),
    }
    .insert(db)
    .await
    .expect("seed branch change")
}
