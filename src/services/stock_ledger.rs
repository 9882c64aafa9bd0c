use crate::{
    db::DbPool,
    entities::{
        branch_stock::{self, Entity as BranchStock},
        product::{self, Entity as Product},
        stock_movement::{self, Entity as StockMovement, MovementType},
        tenant::Entity as Tenant,
    },
    errors::ServiceError,
    events::{Event, EventSender},
};
use chrono::Utc;
use sea_orm::sea_query::{Expr, ExprTrait};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseTransaction, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set, TransactionError, TransactionTrait,
};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

/// One stock-affecting operation. `quantity` is the signed delta.
#[derive(Debug, Clone)]
pub struct AdjustStockCommand {
    pub product_id: Uuid,
    pub tenant_id: Uuid,
    pub quantity: i32,
    pub movement_type: MovementType,
    pub branch_id: Option<Uuid>,
    pub transaction_id: Option<Uuid>,
    pub user_id: Option<Uuid>,
    pub reason: Option<String>,
    pub notes: Option<String>,
}

/// Outcome of a committed adjustment.
#[derive(Debug, Clone)]
pub struct StockAdjustment {
    pub movement_id: Uuid,
    pub previous_stock: i32,
    pub new_stock: i32,
}

/// A product at or below its effective threshold.
#[derive(Debug, Clone)]
pub struct LowStockRow {
    pub product: product::Model,
    pub effective_stock: i32,
    pub threshold: i32,
}

/// Owns the current-stock counter and the append-only movement ledger.
/// Every stock mutation in the system funnels through [`adjust_stock`];
/// the counter update and the movement insert commit as one transaction.
#[derive(Clone)]
pub struct StockLedger {
    db: Arc<DbPool>,
    event_sender: EventSender,
}

struct CommittedAdjustment {
    adjustment: StockAdjustment,
    low_stock_threshold: Option<i32>,
}

impl StockLedger {
    pub fn new(db: Arc<DbPool>, event_sender: EventSender) -> Self {
        Self { db, event_sender }
    }

    /// Applies a signed stock delta and appends the matching movement row.
    ///
    /// The counter mutation is a single conditional `UPDATE stock = stock +
    /// delta` guarded by non-negativity (unless the tenant allows
    /// out-of-stock sales), so concurrent adjustments against one product
    /// serialize in the database rather than behind an application lock.
    /// If either write fails, neither is committed.
    #[instrument(skip(self), fields(product_id = %cmd.product_id, tenant_id = %cmd.tenant_id))]
    pub async fn adjust_stock(
        &self,
        cmd: AdjustStockCommand,
    ) -> Result<StockAdjustment, ServiceError> {
        if cmd.quantity == 0 {
            return Err(ServiceError::ValidationError(
                "quantity must be non-zero".into(),
            ));
        }

        let command = cmd.clone();
        let committed = self
            .db
            .transaction::<_, CommittedAdjustment, ServiceError>(move |txn| {
                Box::pin(async move { apply_adjustment(txn, &command).await })
            })
            .await
            .map_err(|e| match e {
                TransactionError::Connection(db_err) => ServiceError::db_error(db_err),
                TransactionError::Transaction(service_err) => service_err,
            })?;

        let adjustment = committed.adjustment;
        info!(
            previous_stock = adjustment.previous_stock,
            new_stock = adjustment.new_stock,
            movement_type = %cmd.movement_type,
            "stock adjusted"
        );

        self.event_sender
            .send(Event::StockAdjusted {
                tenant_id: cmd.tenant_id,
                product_id: cmd.product_id,
                movement_type: cmd.movement_type.to_string(),
                quantity: cmd.quantity,
                previous_stock: adjustment.previous_stock,
                new_stock: adjustment.new_stock,
            })
            .await
            .map_err(ServiceError::EventError)?;

        if let Some(threshold) = committed.low_stock_threshold {
            self.event_sender
                .send(Event::LowStock {
                    tenant_id: cmd.tenant_id,
                    product_id: cmd.product_id,
                    stock: adjustment.new_stock,
                    threshold,
                })
                .await
                .map_err(ServiceError::EventError)?;
        }

        Ok(adjustment)
    }

    /// Products whose effective stock is at or below `threshold` (the tenant
    /// default when unspecified). With `branch_id`, the branch row is the
    /// effective stock.
    #[instrument(skip(self))]
    pub async fn get_low_stock(
        &self,
        tenant_id: Uuid,
        branch_id: Option<Uuid>,
        threshold: Option<i32>,
    ) -> Result<Vec<LowStockRow>, ServiceError> {
        let db = self.db.as_ref();

        let tenant = Tenant::find_by_id(tenant_id)
            .one(db)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::NotFound(format!("Tenant {} not found", tenant_id)))?;
        let threshold = threshold.unwrap_or(tenant.low_stock_threshold);

        match branch_id {
            None => {
                let products = Product::find()
                    .filter(product::Column::TenantId.eq(tenant_id))
                    .filter(product::Column::TrackInventory.eq(true))
                    .filter(product::Column::IsActive.eq(true))
                    .filter(product::Column::Stock.lte(threshold))
                    .all(db)
                    .await
                    .map_err(ServiceError::db_error)?;

                Ok(products
                    .into_iter()
                    .map(|p| LowStockRow {
                        effective_stock: p.stock,
                        threshold,
                        product: p,
                    })
                    .collect())
            }
            Some(branch) => {
                let rows = BranchStock::find()
                    .filter(branch_stock::Column::TenantId.eq(tenant_id))
                    .filter(branch_stock::Column::BranchId.eq(branch))
                    .filter(branch_stock::Column::Stock.lte(threshold))
                    .find_also_related(Product)
                    .all(db)
                    .await
                    .map_err(ServiceError::db_error)?;

                Ok(rows
                    .into_iter()
                    .filter_map(|(branch_row, maybe_product)| {
                        maybe_product
                            .filter(|p| p.track_inventory && p.is_active)
                            .map(|p| LowStockRow {
                                effective_stock: branch_row.stock,
                                threshold,
                                product: p,
                            })
                    })
                    .collect())
            }
        }
    }

    /// Read-only view of the movement ledger, newest first.
    #[instrument(skip(self))]
    pub async fn list_movements(
        &self,
        tenant_id: Uuid,
        product_id: Uuid,
        limit: u64,
    ) -> Result<Vec<stock_movement::Model>, ServiceError> {
        StockMovement::find()
            .filter(stock_movement::Column::TenantId.eq(tenant_id))
            .filter(stock_movement::Column::ProductId.eq(product_id))
            .order_by_desc(stock_movement::Column::CreatedAt)
            .limit(limit)
            .all(self.db.as_ref())
            .await
            .map_err(ServiceError::db_error)
    }
}

async fn apply_adjustment(
    txn: &DatabaseTransaction,
    cmd: &AdjustStockCommand,
) -> Result<CommittedAdjustment, ServiceError> {
    let tenant = Tenant::find_by_id(cmd.tenant_id)
        .one(txn)
        .await
        .map_err(ServiceError::db_error)?
        .ok_or_else(|| ServiceError::NotFound(format!("Tenant {} not found", cmd.tenant_id)))?;

    let now = Utc::now();
    let guard_negative = cmd.quantity < 0 && !tenant.allow_out_of_stock_sales;

    let mut update = Product::update_many()
        .col_expr(
            product::Column::Stock,
            Expr::col(product::Column::Stock).add(cmd.quantity),
        )
        .col_expr(product::Column::UpdatedAt, Expr::value(now))
        .filter(product::Column::Id.eq(cmd.product_id))
        .filter(product::Column::TenantId.eq(cmd.tenant_id))
        .filter(product::Column::TrackInventory.eq(true));
    if guard_negative {
        update = update.filter(Expr::col(product::Column::Stock).add(cmd.quantity).gte(0));
    }

    let result = update.exec(txn).await.map_err(ServiceError::db_error)?;

    if result.rows_affected == 0 {
        // Distinguish a missing product from an insufficient balance.
        let existing = Product::find_by_id(cmd.product_id)
            .filter(product::Column::TenantId.eq(cmd.tenant_id))
            .one(txn)
            .await
            .map_err(ServiceError::db_error)?;

        return match existing {
            None => Err(ServiceError::NotFound(format!(
                "Product {} not found for tenant {}",
                cmd.product_id, cmd.tenant_id
            ))),
            Some(p) if !p.track_inventory => Err(ServiceError::InvalidOperation(format!(
                "Product {} does not track inventory",
                cmd.product_id
            ))),
            Some(p) => Err(ServiceError::InsufficientStock {
                product_id: cmd.product_id,
                available: p.stock,
                requested: -cmd.quantity,
            }),
        };
    }

    let updated = Product::find_by_id(cmd.product_id)
        .one(txn)
        .await
        .map_err(ServiceError::db_error)?
        .ok_or_else(|| ServiceError::InternalError("product vanished mid-transaction".into()))?;

    let new_stock = updated.stock;
    let previous_stock = new_stock - cmd.quantity;

    if let Some(branch) = cmd.branch_id {
        adjust_branch_stock(txn, cmd, branch, guard_negative, now).await?;
    }

    let movement_id = Uuid::new_v4();
    let movement = stock_movement::ActiveModel {
        id: Set(movement_id),
        tenant_id: Set(cmd.tenant_id),
        product_id: Set(cmd.product_id),
        branch_id: Set(cmd.branch_id),
        movement_type: Set(cmd.movement_type.to_string()),
        quantity: Set(cmd.quantity),
        previous_stock: Set(previous_stock),
        new_stock: Set(new_stock),
        transaction_id: Set(cmd.transaction_id),
        user_id: Set(cmd.user_id),
        reason: Set(cmd.reason.clone()),
        notes: Set(cmd.notes.clone()),
        created_at: Set(now),
    };
    movement.insert(txn).await.map_err(ServiceError::db_error)?;

    let threshold = updated.reorder_point.unwrap_or(tenant.low_stock_threshold);
    let low_stock_threshold =
        (cmd.quantity < 0 && updated.track_inventory && new_stock <= threshold)
            .then_some(threshold);

    Ok(CommittedAdjustment {
        adjustment: StockAdjustment {
            movement_id,
            previous_stock,
            new_stock,
        },
        low_stock_threshold,
    })
}

async fn adjust_branch_stock(
    txn: &DatabaseTransaction,
    cmd: &AdjustStockCommand,
    branch: Uuid,
    guard_negative: bool,
    now: chrono::DateTime<Utc>,
) -> Result<(), ServiceError> {
    let mut update = BranchStock::update_many()
        .col_expr(
            branch_stock::Column::Stock,
            Expr::col(branch_stock::Column::Stock).add(cmd.quantity),
        )
        .col_expr(branch_stock::Column::UpdatedAt, Expr::value(now))
        .filter(branch_stock::Column::ProductId.eq(cmd.product_id))
        .filter(branch_stock::Column::TenantId.eq(cmd.tenant_id))
        .filter(branch_stock::Column::BranchId.eq(branch));
    if guard_negative {
        update = update.filter(
            Expr::col(branch_stock::Column::Stock)
                .add(cmd.quantity)
                .gte(0),
        );
    }

    let result = update.exec(txn).await.map_err(ServiceError::db_error)?;
    if result.rows_affected > 0 {
        return Ok(());
    }

    let existing = BranchStock::find()
        .filter(branch_stock::Column::ProductId.eq(cmd.product_id))
        .filter(branch_stock::Column::TenantId.eq(cmd.tenant_id))
        .filter(branch_stock::Column::BranchId.eq(branch))
        .one(txn)
        .await
        .map_err(ServiceError::db_error)?;

    match existing {
        Some(row) => Err(ServiceError::InsufficientStock {
            product_id: cmd.product_id,
            available: row.stock,
            requested: -cmd.quantity,
        }),
        // First receipt into this branch creates the row.
        None if cmd.quantity > 0 || !guard_negative => {
            let row = branch_stock::ActiveModel {
                id: Set(Uuid::new_v4()),
                tenant_id: Set(cmd.tenant_id),
                product_id: Set(cmd.product_id),
                branch_id: Set(branch),
                stock: Set(cmd.quantity),
                updated_at: Set(now),
            };
            row.insert(txn).await.map_err(ServiceError::db_error)?;
            Ok(())
        }
        None => Err(ServiceError::InsufficientStock {
            product_id: cmd.product_id,
            available: 0,
            requested: -cmd.quantity,
        }),
    }
}
