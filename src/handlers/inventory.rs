use crate::{
    entities::stock_movement::MovementType,
    errors::ServiceError,
    services::stock_ledger::AdjustStockCommand,
    ApiResponse, AppState,
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

pub fn inventory_routes() -> Router<AppState> {
    Router::new()
        .route("/adjust", post(adjust_stock))
        .route("/low-stock", get(low_stock))
        .route("/:product_id/movements", get(list_movements))
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct AdjustStockRequest {
    pub tenant_id: Uuid,
    pub product_id: Uuid,
    /// Signed delta: negative for sales/damage, positive for receipts
    pub quantity: i32,
    pub movement_type: MovementType,
    pub branch_id: Option<Uuid>,
    pub transaction_id: Option<Uuid>,
    pub user_id: Option<Uuid>,
    pub reason: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AdjustStockResponse {
    pub movement_id: Uuid,
    pub previous_stock: i32,
    pub new_stock: i32,
}

/// Apply one stock adjustment through the ledger.
#[utoipa::path(
    post,
    path = "/api/v1/inventory/adjust",
    request_body = AdjustStockRequest,
    responses(
        (status = 200, description = "Stock adjusted", body = AdjustStockResponse),
        (status = 404, description = "Unknown product or tenant", body = crate::errors::ErrorResponse),
        (status = 422, description = "Insufficient stock", body = crate::errors::ErrorResponse)
    ),
    tag = "inventory"
)]
pub async fn adjust_stock(
    State(state): State<AppState>,
    Json(payload): Json<AdjustStockRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let adjustment = state
        .ledger()
        .adjust_stock(AdjustStockCommand {
            product_id: payload.product_id,
            tenant_id: payload.tenant_id,
            quantity: payload.quantity,
            movement_type: payload.movement_type,
            branch_id: payload.branch_id,
            transaction_id: payload.transaction_id,
            user_id: payload.user_id,
            reason: payload.reason,
            notes: payload.notes,
        })
        .await?;

    Ok((
        StatusCode::OK,
        Json(ApiResponse::success(AdjustStockResponse {
            movement_id: adjustment.movement_id,
            previous_stock: adjustment.previous_stock,
            new_stock: adjustment.new_stock,
        })),
    ))
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct LowStockQuery {
    pub tenant_id: Uuid,
    pub branch_id: Option<Uuid>,
    /// Override the tenant's default threshold
    pub threshold: Option<i32>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LowStockItem {
    pub product_id: Uuid,
    pub name: String,
    pub sku: String,
    pub effective_stock: i32,
    pub threshold: i32,
    pub reorder_point: Option<i32>,
}

/// Products at or below the effective low-stock threshold.
#[utoipa::path(
    get,
    path = "/api/v1/inventory/low-stock",
    params(LowStockQuery),
    responses(
        (status = 200, description = "Low stock products returned"),
        (status = 404, description = "Unknown tenant", body = crate::errors::ErrorResponse)
    ),
    tag = "inventory"
)]
pub async fn low_stock(
    State(state): State<AppState>,
    Query(query): Query<LowStockQuery>,
) -> Result<impl IntoResponse, ServiceError> {
    let rows = state
        .ledger()
        .get_low_stock(query.tenant_id, query.branch_id, query.threshold)
        .await?;

    let items: Vec<LowStockItem> = rows
        .into_iter()
        .map(|row| LowStockItem {
            product_id: row.product.id,
            name: row.product.name,
            sku: row.product.sku,
            effective_stock: row.effective_stock,
            threshold: row.threshold,
            reorder_point: row.product.reorder_point,
        })
        .collect();

    Ok((StatusCode::OK, Json(ApiResponse::success(items))))
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct MovementsQuery {
    pub tenant_id: Uuid,
    pub limit: Option<u64>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MovementRow {
    pub id: Uuid,
    pub movement_type: String,
    pub quantity: i32,
    pub previous_stock: i32,
    pub new_stock: i32,
    pub transaction_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

/// The movement ledger for one product, newest first.
pub async fn list_movements(
    State(state): State<AppState>,
    Path(product_id): Path<Uuid>,
    Query(query): Query<MovementsQuery>,
) -> Result<impl IntoResponse, ServiceError> {
    let movements = state
        .ledger()
        .list_movements(query.tenant_id, product_id, query.limit.unwrap_or(50))
        .await?;

    let rows: Vec<MovementRow> = movements
        .into_iter()
        .map(|m| MovementRow {
            id: m.id,
            movement_type: m.movement_type,
            quantity: m.quantity,
            previous_stock: m.previous_stock,
            new_stock: m.new_stock,
            transaction_id: m.transaction_id,
            created_at: m.created_at,
        })
        .collect();

    Ok((StatusCode::OK, Json(ApiResponse::success(rows))))
}
