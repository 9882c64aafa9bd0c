use crate::{
    errors::ServiceError,
    services::rule_resolver::{DiscountQuote, TaxLine, TaxableItem},
    ApiResponse, AppState,
};
use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::post,
    Json, Router,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

pub fn rules_routes() -> Router<AppState> {
    Router::new()
        .route("/discounts/validate", post(validate_discount))
        .route("/discounts/redeem", post(redeem_discount))
        .route("/tax/resolve", post(resolve_tax))
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ValidateDiscountRequest {
    pub tenant_id: Uuid,
    pub code: String,
    pub subtotal: Decimal,
}

/// Pure validation: computes the quote without consuming a use.
#[utoipa::path(
    post,
    path = "/api/v1/rules/discounts/validate",
    request_body = ValidateDiscountRequest,
    responses(
        (status = 200, description = "Discount quote", body = DiscountQuote),
        (status = 422, description = "Code rejected", body = crate::errors::ErrorResponse)
    ),
    tag = "rules"
)]
pub async fn validate_discount(
    State(state): State<AppState>,
    Json(payload): Json<ValidateDiscountRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let quote = state
        .rules()
        .validate_discount(payload.tenant_id, &payload.code, payload.subtotal)
        .await?;

    Ok((StatusCode::OK, Json(ApiResponse::success(quote))))
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct RedeemDiscountRequest {
    pub tenant_id: Uuid,
    pub code: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RedeemDiscountResponse {
    pub code: String,
    pub usage_count: i32,
}

/// Consumes one use of the code; called once a sale is finalized.
pub async fn redeem_discount(
    State(state): State<AppState>,
    Json(payload): Json<RedeemDiscountRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let usage_count = state
        .rules()
        .redeem_discount(payload.tenant_id, &payload.code)
        .await?;

    Ok((
        StatusCode::OK,
        Json(ApiResponse::success(RedeemDiscountResponse {
            code: payload.code,
            usage_count,
        })),
    ))
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ResolveTaxRequest {
    pub tenant_id: Uuid,
    /// Subtotal after any discount was applied
    pub subtotal: Decimal,
    #[serde(default)]
    pub items: Vec<TaxableItem>,
}

/// Deterministic tax resolution over the tenant's active rule set.
#[utoipa::path(
    post,
    path = "/api/v1/rules/tax/resolve",
    request_body = ResolveTaxRequest,
    responses(
        (status = 200, description = "Resolved tax line", body = TaxLine),
        (status = 404, description = "Unknown tenant", body = crate::errors::ErrorResponse)
    ),
    tag = "rules"
)]
pub async fn resolve_tax(
    State(state): State<AppState>,
    Json(payload): Json<ResolveTaxRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let line = state
        .rules()
        .resolve_tax_for(payload.tenant_id, payload.subtotal, &payload.items)
        .await?;

    Ok((StatusCode::OK, Json(ApiResponse::success(line))))
}
