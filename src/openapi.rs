use utoipa::OpenApi;

/// Aggregated OpenAPI document for the HTTP surface. Served as JSON at
/// `/api/v1/openapi.json`; no bundled UI.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "storefront-api",
        description = "Multi-tenant point-of-sale core: stock ledger, rule resolution, automation job triggers"
    ),
    paths(
        crate::handlers::triggers::auto_clock_out_body,
        crate::handlers::triggers::auto_clock_out_query,
        crate::handlers::triggers::no_show_body,
        crate::handlers::triggers::booking_reminders_body,
        crate::handlers::triggers::dynamic_pricing_body,
        crate::handlers::inventory::adjust_stock,
        crate::handlers::inventory::low_stock,
        crate::handlers::rules::validate_discount,
        crate::handlers::rules::resolve_tax,
    ),
    components(schemas(
        crate::errors::ErrorResponse,
        crate::jobs::JobRunResult,
        crate::handlers::inventory::AdjustStockRequest,
        crate::handlers::inventory::AdjustStockResponse,
        crate::handlers::inventory::LowStockItem,
        crate::handlers::rules::ValidateDiscountRequest,
        crate::handlers::rules::ResolveTaxRequest,
    )),
    tags(
        (name = "jobs", description = "Automation job triggers"),
        (name = "inventory", description = "Stock ledger"),
        (name = "rules", description = "Tax and discount resolution")
    )
)]
pub struct ApiDoc;

pub fn openapi_json() -> serde_json::Value {
    serde_json::to_value(ApiDoc::openapi()).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_contains_trigger_paths() {
        let doc = openapi_json();
        let paths = doc
            .get("paths")
            .and_then(|p| p.as_object())
            .expect("paths object");
        assert!(paths.contains_key("/api/v1/jobs/auto-clock-out"));
        assert!(paths.contains_key("/api/v1/inventory/adjust"));
    }
}
