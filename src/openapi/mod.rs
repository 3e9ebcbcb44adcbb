use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Restock API",
        version = "1.0.0",
        description = r#"
# Restock API

Inventory replenishment and supplier selection for a building-materials
storefront.

## Features

- **Replenishment Suggestions**: Velocity-based stock-out projection and ranked restock recommendations
- **Reorder Points**: Dynamic per-product reorder points from trailing sales and supplier lead times
- **Supplier Ranking**: Deterministic offer comparison for a given order quantity
- **Purchase Requests**: Pending / approved / converted / rejected lifecycle with audit fields
- **Purchase Orders**: Draft orders produced from approved requests
- **Batch Jobs**: Scheduled reorder-point refresh and automatic request generation

## Error Handling

Errors use a consistent response format with appropriate HTTP status codes:

```json
{
  "error": "Not Found",
  "message": "Product 550e8400-e29b-41d4-a716-446655440000 not found",
  "timestamp": "2026-01-01T00:00:00Z"
}
```
        "#,
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development")
    ),
    tags(
        (name = "suggestions", description = "Replenishment suggestion generation"),
        (name = "inventory", description = "Stock level reporting"),
        (name = "offers", description = "Supplier offer catalog and ranking"),
        (name = "requests", description = "Purchase request lifecycle"),
        (name = "purchase-orders", description = "Purchase orders created from requests"),
        (name = "batch", description = "Scheduled maintenance jobs")
    ),
    paths(
        // Suggestions
        crate::handlers::suggestions::generate_suggestions,
        crate::handlers::suggestions::low_stock_report,

        // Offers
        crate::handlers::offers::list_offers,
        crate::handlers::offers::upsert_offer,
        crate::handlers::offers::compare_suppliers,

        // Requests
        crate::handlers::requests::create_request,
        crate::handlers::requests::list_requests,
        crate::handlers::requests::get_request,
        crate::handlers::requests::approve_request,
        crate::handlers::requests::reject_request,
        crate::handlers::requests::convert_request,
        crate::handlers::requests::assign_supplier,

        // Purchase orders
        crate::handlers::purchase_orders::list_purchase_orders,
        crate::handlers::purchase_orders::get_purchase_order,

        // Batch
        crate::handlers::batch::refresh_reorder_points,
        crate::handlers::batch::auto_generate_requests,
    ),
    components(
        schemas(
            // Common types
            crate::ApiResponse<serde_json::Value>,

            // Suggestion types
            crate::services::suggestions::ReplenishmentSuggestion,
            crate::services::suggestions::LowStockAlert,
            crate::services::suggestions::AlertTier,
            crate::services::supplier_ranking::RankedSupplierOffer,

            // Request types
            crate::services::purchase_requests::CreatePurchaseRequestInput,
            crate::services::purchase_requests::PurchaseRequestDetail,
            crate::services::purchase_requests::AutoGenerateSummary,
            crate::handlers::requests::ApproveRequestBody,
            crate::handlers::requests::AssignSupplierBody,
            crate::entities::purchase_request::RequestStatus,
            crate::entities::purchase_request::RequestPriority,
            crate::entities::purchase_request::RequestSource,

            // Purchase order types
            crate::services::purchase_orders::PurchaseOrderDetail,
            crate::services::purchase_orders::PurchaseOrderLine,
            crate::entities::purchase_order::PurchaseOrderStatus,

            // Offer types
            crate::services::supplier_offers::UpsertSupplierOfferInput,

            // Batch types
            crate::services::reorder_point::ReorderPointRunSummary,

            // Error types
            crate::errors::ErrorResponse
        )
    )
)]
pub struct ApiDocV1;

pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/swagger-ui")
        .url("/api-docs/openapi.json", ApiDocV1::openapi())
        .config(utoipa_swagger_ui::Config::from("/api-docs/openapi.json").try_it_out_enabled(true))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_document_generates() {
        let openapi = ApiDocV1::openapi();
        let json = serde_json::to_string_pretty(&openapi).unwrap();
        assert!(json.contains("Restock API"));
        assert!(json.contains("/api/v1/requests"));
        assert!(json.contains("/api/v1/batch/reorder-points"));
    }
}
