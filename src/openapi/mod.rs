use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "Bearer",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Storefront API",
        version = "0.1.0",
        description = r#"
# Storefront API

Checkout and order history for the storefront.

## Authentication

Every `/api/v1` endpoint requires a bearer token:

```
Authorization: Bearer <your-jwt-token>
```

## Error Handling

Errors share one JSON shape and echo the `X-Request-Id` of the call:

```json
{
  "error": "Bad Request",
  "message": "Cart is empty",
  "code": "empty_cart",
  "request_id": "2b1f...",
  "timestamp": "2024-01-01T00:00:00Z"
}
```
        "#,
        license(name = "MIT", url = "https://opensource.org/licenses/MIT")
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development")
    ),
    tags(
        (name = "Checkout", description = "Cart to transaction conversion"),
        (name = "Transactions", description = "Order history and status lifecycle"),
        (name = "Health", description = "Health check endpoints")
    ),
    paths(
        crate::handlers::checkout::checkout,
        crate::handlers::transactions::list_transactions,
        crate::handlers::transactions::get_transaction,
        crate::handlers::transactions::update_transaction_status,
        crate::health::health,
    ),
    components(
        schemas(
            crate::services::checkout::CheckoutRequest,
            crate::services::checkout::CheckoutReceipt,
            crate::services::transactions::TransactionSummary,
            crate::services::transactions::TransactionDetail,
            crate::services::transactions::TransactionLine,
            crate::handlers::transactions::UpdateStatusRequest,
            crate::entities::transaction::TransactionStatus,
            crate::health::HealthInfo,
            crate::health::HealthStatus,
            crate::errors::ErrorResponse
        )
    ),
    modifiers(&BearerAuth)
)]
pub struct ApiDocV1;

pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDocV1::openapi())
}
