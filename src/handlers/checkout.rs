use crate::handlers::common::{created_response, map_service_error, validate_input};
use crate::{
    auth::AuthUser,
    errors::{ApiError, ErrorResponse},
    services::checkout::{CheckoutReceipt, CheckoutRequest},
    AppState,
};
use axum::{
    extract::{Json, State},
    response::IntoResponse,
};

/// Convert the caller's cart into a transaction
#[utoipa::path(
    post,
    path = "/api/v1/checkout",
    summary = "Check out the current cart",
    description = "Prices the caller's cart, writes the transaction with its lines and decrements stock in one unit of work. Contact fields left out of the body are taken from the caller's profile.",
    request_body = CheckoutRequest,
    responses(
        (status = 201, description = "Transaction created", body = CheckoutReceipt,
            headers(("X-Request-Id" = String, description = "Unique request id"))
        ),
        (status = 400, description = "Incomplete contact details, unknown fee selection or empty cart", body = ErrorResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 422, description = "Not enough stock for a cart line", body = ErrorResponse),
        (status = 500, description = "The transaction could not be saved", body = ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "Checkout"
)]
pub async fn checkout(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CheckoutRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;

    let receipt = state
        .services
        .checkout
        .checkout(user.user_id, payload)
        .await
        .map_err(map_service_error)?;

    Ok(created_response(receipt))
}
