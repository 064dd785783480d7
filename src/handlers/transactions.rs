use crate::handlers::common::{map_service_error, success_response};
use crate::{
    auth::AuthUser,
    entities::transaction::TransactionStatus,
    errors::{ApiError, ErrorResponse, ServiceError},
    services::transactions::{TransactionDetail, TransactionSummary},
    AppState,
};
use axum::{
    extract::{Json, Path, State},
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct UpdateStatusRequest {
    pub status: TransactionStatus,
}

/// List the caller's transactions, newest first
#[utoipa::path(
    get,
    path = "/api/v1/transactions",
    responses(
        (status = 200, description = "Transactions retrieved", body = [TransactionSummary]),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "Transactions"
)]
pub async fn list_transactions(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<impl IntoResponse, ApiError> {
    let items = state
        .services
        .transactions
        .list_for_user(user.user_id)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(items))
}

/// Get one of the caller's transactions with its lines
#[utoipa::path(
    get,
    path = "/api/v1/transactions/{id}",
    params(("id" = i32, Path, description = "Transaction id")),
    responses(
        (status = 200, description = "Transaction retrieved", body = TransactionDetail),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 404, description = "No such transaction for this user", body = ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "Transactions"
)]
pub async fn get_transaction(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, ApiError> {
    let detail = state
        .services
        .transactions
        .get_detail(user.user_id, id)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(detail))
}

/// Move a transaction along its lifecycle (admin only)
#[utoipa::path(
    patch,
    path = "/api/v1/transactions/{id}/status",
    params(("id" = i32, Path, description = "Transaction id")),
    request_body = UpdateStatusRequest,
    responses(
        (status = 200, description = "Status updated", body = TransactionSummary),
        (status = 403, description = "Caller is not an admin", body = ErrorResponse),
        (status = 404, description = "Transaction not found", body = ErrorResponse),
        (status = 409, description = "Transition not allowed", body = ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "Transactions"
)]
pub async fn update_transaction_status(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i32>,
    Json(payload): Json<UpdateStatusRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if !user.is_admin() {
        return Err(ServiceError::Forbidden(
            "Only administrators can change a transaction status".to_string(),
        )
        .into());
    }

    let summary = state
        .services
        .transactions
        .update_status(id, payload.status, user.user_id)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(summary))
}
