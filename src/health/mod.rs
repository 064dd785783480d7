/*!
 * # Health Check Module
 *
 * `GET /health` reports whether the service can reach its database. It is
 * mounted outside the authenticated API.
 */

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::AppState;

/// Basic health status
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Up,
    Down,
}

#[derive(Serialize, Deserialize, Debug, Clone, ToSchema)]
pub struct HealthInfo {
    pub status: HealthStatus,
    pub version: String,
    pub database: HealthStatus,
    pub timestamp: DateTime<Utc>,
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service and database are reachable", body = HealthInfo),
        (status = 503, description = "Database is unreachable", body = HealthInfo),
    ),
    tag = "Health"
)]
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let database = match crate::db::check_connection(&state.db).await {
        Ok(()) => HealthStatus::Up,
        Err(e) => {
            tracing::warn!(error = %e, "health check could not reach the database");
            HealthStatus::Down
        }
    };

    let status_code = if database == HealthStatus::Up {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let info = HealthInfo {
        status: database.clone(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        database,
        timestamp: Utc::now(),
    };

    (status_code, Json(info))
}
