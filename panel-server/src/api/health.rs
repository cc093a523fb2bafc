use crate::openapi::HEALTH_TAG;
use crate::state::AppState;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Basic health check response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct Health {
    status: String,
}

impl IntoResponse for Health {
    fn into_response(self) -> Response {
        (StatusCode::OK, Json(self)).into_response()
    }
}

/// Liveness check, no authentication required
#[utoipa::path(
    get,
    path = "/health",
    tag = HEALTH_TAG,
    responses(
        (status = 200, description = "Service is healthy", body = Health)
    )
)]
pub(crate) async fn health_check() -> Health {
    Health {
        status: "ok".to_string(),
    }
}

pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
