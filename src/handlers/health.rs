use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};

use crate::{app::AppState, models::HealthReport};

/// Liveness check
/// GET /health
/// Never touches the database, so it stays green while the database is starting.
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    (StatusCode::OK, Json(HealthReport::from_tracker(&state.tracker)))
}
