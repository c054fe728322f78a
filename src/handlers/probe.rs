// Probe handler
// Opens and closes one database connection per request

use axum::{extract::State, http::StatusCode, response::Html};
use tracing::{info, warn};

use crate::{app::AppState, config::DatabaseParams, models::ProbeOutcome};

/// Database connectivity probe
/// GET /
/// Always answers 200; success and failure differ only in the body text.
pub async fn probe_database(State(state): State<AppState>) -> (StatusCode, Html<String>) {
    let outcome = run_probe(&state).await;

    match &outcome {
        ProbeOutcome::Connected => info!("Database probe succeeded"),
        ProbeOutcome::Failed(err) if err.is_config() => {
            warn!(error = %err, "Database probe failed: configuration")
        }
        ProbeOutcome::Failed(err) => warn!(error = %err, "Database probe failed"),
    }

    (StatusCode::OK, Html(outcome.body()))
}

async fn run_probe(state: &AppState) -> ProbeOutcome {
    state.tracker.record_probe();

    let params = match DatabaseParams::from_source(state.env.as_ref()) {
        Ok(params) => params,
        Err(err) => return ProbeOutcome::Failed(err),
    };

    state
        .connector
        .connect_and_close(&params, &state.tracker)
        .await
        .into()
}
