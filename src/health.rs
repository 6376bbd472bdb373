use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use serde_json::json;
use tracing::instrument;

use crate::db::{Db, PaymentStore};
use crate::state::AppState;

/// Dependency probe. 200 when a trivial query round-trips against the store,
/// 500 otherwise.
#[instrument(skip_all)]
async fn health_check(State(db): State<Db>) -> Response {
    match db.ping().await {
        Ok(()) => (StatusCode::OK, Json(json!({"alive": true}))).into_response(),
        Err(e) => {
            tracing::error!("Health check failed: {e}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"alive": false})),
            )
                .into_response()
        }
    }
}

pub fn router() -> axum::Router<AppState> {
    axum::Router::new().route("/health", get(health_check))
}
