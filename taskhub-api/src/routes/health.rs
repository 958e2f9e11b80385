/// Health check endpoint
///
/// Public, unauthenticated. Reports service liveness and database
/// reachability; load balancers and uptime checks poll this.

use crate::{app::AppState, error::ApiResult};
use axum::{extract::State, Json};
use serde_json::{json, Value};
use taskhub_shared::{db::pool::health_check, dto::ApiResponse};

/// `GET /health`
///
/// Returns 200 with `{"status": "ok", "database": "ok"}` when both the
/// process and the database are healthy. A failed database ping is
/// reported in the body rather than as a 5xx, so the check itself
/// stays observable.
pub async fn health(State(state): State<AppState>) -> ApiResult<Json<ApiResponse<Value>>> {
    let database = match health_check(&state.db).await {
        Ok(()) => "ok",
        Err(e) => {
            tracing::warn!("Health check: database unreachable: {}", e);
            "unreachable"
        }
    };

    Ok(Json(ApiResponse::ok(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "database": database,
    }))))
}
