use axum::{extract::State, response::Json};
use serde_json::{json, Value};

use crate::{db, errors::ServiceError, AppState};

/// Liveness + database readiness probe.
pub async fn check(State(state): State<AppState>) -> Result<Json<Value>, ServiceError> {
    db::health_check(&state.db).await?;
    Ok(Json(json!({ "status": "ok" })))
}
