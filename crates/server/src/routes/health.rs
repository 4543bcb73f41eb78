use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::{error::AppError, state::AppState};

pub async fn health_check(State(state): State<AppState>) -> Result<Json<Value>, AppError> {
    let streaming = state.db.streaming_session_id().await?;
    Ok(Json(json!({
        "status": "ok",
        "streaming_session_id": streaming,
    })))
}
