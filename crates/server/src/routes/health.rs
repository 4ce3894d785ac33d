use axum::Json;
use serde_json::Value as JsonValue;

/// GET /healthz
pub async fn health_check() -> Json<JsonValue> {
    Json(serde_json::json!({ "ok": "true" }))
}
