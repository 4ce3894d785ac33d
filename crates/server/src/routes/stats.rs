use axum::{
    extract::{Path, Query},
    Extension, Json,
};
use serde::Deserialize;
use serde_json::Value as JsonValue;
use sqlx::PgPool;

use crate::db::stats;
use crate::error::AppError;
use crate::routes::{check_range, ThresholdQuery};

#[derive(Deserialize)]
pub struct ReviewStatsQuery {
    pub days: Option<i32>,
}

/// GET /api/stats/{username}
pub async fn user_stats(
    Extension(pool): Extension<PgPool>,
    Path(username): Path<String>,
    Query(q): Query<ThresholdQuery>,
) -> Result<Json<JsonValue>, AppError> {
    let thresholds = q.thresholds()?;
    let out = stats::user_stats(&pool, &username, &thresholds).await?;
    Ok(Json(out))
}

/// GET /api/stats/reviews/{username}
pub async fn review_stats(
    Extension(pool): Extension<PgPool>,
    Path(username): Path<String>,
    Query(q): Query<ReviewStatsQuery>,
) -> Result<Json<JsonValue>, AppError> {
    let days = check_range("days", q.days.unwrap_or(60), 7, 365)?;
    let out = stats::review_stats(&pool, &username, days).await?;
    Ok(Json(out))
}

/// GET /api/users
pub async fn list_users(
    Extension(pool): Extension<PgPool>,
) -> Result<Json<JsonValue>, AppError> {
    let users = stats::list_users(&pool).await?;
    Ok(Json(serde_json::json!({ "users": users })))
}
