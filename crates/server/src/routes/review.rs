use axum::{
    extract::{Path, Query},
    Extension, Json,
};
use chrono::Utc;
use review_core::{Rating, Scheduler};
use serde::Deserialize;
use serde_json::Value as JsonValue;
use sqlx::PgPool;

use crate::config::Config;
use crate::db::cards;
use crate::error::AppError;
use crate::routes::ThresholdQuery;

#[derive(Deserialize)]
pub struct GradeBody {
    pub card_id: i64,
    pub rating: i32,
}

/// GET /api/review/next/{username}
/// Backfill cards for every eligible position under the given thresholds,
/// then serve the highest-priority due card with its full context.
pub async fn next_card(
    Extension(pool): Extension<PgPool>,
    Path(username): Path<String>,
    Query(q): Query<ThresholdQuery>,
) -> Result<Json<JsonValue>, AppError> {
    let thresholds = q.thresholds()?;

    cards::ensure_cards(&pool, &username, &thresholds).await?;
    let due = match cards::fetch_due_card(&pool, &username, &thresholds).await? {
        Some(due) => due,
        None => return Ok(Json(serde_json::json!({ "card": null }))),
    };

    let lines = cards::fetch_candidate_lines(&pool, due.position_id).await?;
    let practical = cards::fetch_practical_response(&pool, due.position_id).await?;

    let acceptable: Vec<JsonValue> = lines
        .iter()
        .filter(|line| line.is_acceptable)
        .map(|line| {
            serde_json::json!({
                "first_move_uci": line.first_move_uci,
                "san_line": line.san_line,
                "cp": line.cp,
            })
        })
        .collect();
    let all_lines: Vec<JsonValue> = lines
        .iter()
        .map(|line| {
            serde_json::json!({
                "first_move_uci": line.first_move_uci,
                "san_line": line.san_line,
                "cp": line.cp,
                "rank": line.pv_rank,
                "is_acceptable": line.is_acceptable,
            })
        })
        .collect();

    Ok(Json(serde_json::json!({
        "card": {
            "card_id": due.card_id,
            "fen": due.fen,
            "side_to_move": due.side_to_move,
            "loss_cp": due.loss_cp,
            "played_uci": due.played_uci,
            "played_san": due.played_san,
            "source": due.source,
            "source_game_id": due.source_game_id,
            "best_cp": due.best_cp,
            "played_cp": due.played_cp,
            "acceptable_lines": acceptable,
            "all_lines": all_lines,
            "practical_response": practical.map(|p| serde_json::json!({
                "opponent_move_uci": p.opponent_move_uci,
                "opponent_move_san": p.opponent_move_san,
                "cp_after": p.cp_after,
            })),
        }
    })))
}

/// POST /api/review/grade
pub async fn grade(
    Extension(pool): Extension<PgPool>,
    Extension(config): Extension<Config>,
    Json(body): Json<GradeBody>,
) -> Result<Json<JsonValue>, AppError> {
    let rating =
        Rating::from_value(body.rating).map_err(|e| AppError::BadRequest(e.to_string()))?;
    let card = cards::get_card(&pool, body.card_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Card not found".into()))?;

    let now = Utc::now();
    let outcome = Scheduler::new(config.desired_retention).review(&card, rating, now);
    cards::apply_review(&pool, body.card_id, rating, &outcome, now).await?;

    Ok(Json(serde_json::json!({
        "next_due_at": outcome.due_at.to_rfc3339(),
        "state": outcome.state.as_str(),
        "stability": outcome.stability,
        "difficulty": outcome.difficulty,
    })))
}

/// GET /api/review/preview/{card_id}
/// Due date per prospective rating, without persisting anything.
pub async fn preview(
    Extension(pool): Extension<PgPool>,
    Extension(config): Extension<Config>,
    Path(card_id): Path<i64>,
) -> Result<Json<JsonValue>, AppError> {
    let card = cards::get_card(&pool, card_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Card not found".into()))?;

    let outcomes = Scheduler::new(config.desired_retention).preview(&card, Utc::now());

    let mut due_by_rating = serde_json::Map::new();
    for (rating, outcome) in Rating::ALL.into_iter().zip(outcomes.iter()) {
        due_by_rating.insert(
            rating.value().to_string(),
            serde_json::json!(outcome.due_at.to_rfc3339()),
        );
    }
    Ok(Json(serde_json::json!({ "due_by_rating": due_by_rating })))
}
