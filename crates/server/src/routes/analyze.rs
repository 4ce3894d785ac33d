use analysis::AnalyzeParams;
use axum::{
    extract::{Path, Query},
    Extension, Json,
};
use serde::Deserialize;
use serde_json::Value as JsonValue;
use sqlx::PgPool;

use crate::config::Config;
use crate::db::games;
use crate::error::AppError;
use crate::jobs::{AnalyzeJob, AnalyzeJobs, JobState};
use crate::routes::check_range;

#[derive(Deserialize)]
pub struct AnalyzeBody {
    pub username: String,
    pub depth: Option<u32>,
    pub multipv: Option<u32>,
    pub cp_window: Option<i32>,
    pub blunder_loss_cp: Option<i32>,
    pub objective_floor_cp: Option<i32>,
    pub winning_prune_cp: Option<i32>,
    pub opening_user_moves_to_skip: Option<u32>,
    pub max_games: Option<i64>,
}

impl AnalyzeBody {
    fn params(&self) -> Result<AnalyzeParams, AppError> {
        let defaults = AnalyzeParams::default();
        Ok(AnalyzeParams {
            depth: check_range("depth", self.depth.unwrap_or(defaults.depth), 4, 24)?,
            multipv: check_range("multipv", self.multipv.unwrap_or(defaults.multipv), 1, 12)?,
            cp_window: check_range(
                "cp_window",
                self.cp_window.unwrap_or(defaults.cp_window),
                0,
                300,
            )?,
            blunder_loss_cp: check_range(
                "blunder_loss_cp",
                self.blunder_loss_cp.unwrap_or(defaults.blunder_loss_cp),
                20,
                1000,
            )?,
            objective_floor_cp: check_range(
                "objective_floor_cp",
                self.objective_floor_cp.unwrap_or(defaults.objective_floor_cp),
                -1000,
                1000,
            )?,
            winning_prune_cp: check_range(
                "winning_prune_cp",
                self.winning_prune_cp.unwrap_or(defaults.winning_prune_cp),
                0,
                2000,
            )?,
            opening_user_moves_to_skip: check_range(
                "opening_user_moves_to_skip",
                self.opening_user_moves_to_skip
                    .unwrap_or(defaults.opening_user_moves_to_skip),
                0,
                40,
            )?,
            max_games: check_range("max_games", self.max_games.unwrap_or(defaults.max_games), 1, 2000)?,
        })
    }
}

#[derive(Deserialize)]
pub struct UserBody {
    pub username: String,
}

#[derive(Deserialize)]
pub struct GamesQuery {
    pub limit: Option<i64>,
}

fn outcome_json(out: analysis::AnalyzeOutcome) -> JsonValue {
    serde_json::json!({
        "games": out.games,
        "positions": out.positions,
        "blunders": out.blunders,
    })
}

/// POST /api/analyze
/// Analyze the user's pending games in the request thread; callers with a
/// large backlog should prefer /api/analyze/start.
pub async fn analyze(
    Extension(pool): Extension<PgPool>,
    Extension(config): Extension<Config>,
    Json(body): Json<AnalyzeBody>,
) -> Result<Json<JsonValue>, AppError> {
    let params = body.params()?;
    let out = analysis::analyze_username(
        &pool,
        &config.stockfish_path,
        &body.username,
        &params,
        |_, _| {},
    )
    .await?;
    Ok(Json(outcome_json(out)))
}

/// POST /api/analyze/start
/// Run the batch in the background; poll progress by job id.
pub async fn start_analyze(
    Extension(pool): Extension<PgPool>,
    Extension(config): Extension<Config>,
    Extension(jobs): Extension<AnalyzeJobs>,
    Json(body): Json<AnalyzeBody>,
) -> Result<Json<JsonValue>, AppError> {
    let params = body.params()?;
    let total = analysis::db::count_unanalyzed_games(&pool, &body.username, params.max_games).await
        .map_err(AppError::Sqlx)? as usize;

    let job_id = jobs.create(AnalyzeJob::running(&body.username, total));

    tokio::spawn({
        let jobs = jobs.clone();
        let job_id = job_id.clone();
        let stockfish_path = config.stockfish_path.clone();
        async move {
            let progress = |done: usize, total: usize| {
                jobs.update(&job_id, |job| {
                    job.games_done = done;
                    job.total_games = total;
                });
            };

            match analysis::analyze_username(
                &pool,
                &stockfish_path,
                &body.username,
                &params,
                progress,
            )
            .await
            {
                Ok(out) => jobs.update(&job_id, |job| {
                    job.state = JobState::Done;
                    job.games_done = out.games;
                    job.result = Some(outcome_json(out));
                }),
                Err(err) => {
                    tracing::error!("Analysis job failed: {err}");
                    jobs.update(&job_id, |job| {
                        job.state = JobState::Error;
                        job.error = Some(err.to_string());
                    });
                }
            }
        }
    });

    Ok(Json(serde_json::json!({
        "job_id": job_id,
        "total_games": total,
    })))
}

/// GET /api/analyze/progress/{job_id}
pub async fn analyze_progress(
    Extension(jobs): Extension<AnalyzeJobs>,
    Path(job_id): Path<String>,
) -> Result<Json<AnalyzeJob>, AppError> {
    jobs.get(&job_id)
        .map(Json)
        .ok_or_else(|| AppError::NotFound("Job not found".into()))
}

/// POST /api/analyze/reset
/// Drop every stored position for a user and clear the analyzed flags so
/// the next run starts from scratch.
pub async fn reset(
    Extension(pool): Extension<PgPool>,
    Json(body): Json<UserBody>,
) -> Result<Json<JsonValue>, AppError> {
    let (games_reset, positions_deleted) = games::reset_analysis(&pool, &body.username).await?;
    Ok(Json(serde_json::json!({
        "games_reset": games_reset,
        "positions_deleted": positions_deleted,
    })))
}

/// GET /api/games/{username}
pub async fn list_games(
    Extension(pool): Extension<PgPool>,
    Path(username): Path<String>,
    Query(q): Query<GamesQuery>,
) -> Result<Json<JsonValue>, AppError> {
    let limit = check_range("limit", q.limit.unwrap_or(200), 1, 2000)?;
    let games = games::list_games(&pool, &username, limit).await?;
    Ok(Json(serde_json::json!({
        "total_games": games.len(),
        "games": games,
    })))
}
