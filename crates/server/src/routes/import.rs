use axum::{extract::Path, Extension, Json};
use serde::Deserialize;
use serde_json::Value as JsonValue;
use sqlx::PgPool;

use crate::error::AppError;
use crate::import;
use crate::jobs::{ImportJob, ImportJobs, JobState};
use crate::routes::check_range;

#[derive(Deserialize)]
pub struct ImportBody {
    pub username: String,
    pub max_games: Option<usize>,
}

impl ImportBody {
    fn max_games(&self) -> Result<usize, AppError> {
        check_range("max_games", self.max_games.unwrap_or(100), 1, 2000)
    }
}

#[derive(Deserialize)]
pub struct ImportStartBody {
    pub source: String,
    pub username: String,
    pub max_games: Option<usize>,
}

#[derive(Deserialize)]
pub struct PgnImportBody {
    pub username: String,
    pub pgn: String,
}

fn import_summary(out: import::ImportOutcome) -> Json<JsonValue> {
    Json(serde_json::json!({
        "imported": out.imported,
        "skipped": out.skipped,
    }))
}

/// POST /api/import/lichess
pub async fn import_lichess(
    Extension(pool): Extension<PgPool>,
    Json(body): Json<ImportBody>,
) -> Result<Json<JsonValue>, AppError> {
    let max_games = body.max_games()?;
    let out = import::import_lichess(&pool, &body.username, max_games, |_, _, _, _| {}).await?;
    Ok(import_summary(out))
}

/// POST /api/import/chesscom
pub async fn import_chesscom(
    Extension(pool): Extension<PgPool>,
    Json(body): Json<ImportBody>,
) -> Result<Json<JsonValue>, AppError> {
    let max_games = body.max_games()?;
    let out = import::import_chesscom(&pool, &body.username, max_games, |_, _, _, _| {}).await?;
    Ok(import_summary(out))
}

/// POST /api/import/pgn
/// Store games pasted as a raw multi-game PGN blob.
pub async fn import_pgn(
    Extension(pool): Extension<PgPool>,
    Json(body): Json<PgnImportBody>,
) -> Result<Json<JsonValue>, AppError> {
    if body.pgn.trim().is_empty() {
        return Err(AppError::BadRequest("PGN is empty".into()));
    }
    let out = import::import_pgn(&pool, &body.username, &body.pgn, |_, _, _, _| {}).await?;
    Ok(import_summary(out))
}

/// POST /api/import/start
/// Kick off a background import and return its job id.
pub async fn start_import(
    Extension(pool): Extension<PgPool>,
    Extension(jobs): Extension<ImportJobs>,
    Json(body): Json<ImportStartBody>,
) -> Result<Json<JsonValue>, AppError> {
    if body.source != "lichess" && body.source != "chesscom" {
        return Err(AppError::BadRequest(
            "source must be lichess or chesscom".into(),
        ));
    }
    let max_games = check_range("max_games", body.max_games.unwrap_or(100), 1, 2000)?;

    let job_id = jobs.create(ImportJob::running(&body.source, &body.username));

    tokio::spawn({
        let jobs = jobs.clone();
        let job_id = job_id.clone();
        async move {
            let progress = |done: usize, total: usize, imported: usize, skipped: usize| {
                jobs.update(&job_id, |job| {
                    job.done = done;
                    job.total = total;
                    job.imported = imported;
                    job.skipped = skipped;
                });
            };

            let result = if body.source == "lichess" {
                import::import_lichess(&pool, &body.username, max_games, progress).await
            } else {
                import::import_chesscom(&pool, &body.username, max_games, progress).await
            };

            match result {
                Ok(out) => jobs.update(&job_id, |job| {
                    job.state = JobState::Done;
                    job.imported = out.imported;
                    job.skipped = out.skipped;
                    job.done = out.imported + out.skipped;
                    if job.total == 0 {
                        job.total = out.imported + out.skipped;
                    }
                }),
                Err(err) => {
                    tracing::error!("Import job failed: {err}");
                    jobs.update(&job_id, |job| {
                        job.state = JobState::Error;
                        job.error = Some(err.to_string());
                    });
                }
            }
        }
    });

    Ok(Json(serde_json::json!({ "job_id": job_id })))
}

/// GET /api/import/progress/{job_id}
pub async fn import_progress(
    Extension(jobs): Extension<ImportJobs>,
    Path(job_id): Path<String>,
) -> Result<Json<ImportJob>, AppError> {
    jobs.get(&job_id)
        .map(Json)
        .ok_or_else(|| AppError::NotFound("Job not found".into()))
}
