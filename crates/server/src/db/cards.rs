use chrono::{DateTime, Utc};
use review_core::{CardSnapshot, CardState, CardThresholds, Rating, ReviewOutcome};
use sqlx::PgPool;

use crate::error::AppError;

/// Due card joined with its position and game context.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct DueCard {
    pub card_id: i64,
    pub position_id: i64,
    pub fen: String,
    pub side_to_move: String,
    pub loss_cp: i32,
    pub played_uci: String,
    pub played_san: String,
    pub best_cp: i32,
    pub played_cp: i32,
    pub source: String,
    pub source_game_id: String,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CandidateLineRow {
    pub pv_rank: i32,
    pub cp: i32,
    pub first_move_uci: String,
    pub san_line: String,
    pub is_acceptable: bool,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PracticalResponseRow {
    pub opponent_move_uci: String,
    pub opponent_move_san: String,
    pub cp_after: Option<i32>,
}

/// Backfill missing cards for every position of this user that clears the
/// thresholds. Returns how many cards were created.
pub async fn ensure_cards(
    pool: &PgPool,
    username: &str,
    thresholds: &CardThresholds,
) -> Result<u64, AppError> {
    let sql = format!(
        r#"INSERT INTO cards (position_id)
           SELECT p.id
           FROM positions p
           JOIN games g ON g.id = p.game_id
           LEFT JOIN cards c ON c.position_id = p.id
           WHERE LOWER(g.username) = LOWER($1)
             AND {}
             AND c.id IS NULL
           ON CONFLICT (position_id) DO NOTHING"#,
        CardThresholds::sql_predicate(2),
    );

    let done = sqlx::query(&sql)
        .bind(username)
        .bind(thresholds.min_loss_cp)
        .bind(thresholds.min_best_cp)
        .bind(thresholds.winning_prune_cp)
        .execute(pool)
        .await
        .map_err(AppError::Sqlx)?;

    Ok(done.rows_affected())
}

/// The highest-priority due card for a user: cards already seen come before
/// brand-new ones, oldest due date first.
pub async fn fetch_due_card(
    pool: &PgPool,
    username: &str,
    thresholds: &CardThresholds,
) -> Result<Option<DueCard>, AppError> {
    let sql = format!(
        r#"SELECT c.id AS card_id, c.position_id, p.fen, p.side_to_move, p.loss_cp,
                  p.played_uci, p.played_san, p.best_cp, p.played_cp,
                  g.source, g.source_game_id
           FROM cards c
           JOIN positions p ON p.id = c.position_id
           JOIN games g ON g.id = p.game_id
           WHERE LOWER(g.username) = LOWER($1)
             AND c.due_at <= NOW()
             AND {}
           ORDER BY CASE WHEN c.reps > 0 THEN 0 ELSE 1 END ASC, c.due_at ASC
           LIMIT 1"#,
        CardThresholds::sql_predicate(2),
    );

    sqlx::query_as::<_, DueCard>(&sql)
        .bind(username)
        .bind(thresholds.min_loss_cp)
        .bind(thresholds.min_best_cp)
        .bind(thresholds.winning_prune_cp)
        .fetch_optional(pool)
        .await
        .map_err(AppError::Sqlx)
}

pub async fn fetch_candidate_lines(
    pool: &PgPool,
    position_id: i64,
) -> Result<Vec<CandidateLineRow>, AppError> {
    sqlx::query_as::<_, CandidateLineRow>(
        r#"SELECT pv_rank, cp, first_move_uci, san_line, is_acceptable
           FROM candidate_lines
           WHERE position_id = $1
           ORDER BY pv_rank ASC"#,
    )
    .bind(position_id)
    .fetch_all(pool)
    .await
    .map_err(AppError::Sqlx)
}

pub async fn fetch_practical_response(
    pool: &PgPool,
    position_id: i64,
) -> Result<Option<PracticalResponseRow>, AppError> {
    sqlx::query_as::<_, PracticalResponseRow>(
        r#"SELECT opponent_move_uci, opponent_move_san, cp_after
           FROM practical_responses
           WHERE position_id = $1
           LIMIT 1"#,
    )
    .bind(position_id)
    .fetch_optional(pool)
    .await
    .map_err(AppError::Sqlx)
}

pub async fn get_card(pool: &PgPool, card_id: i64) -> Result<Option<CardSnapshot>, AppError> {
    let row: Option<(String, i32, f64, f64, i32, i32, DateTime<Utc>, Option<DateTime<Utc>>)> =
        sqlx::query_as(
            r#"SELECT state, step, stability, difficulty, reps, lapses, due_at, last_review_at
               FROM cards WHERE id = $1"#,
        )
        .bind(card_id)
        .fetch_optional(pool)
        .await
        .map_err(AppError::Sqlx)?;

    Ok(row.map(
        |(state, step, stability, difficulty, reps, lapses, due_at, last_review_at)| CardSnapshot {
            state: CardState::from_db(&state),
            step,
            stability,
            difficulty,
            reps,
            lapses,
            due_at,
            last_review_at,
        },
    ))
}

/// Persist one graded review: update the card and append the log row in a
/// single transaction.
pub async fn apply_review(
    pool: &PgPool,
    card_id: i64,
    rating: Rating,
    outcome: &ReviewOutcome,
    reviewed_at: DateTime<Utc>,
) -> Result<(), AppError> {
    let mut tx = pool.begin().await.map_err(AppError::Sqlx)?;

    sqlx::query(
        r#"UPDATE cards
           SET state = $2, step = $3, due_at = $4, stability = $5, difficulty = $6,
               reps = $7, lapses = $8, last_review_at = $9
           WHERE id = $1"#,
    )
    .bind(card_id)
    .bind(outcome.state.as_str())
    .bind(outcome.step)
    .bind(outcome.due_at)
    .bind(outcome.stability)
    .bind(outcome.difficulty)
    .bind(outcome.reps)
    .bind(outcome.lapses)
    .bind(reviewed_at)
    .execute(&mut *tx)
    .await
    .map_err(AppError::Sqlx)?;

    sqlx::query(
        r#"INSERT INTO reviews (card_id, rating, reviewed_at, next_due_at, elapsed_days)
           VALUES ($1, $2, $3, $4, $5)"#,
    )
    .bind(card_id)
    .bind(rating.value())
    .bind(reviewed_at)
    .bind(outcome.due_at)
    .bind(outcome.elapsed_days)
    .execute(&mut *tx)
    .await
    .map_err(AppError::Sqlx)?;

    tx.commit().await.map_err(AppError::Sqlx)?;

    Ok(())
}
