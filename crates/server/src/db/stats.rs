use review_core::CardThresholds;
use serde_json::Value as JsonValue;
use sqlx::PgPool;

use crate::error::AppError;

/// Per-user training stats under the given thresholds, with due counts
/// split into new / learning / review.
pub async fn user_stats(
    pool: &PgPool,
    username: &str,
    thresholds: &CardThresholds,
) -> Result<JsonValue, AppError> {
    let pred = CardThresholds::sql_predicate(2);
    let sql = format!(
        r#"SELECT
             (SELECT COUNT(*) FROM games g
              WHERE LOWER(g.username) = LOWER($1)) AS games,
             (SELECT COUNT(*) FROM games g
              WHERE LOWER(g.username) = LOWER($1) AND g.analyzed) AS analyzed_games,
             (SELECT COUNT(*) FROM positions p
              JOIN games g ON g.id = p.game_id
              WHERE LOWER(g.username) = LOWER($1)) AS positions,
             (SELECT COUNT(*) FROM positions p
              JOIN games g ON g.id = p.game_id
              WHERE LOWER(g.username) = LOWER($1) AND {pred}) AS blunders,
             (SELECT COUNT(*) FROM cards c
              JOIN positions p ON p.id = c.position_id
              JOIN games g ON g.id = p.game_id
              WHERE LOWER(g.username) = LOWER($1)
                AND c.due_at <= NOW() AND {pred}) AS due_cards,
             (SELECT COUNT(*) FROM cards c
              JOIN positions p ON p.id = c.position_id
              JOIN games g ON g.id = p.game_id
              WHERE LOWER(g.username) = LOWER($1)
                AND c.due_at <= NOW() AND c.reps = 0 AND {pred}) AS new_due_cards,
             (SELECT COUNT(*) FROM cards c
              JOIN positions p ON p.id = c.position_id
              JOIN games g ON g.id = p.game_id
              WHERE LOWER(g.username) = LOWER($1)
                AND c.due_at <= NOW() AND c.reps > 0
                AND c.state IN ('learning', 'relearning') AND {pred}) AS learning_due_cards,
             (SELECT COUNT(*) FROM cards c
              JOIN positions p ON p.id = c.position_id
              JOIN games g ON g.id = p.game_id
              WHERE LOWER(g.username) = LOWER($1)
                AND c.due_at <= NOW() AND c.reps > 0
                AND c.state = 'review' AND {pred}) AS review_due_cards"#,
    );

    let row: (i64, i64, i64, i64, i64, i64, i64, i64) = sqlx::query_as(&sql)
        .bind(username)
        .bind(thresholds.min_loss_cp)
        .bind(thresholds.min_best_cp)
        .bind(thresholds.winning_prune_cp)
        .fetch_one(pool)
        .await
        .map_err(AppError::Sqlx)?;

    Ok(serde_json::json!({
        "games": row.0,
        "analyzed_games": row.1,
        "positions": row.2,
        "blunders": row.3,
        "due_cards": row.4,
        "new_due_cards": row.5,
        "learning_due_cards": row.6,
        "review_due_cards": row.7,
    }))
}

/// Every distinct (lowercased) username with game/position/card counts.
pub async fn list_users(pool: &PgPool) -> Result<Vec<JsonValue>, AppError> {
    let rows: Vec<(String, i64, i64, i64)> = sqlx::query_as(
        r#"SELECT u.username,
                  (SELECT COUNT(*) FROM games g
                   WHERE LOWER(g.username) = u.username) AS games,
                  (SELECT COUNT(*) FROM positions p
                   JOIN games g ON g.id = p.game_id
                   WHERE LOWER(g.username) = u.username) AS positions,
                  (SELECT COUNT(*) FROM cards c
                   JOIN positions p ON p.id = c.position_id
                   JOIN games g ON g.id = p.game_id
                   WHERE LOWER(g.username) = u.username) AS cards
           FROM (SELECT DISTINCT LOWER(username) AS username FROM games) u
           ORDER BY u.username ASC"#,
    )
    .fetch_all(pool)
    .await
    .map_err(AppError::Sqlx)?;

    Ok(rows
        .into_iter()
        .map(|(username, games, positions, cards)| {
            serde_json::json!({
                "username": username,
                "games": games,
                "positions": positions,
                "cards": cards,
            })
        })
        .collect())
}

/// Review-history stats: totals by rating, retention, average scheduled
/// interval, per-day counts for the last `days` days, interval histogram.
pub async fn review_stats(
    pool: &PgPool,
    username: &str,
    days: i32,
) -> Result<JsonValue, AppError> {
    let summary: (i64, i64, i64, i64, i64, f64) = sqlx::query_as(
        r#"SELECT COUNT(*) AS total_reviews,
                  COUNT(*) FILTER (WHERE r.rating = 1) AS again,
                  COUNT(*) FILTER (WHERE r.rating = 2) AS hard,
                  COUNT(*) FILTER (WHERE r.rating = 3) AS good,
                  COUNT(*) FILTER (WHERE r.rating = 4) AS easy,
                  COALESCE(AVG(GREATEST(
                      EXTRACT(EPOCH FROM (r.next_due_at - r.reviewed_at)) / 86400.0, 0
                  )), 0)::double precision AS avg_interval_days
           FROM reviews r
           JOIN cards c ON c.id = r.card_id
           JOIN positions p ON p.id = c.position_id
           JOIN games g ON g.id = p.game_id
           WHERE LOWER(g.username) = LOWER($1)"#,
    )
    .bind(username)
    .fetch_one(pool)
    .await
    .map_err(AppError::Sqlx)?;

    let (total_reviews, again, hard, good, easy, avg_interval_days) = summary;
    let correct = hard + good + easy;
    let retention_pct = if total_reviews > 0 {
        (correct as f64 * 1000.0 / total_reviews as f64).round() / 10.0
    } else {
        0.0
    };

    let by_day_rows: Vec<(chrono::NaiveDate, i64, i64)> = sqlx::query_as(
        r#"SELECT r.reviewed_at::date AS day,
                  COUNT(*) AS reviews,
                  COUNT(*) FILTER (WHERE r.rating > 1) AS correct
           FROM reviews r
           JOIN cards c ON c.id = r.card_id
           JOIN positions p ON p.id = c.position_id
           JOIN games g ON g.id = p.game_id
           WHERE LOWER(g.username) = LOWER($1)
             AND r.reviewed_at::date >= (NOW() - ($2 * INTERVAL '1 day'))::date
           GROUP BY day
           ORDER BY day ASC"#,
    )
    .bind(username)
    .bind(days)
    .fetch_all(pool)
    .await
    .map_err(AppError::Sqlx)?;

    let by_day: Vec<JsonValue> = by_day_rows
        .into_iter()
        .map(|(day, reviews, correct)| {
            let day_pct = if reviews > 0 {
                (correct as f64 * 1000.0 / reviews as f64).round() / 10.0
            } else {
                0.0
            };
            serde_json::json!({
                "day": day.to_string(),
                "reviews": reviews,
                "correct": correct,
                "retention_pct": day_pct,
            })
        })
        .collect();

    let bucket_rows: Vec<(String, i64)> = sqlx::query_as(
        r#"SELECT CASE
                    WHEN d < 1 THEN '<1d'
                    WHEN d < 4 THEN '1-3d'
                    WHEN d < 8 THEN '4-7d'
                    WHEN d < 31 THEN '8-30d'
                    ELSE '>30d'
                  END AS bucket,
                  COUNT(*) AS c
           FROM (
               SELECT GREATEST(
                   EXTRACT(EPOCH FROM (r.next_due_at - r.reviewed_at)) / 86400.0, 0
               ) AS d
               FROM reviews r
               JOIN cards c ON c.id = r.card_id
               JOIN positions p ON p.id = c.position_id
               JOIN games g ON g.id = p.game_id
               WHERE LOWER(g.username) = LOWER($1)
           ) t
           GROUP BY bucket"#,
    )
    .bind(username)
    .fetch_all(pool)
    .await
    .map_err(AppError::Sqlx)?;

    let mut interval_buckets = serde_json::Map::new();
    for (bucket, count) in bucket_rows {
        interval_buckets.insert(bucket, serde_json::json!(count));
    }

    Ok(serde_json::json!({
        "summary": {
            "total_reviews": total_reviews,
            "again": again,
            "hard": hard,
            "good": good,
            "easy": easy,
            "retention_pct": retention_pct,
            "avg_interval_days": (avg_interval_days * 100.0).round() / 100.0,
        },
        "by_day": by_day,
        "interval_buckets": interval_buckets,
    }))
}
