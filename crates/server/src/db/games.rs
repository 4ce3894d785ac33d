use serde_json::Value as JsonValue;
use sqlx::PgPool;

use crate::error::AppError;

/// Insert one imported game. Returns false when the
/// (source, username, source_game_id) triple already exists.
pub async fn insert_game(
    pool: &PgPool,
    source: &str,
    source_game_id: &str,
    username: &str,
    played_color: &str,
    result: &str,
    pgn: &str,
) -> Result<bool, AppError> {
    let done = sqlx::query(
        r#"INSERT INTO games (source, source_game_id, username, played_color, result, pgn)
           VALUES ($1, $2, $3, $4, $5, $6)
           ON CONFLICT (source, username, source_game_id) DO NOTHING"#,
    )
    .bind(source)
    .bind(source_game_id)
    .bind(username.trim().to_lowercase())
    .bind(played_color)
    .bind(result)
    .bind(pgn)
    .execute(pool)
    .await
    .map_err(AppError::Sqlx)?;

    Ok(done.rows_affected() > 0)
}

pub async fn count_games(pool: &PgPool, username: &str) -> Result<i64, AppError> {
    let count: (i64,) = sqlx::query_as(
        "SELECT COUNT(*) FROM games WHERE LOWER(username) = LOWER($1)",
    )
    .bind(username)
    .fetch_one(pool)
    .await
    .map_err(AppError::Sqlx)?;

    Ok(count.0)
}

/// Newest-first listing with per-game position/blunder counts.
pub async fn list_games(
    pool: &PgPool,
    username: &str,
    limit: i64,
) -> Result<Vec<JsonValue>, AppError> {
    use sqlx::Row;

    let rows = sqlx::query(
        r#"SELECT g.id, g.source, g.played_color, g.result, g.analyzed, g.created_at,
                  COUNT(p.id) AS positions,
                  COUNT(p.id) FILTER (WHERE p.is_blunder) AS blunders
           FROM games g
           LEFT JOIN positions p ON p.game_id = g.id
           WHERE LOWER(g.username) = LOWER($1)
           GROUP BY g.id
           ORDER BY g.id DESC
           LIMIT $2"#,
    )
    .bind(username)
    .bind(limit)
    .fetch_all(pool)
    .await
    .map_err(AppError::Sqlx)?;

    Ok(rows
        .into_iter()
        .map(|r| {
            serde_json::json!({
                "id": r.try_get::<i64, _>("id").unwrap_or(0),
                "source": r.try_get::<String, _>("source").unwrap_or_default(),
                "played_color": r.try_get::<String, _>("played_color").unwrap_or_default(),
                "result": r.try_get::<Option<String>, _>("result").unwrap_or(None),
                "analyzed": r.try_get::<bool, _>("analyzed").unwrap_or(false),
                "created_at": r
                    .try_get::<chrono::DateTime<chrono::Utc>, _>("created_at")
                    .map(|t| t.to_rfc3339())
                    .ok(),
                "positions": r.try_get::<i64, _>("positions").unwrap_or(0),
                "blunders": r.try_get::<i64, _>("blunders").unwrap_or(0),
            })
        })
        .collect())
}

/// Delete every stored position for a user and clear the analyzed flags.
/// Cascades remove candidate lines, practical responses, cards and reviews.
pub async fn reset_analysis(pool: &PgPool, username: &str) -> Result<(i64, i64), AppError> {
    let mut tx = pool.begin().await.map_err(AppError::Sqlx)?;

    let games: (i64,) = sqlx::query_as(
        "SELECT COUNT(*) FROM games WHERE LOWER(username) = LOWER($1)",
    )
    .bind(username)
    .fetch_one(&mut *tx)
    .await
    .map_err(AppError::Sqlx)?;

    if games.0 == 0 {
        return Ok((0, 0));
    }

    let deleted = sqlx::query(
        r#"DELETE FROM positions p
           USING games g
           WHERE g.id = p.game_id AND LOWER(g.username) = LOWER($1)"#,
    )
    .bind(username)
    .execute(&mut *tx)
    .await
    .map_err(AppError::Sqlx)?;

    sqlx::query("UPDATE games SET analyzed = FALSE WHERE LOWER(username) = LOWER($1)")
        .bind(username)
        .execute(&mut *tx)
        .await
        .map_err(AppError::Sqlx)?;

    tx.commit().await.map_err(AppError::Sqlx)?;

    Ok((games.0, deleted.rows_affected() as i64))
}
