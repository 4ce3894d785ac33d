//! Persistence for analysis input and output.

use review_core::CardThresholds;
use sqlx::PgPool;

use crate::blunder::PositionAnalysis;

/// A stored game pending analysis.
#[derive(Debug, Clone)]
pub struct PendingGame {
    pub id: i64,
    pub pgn: String,
    pub played_color: String,
}

/// Fetch up to `limit` unanalyzed games for a user, oldest first.
pub async fn fetch_unanalyzed_games(
    pool: &PgPool,
    username: &str,
    limit: i64,
) -> Result<Vec<PendingGame>, sqlx::Error> {
    let rows = sqlx::query_as::<_, (i64, String, String)>(
        "SELECT id, pgn, played_color FROM games
         WHERE LOWER(username) = LOWER($1) AND analyzed = FALSE
         ORDER BY id ASC
         LIMIT $2",
    )
    .bind(username)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|(id, pgn, played_color)| PendingGame {
            id,
            pgn,
            played_color,
        })
        .collect())
}

/// Count the games an analysis run with the same `limit` would pick up.
pub async fn count_unanalyzed_games(
    pool: &PgPool,
    username: &str,
    limit: i64,
) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM (
             SELECT id FROM games
             WHERE LOWER(username) = LOWER($1) AND analyzed = FALSE
             ORDER BY id ASC
             LIMIT $2
         ) AS pending",
    )
    .bind(username)
    .bind(limit)
    .fetch_one(pool)
    .await
}

/// Mark a game analyzed without touching its positions. Used for games
/// whose movetext does not replay.
pub async fn mark_game_analyzed(pool: &PgPool, game_id: i64) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE games SET analyzed = TRUE WHERE id = $1")
        .bind(game_id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Replace a game's stored analysis in one transaction: drop existing
/// positions (cards and lines cascade away), insert the new set, create
/// cards for reviewable positions, and mark the game analyzed. Running
/// analysis twice therefore converges instead of duplicating rows.
pub async fn replace_analysis_for_game(
    pool: &PgPool,
    game_id: i64,
    positions: &[PositionAnalysis],
    thresholds: &CardThresholds,
) -> Result<(), sqlx::Error> {
    let mut tx = pool.begin().await?;

    sqlx::query("DELETE FROM positions WHERE game_id = $1")
        .bind(game_id)
        .execute(&mut *tx)
        .await?;

    for pos in positions {
        let position_id = sqlx::query_scalar::<_, i64>(
            "INSERT INTO positions
                 (game_id, ply, fen, side_to_move, played_uci, played_san,
                  best_cp, played_cp, loss_cp, is_blunder)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
             RETURNING id",
        )
        .bind(game_id)
        .bind(pos.ply)
        .bind(&pos.fen)
        .bind(pos.side_to_move.as_str())
        .bind(&pos.played_uci)
        .bind(&pos.played_san)
        .bind(pos.best_cp)
        .bind(pos.played_cp)
        .bind(pos.loss_cp)
        .bind(pos.is_blunder)
        .fetch_one(&mut *tx)
        .await?;

        for line in &pos.lines {
            sqlx::query(
                "INSERT INTO candidate_lines
                     (position_id, pv_rank, cp, first_move_uci, uci_line, san_line, is_acceptable)
                 VALUES ($1, $2, $3, $4, $5, $6, $7)",
            )
            .bind(position_id)
            .bind(line.pv_rank)
            .bind(line.cp)
            .bind(&line.first_move_uci)
            .bind(&line.uci_line)
            .bind(&line.san_line)
            .bind(line.is_acceptable)
            .execute(&mut *tx)
            .await?;
        }

        if let Some(resp) = &pos.practical_response {
            sqlx::query(
                "INSERT INTO practical_responses
                     (position_id, opponent_move_uci, opponent_move_san, cp_after)
                 VALUES ($1, $2, $3, $4)",
            )
            .bind(position_id)
            .bind(&resp.opponent_move_uci)
            .bind(&resp.opponent_move_san)
            .bind(resp.cp_after)
            .execute(&mut *tx)
            .await?;
        }

        if thresholds.is_reviewable(pos.loss_cp, pos.best_cp, pos.played_cp) {
            sqlx::query("INSERT INTO cards (position_id) VALUES ($1) ON CONFLICT DO NOTHING")
                .bind(position_id)
                .execute(&mut *tx)
                .await?;
        }
    }

    sqlx::query("UPDATE games SET analyzed = TRUE WHERE id = $1")
        .bind(game_id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    Ok(())
}
