//! Turning platform exports into stored game rows.
//!
//! Both platforms hand back multi-game PGN blobs; everything after the
//! fetch is shared: split the blob, pull the game id out of the headers,
//! derive the user's color and result, and insert with duplicate
//! detection. Progress is reported per game as
//! `(done, total, imported, skipped)`.

use chess_pgn::{color_and_outcome, extract_header, game_id_from_url, split_games};
use sqlx::PgPool;
use tracing::info;

use crate::clients::{chess_com::ChessComClient, lichess::LichessClient};
use crate::db::games;
use crate::error::AppError;

/// Totals for one import run.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImportOutcome {
    pub imported: usize,
    pub skipped: usize,
}

/// Import a user's recent lichess games.
pub async fn import_lichess(
    pool: &PgPool,
    username: &str,
    max_games: usize,
    progress: impl FnMut(usize, usize, usize, usize),
) -> Result<ImportOutcome, AppError> {
    let blob = LichessClient::new()
        .export_games(username, max_games)
        .await
        .map_err(map_client_error)?;

    let out = insert_blob(pool, "lichess", username, &blob, None, progress).await?;
    info!(
        username,
        imported = out.imported,
        skipped = out.skipped,
        "Lichess import finished"
    );
    Ok(out)
}

/// Import a user's recent chess.com games, walking monthly archives
/// newest-first until `max_games` have been collected.
pub async fn import_chesscom(
    pool: &PgPool,
    username: &str,
    max_games: usize,
    progress: impl FnMut(usize, usize, usize, usize),
) -> Result<ImportOutcome, AppError> {
    let client = ChessComClient::new();
    let archives = client
        .fetch_archives(username)
        .await
        .map_err(map_client_error)?;

    let mut months: Vec<Vec<String>> = Vec::new();
    let mut collected = 0;
    for archive_url in &archives {
        let month_blob = client
            .fetch_archive_pgn(archive_url)
            .await
            .map_err(map_client_error)?;
        let games: Vec<String> = split_games(&month_blob)
            .into_iter()
            .map(str::to_string)
            .collect();
        collected += games.len();
        months.push(games);
        if collected >= max_games {
            break;
        }
    }

    let blob = most_recent_games(months, max_games).join("\n\n");

    let out = insert_blob(pool, "chesscom", username, &blob, None, progress).await?;
    info!(
        username,
        imported = out.imported,
        skipped = out.skipped,
        "Chess.com import finished"
    );
    Ok(out)
}

/// Import games pasted or uploaded as a raw PGN blob. Games without a
/// recognizable id header get a synthesized one, so re-uploading the same
/// hand-edited file may duplicate those.
pub async fn import_pgn(
    pool: &PgPool,
    username: &str,
    blob: &str,
    progress: impl FnMut(usize, usize, usize, usize),
) -> Result<ImportOutcome, AppError> {
    insert_blob(pool, "manual", username, blob, Some(synthesize_game_id), progress).await
}

fn synthesize_game_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

/// Pick the `max_games` most recent games out of monthly archives.
///
/// `months` is newest-month-first while games within each month run
/// oldest-first, so the newest games sit at the tail of the FIRST month,
/// not of the concatenation. Walk months from the newest, keeping each
/// month whole until the budget runs out and trimming the oldest games of
/// the month that overflows it, then flip back to chronological order for
/// insertion.
fn most_recent_games(months: Vec<Vec<String>>, max_games: usize) -> Vec<String> {
    let mut picked: Vec<Vec<String>> = Vec::new();
    let mut remaining = max_games;
    for mut games in months {
        if remaining == 0 {
            break;
        }
        if games.len() > remaining {
            games.drain(..games.len() - remaining);
        }
        remaining -= games.len();
        picked.push(games);
    }
    picked.reverse();
    picked.concat()
}

fn map_client_error(message: String) -> AppError {
    if message == "User not found" {
        AppError::NotFound(message)
    } else {
        AppError::BadGateway(message)
    }
}

/// The game id lives in the `Site` header on lichess and in `Link` (with a
/// `Site` fallback) on chess.com; both are URLs whose last path segment is
/// the id.
fn game_id_from_headers(pgn: &str) -> Option<String> {
    extract_header(pgn, "Link")
        .or_else(|| extract_header(pgn, "Site"))
        .and_then(|url| game_id_from_url(&url))
}

async fn insert_blob(
    pool: &PgPool,
    source: &str,
    username: &str,
    blob: &str,
    missing_id_fallback: Option<fn() -> String>,
    mut progress: impl FnMut(usize, usize, usize, usize),
) -> Result<ImportOutcome, AppError> {
    let game_pgns = split_games(blob);
    let total = game_pgns.len();
    let mut out = ImportOutcome::default();
    progress(0, total, 0, 0);

    for (done, game_pgn) in game_pgns.iter().enumerate() {
        let game_id = match game_id_from_headers(game_pgn) {
            Some(id) => Some(id),
            None => missing_id_fallback.map(|f| f()),
        };

        match game_id {
            Some(game_id) => {
                let (color, outcome) = color_and_outcome(game_pgn, username);
                let inserted = games::insert_game(
                    pool,
                    source,
                    &game_id,
                    username,
                    color.as_str(),
                    outcome.as_str(),
                    game_pgn,
                )
                .await?;
                if inserted {
                    out.imported += 1;
                } else {
                    out.skipped += 1;
                }
            }
            None => out.skipped += 1,
        }

        progress(done + 1, total, out.imported, out.skipped);
    }

    Ok(out)
}
