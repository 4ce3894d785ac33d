//! Batch analysis over a user's imported games.
//!
//! Walks each unanalyzed game move by move, asks the engine for ranked
//! candidates at every decision point of the user, scores the move that was
//! actually played, and persists one replaceable analysis block per game.

use chess_pgn::{parse_mainline, PlayedColor};
use review_core::CardThresholds;
use sqlx::PgPool;
use tracing::{info, warn};

use crate::blunder::{self, PositionAnalysis, PracticalResponse};
use crate::db;
use crate::error::AnalysisError;
use crate::evaluator::PositionEvaluator;

/// Tunable knobs for one analysis run.
#[derive(Debug, Clone)]
pub struct AnalyzeParams {
    /// Search depth for candidate ranking
    pub depth: u32,
    /// How many candidate lines to request per position
    pub multipv: u32,
    /// Candidates within this many centipawns of the best count as acceptable
    pub cp_window: i32,
    /// Minimum loss for a move to be recorded as a blunder
    pub blunder_loss_cp: i32,
    /// Skip positions where even the best line is below this score
    pub objective_floor_cp: i32,
    /// Skip positions that stay comfortably winning either way
    pub winning_prune_cp: i32,
    /// User moves at the start of the game that are not analyzed
    pub opening_user_moves_to_skip: u32,
    /// Upper bound on games picked up in one run
    pub max_games: i64,
}

impl Default for AnalyzeParams {
    fn default() -> Self {
        Self {
            depth: 10,
            multipv: 4,
            cp_window: 50,
            blunder_loss_cp: 200,
            objective_floor_cp: -200,
            winning_prune_cp: 300,
            opening_user_moves_to_skip: 0,
            max_games: 200,
        }
    }
}

impl AnalyzeParams {
    /// The card thresholds implied by this run's knobs.
    pub fn card_thresholds(&self) -> CardThresholds {
        CardThresholds {
            min_loss_cp: self.blunder_loss_cp,
            min_best_cp: self.objective_floor_cp,
            winning_prune_cp: self.winning_prune_cp,
        }
    }
}

/// Totals reported when an analysis run finishes.
#[derive(Debug, Clone, Copy, Default)]
pub struct AnalyzeOutcome {
    /// Games fully analyzed and persisted
    pub games: usize,
    /// Decision points recorded across those games
    pub positions: usize,
    /// Positions that qualified for a review card
    pub blunders: usize,
}

/// Analyze every pending game for `username`, reporting per-game progress
/// through `progress(games_done, total_games)`.
///
/// One engine process serves the whole batch and is shut down on every exit
/// path, success or error. Work already persisted stays persisted when a
/// later game fails.
pub async fn analyze_username(
    pool: &PgPool,
    engine_path: &str,
    username: &str,
    params: &AnalyzeParams,
    mut progress: impl FnMut(usize, usize) + Send,
) -> Result<AnalyzeOutcome, AnalysisError> {
    let games = db::fetch_unanalyzed_games(pool, username, params.max_games).await?;
    if games.is_empty() {
        return Ok(AnalyzeOutcome::default());
    }

    info!(username, games = games.len(), "Starting analysis batch");
    let mut evaluator = PositionEvaluator::spawn(engine_path).await?;
    let result = analyze_games(pool, &mut evaluator, &games, params, &mut progress).await;
    evaluator.quit().await;
    result
}

async fn analyze_games<F>(
    pool: &PgPool,
    evaluator: &mut PositionEvaluator,
    games: &[db::PendingGame],
    params: &AnalyzeParams,
    progress: &mut F,
) -> Result<AnalyzeOutcome, AnalysisError>
where
    F: FnMut(usize, usize),
{
    let total = games.len();
    // Follow-up evals (played move, practical reply) run a bit shallower.
    let reduced_depth = params.depth.saturating_sub(2).max(6);
    let thresholds = params.card_thresholds();

    let mut out = AnalyzeOutcome::default();
    progress(0, total);

    for game in games {
        let records = match parse_mainline(&game.pgn) {
            Some(records) => records,
            None => {
                warn!(game_id = game.id, "Mainline did not replay; skipping");
                db::mark_game_analyzed(pool, game.id).await?;
                continue;
            }
        };

        let user_color = PlayedColor::from_db(&game.played_color);
        let mut positions: Vec<PositionAnalysis> = Vec::new();
        let mut user_moves_seen: u32 = 0;

        for (idx, rec) in records.iter().enumerate() {
            if rec.side_to_move != user_color {
                continue;
            }
            user_moves_seen += 1;
            if user_moves_seen <= params.opening_user_moves_to_skip {
                continue;
            }

            let candidates = evaluator
                .candidates(&rec.fen_before, params.depth, params.multipv)
                .await?;
            let best_cp = match candidates.first() {
                Some(best) => best.cp,
                None => continue,
            };
            let lines = blunder::candidate_lines(&rec.fen_before, &candidates, params.cp_window);

            let played_cp = match blunder::played_cp_from_candidates(&candidates, &rec.uci) {
                Some(cp) => cp,
                // Not among the candidates: score the position after the
                // move and flip it back to the mover's point of view.
                None => -evaluator.score(&rec.fen_after, reduced_depth, None).await?,
            };
            let (loss_cp, is_blunder) = blunder::classify(best_cp, played_cp, params.blunder_loss_cp);

            let practical_response = match records.get(idx + 1) {
                Some(reply) => {
                    let cp_after = evaluator
                        .score(&reply.fen_after, reduced_depth, Some(user_color))
                        .await?;
                    Some(PracticalResponse {
                        opponent_move_uci: reply.uci.clone(),
                        opponent_move_san: reply.san.clone(),
                        cp_after: Some(cp_after),
                    })
                }
                None => None,
            };

            if thresholds.is_reviewable(loss_cp, best_cp, played_cp) {
                out.blunders += 1;
            }
            out.positions += 1;

            positions.push(PositionAnalysis {
                ply: rec.ply as i32,
                fen: rec.fen_before.clone(),
                side_to_move: user_color,
                played_uci: rec.uci.clone(),
                played_san: rec.san.clone(),
                best_cp,
                played_cp,
                loss_cp,
                is_blunder,
                lines,
                practical_response,
            });
        }

        db::replace_analysis_for_game(pool, game.id, &positions, &thresholds).await?;
        out.games += 1;
        progress(out.games, total);
        info!(
            game_id = game.id,
            positions = positions.len(),
            "Analyzed game"
        );
    }

    Ok(out)
}
