//! Position evaluation on top of the UCI driver.
//!
//! [`PositionEvaluator`] owns one engine process and turns raw UCI output
//! into normalized centipawn scores and ranked candidate lines. The free
//! functions spawn a short-lived engine for one-off probes from the HTTP
//! surface and always shut it down before returning.

use chess_pgn::{position_from_fen, san_line, uci_to_san, PlayedColor};
use shakmaty::Position;

use crate::blunder::LINE_MAX_PLIES;
use crate::error::AnalysisError;
use crate::score;
use crate::stockfish::StockfishEngine;

/// One ranked engine line for a position.
#[derive(Debug, Clone)]
pub struct Candidate {
    /// 1-based MultiPV rank
    pub rank: i32,
    /// Score from the side to move's perspective
    pub cp: i32,
    /// Principal variation in UCI notation, never empty
    pub pv: Vec<String>,
}

/// A candidate reply rendered for ad-hoc position probes.
#[derive(Debug, Clone)]
pub struct ReplyLine {
    pub rank: i32,
    pub cp: i32,
    pub first_move_uci: String,
    pub first_move_san: String,
    pub san_line: String,
}

/// A running engine plus the score bookkeeping around it.
pub struct PositionEvaluator {
    engine: StockfishEngine,
}

impl PositionEvaluator {
    pub async fn spawn(path: &str) -> Result<Self, AnalysisError> {
        Ok(Self {
            engine: StockfishEngine::new(path).await?,
        })
    }

    /// Score `fen` at fixed depth. The result is from the side to move's
    /// perspective unless `pov` asks for the other side's view.
    pub async fn score(
        &mut self,
        fen: &str,
        depth: u32,
        pov: Option<PlayedColor>,
    ) -> Result<i32, AnalysisError> {
        let side = side_to_move(fen)?;
        let result = self.engine.evaluate(fen, depth).await?;
        let cp = score::resolve_cp(result.cp, result.mate);
        Ok(score::from_pov(cp, side, pov.unwrap_or(side)))
    }

    /// Rank up to `multipv` candidate moves for `fen`, best first. Entries
    /// the engine never filled in are dropped, so fewer candidates than
    /// requested is normal near forced lines.
    pub async fn candidates(
        &mut self,
        fen: &str,
        depth: u32,
        multipv: u32,
    ) -> Result<Vec<Candidate>, AnalysisError> {
        side_to_move(fen)?;
        let lines = self.engine.evaluate_multipv(fen, depth, multipv).await?;

        let mut out = Vec::with_capacity(lines.len());
        for (idx, line) in lines.iter().enumerate() {
            if line.pv.is_empty() {
                continue;
            }
            out.push(Candidate {
                rank: idx as i32 + 1,
                cp: score::resolve_cp(line.cp, line.mate),
                pv: line.pv.clone(),
            });
        }
        Ok(out)
    }

    /// Shut the engine down, waiting for the process to exit.
    pub async fn quit(mut self) {
        self.engine.quit().await;
    }
}

/// One-shot score for a single FEN, spawning and quitting an engine.
pub async fn evaluate_fen(
    engine_path: &str,
    fen: &str,
    depth: u32,
    pov: Option<PlayedColor>,
) -> Result<i32, AnalysisError> {
    // Reject bad input before paying for an engine process
    side_to_move(fen)?;

    let mut evaluator = PositionEvaluator::spawn(engine_path).await?;
    let result = evaluator.score(fen, depth, pov).await;
    evaluator.quit().await;
    result
}

/// One-shot ranked replies for a single FEN, keeping only lines within
/// `cp_window` of the best. Scores are flipped to `pov` before the window
/// is applied, defaulting to the side to move.
pub async fn reply_lines(
    engine_path: &str,
    fen: &str,
    depth: u32,
    multipv: u32,
    cp_window: i32,
    pov: Option<PlayedColor>,
) -> Result<Vec<ReplyLine>, AnalysisError> {
    let pos = position_from_fen(fen).ok_or(AnalysisError::InvalidFen)?;
    let side = PlayedColor::from(pos.turn());
    let target = pov.unwrap_or(side);

    let mut evaluator = PositionEvaluator::spawn(engine_path).await?;
    let result = evaluator.candidates(fen, depth, multipv).await;
    evaluator.quit().await;
    let candidates = result?;

    let best_cp = match candidates.first() {
        Some(best) => score::from_pov(best.cp, side, target),
        None => return Ok(Vec::new()),
    };

    let mut lines = Vec::new();
    for cand in &candidates {
        let cp = score::from_pov(cand.cp, side, target);
        if best_cp - cp > cp_window {
            continue;
        }
        let first_move_uci = match cand.pv.first() {
            Some(uci) => uci.clone(),
            None => continue,
        };
        let first_move_san =
            uci_to_san(&pos, &first_move_uci).unwrap_or_else(|| first_move_uci.clone());
        lines.push(ReplyLine {
            rank: cand.rank,
            cp,
            first_move_uci,
            first_move_san,
            san_line: san_line(fen, &cand.pv, LINE_MAX_PLIES),
        });
    }
    Ok(lines)
}

fn side_to_move(fen: &str) -> Result<PlayedColor, AnalysisError> {
    let pos = position_from_fen(fen).ok_or(AnalysisError::InvalidFen)?;
    Ok(PlayedColor::from(pos.turn()))
}
