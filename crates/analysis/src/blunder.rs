//! Candidate-line rendering and blunder classification.
//!
//! Pure bookkeeping between the engine and the database: no I/O happens
//! here, which keeps the threshold arithmetic easy to test.

use chess_pgn::{san_line, PlayedColor};

use crate::evaluator::Candidate;

/// Stored candidate and played lines keep at most this many plies.
pub const LINE_MAX_PLIES: usize = 10;

/// One ranked alternative, rendered for storage.
#[derive(Debug, Clone)]
pub struct CandidateLine {
    pub pv_rank: i32,
    pub cp: i32,
    pub first_move_uci: String,
    pub uci_line: String,
    pub san_line: String,
    pub is_acceptable: bool,
}

/// The opponent's actual reply to the played move, with the score after it
/// from the mover's point of view.
#[derive(Debug, Clone)]
pub struct PracticalResponse {
    pub opponent_move_uci: String,
    pub opponent_move_san: String,
    pub cp_after: Option<i32>,
}

/// Everything recorded about one user decision point.
#[derive(Debug, Clone)]
pub struct PositionAnalysis {
    /// 1-based ply of the played move within the game
    pub ply: i32,
    /// FEN before the move was played
    pub fen: String,
    pub side_to_move: PlayedColor,
    pub played_uci: String,
    pub played_san: String,
    pub best_cp: i32,
    pub played_cp: i32,
    pub loss_cp: i32,
    pub is_blunder: bool,
    pub lines: Vec<CandidateLine>,
    pub practical_response: Option<PracticalResponse>,
}

/// Render engine candidates into storable lines, flagging those within
/// `cp_window` of the best as acceptable.
pub fn candidate_lines(fen: &str, candidates: &[Candidate], cp_window: i32) -> Vec<CandidateLine> {
    let best_cp = match candidates.first() {
        Some(best) => best.cp,
        None => return Vec::new(),
    };

    candidates
        .iter()
        .filter_map(|cand| {
            let first_move_uci = cand.pv.first()?.clone();
            let truncated: Vec<&str> = cand
                .pv
                .iter()
                .take(LINE_MAX_PLIES)
                .map(String::as_str)
                .collect();
            Some(CandidateLine {
                pv_rank: cand.rank,
                cp: cand.cp,
                first_move_uci,
                uci_line: truncated.join(" "),
                san_line: san_line(fen, &cand.pv, LINE_MAX_PLIES),
                is_acceptable: best_cp - cand.cp <= cp_window,
            })
        })
        .collect()
}

/// Score for the played move when it heads one of the candidate lines.
pub fn played_cp_from_candidates(candidates: &[Candidate], played_uci: &str) -> Option<i32> {
    candidates
        .iter()
        .find(|cand| cand.pv.first().map(String::as_str) == Some(played_uci))
        .map(|cand| cand.cp)
}

/// Score loss for the played move and whether it crosses the blunder bar.
/// Fixed-depth evals are not monotonic, so a negative loss can happen and
/// simply classifies as not a blunder.
pub fn classify(best_cp: i32, played_cp: i32, blunder_loss_cp: i32) -> (i32, bool) {
    let loss_cp = best_cp - played_cp;
    (loss_cp, loss_cp >= blunder_loss_cp)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chess_pgn::STANDARD_START_FEN;

    fn cand(rank: i32, cp: i32, pv: &[&str]) -> Candidate {
        Candidate {
            rank,
            cp,
            pv: pv.iter().map(|m| m.to_string()).collect(),
        }
    }

    #[test]
    fn test_acceptable_window_is_inclusive() {
        let candidates = vec![
            cand(1, 80, &["e2e4"]),
            cand(2, 60, &["d2d4"]),
            cand(3, 55, &["g1f3"]),
            cand(4, 10, &["c2c4"]),
        ];
        let lines = candidate_lines(STANDARD_START_FEN, &candidates, 30);
        assert_eq!(lines.len(), 4);
        assert!(lines[0].is_acceptable);
        assert!(lines[1].is_acceptable);
        assert!(lines[2].is_acceptable);
        assert!(!lines[3].is_acceptable);

        // Exactly at the window still counts.
        let edge = candidate_lines(
            STANDARD_START_FEN,
            &[cand(1, 80, &["e2e4"]), cand(2, 50, &["d2d4"])],
            30,
        );
        assert!(edge[1].is_acceptable);
    }

    #[test]
    fn test_lines_render_san_and_uci() {
        let candidates = vec![cand(1, 35, &["e2e4", "e7e5", "g1f3"])];
        let lines = candidate_lines(STANDARD_START_FEN, &candidates, 50);
        assert_eq!(lines[0].first_move_uci, "e2e4");
        assert_eq!(lines[0].uci_line, "e2e4 e7e5 g1f3");
        assert_eq!(lines[0].san_line, "e4 e5 Nf3");
        assert_eq!(lines[0].pv_rank, 1);
    }

    #[test]
    fn test_long_pv_is_capped_at_ten_plies() {
        let ruy = [
            "e2e4", "e7e5", "g1f3", "b8c6", "f1b5", "a7a6", "b5a4", "g8f6", "e1g1", "f8e7",
            "f1e1", "b7b5",
        ];
        let candidates = vec![cand(1, 20, &ruy)];
        let lines = candidate_lines(STANDARD_START_FEN, &candidates, 50);
        assert_eq!(
            lines[0].uci_line,
            "e2e4 e7e5 g1f3 b8c6 f1b5 a7a6 b5a4 g8f6 e1g1 f8e7"
        );
        assert_eq!(
            lines[0].san_line,
            "e4 e5 Nf3 Nc6 Bb5 a6 Ba4 Nf6 O-O Be7"
        );
    }

    #[test]
    fn test_no_candidates_no_lines() {
        assert!(candidate_lines(STANDARD_START_FEN, &[], 30).is_empty());
    }

    #[test]
    fn test_played_move_found_among_candidates() {
        let candidates = vec![
            cand(1, 80, &["e2e4", "e7e5"]),
            cand(2, 60, &["d2d4", "d7d5"]),
        ];
        assert_eq!(played_cp_from_candidates(&candidates, "d2d4"), Some(60));
        assert_eq!(played_cp_from_candidates(&candidates, "a2a3"), None);
    }

    #[test]
    fn test_classify_blunder_threshold_is_inclusive() {
        assert_eq!(classify(50, -80, 120), (130, true));
        assert_eq!(classify(50, -70, 120), (120, true));
        assert_eq!(classify(50, -69, 120), (119, false));
    }

    #[test]
    fn test_classify_tolerates_negative_loss() {
        // Deeper re-eval of the played move can come back above the best line.
        assert_eq!(classify(40, 55, 120), (-15, false));
    }
}
