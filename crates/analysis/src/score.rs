//! Engine score normalization.
//!
//! Raw UCI scores come as either a centipawn value or a mate distance, always
//! from the side to move's perspective. Everything downstream works with a
//! single signed centipawn number, so mates collapse into a sentinel band
//! near +/-100000 where a shorter mate still compares as better.

use chess_pgn::PlayedColor;

/// Sentinel magnitude for forced mates.
pub const MATE_SCORE: i32 = 100_000;

/// Collapse a `cp`/`mate` score pair into one centipawn value from the side
/// to move's perspective.
pub fn resolve_cp(cp: Option<i32>, mate: Option<i32>) -> i32 {
    if let Some(m) = mate {
        if m > 0 {
            MATE_SCORE - m
        } else if m < 0 {
            -MATE_SCORE - m
        } else {
            // "mate 0": the side to move is already checkmated
            -MATE_SCORE
        }
    } else {
        cp.unwrap_or(0)
    }
}

/// Re-express a side-to-move score from `pov`'s point of view.
pub fn from_pov(cp: i32, side_to_move: PlayedColor, pov: PlayedColor) -> i32 {
    if side_to_move == pov {
        cp
    } else {
        -cp
    }
}
