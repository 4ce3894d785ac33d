//! Engine-backed game analysis.
//!
//! Replays imported games, asks Stockfish for ranked candidates at each of
//! the user's decision points, classifies the played move against them, and
//! persists positions, candidate lines, and practical responses for review.

pub mod blunder;
pub mod db;
pub mod error;
pub mod evaluator;
pub mod pipeline;
pub mod score;
pub mod stockfish;

pub use blunder::{CandidateLine, PositionAnalysis, PracticalResponse, LINE_MAX_PLIES};
pub use error::AnalysisError;
pub use evaluator::{evaluate_fen, reply_lines, Candidate, PositionEvaluator, ReplyLine};
pub use pipeline::{analyze_username, AnalyzeOutcome, AnalyzeParams};
pub use score::MATE_SCORE;
