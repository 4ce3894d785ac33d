//! Analysis error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("Invalid FEN")]
    InvalidFen,

    #[error("Stockfish error: {0}")]
    Stockfish(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}
