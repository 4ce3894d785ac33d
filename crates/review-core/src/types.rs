//! Closed enums for review ratings and card lifecycle states.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A review grade. Stored as 1..=4 in the database and on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rating {
    Again,
    Hard,
    Good,
    Easy,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("rating must be between 1 and 4, got {0}")]
pub struct InvalidRating(pub i32);

impl Rating {
    pub const ALL: [Rating; 4] = [Rating::Again, Rating::Hard, Rating::Good, Rating::Easy];

    pub fn from_value(value: i32) -> Result<Self, InvalidRating> {
        match value {
            1 => Ok(Rating::Again),
            2 => Ok(Rating::Hard),
            3 => Ok(Rating::Good),
            4 => Ok(Rating::Easy),
            other => Err(InvalidRating(other)),
        }
    }

    pub fn value(self) -> i32 {
        match self {
            Rating::Again => 1,
            Rating::Hard => 2,
            Rating::Good => 3,
            Rating::Easy => 4,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Rating::Again => "again",
            Rating::Hard => "hard",
            Rating::Good => "good",
            Rating::Easy => "easy",
        }
    }
}

/// Card lifecycle state. `Learning` covers brand-new cards (reps == 0)
/// as well as cards still walking the learning steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CardState {
    Learning,
    Review,
    Relearning,
}

impl CardState {
    pub fn as_str(self) -> &'static str {
        match self {
            CardState::Learning => "learning",
            CardState::Review => "review",
            CardState::Relearning => "relearning",
        }
    }

    /// Parse a stored state string. Unknown values fall back to `Learning`,
    /// which restarts the step walk instead of rejecting the card.
    pub fn from_db(s: &str) -> CardState {
        match s {
            "review" => CardState::Review,
            "relearning" => CardState::Relearning,
            _ => CardState::Learning,
        }
    }
}
