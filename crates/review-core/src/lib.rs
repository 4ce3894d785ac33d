//! Spaced-repetition core: card lifecycle types, the FSRS memory model,
//! and the eligibility policy that decides which positions become cards.

pub mod eligibility;
pub mod fsrs;
pub mod types;

pub use eligibility::CardThresholds;
pub use fsrs::{CardSnapshot, ReviewOutcome, Scheduler};
pub use types::{CardState, InvalidRating, Rating};
