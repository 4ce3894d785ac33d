use review_core::CardThresholds;
use serde::Deserialize;

use crate::error::AppError;

pub mod analyze;
pub mod eval;
pub mod health;
pub mod import;
pub mod review;
pub mod stats;

/// Reject a tuning knob outside its documented range.
pub(crate) fn check_range<T>(name: &str, value: T, min: T, max: T) -> Result<T, AppError>
where
    T: PartialOrd + Copy + std::fmt::Display,
{
    if value < min || value > max {
        return Err(AppError::BadRequest(format!(
            "{name} must be between {min} and {max}"
        )));
    }
    Ok(value)
}

/// Threshold knobs accepted by the review and stats endpoints. Defaults
/// mirror the analysis defaults so a plain GET sees the same card set the
/// last default-parameter analysis produced.
#[derive(Debug, Deserialize)]
pub struct ThresholdQuery {
    pub blunder_threshold: Option<i32>,
    pub objective_floor_cp: Option<i32>,
    pub winning_prune_cp: Option<i32>,
}

impl ThresholdQuery {
    pub fn thresholds(&self) -> Result<CardThresholds, AppError> {
        let defaults = CardThresholds::default();
        Ok(CardThresholds {
            min_loss_cp: check_range(
                "blunder_threshold",
                self.blunder_threshold.unwrap_or(defaults.min_loss_cp),
                20,
                1000,
            )?,
            min_best_cp: check_range(
                "objective_floor_cp",
                self.objective_floor_cp.unwrap_or(defaults.min_best_cp),
                -1000,
                1000,
            )?,
            winning_prune_cp: check_range(
                "winning_prune_cp",
                self.winning_prune_cp.unwrap_or(defaults.winning_prune_cp),
                0,
                2000,
            )?,
        })
    }
}
