//! Which analyzed positions deserve a card.
//!
//! Every path that filters positions by the threshold triple goes through
//! this module: card creation during analysis uses [`CardThresholds::is_reviewable`],
//! and the SQL read paths (card backfill, due selection, stats) embed the
//! fragment from [`CardThresholds::sql_predicate`]. Keeping both here means
//! the write side and the read side cannot drift apart.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardThresholds {
    /// Minimum loss for a position to count as a trainable mistake.
    pub min_loss_cp: i32,
    /// Objective floor: blunders in already-lost positions are not drilled.
    pub min_best_cp: i32,
    /// If both the best line and the played move stay at or above this,
    /// the game was comfortably won either way and the position is pruned.
    pub winning_prune_cp: i32,
}

impl Default for CardThresholds {
    fn default() -> Self {
        CardThresholds {
            min_loss_cp: 200,
            min_best_cp: -200,
            winning_prune_cp: 300,
        }
    }
}

impl CardThresholds {
    pub fn is_reviewable(&self, loss_cp: i32, best_cp: i32, played_cp: i32) -> bool {
        loss_cp >= self.min_loss_cp
            && best_cp >= self.min_best_cp
            && !(best_cp >= self.winning_prune_cp && played_cp >= self.winning_prune_cp)
    }

    /// SQL rendering of the same predicate over a positions table aliased
    /// `p`. Callers bind `min_loss_cp`, `min_best_cp`, `winning_prune_cp`
    /// in that order, with `$first_bind` as the first placeholder index.
    pub fn sql_predicate(first_bind: usize) -> String {
        format!(
            "p.loss_cp >= ${loss} AND p.best_cp >= ${best} \
             AND NOT (p.best_cp >= ${prune} AND p.played_cp >= ${prune})",
            loss = first_bind,
            best = first_bind + 1,
            prune = first_bind + 2,
        )
    }
}
