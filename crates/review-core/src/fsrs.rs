//! FSRS-4.5 scheduler with short learning steps.
//!
//! The memory model tracks two continuous parameters per card: stability
//! (days until recall probability decays to 90%) and difficulty (1..10).
//! Cards in `learning`/`relearning` walk a short fixed sequence of sub-day
//! intervals before promotion to `review`; once in `review`, the interval
//! is derived from stability and the configured desired retention.

use chrono::{DateTime, Duration, Utc};

use crate::types::{CardState, Rating};

/// FSRS-4.5 default weights.
pub const DEFAULT_WEIGHTS: [f64; 17] = [
    0.4, 0.6, 2.4, 5.8, 4.93, 0.94, 0.86, 0.01, 1.49, 0.14, 0.94, 2.18, 0.05, 0.34, 1.26, 0.29,
    2.61,
];

pub const MIN_STABILITY: f64 = 0.01;
const MIN_DIFFICULTY: f64 = 1.0;
const MAX_DIFFICULTY: f64 = 10.0;

const SECONDS_PER_DAY: f64 = 86_400.0;

/// A card's scheduling fields as persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct CardSnapshot {
    pub state: CardState,
    pub step: i32,
    pub stability: f64,
    pub difficulty: f64,
    pub reps: i32,
    pub lapses: i32,
    pub due_at: DateTime<Utc>,
    pub last_review_at: Option<DateTime<Utc>>,
}

impl CardSnapshot {
    /// A freshly created card, due immediately.
    pub fn new(now: DateTime<Utc>) -> Self {
        CardSnapshot {
            state: CardState::Learning,
            step: 0,
            stability: 0.4,
            difficulty: 5.0,
            reps: 0,
            lapses: 0,
            due_at: now,
            last_review_at: None,
        }
    }
}

/// The full result of grading a card.
#[derive(Debug, Clone, PartialEq)]
pub struct ReviewOutcome {
    pub state: CardState,
    pub step: i32,
    pub stability: f64,
    pub difficulty: f64,
    pub reps: i32,
    pub lapses: i32,
    pub due_at: DateTime<Utc>,
    pub elapsed_days: f64,
}

#[derive(Debug, Clone)]
pub struct Scheduler {
    pub desired_retention: f64,
    pub maximum_interval_days: i64,
    pub learning_steps: Vec<Duration>,
    pub relearning_steps: Vec<Duration>,
    w: [f64; 17],
}

impl Default for Scheduler {
    fn default() -> Self {
        Scheduler {
            desired_retention: 0.9,
            maximum_interval_days: 36_500,
            learning_steps: vec![Duration::minutes(1), Duration::minutes(10)],
            relearning_steps: vec![Duration::minutes(10)],
            w: DEFAULT_WEIGHTS,
        }
    }
}

impl Scheduler {
    pub fn new(desired_retention: f64) -> Self {
        Scheduler {
            desired_retention: desired_retention.clamp(0.5, 0.99),
            ..Scheduler::default()
        }
    }

    /// Grade `card` with `rating` at time `now`. Pure: identical inputs
    /// always produce identical outputs.
    pub fn review(&self, card: &CardSnapshot, rating: Rating, now: DateTime<Utc>) -> ReviewOutcome {
        let elapsed_days = match card.last_review_at {
            Some(prev) => ((now - prev).num_seconds() as f64 / SECONDS_PER_DAY).max(0.0),
            None => 0.0,
        };

        let (stability, difficulty) = self.next_memory(card, rating, elapsed_days);
        let (state, step, wait) = self.next_schedule(card, rating, stability);

        ReviewOutcome {
            state,
            step,
            stability,
            difficulty,
            reps: card.reps + 1,
            lapses: card.lapses + if rating == Rating::Again { 1 } else { 0 },
            due_at: now + wait,
            elapsed_days,
        }
    }

    /// Due date per prospective rating, in `Again, Hard, Good, Easy` order.
    pub fn preview(&self, card: &CardSnapshot, now: DateTime<Utc>) -> [ReviewOutcome; 4] {
        Rating::ALL.map(|rating| self.review(card, rating, now))
    }

    fn next_memory(&self, card: &CardSnapshot, rating: Rating, elapsed_days: f64) -> (f64, f64) {
        if card.reps == 0 {
            // First grade seeds the memory model from the rating alone.
            return (
                self.initial_stability(rating),
                self.initial_difficulty(rating),
            );
        }

        let s = card.stability.max(MIN_STABILITY);
        let d = card.difficulty.clamp(MIN_DIFFICULTY, MAX_DIFFICULTY);
        let r = self.retrievability(elapsed_days, s);

        let stability = match rating {
            Rating::Again => self.stability_on_forget(s, d, r),
            _ => self.stability_on_recall(s, d, r, rating),
        };
        (stability, self.next_difficulty(d, rating))
    }

    fn next_schedule(
        &self,
        card: &CardSnapshot,
        rating: Rating,
        stability: f64,
    ) -> (CardState, i32, Duration) {
        match card.state {
            CardState::Review => match rating {
                Rating::Again => match self.relearning_steps.first() {
                    Some(&first) => (CardState::Relearning, 0, first),
                    None => (CardState::Review, 0, self.review_interval(stability)),
                },
                _ => (CardState::Review, 0, self.review_interval(stability)),
            },
            CardState::Learning => self.walk_steps(
                CardState::Learning,
                &self.learning_steps,
                card.step,
                rating,
                stability,
            ),
            CardState::Relearning => self.walk_steps(
                CardState::Relearning,
                &self.relearning_steps,
                card.step,
                rating,
                stability,
            ),
        }
    }

    fn walk_steps(
        &self,
        state: CardState,
        steps: &[Duration],
        step: i32,
        rating: Rating,
        stability: f64,
    ) -> (CardState, i32, Duration) {
        if steps.is_empty() {
            return (CardState::Review, 0, self.review_interval(stability));
        }
        let idx = (step.max(0) as usize).min(steps.len() - 1);
        match rating {
            Rating::Again => (state, 0, steps[0]),
            Rating::Hard => {
                // Hard holds the step. At the first step there is no prior
                // interval to repeat, so wait between this step and the next.
                let wait = if idx == 0 && steps.len() >= 2 {
                    (steps[0] + steps[1]) / 2
                } else if idx == 0 {
                    steps[0] + steps[0] / 2
                } else {
                    steps[idx]
                };
                (state, idx as i32, wait)
            }
            Rating::Good => {
                if idx + 1 >= steps.len() {
                    (CardState::Review, 0, self.review_interval(stability))
                } else {
                    (state, (idx + 1) as i32, steps[idx + 1])
                }
            }
            Rating::Easy => (CardState::Review, 0, self.review_interval(stability)),
        }
    }

    fn initial_stability(&self, rating: Rating) -> f64 {
        self.w[(rating.value() - 1) as usize].max(MIN_STABILITY)
    }

    fn initial_difficulty(&self, rating: Rating) -> f64 {
        let g = rating.value() as f64;
        (self.w[4] - self.w[5] * (g - 3.0)).clamp(MIN_DIFFICULTY, MAX_DIFFICULTY)
    }

    /// Mean reversion toward the initial Easy difficulty keeps repeated
    /// grades from pinning difficulty at an extreme.
    fn next_difficulty(&self, difficulty: f64, rating: Rating) -> f64 {
        let g = rating.value() as f64;
        let shifted = difficulty - self.w[6] * (g - 3.0);
        let target = self.w[4] - self.w[5];
        (self.w[7] * target + (1.0 - self.w[7]) * shifted).clamp(MIN_DIFFICULTY, MAX_DIFFICULTY)
    }

    /// Probability of recall after `elapsed_days` at the given stability.
    fn retrievability(&self, elapsed_days: f64, stability: f64) -> f64 {
        (1.0 + elapsed_days / (9.0 * stability)).powi(-1)
    }

    fn stability_on_recall(&self, s: f64, d: f64, r: f64, rating: Rating) -> f64 {
        let modifier = match rating {
            Rating::Hard => self.w[15],
            Rating::Easy => self.w[16],
            _ => 1.0,
        };
        // The Hard penalty / Easy bonus scales the growth term, not the
        // whole product, so Hard never shrinks stability.
        let growth =
            self.w[8].exp() * (11.0 - d) * s.powf(-self.w[9]) * ((self.w[10] * (1.0 - r)).exp() - 1.0);
        (s * (1.0 + growth * modifier)).max(MIN_STABILITY)
    }

    /// Post-lapse stability: proportional to how established the memory
    /// was, discounted by difficulty, never above the prior stability.
    fn stability_on_forget(&self, s: f64, d: f64, r: f64) -> f64 {
        let forgotten = self.w[11]
            * d.powf(-self.w[12])
            * ((s + 1.0).powf(self.w[13]) - 1.0)
            * (self.w[14] * (1.0 - r)).exp();
        forgotten.min(s).max(MIN_STABILITY)
    }

    fn next_interval_days(&self, stability: f64) -> i64 {
        let interval = stability * 9.0 * (1.0 / self.desired_retention - 1.0);
        (interval.round() as i64).clamp(1, self.maximum_interval_days)
    }

    fn review_interval(&self, stability: f64) -> Duration {
        Duration::days(self.next_interval_days(stability))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scheduler() -> Scheduler {
        Scheduler::default()
    }

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2025-06-01T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    fn new_card() -> CardSnapshot {
        CardSnapshot::new(now())
    }

    fn review_card(stability: f64, difficulty: f64, days_since_review: i64) -> CardSnapshot {
        CardSnapshot {
            state: CardState::Review,
            step: 0,
            stability,
            difficulty,
            reps: 5,
            lapses: 1,
            due_at: now(),
            last_review_at: Some(now() - Duration::days(days_since_review)),
        }
    }

    #[test]
    fn new_card_again_restarts_first_step() {
        let out = scheduler().review(&new_card(), Rating::Again, now());
        assert_eq!(out.state, CardState::Learning);
        assert_eq!(out.step, 0);
        assert_eq!(out.lapses, 1);
        assert_eq!(out.reps, 1);
        assert_eq!(out.due_at, now() + Duration::minutes(1));
    }

    #[test]
    fn new_card_again_due_within_minutes_not_days() {
        let out = scheduler().review(&new_card(), Rating::Again, now());
        assert!(out.due_at - now() < Duration::hours(12));
    }

    #[test]
    fn new_card_hard_waits_between_first_two_steps() {
        let out = scheduler().review(&new_card(), Rating::Hard, now());
        assert_eq!(out.state, CardState::Learning);
        assert_eq!(out.step, 0);
        assert_eq!(out.due_at, now() + Duration::seconds(330));
    }

    #[test]
    fn new_card_good_advances_to_second_step() {
        let out = scheduler().review(&new_card(), Rating::Good, now());
        assert_eq!(out.state, CardState::Learning);
        assert_eq!(out.step, 1);
        assert_eq!(out.lapses, 0);
        assert_eq!(out.due_at, now() + Duration::minutes(10));
    }

    #[test]
    fn new_card_easy_graduates_immediately() {
        let out = scheduler().review(&new_card(), Rating::Easy, now());
        assert_eq!(out.state, CardState::Review);
        assert_eq!(out.step, 0);
        // Initial Easy stability is w[3] = 5.8, which maps to 6 days at
        // the default retention.
        assert_eq!(out.due_at, now() + Duration::days(6));
    }

    #[test]
    fn good_at_last_learning_step_promotes() {
        let card = CardSnapshot {
            state: CardState::Learning,
            step: 1,
            stability: 2.4,
            difficulty: 5.0,
            reps: 1,
            lapses: 0,
            due_at: now(),
            last_review_at: Some(now() - Duration::minutes(10)),
        };
        let out = scheduler().review(&card, Rating::Good, now());
        assert_eq!(out.state, CardState::Review);
        assert_eq!(out.step, 0);
        assert_eq!(out.due_at, now() + Duration::days(2));
    }

    #[test]
    fn hard_at_last_learning_step_holds() {
        let card = CardSnapshot {
            state: CardState::Learning,
            step: 1,
            stability: 2.4,
            difficulty: 5.0,
            reps: 1,
            lapses: 0,
            due_at: now(),
            last_review_at: Some(now() - Duration::minutes(10)),
        };
        let out = scheduler().review(&card, Rating::Hard, now());
        assert_eq!(out.state, CardState::Learning);
        assert_eq!(out.step, 1);
        assert_eq!(out.due_at, now() + Duration::minutes(10));
    }

    #[test]
    fn review_again_enters_relearning() {
        let card = review_card(10.0, 5.0, 10);
        let out = scheduler().review(&card, Rating::Again, now());
        assert_eq!(out.state, CardState::Relearning);
        assert_eq!(out.step, 0);
        assert_eq!(out.lapses, card.lapses + 1);
        assert_eq!(out.due_at, now() + Duration::minutes(10));
        assert!(out.stability <= card.stability);
    }

    #[test]
    fn relearning_good_returns_to_review() {
        let card = CardSnapshot {
            state: CardState::Relearning,
            step: 0,
            stability: 4.0,
            difficulty: 6.0,
            reps: 7,
            lapses: 2,
            due_at: now(),
            last_review_at: Some(now() - Duration::minutes(10)),
        };
        let out = scheduler().review(&card, Rating::Good, now());
        assert_eq!(out.state, CardState::Review);
        assert!(out.due_at >= now() + Duration::days(1));
    }

    #[test]
    fn review_ratings_order_due_dates() {
        let card = review_card(10.0, 5.0, 10);
        let s = scheduler();
        let again = s.review(&card, Rating::Again, now()).due_at;
        let hard = s.review(&card, Rating::Hard, now()).due_at;
        let good = s.review(&card, Rating::Good, now()).due_at;
        let easy = s.review(&card, Rating::Easy, now()).due_at;
        assert!(again < hard);
        assert!(hard <= good);
        assert!(good <= easy);
    }

    #[test]
    fn learning_ratings_order_due_dates() {
        let s = scheduler();
        let card = new_card();
        let again = s.review(&card, Rating::Again, now()).due_at;
        let hard = s.review(&card, Rating::Hard, now()).due_at;
        let good = s.review(&card, Rating::Good, now()).due_at;
        let easy = s.review(&card, Rating::Easy, now()).due_at;
        assert!(again < hard);
        assert!(hard <= good);
        assert!(good <= easy);
    }

    #[test]
    fn successful_review_grows_stability() {
        let card = review_card(10.0, 5.0, 10);
        let out = scheduler().review(&card, Rating::Good, now());
        assert!(out.stability > card.stability);
        assert!(out.due_at > now() + Duration::days(10));
    }

    #[test]
    fn hard_never_shrinks_stability() {
        let card = review_card(10.0, 5.0, 10);
        let out = scheduler().review(&card, Rating::Hard, now());
        assert!(out.stability >= card.stability);
    }

    #[test]
    fn again_raises_difficulty_easy_lowers_it() {
        let card = review_card(10.0, 5.0, 10);
        let s = scheduler();
        assert!(s.review(&card, Rating::Again, now()).difficulty > card.difficulty);
        assert!(s.review(&card, Rating::Easy, now()).difficulty < card.difficulty);
    }

    #[test]
    fn difficulty_stays_clamped() {
        let s = scheduler();
        let hard_card = review_card(2.0, 9.9, 5);
        assert!(s.review(&hard_card, Rating::Again, now()).difficulty <= MAX_DIFFICULTY);
        let easy_card = review_card(50.0, 1.05, 60);
        assert!(s.review(&easy_card, Rating::Easy, now()).difficulty >= MIN_DIFFICULTY);
    }

    #[test]
    fn reps_always_increment_lapses_only_on_again() {
        let card = review_card(10.0, 5.0, 10);
        let s = scheduler();
        for rating in Rating::ALL {
            let out = s.review(&card, rating, now());
            assert_eq!(out.reps, card.reps + 1);
            let expected_lapses = card.lapses + if rating == Rating::Again { 1 } else { 0 };
            assert_eq!(out.lapses, expected_lapses);
        }
    }

    #[test]
    fn elapsed_days_never_negative() {
        let mut card = review_card(10.0, 5.0, 10);
        card.last_review_at = Some(now() + Duration::days(3));
        let out = scheduler().review(&card, Rating::Good, now());
        assert_eq!(out.elapsed_days, 0.0);
    }

    #[test]
    fn elapsed_days_zero_without_prior_review() {
        let out = scheduler().review(&new_card(), Rating::Good, now());
        assert_eq!(out.elapsed_days, 0.0);
    }

    #[test]
    fn review_is_deterministic() {
        let card = review_card(7.3, 6.1, 4);
        let s = scheduler();
        let a = s.review(&card, Rating::Good, now());
        let b = s.review(&card, Rating::Good, now());
        assert_eq!(a, b);
    }

    #[test]
    fn interval_equals_stability_at_default_retention() {
        // 9 * (1/0.9 - 1) = 1, so the interval in days is the stability.
        let s = scheduler();
        assert_eq!(s.next_interval_days(5.8), 6);
        assert_eq!(s.next_interval_days(1.0), 1);
        assert_eq!(s.next_interval_days(30.2), 30);
    }

    #[test]
    fn lower_retention_stretches_intervals() {
        let strict = Scheduler::new(0.95);
        let lax = Scheduler::new(0.8);
        assert!(lax.next_interval_days(10.0) > strict.next_interval_days(10.0));
    }

    #[test]
    fn interval_respects_bounds() {
        let s = scheduler();
        assert_eq!(s.next_interval_days(0.01), 1);
        assert_eq!(s.next_interval_days(1.0e9), s.maximum_interval_days);
    }

    #[test]
    fn preview_matches_individual_reviews() {
        let card = review_card(10.0, 5.0, 10);
        let s = scheduler();
        let previews = s.preview(&card, now());
        for (i, rating) in Rating::ALL.into_iter().enumerate() {
            assert_eq!(previews[i], s.review(&card, rating, now()));
        }
    }

    #[test]
    fn stability_floor_holds_under_repeated_lapses() {
        let s = scheduler();
        let mut card = review_card(0.05, 9.5, 1);
        for _ in 0..10 {
            let out = s.review(&card, Rating::Again, now());
            assert!(out.stability >= MIN_STABILITY);
            card.stability = out.stability;
            card.difficulty = out.difficulty;
            card.state = out.state;
            card.step = out.step;
        }
    }
}
